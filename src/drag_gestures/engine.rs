use super::content::DragContent;
use super::geometry::Point;
use super::page::{NodeId, TextSelection};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Armed,
    Dragging,
    Cancelling,
}

/// Result of feeding a pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No gesture is live.
    Ignored,
    /// Armed, still inside the threshold.
    Tracking,
    /// This move crossed the threshold; the caller must classify and call
    /// [`GestureState::begin_drag`].
    CrossedThreshold,
    Dragging,
}

/// Per-page gesture state. Exactly one instance is live per page.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureState {
    phase: Phase,
    start_position: Point,
    current_position: Point,
    origin: Option<NodeId>,
    selection: Option<TextSelection>,
    selected_text: String,
    drag_threshold_px: f32,
    has_actually_dragged: bool,
    content: Option<DragContent>,
    ignore_next_mouseup: bool,
    drag_flag_clear_at: Option<Instant>,
}

impl GestureState {
    pub fn new(drag_threshold_px: f32) -> Self {
        Self {
            phase: Phase::Idle,
            start_position: Point::default(),
            current_position: Point::default(),
            origin: None,
            selection: None,
            selected_text: String::new(),
            drag_threshold_px,
            has_actually_dragged: false,
            content: None,
            ignore_next_mouseup: false,
            drag_flag_clear_at: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn start_position(&self) -> Point {
        self.start_position
    }

    pub fn current_position(&self) -> Point {
        self.current_position
    }

    pub fn origin(&self) -> Option<NodeId> {
        self.origin
    }

    pub fn selection(&self) -> Option<&TextSelection> {
        self.selection.as_ref()
    }

    pub fn selected_text(&self) -> &str {
        &self.selected_text
    }

    pub fn drag_threshold_px(&self) -> f32 {
        self.drag_threshold_px
    }

    pub fn has_actually_dragged(&self) -> bool {
        self.has_actually_dragged
    }

    pub fn content(&self) -> Option<&DragContent> {
        self.content.as_ref()
    }

    pub fn ignore_next_mouseup(&self) -> bool {
        self.ignore_next_mouseup
    }

    pub fn drag_flag_clear_at(&self) -> Option<Instant> {
        self.drag_flag_clear_at
    }

    /// Idle -> Armed. Cancels a pending drag-flag clear.
    pub fn arm(&mut self, origin: NodeId, position: Point, selection: Option<TextSelection>) {
        self.phase = Phase::Armed;
        self.origin = Some(origin);
        self.start_position = position;
        self.current_position = position;
        self.selected_text = selection
            .as_ref()
            .map(|s| s.text.trim().to_string())
            .unwrap_or_default();
        self.selection = selection;
        self.content = None;
        self.has_actually_dragged = false;
        self.drag_flag_clear_at = None;
        self.ignore_next_mouseup = false;
    }

    pub fn track(&mut self, position: Point) -> MoveOutcome {
        match self.phase {
            Phase::Idle | Phase::Cancelling => MoveOutcome::Ignored,
            Phase::Dragging => {
                self.current_position = position;
                MoveOutcome::Dragging
            }
            Phase::Armed => {
                self.current_position = position;
                if self.start_position.distance_to(position) > self.drag_threshold_px {
                    MoveOutcome::CrossedThreshold
                } else {
                    MoveOutcome::Tracking
                }
            }
        }
    }

    /// Armed -> Dragging. The flag is set even without content so the
    /// trailing click of a plain mouse drag is still absorbed.
    pub fn begin_drag(&mut self, content: Option<DragContent>) {
        if self.phase != Phase::Armed {
            return;
        }
        self.phase = Phase::Dragging;
        self.has_actually_dragged = true;
        self.content = content;
    }

    /// Dragging -> Cancelling. Marks the next release to be ignored.
    pub fn begin_cancel(&mut self) -> bool {
        if self.phase != Phase::Dragging {
            return false;
        }
        self.phase = Phase::Cancelling;
        self.ignore_next_mouseup = true;
        true
    }

    pub fn consume_ignored_mouseup(&mut self) -> bool {
        std::mem::take(&mut self.ignore_next_mouseup)
    }

    /// Back to Idle. Keeps the selection text and schedules the drag flag to
    /// drop `clear_delay` after `now`.
    pub fn reset(&mut self, now: Instant, clear_delay: Duration) {
        self.phase = Phase::Idle;
        self.origin = None;
        self.content = None;
        if self.has_actually_dragged {
            self.drag_flag_clear_at = Some(now + clear_delay);
        }
    }

    /// Drop the drag flag once its deadline passed. Returns true when it changed.
    pub fn expire_drag_flag(&mut self, now: Instant) -> bool {
        match self.drag_flag_clear_at {
            Some(at) if now >= at => {
                self.drag_flag_clear_at = None;
                self.has_actually_dragged = false;
                true
            }
            _ => false,
        }
    }

    /// Forget everything, including pending deadlines.
    pub fn clear(&mut self) {
        *self = GestureState::new(self.drag_threshold_px);
    }
}
