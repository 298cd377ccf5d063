use super::content::DragContent;
use super::geometry::Point;
use super::page::OverlayBackend;
use std::sync::Arc;

const TOOLTIP_OFFSET: (f32, f32) = (10.0, -30.0);

/// Floating preview that follows the pointer.
///
/// Repositioning is coalesced to one backend move per animation frame: at
/// most one frame request is outstanding and newer targets overwrite the
/// pending one.
pub struct PreviewOverlay {
    backend: Arc<dyn OverlayBackend>,
    visible: bool,
    pending: Option<Point>,
    frame_requested: bool,
}

impl PreviewOverlay {
    pub fn new(backend: Arc<dyn OverlayBackend>) -> Self {
        Self {
            backend,
            visible: false,
            pending: None,
            frame_requested: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn has_pending_frame(&self) -> bool {
        self.frame_requested
    }

    pub fn show(&mut self, content: &DragContent, at: Point) {
        self.backend.show_preview(content, at);
        self.visible = true;
    }

    pub fn request_move(&mut self, to: Point) {
        if !self.visible {
            return;
        }
        self.pending = Some(to);
        if !self.frame_requested {
            self.frame_requested = true;
            self.backend.request_animation_frame();
        }
    }

    /// Apply the newest pending position. Called once per animation frame.
    pub fn on_frame(&mut self) {
        self.frame_requested = false;
        if let Some(to) = self.pending.take() {
            if self.visible {
                self.backend.move_preview(to);
            }
        }
    }

    pub fn remove(&mut self) {
        if self.frame_requested {
            self.backend.cancel_animation_frame();
            self.frame_requested = false;
        }
        self.pending = None;
        if self.visible {
            self.backend.hide_preview();
            self.visible = false;
        }
    }
}

/// Text hint drawn beside the pointer.
pub struct HintOverlay {
    backend: Arc<dyn OverlayBackend>,
    visible: bool,
}

impl HintOverlay {
    pub fn new(backend: Arc<dyn OverlayBackend>) -> Self {
        Self {
            backend,
            visible: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn update(&mut self, text: &str, pointer: Point) {
        if text.is_empty() {
            return;
        }
        self.backend
            .show_tooltip(text, pointer.offset(TOOLTIP_OFFSET.0, TOOLTIP_OFFSET.1));
        self.visible = true;
    }

    pub fn hide(&mut self) {
        if self.visible {
            self.backend.hide_tooltip();
            self.visible = false;
        }
    }
}
