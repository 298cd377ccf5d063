//! Capabilities the host page provides to the gesture subsystem.
//!
//! The crate never touches a DOM directly. A host (wasm glue, a browser
//! automation bridge, or a test double) implements these traits and forwards
//! page events to [`DragGestureService`](super::DragGestureService).

use super::content::DragContent;
use super::geometry::{Point, Rect};
use crate::site_filter::PageLocation;
use std::sync::mpsc::Sender;

/// Opaque handle to a DOM node. The page owns the node; a handle may go
/// stale, in which case lookups return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Auxiliary,
    Secondary,
    Other(u16),
}

impl MouseButton {
    /// Map a `MouseEvent.button` value.
    pub fn from_index(index: u16) -> Self {
        match index {
            0 => MouseButton::Primary,
            1 => MouseButton::Auxiliary,
            2 => MouseButton::Secondary,
            other => MouseButton::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other(String),
}

impl Key {
    /// Map a `KeyboardEvent.key` value.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            other => Key::Other(other.to_string()),
        }
    }
}

/// Events delivered to the gesture listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    PointerDown {
        button: MouseButton,
        position: Point,
        target: Option<NodeId>,
    },
    PointerMove {
        position: Point,
    },
    PointerUp {
        position: Point,
    },
    Click {
        target: Option<NodeId>,
    },
    KeyDown {
        key: Key,
    },
    Scroll,
    NativeDragStart,
    NativeDragEnd,
}

impl PageEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PageEvent::PointerDown { .. } => EventKind::MouseDown,
            PageEvent::PointerMove { .. } => EventKind::MouseMove,
            PageEvent::PointerUp { .. } => EventKind::MouseUp,
            PageEvent::Click { .. } => EventKind::Click,
            PageEvent::KeyDown { .. } => EventKind::KeyDown,
            PageEvent::Scroll => EventKind::Scroll,
            PageEvent::NativeDragStart => EventKind::DragStart,
            PageEvent::NativeDragEnd => EventKind::DragEnd,
        }
    }

    pub fn target(&self) -> Option<NodeId> {
        match self {
            PageEvent::PointerDown { target, .. } | PageEvent::Click { target } => *target,
            _ => None,
        }
    }
}

/// What the host must do with the event it just forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventVerdict {
    pub prevent_default: bool,
    pub stop_propagation: bool,
    pub stop_immediate_propagation: bool,
}

impl EventVerdict {
    pub const PASS: EventVerdict = EventVerdict {
        prevent_default: false,
        stop_propagation: false,
        stop_immediate_propagation: false,
    };

    /// Swallow the event entirely, including other listeners on the same target.
    pub const SUPPRESS: EventVerdict = EventVerdict {
        prevent_default: true,
        stop_propagation: true,
        stop_immediate_propagation: true,
    };

    /// Stop the default action and further propagation, leaving same-target
    /// listeners alone.
    pub const CONSUME: EventVerdict = EventVerdict {
        prevent_default: true,
        stop_propagation: true,
        stop_immediate_propagation: false,
    };

    pub const PREVENT_DEFAULT: EventVerdict = EventVerdict {
        prevent_default: true,
        stop_propagation: false,
        stop_immediate_propagation: false,
    };

    pub fn is_pass(&self) -> bool {
        *self == EventVerdict::PASS
    }

    pub fn stops(&self) -> bool {
        self.stop_propagation || self.stop_immediate_propagation
    }
}

/// Objects a listener can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventLevel {
    Window,
    Document,
    DocumentElement,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MouseDown,
    MouseMove,
    MouseUp,
    Click,
    KeyDown,
    DragStart,
    DragEnd,
    Scroll,
}

impl EventKind {
    pub fn dom_name(self) -> &'static str {
        match self {
            EventKind::MouseDown => "mousedown",
            EventKind::MouseMove => "mousemove",
            EventKind::MouseUp => "mouseup",
            EventKind::Click => "click",
            EventKind::KeyDown => "keydown",
            EventKind::DragStart => "dragstart",
            EventKind::DragEnd => "dragend",
            EventKind::Scroll => "scroll",
        }
    }
}

/// Which service entry point a registered listener forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerRole {
    /// Forward to [`DragGestureService::handle`](super::DragGestureService::handle).
    Gesture,
    /// Forward to [`DragGestureService::intercept`](super::DragGestureService::intercept).
    Interception,
}

/// One listener registration. Two specs that differ only in `role` are
/// distinct listeners on the same target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerSpec {
    pub level: EventLevel,
    pub kind: EventKind,
    pub capture: bool,
    pub role: ListenerRole,
}

impl ListenerSpec {
    /// Capture-phase interception listener.
    pub fn interception(level: EventLevel, kind: EventKind) -> Self {
        Self {
            level,
            kind,
            capture: true,
            role: ListenerRole::Interception,
        }
    }

    /// Gesture listener on the document.
    pub fn gesture(kind: EventKind, capture: bool) -> Self {
        Self {
            level: EventLevel::Document,
            kind,
            capture,
            role: ListenerRole::Gesture,
        }
    }
}

/// Snapshot of the page's text selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSelection {
    pub text: String,
    pub rects: Vec<Rect>,
}

impl TextSelection {
    pub fn contains(&self, point: Point) -> bool {
        !self.text.trim().is_empty() && self.rects.iter().any(|r| r.contains(point))
    }
}

/// Read access to the document plus the few mutations the engine needs.
pub trait PageDom: Send + Sync {
    fn location(&self) -> PageLocation;
    /// False until `document.body` exists.
    fn body_ready(&self) -> bool;
    fn base_url(&self) -> Option<url::Url>;
    fn selection(&self) -> Option<TextSelection>;
    /// Lower-case tag name, or `None` for stale or non-element nodes.
    fn tag_name(&self, node: NodeId) -> Option<String>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn text_content(&self, node: NodeId) -> Option<String>;
    /// Toggle the page-wide drag styling: marker class on the body, no text
    /// selection and a hidden cursor.
    fn set_drag_styling(&self, dragging: bool);
    /// Detach the node's inline click handler. Returns false when there was none.
    fn detach_inline_click(&self, node: NodeId) -> bool;
    fn restore_inline_click(&self, node: NodeId);
}

/// Rendering surface for the floating preview and tooltip.
pub trait OverlayBackend: Send + Sync {
    fn show_preview(&self, content: &DragContent, at: Point);
    fn move_preview(&self, to: Point);
    fn hide_preview(&self);
    fn show_tooltip(&self, text: &str, at: Point);
    fn hide_tooltip(&self);
    /// Ask for one `on_animation_frame` callback.
    fn request_animation_frame(&self);
    fn cancel_animation_frame(&self);
}

/// Registers listeners that forward into the service. The host keeps each
/// spec it was given and hands it back through
/// [`DragGestureService::dispatch`](super::DragGestureService::dispatch) when
/// that listener fires.
pub trait ListenerRegistry: Send + Sync {
    /// Returns false when the target level does not exist on this page.
    fn add_listener(&self, spec: ListenerSpec) -> bool;
    fn remove_listener(&self, spec: ListenerSpec);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    PushState,
    ReplaceState,
    PopState,
    HashChange,
}

/// Client-side route change notifications.
pub trait NavigationSource: Send {
    fn subscribe(&mut self, sender: Sender<NavigationEvent>) -> anyhow::Result<()>;
    fn unsubscribe(&mut self) -> anyhow::Result<()>;
}
