pub mod content;
pub mod engine;
pub mod geometry;
pub mod interception;
pub mod overlay;
pub mod page;
mod service;

pub use content::{classify, truncate_chars, DragContent};
pub use engine::{GestureState, MoveOutcome, Phase};
pub use geometry::{Point, Rect};
pub use interception::{InterceptionWindow, SuppressionPolicy, SuppressionReason};
pub use page::{
    EventKind, EventLevel, EventVerdict, Key, ListenerRegistry, ListenerRole, ListenerSpec,
    MouseButton, NavigationEvent, NavigationSource, NodeId, OverlayBackend, PageDom, PageEvent,
    TextSelection,
};
pub use service::{DragGestureService, PageBackends, ServiceStatus};
