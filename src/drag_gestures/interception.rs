//! Capture-phase firewall for trailing clicks after a drag or a cancel.
//!
//! Browsers fire `mouseup`/`click` after a release even when the release
//! ended a drag, and after Escape the pending release still lands on the
//! page. One [`SuppressionPolicy`] decides what to swallow; every capture
//! listener, at every level, consults it.

use super::page::{
    EventKind, EventLevel, EventVerdict, ListenerRegistry, ListenerSpec, NodeId, PageDom,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

const PERSISTENT_LISTENERS: [(EventLevel, EventKind); 7] = [
    (EventLevel::Document, EventKind::Click),
    (EventLevel::Document, EventKind::MouseUp),
    (EventLevel::Document, EventKind::MouseDown),
    (EventLevel::Window, EventKind::Click),
    (EventLevel::Window, EventKind::MouseUp),
    (EventLevel::DocumentElement, EventKind::Click),
    (EventLevel::DocumentElement, EventKind::MouseUp),
];

const BLANKET_LEVELS: [EventLevel; 4] = [
    EventLevel::Document,
    EventLevel::Window,
    EventLevel::DocumentElement,
    EventLevel::Body,
];
const BLANKET_KINDS: [EventKind; 2] = [EventKind::Click, EventKind::MouseUp];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionReason {
    /// Opened by the release that ended a cancelled drag. Blocks clicks.
    PostDrag,
    /// Opened by Escape mid-drag. Blocks click, mouseup and mousedown.
    PostEscape,
}

impl SuppressionReason {
    fn blocks(self, kind: EventKind) -> bool {
        match self {
            SuppressionReason::PostDrag => kind == EventKind::Click,
            SuppressionReason::PostEscape => matches!(
                kind,
                EventKind::Click | EventKind::MouseUp | EventKind::MouseDown
            ),
        }
    }
}

/// Time-boxed suppression period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterceptionWindow {
    pub active: bool,
    pub reason: Option<SuppressionReason>,
    pub expires_at: Option<Instant>,
}

impl InterceptionWindow {
    /// Reason in force at `now`, ignoring a window whose deadline passed but
    /// has not been swept yet.
    pub fn reason_at(&self, now: Instant) -> Option<SuppressionReason> {
        match (self.active, self.reason, self.expires_at) {
            (true, Some(reason), Some(at)) if now < at => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SuppressionPolicy {
    window: InterceptionWindow,
}

impl SuppressionPolicy {
    pub fn window(&self) -> InterceptionWindow {
        self.window
    }

    /// `drag_flag` mirrors the gesture's has-actually-dragged flag; it only
    /// blocks clicks so the release that ends a drag still reaches the
    /// gesture listener.
    pub fn should_suppress(&self, kind: EventKind, drag_flag: bool, now: Instant) -> bool {
        if let Some(reason) = self.window.reason_at(now) {
            if reason.blocks(kind) {
                return true;
            }
        }
        drag_flag && kind == EventKind::Click
    }

    fn open(&mut self, reason: SuppressionReason, expires_at: Instant, now: Instant) {
        let current = self.window.reason_at(now);
        let reason = match current {
            Some(SuppressionReason::PostEscape) => SuppressionReason::PostEscape,
            _ => reason,
        };
        let expires_at = match (current, self.window.expires_at) {
            (Some(_), Some(existing)) => existing.max(expires_at),
            _ => expires_at,
        };
        self.window = InterceptionWindow {
            active: true,
            reason: Some(reason),
            expires_at: Some(expires_at),
        };
    }

    fn close(&mut self) {
        self.window = InterceptionWindow::default();
    }
}

/// Listener registrations owned by one component. Adds and removes go
/// through here so they stay symmetric.
#[derive(Debug, Default)]
pub struct ListenerSet {
    installed: HashSet<ListenerSpec>,
}

impl ListenerSet {
    pub fn install(&mut self, registry: &dyn ListenerRegistry, spec: ListenerSpec) -> bool {
        if self.installed.contains(&spec) {
            return true;
        }
        if registry.add_listener(spec) {
            self.installed.insert(spec);
            true
        } else {
            false
        }
    }

    pub fn remove_all(&mut self, registry: &dyn ListenerRegistry) {
        for spec in self.installed.drain() {
            registry.remove_listener(spec);
        }
    }

    pub fn contains(&self, spec: &ListenerSpec) -> bool {
        self.installed.contains(spec)
    }

    pub fn len(&self) -> usize {
        self.installed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingRestore {
    node: NodeId,
    due: Instant,
}

pub struct InterceptionLayer {
    registry: Arc<dyn ListenerRegistry>,
    persistent: ListenerSet,
    blanket: ListenerSet,
    policy: SuppressionPolicy,
    restores: Vec<PendingRestore>,
    restore_delay: Duration,
}

impl InterceptionLayer {
    pub fn new(registry: Arc<dyn ListenerRegistry>, restore_delay: Duration) -> Self {
        Self {
            registry,
            persistent: ListenerSet::default(),
            blanket: ListenerSet::default(),
            policy: SuppressionPolicy::default(),
            restores: Vec::new(),
            restore_delay,
        }
    }

    pub fn policy(&self) -> &SuppressionPolicy {
        &self.policy
    }

    pub fn window(&self) -> InterceptionWindow {
        self.policy.window()
    }

    pub fn persistent_listeners(&self) -> &ListenerSet {
        &self.persistent
    }

    pub fn blanket_listeners(&self) -> &ListenerSet {
        &self.blanket
    }

    pub fn pending_restores(&self) -> usize {
        self.restores.len()
    }

    pub fn install(&mut self) {
        for (level, kind) in PERSISTENT_LISTENERS {
            let spec = ListenerSpec::interception(level, kind);
            if !self.persistent.install(self.registry.as_ref(), spec) {
                tracing::debug!(?level, ?kind, "interception target absent");
            }
        }
    }

    pub fn uninstall(&mut self) {
        self.persistent.remove_all(self.registry.as_ref());
        self.blanket.remove_all(self.registry.as_ref());
    }

    pub fn open_window(&mut self, reason: SuppressionReason, now: Instant, duration: Duration) {
        self.policy.open(reason, now + duration, now);
        let effective = self.policy.window().reason;
        if effective == Some(SuppressionReason::PostEscape) {
            for level in BLANKET_LEVELS {
                for kind in BLANKET_KINDS {
                    let spec = ListenerSpec::interception(level, kind);
                    if self.persistent.contains(&spec) {
                        continue;
                    }
                    self.blanket.install(self.registry.as_ref(), spec);
                }
            }
        }
        tracing::debug!(?effective, "interception window opened");
    }

    /// Capture-phase entry point for one listener.
    pub fn intercept(
        &mut self,
        dom: &dyn PageDom,
        kind: EventKind,
        target: Option<NodeId>,
        drag_flag: bool,
        now: Instant,
    ) -> EventVerdict {
        if !self.policy.should_suppress(kind, drag_flag, now) {
            return EventVerdict::PASS;
        }
        if kind == EventKind::Click && self.policy.window().reason_at(now).is_some() {
            if let Some(node) = target {
                self.detach_inline_click(dom, node, now);
            }
        }
        EventVerdict::SUPPRESS
    }

    fn detach_inline_click(&mut self, dom: &dyn PageDom, node: NodeId, now: Instant) {
        if self.restores.iter().any(|r| r.node == node) {
            return;
        }
        if dom.detach_inline_click(node) {
            self.restores.push(PendingRestore {
                node,
                due: now + self.restore_delay,
            });
        }
    }

    /// Sweep the expired window and give back handlers whose delay passed.
    /// Restores wait while a window is still in force.
    pub fn tick(&mut self, dom: &dyn PageDom, now: Instant) {
        let window = self.policy.window();
        if window.active && window.reason_at(now).is_none() {
            self.policy.close();
            self.blanket.remove_all(self.registry.as_ref());
            tracing::debug!("interception window expired");
        }
        if self.policy.window().active {
            return;
        }
        self.restores.retain(|r| {
            if now >= r.due {
                dom.restore_inline_click(r.node);
                false
            } else {
                true
            }
        });
    }

    /// Cancel the window and hand every detached handler back now.
    pub fn clear(&mut self, dom: &dyn PageDom) {
        self.policy.close();
        self.blanket.remove_all(self.registry.as_ref());
        for r in self.restores.drain(..) {
            dom.restore_inline_click(r.node);
        }
    }
}
