#![allow(dead_code)]

use drag_to_go::dispatch::{DragAction, DragActionSink};
use drag_to_go::drag_gestures::page::{
    EventKind, EventLevel, EventVerdict, ListenerRegistry, ListenerRole, ListenerSpec,
    NavigationEvent, NavigationSource, NodeId, OverlayBackend, PageDom, PageEvent, TextSelection,
};
use drag_to_go::drag_gestures::{DragContent, DragGestureService, PageBackends, Point};
use drag_to_go::settings::{DragConfig, Settings};
use drag_to_go::settings_cache::{MemoryStore, SettingsCache, SettingsMap, SettingsStore};
use drag_to_go::site_filter::PageLocation;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct MockNode {
    pub tag: String,
    pub attrs: HashMap<String, String>,
    pub parent: Option<NodeId>,
    pub text: Option<String>,
    pub inline_click: bool,
}

pub struct MockDom {
    nodes: Mutex<HashMap<NodeId, MockNode>>,
    location: Mutex<PageLocation>,
    body_ready: AtomicBool,
    base_url: Mutex<Option<url::Url>>,
    selection: Mutex<Option<TextSelection>>,
    styling: Mutex<Vec<bool>>,
    restored: Mutex<Vec<NodeId>>,
}

impl MockDom {
    pub fn new(href: &str) -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            location: Mutex::new(PageLocation::from_href(href)),
            body_ready: AtomicBool::new(true),
            base_url: Mutex::new(url::Url::parse(href).ok()),
            selection: Mutex::new(None),
            styling: Mutex::new(Vec::new()),
            restored: Mutex::new(Vec::new()),
        }
    }

    pub fn element(
        &self,
        id: u64,
        tag: &str,
        parent: Option<u64>,
        attrs: &[(&str, &str)],
        text: Option<&str>,
    ) -> NodeId {
        let node = MockNode {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            parent: parent.map(NodeId),
            text: text.map(str::to_string),
            inline_click: false,
        };
        self.nodes.lock().unwrap().insert(NodeId(id), node);
        NodeId(id)
    }

    pub fn set_inline_click(&self, node: NodeId) {
        if let Some(n) = self.nodes.lock().unwrap().get_mut(&node) {
            n.inline_click = true;
        }
    }

    pub fn has_inline_click(&self, node: NodeId) -> bool {
        self.nodes
            .lock()
            .unwrap()
            .get(&node)
            .map(|n| n.inline_click)
            .unwrap_or(false)
    }

    pub fn navigate(&self, href: &str) {
        *self.location.lock().unwrap() = PageLocation::from_href(href);
    }

    pub fn set_body_ready(&self, ready: bool) {
        self.body_ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_base_url(&self, base: Option<&str>) {
        *self.base_url.lock().unwrap() = base.and_then(|b| url::Url::parse(b).ok());
    }

    pub fn select(&self, selection: Option<TextSelection>) {
        *self.selection.lock().unwrap() = selection;
    }

    pub fn styling_calls(&self) -> Vec<bool> {
        self.styling.lock().unwrap().clone()
    }

    pub fn restored(&self) -> Vec<NodeId> {
        self.restored.lock().unwrap().clone()
    }
}

impl PageDom for MockDom {
    fn location(&self) -> PageLocation {
        self.location.lock().unwrap().clone()
    }

    fn body_ready(&self) -> bool {
        self.body_ready.load(Ordering::SeqCst)
    }

    fn base_url(&self) -> Option<url::Url> {
        self.base_url.lock().unwrap().clone()
    }

    fn selection(&self) -> Option<TextSelection> {
        self.selection.lock().unwrap().clone()
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.nodes.lock().unwrap().get(&node).map(|n| n.tag.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .lock()
            .unwrap()
            .get(&node)
            .and_then(|n| n.attrs.get(name).cloned())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.lock().unwrap().get(&node).and_then(|n| n.parent)
    }

    fn text_content(&self, node: NodeId) -> Option<String> {
        self.nodes.lock().unwrap().get(&node).and_then(|n| n.text.clone())
    }

    fn set_drag_styling(&self, dragging: bool) {
        self.styling.lock().unwrap().push(dragging);
    }

    fn detach_inline_click(&self, node: NodeId) -> bool {
        match self.nodes.lock().unwrap().get_mut(&node) {
            Some(n) if n.inline_click => {
                n.inline_click = false;
                true
            }
            _ => false,
        }
    }

    fn restore_inline_click(&self, node: NodeId) {
        if let Some(n) = self.nodes.lock().unwrap().get_mut(&node) {
            n.inline_click = true;
        }
        self.restored.lock().unwrap().push(node);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCall {
    ShowPreview(&'static str, Point),
    MovePreview(Point),
    HidePreview,
    ShowTooltip(String, Point),
    HideTooltip,
    RequestFrame,
    CancelFrame,
}

#[derive(Default)]
pub struct RecordingOverlay {
    calls: Mutex<Vec<OverlayCall>>,
}

impl RecordingOverlay {
    pub fn calls(&self) -> Vec<OverlayCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn count(&self, pred: impl Fn(&OverlayCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn push(&self, call: OverlayCall) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(call);
        }
    }
}

impl OverlayBackend for RecordingOverlay {
    fn show_preview(&self, content: &DragContent, at: Point) {
        self.push(OverlayCall::ShowPreview(content.kind(), at));
    }

    fn move_preview(&self, to: Point) {
        self.push(OverlayCall::MovePreview(to));
    }

    fn hide_preview(&self) {
        self.push(OverlayCall::HidePreview);
    }

    fn show_tooltip(&self, text: &str, at: Point) {
        self.push(OverlayCall::ShowTooltip(text.to_string(), at));
    }

    fn hide_tooltip(&self) {
        self.push(OverlayCall::HideTooltip);
    }

    fn request_animation_frame(&self) {
        self.push(OverlayCall::RequestFrame);
    }

    fn cancel_animation_frame(&self) {
        self.push(OverlayCall::CancelFrame);
    }
}

/// Keeps live registrations in the order they were added, the way a page
/// runs same-target listeners. Levels listed in `missing` refuse listeners,
/// like a page without a body.
#[derive(Default)]
pub struct RecordingRegistry {
    active: Mutex<Vec<ListenerSpec>>,
    added: AtomicUsize,
    removed: AtomicUsize,
    missing: Mutex<Vec<EventLevel>>,
}

impl RecordingRegistry {
    pub fn refuse_level(&self, level: EventLevel) {
        self.missing.lock().unwrap().push(level);
    }

    pub fn live(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn live_for(&self, spec: ListenerSpec) -> usize {
        self.active
            .lock()
            .unwrap()
            .iter()
            .filter(|s| **s == spec)
            .count()
    }

    /// Registered listeners for one target and phase, in registration order.
    pub fn listeners_at(
        &self,
        level: EventLevel,
        kind: EventKind,
        capture: bool,
    ) -> Vec<ListenerSpec> {
        self.active
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.level == level && s.kind == kind && s.capture == capture)
            .copied()
            .collect()
    }

    pub fn added(&self) -> usize {
        self.added.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }
}

impl ListenerRegistry for RecordingRegistry {
    fn add_listener(&self, spec: ListenerSpec) -> bool {
        if self.missing.lock().unwrap().contains(&spec.level) {
            return false;
        }
        self.active.lock().unwrap().push(spec);
        self.added.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn remove_listener(&self, spec: ListenerSpec) {
        let mut active = self.active.lock().unwrap();
        if let Some(pos) = active.iter().position(|s| *s == spec) {
            active.remove(pos);
            self.removed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Test-side handle onto the navigation source handed to the service.
#[derive(Clone, Default)]
pub struct NavigationHandle {
    sender: Arc<Mutex<Option<Sender<NavigationEvent>>>>,
    subscribes: Arc<AtomicUsize>,
}

impl NavigationHandle {
    pub fn emit(&self, event: NavigationEvent) -> bool {
        match self.sender.lock().unwrap().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.sender.lock().unwrap().is_some()
    }

    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }
}

pub struct MockNavigation {
    handle: NavigationHandle,
}

impl MockNavigation {
    pub fn new(handle: NavigationHandle) -> Self {
        Self { handle }
    }
}

impl NavigationSource for MockNavigation {
    fn subscribe(&mut self, sender: Sender<NavigationEvent>) -> anyhow::Result<()> {
        *self.handle.sender.lock().unwrap() = Some(sender);
        self.handle.subscribes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn unsubscribe(&mut self) -> anyhow::Result<()> {
        self.handle.sender.lock().unwrap().take();
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    actions: Arc<Mutex<Vec<DragAction>>>,
}

impl RecordingSink {
    pub fn actions(&self) -> Vec<DragAction> {
        self.actions.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl DragActionSink for RecordingSink {
    fn dispatch(&self, action: DragAction) {
        if let Ok(mut guard) = self.actions.lock() {
            guard.push(action);
        }
    }
}

/// Store that counts fetches and can be made slow.
pub struct CountingStore {
    inner: MemoryStore,
    gets: AtomicUsize,
    delay: Duration,
}

impl CountingStore {
    pub fn new(values: SettingsMap, delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(values),
            gets: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

impl SettingsStore for CountingStore {
    fn get(&self, keys: &[&str]) -> anyhow::Result<SettingsMap> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.inner.get(keys)
    }

    fn set(&self, values: &SettingsMap) -> anyhow::Result<()> {
        self.inner.set(values)
    }
}

/// What happened to one event pushed through the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    /// A gesture listener ran.
    pub reached_gesture: bool,
    pub default_prevented: bool,
    pub stopped: bool,
}

impl Delivery {
    /// The event went through untouched.
    pub fn is_normal(&self) -> bool {
        self.reached_gesture && !self.default_prevented && !self.stopped
    }

    fn absorb(&mut self, verdict: EventVerdict) {
        self.default_prevented |= verdict.prevent_default;
        self.stopped |= verdict.stops();
    }
}

const CAPTURE_PATH: [EventLevel; 4] = [
    EventLevel::Window,
    EventLevel::Document,
    EventLevel::DocumentElement,
    EventLevel::Body,
];

/// One page wired to recording backends, with a browser-like event path.
pub struct Harness {
    pub dom: Arc<MockDom>,
    pub overlay: Arc<RecordingOverlay>,
    pub registry: Arc<RecordingRegistry>,
    pub navigation: NavigationHandle,
    pub store: Arc<CountingStore>,
    pub service: DragGestureService,
    pub t0: Instant,
}

impl Harness {
    pub fn new(dom: MockDom, settings: Settings, sink: Arc<dyn DragActionSink>) -> Self {
        Self::with_config(dom, settings, sink, DragConfig::default())
    }

    pub fn with_config(
        dom: MockDom,
        settings: Settings,
        sink: Arc<dyn DragActionSink>,
        config: DragConfig,
    ) -> Self {
        let dom = Arc::new(dom);
        let overlay = Arc::new(RecordingOverlay::default());
        let registry = Arc::new(RecordingRegistry::default());
        let navigation = NavigationHandle::default();
        let store = Arc::new(CountingStore::new(settings.to_map(), Duration::ZERO));
        let cache = Arc::new(SettingsCache::new(store.clone()));
        let backends = PageBackends {
            dom: dom.clone(),
            overlay: overlay.clone(),
            listeners: registry.clone(),
            navigation: Box::new(MockNavigation::new(navigation.clone())),
        };
        let service = DragGestureService::new(config, backends, cache, sink);
        Self {
            dom,
            overlay,
            registry,
            navigation,
            store,
            service,
            t0: Instant::now(),
        }
    }

    pub fn at(&self, ms: u64) -> Instant {
        self.t0 + Duration::from_millis(ms)
    }

    pub fn tick(&mut self, ms: u64) {
        let now = self.at(ms);
        self.service.tick(now);
    }

    /// Deliver `event` the way a browser would: capture listeners from the
    /// window inwards, then bubble listeners on the document. Only listeners
    /// the service registered run, each through the spec it registered.
    pub fn fire(&mut self, event: PageEvent, ms: u64) -> Delivery {
        let now = self.at(ms);
        let kind = event.kind();
        let mut delivery = Delivery::default();

        let path = CAPTURE_PATH
            .iter()
            .map(|level| (*level, true))
            .chain(std::iter::once((EventLevel::Document, false)));
        for (level, capture) in path {
            for spec in self.registry.listeners_at(level, kind, capture) {
                if spec.role == ListenerRole::Gesture {
                    delivery.reached_gesture = true;
                }
                let verdict = self.service.dispatch(spec, &event, now);
                delivery.absorb(verdict);
                if verdict.stops() {
                    return delivery;
                }
            }
        }
        delivery
    }

    pub fn press(&mut self, target: NodeId, x: f32, y: f32, ms: u64) -> Delivery {
        self.fire(
            PageEvent::PointerDown {
                button: drag_to_go::drag_gestures::page::MouseButton::Primary,
                position: Point::new(x, y),
                target: Some(target),
            },
            ms,
        )
    }

    pub fn move_to(&mut self, x: f32, y: f32, ms: u64) -> Delivery {
        self.fire(
            PageEvent::PointerMove {
                position: Point::new(x, y),
            },
            ms,
        )
    }

    pub fn release(&mut self, x: f32, y: f32, ms: u64) -> Delivery {
        self.fire(
            PageEvent::PointerUp {
                position: Point::new(x, y),
            },
            ms,
        )
    }

    pub fn click(&mut self, target: NodeId, ms: u64) -> Delivery {
        self.fire(
            PageEvent::Click {
                target: Some(target),
            },
            ms,
        )
    }
}

pub fn settings_with_blacklist(patterns: &[&str]) -> Settings {
    Settings {
        blacklist: patterns.iter().map(|p| p.to_string()).collect(),
        ..Settings::default()
    }
}
