use super::content::classify;
use super::engine::{GestureState, MoveOutcome, Phase};
use super::geometry::Point;
use super::interception::{InterceptionLayer, ListenerSet, SuppressionReason};
use super::overlay::{HintOverlay, PreviewOverlay};
use super::page::{
    EventKind, EventLevel, EventVerdict, Key, ListenerRegistry, ListenerRole, ListenerSpec,
    MouseButton, NavigationSource, NodeId, OverlayBackend, PageDom, PageEvent,
};
use crate::dispatch::{resolve_action, DragActionSink};
use crate::navigation::NavigationObserver;
use crate::settings::{DragConfig, SearchEngine};
use crate::settings_cache::SettingsCache;
use crate::site_filter::SiteFilter;
use std::sync::Arc;
use std::time::Instant;

const GESTURE_LISTENERS: [(EventKind, bool); 9] = [
    (EventKind::MouseDown, false),
    (EventKind::MouseMove, false),
    (EventKind::MouseUp, false),
    (EventKind::KeyDown, false),
    (EventKind::DragStart, false),
    (EventKind::DragEnd, false),
    (EventKind::Scroll, false),
    (EventKind::Click, true),
    (EventKind::Click, false),
];

/// Host-provided capabilities of one page.
pub struct PageBackends {
    pub dom: Arc<dyn PageDom>,
    pub overlay: Arc<dyn OverlayBackend>,
    pub listeners: Arc<dyn ListenerRegistry>,
    pub navigation: Box<dyn NavigationSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Stopped,
    /// `document.body` is missing; `tick` retries the start.
    WaitingForDom,
    Active,
    /// The current location is blacklisted.
    Disabled,
}

/// Drag-to-open gesture handling for one page.
pub struct DragGestureService {
    config: DragConfig,
    state: GestureState,
    dom: Arc<dyn PageDom>,
    listeners: Arc<dyn ListenerRegistry>,
    preview: PreviewOverlay,
    hint: HintOverlay,
    interception: InterceptionLayer,
    gesture_listeners: ListenerSet,
    filter: SiteFilter,
    settings: Arc<SettingsCache>,
    search_engine: SearchEngine,
    sink: Arc<dyn DragActionSink>,
    navigation: NavigationObserver,
    navigation_source: Box<dyn NavigationSource>,
    page_styled: bool,
    status: ServiceStatus,
}

impl DragGestureService {
    pub fn new(
        config: DragConfig,
        backends: PageBackends,
        settings: Arc<SettingsCache>,
        sink: Arc<dyn DragActionSink>,
    ) -> Self {
        let PageBackends {
            dom,
            overlay,
            listeners,
            navigation,
        } = backends;
        Self {
            state: GestureState::new(config.drag_threshold_px),
            preview: PreviewOverlay::new(Arc::clone(&overlay)),
            hint: HintOverlay::new(overlay),
            interception: InterceptionLayer::new(
                Arc::clone(&listeners),
                config.inline_handler_restore(),
            ),
            navigation: NavigationObserver::new(config.navigation_delay()),
            config,
            dom,
            listeners,
            gesture_listeners: ListenerSet::default(),
            filter: SiteFilter::default(),
            settings,
            search_engine: SearchEngine::default(),
            sink,
            navigation_source: navigation,
            page_styled: false,
            status: ServiceStatus::Stopped,
        }
    }

    pub fn status(&self) -> ServiceStatus {
        self.status
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn search_engine(&self) -> SearchEngine {
        self.search_engine
    }

    pub fn interception(&self) -> &InterceptionLayer {
        &self.interception
    }

    pub fn preview(&self) -> &PreviewOverlay {
        &self.preview
    }

    pub fn gesture_listeners(&self) -> &ListenerSet {
        &self.gesture_listeners
    }

    pub fn navigation(&self) -> &NavigationObserver {
        &self.navigation
    }

    /// Load settings, install the interception layer and start watching
    /// navigation. Gesture listeners are bound only off the blacklist.
    pub fn start(&mut self) {
        if !matches!(
            self.status,
            ServiceStatus::Stopped | ServiceStatus::WaitingForDom
        ) {
            return;
        }
        if !self.dom.body_ready() {
            if self.status != ServiceStatus::WaitingForDom {
                tracing::debug!("document body not ready; deferring start");
            }
            self.status = ServiceStatus::WaitingForDom;
            return;
        }

        self.refresh_settings();
        self.interception.install();
        if let Err(err) = self.navigation.start(self.navigation_source.as_mut()) {
            tracing::error!(?err, "failed to subscribe to navigation changes");
        }

        let location = self.dom.location();
        if self.filter.is_blacklisted(&location) {
            tracing::info!(href = %location.href, "page is blacklisted; drag gestures disabled");
            self.status = ServiceStatus::Disabled;
        } else {
            self.bind_gesture_listeners();
            self.status = ServiceStatus::Active;
        }
    }

    /// Tear everything down. Pending suppression is cancelled.
    pub fn stop(&mut self, now: Instant) {
        if self.status == ServiceStatus::Stopped {
            return;
        }
        self.reset_drag_state(now);
        self.gesture_listeners.remove_all(self.listeners.as_ref());
        self.interception.clear(self.dom.as_ref());
        self.interception.uninstall();
        if let Err(err) = self.navigation.stop(self.navigation_source.as_mut()) {
            tracing::error!(?err, "failed to unsubscribe from navigation changes");
        }
        self.state.clear();
        self.status = ServiceStatus::Stopped;
    }

    fn refresh_settings(&mut self) {
        let settings = self.settings.load_settings();
        self.filter.set_patterns(settings.blacklist);
        self.search_engine = settings.search_engine;
    }

    fn bind_gesture_listeners(&mut self) {
        for (kind, capture) in GESTURE_LISTENERS {
            let spec = ListenerSpec::gesture(kind, capture);
            if !self.gesture_listeners.install(self.listeners.as_ref(), spec) {
                tracing::warn!(event = kind.dom_name(), "failed to bind gesture listener");
            }
        }
    }

    fn disable(&mut self, now: Instant) {
        if self.status != ServiceStatus::Active {
            return;
        }
        self.reset_drag_state(now);
        self.gesture_listeners.remove_all(self.listeners.as_ref());
        self.hint.hide();
        self.status = ServiceStatus::Disabled;
        tracing::info!("drag gestures disabled for this route");
    }

    fn enable(&mut self) {
        if self.status != ServiceStatus::Disabled {
            return;
        }
        self.bind_gesture_listeners();
        self.status = ServiceStatus::Active;
        tracing::info!("drag gestures enabled for this route");
    }

    /// Entry point for a host that keeps the specs it registered: route the
    /// event to the listener `spec` belongs to.
    pub fn dispatch(
        &mut self,
        spec: ListenerSpec,
        event: &PageEvent,
        now: Instant,
    ) -> EventVerdict {
        match spec.role {
            ListenerRole::Gesture => self.handle(event, now),
            ListenerRole::Interception => {
                self.intercept(spec.level, event.kind(), event.target(), now)
            }
        }
    }

    /// Gesture listener entry point.
    pub fn handle(&mut self, event: &PageEvent, now: Instant) -> EventVerdict {
        if self.status != ServiceStatus::Active {
            return EventVerdict::PASS;
        }
        self.expire_drag_flag(now);
        match event {
            PageEvent::PointerDown {
                button,
                position,
                target,
            } => self.on_pointer_down(*button, *position, *target, now),
            PageEvent::PointerMove { position } => self.on_pointer_move(*position),
            PageEvent::PointerUp { .. } => self.on_pointer_up(now),
            PageEvent::Click { .. } => self.on_click(now),
            PageEvent::KeyDown { key } => self.on_key_down(key, now),
            PageEvent::Scroll => {
                if self.state.phase() == Phase::Dragging {
                    self.preview.request_move(self.state.current_position());
                }
                EventVerdict::PASS
            }
            PageEvent::NativeDragStart => EventVerdict::PREVENT_DEFAULT,
            PageEvent::NativeDragEnd => {
                self.reset_drag_state(now);
                EventVerdict::PASS
            }
        }
    }

    /// Capture-phase entry point for the interception listeners.
    pub fn intercept(
        &mut self,
        level: EventLevel,
        kind: EventKind,
        target: Option<NodeId>,
        now: Instant,
    ) -> EventVerdict {
        if self.status == ServiceStatus::Stopped {
            return EventVerdict::PASS;
        }
        self.expire_drag_flag(now);
        let verdict = self.interception.intercept(
            self.dom.as_ref(),
            kind,
            target,
            self.state.has_actually_dragged(),
            now,
        );
        if !verdict.is_pass() {
            tracing::trace!(?level, event = kind.dom_name(), "suppressed trailing event");
        }
        verdict
    }

    /// Fire every deadline that has passed.
    pub fn tick(&mut self, now: Instant) {
        if self.status == ServiceStatus::WaitingForDom {
            self.start();
        }
        self.expire_drag_flag(now);
        self.interception.tick(self.dom.as_ref(), now);
        if self.navigation.poll(now) {
            self.handle_route_change(now);
        }
    }

    /// Every entry point runs this, not only `tick`.
    fn expire_drag_flag(&mut self, now: Instant) {
        if self.state.expire_drag_flag(now) {
            tracing::trace!("drag flag cleared");
        }
    }

    pub fn on_animation_frame(&mut self) {
        self.preview.on_frame();
    }

    fn handle_route_change(&mut self, now: Instant) {
        if matches!(
            self.status,
            ServiceStatus::Stopped | ServiceStatus::WaitingForDom
        ) {
            return;
        }
        let location = self.dom.location();
        if !self.filter.needs_refresh(&location) {
            return;
        }
        if !self.settings.is_fresh() {
            self.refresh_settings();
        }
        if self.filter.is_blacklisted(&location) {
            self.disable(now);
        } else {
            self.enable();
        }
    }

    fn on_pointer_down(
        &mut self,
        button: MouseButton,
        position: Point,
        target: Option<NodeId>,
        now: Instant,
    ) -> EventVerdict {
        if button != MouseButton::Primary {
            return EventVerdict::PASS;
        }
        if self.state.phase() != Phase::Idle {
            self.reset_drag_state(now);
        }
        let Some(origin) = target else {
            return EventVerdict::PASS;
        };
        let selection = self.dom.selection();
        self.state.arm(origin, position, selection);
        tracing::trace!(?origin, x = position.x, y = position.y, "gesture armed");
        EventVerdict::PASS
    }

    fn on_pointer_move(&mut self, position: Point) -> EventVerdict {
        match self.state.track(position) {
            MoveOutcome::Ignored | MoveOutcome::Tracking => {}
            MoveOutcome::CrossedThreshold => {
                let content = self.state.origin().and_then(|origin| {
                    classify(
                        self.dom.as_ref(),
                        origin,
                        self.state.selection(),
                        self.state.start_position(),
                        self.config.preview_max_chars,
                    )
                });
                tracing::debug!(
                    kind = content.as_ref().map(|c| c.kind()).unwrap_or("none"),
                    "drag started"
                );
                if let Some(content) = &content {
                    self.dom.set_drag_styling(true);
                    self.page_styled = true;
                    self.preview.show(content, position);
                }
                self.state.begin_drag(content);
                self.update_hint(position);
            }
            MoveOutcome::Dragging => {
                self.preview.request_move(position);
                self.update_hint(position);
            }
        }
        EventVerdict::PASS
    }

    fn update_hint(&mut self, position: Point) {
        if let Some(content) = self.state.content() {
            let text = content.tooltip(self.config.tooltip_max_chars);
            self.hint.update(&text, position);
        }
    }

    fn on_pointer_up(&mut self, now: Instant) -> EventVerdict {
        let escaping = self.interception.window().reason_at(now)
            == Some(SuppressionReason::PostEscape);
        if self.state.ignore_next_mouseup() || escaping {
            self.state.consume_ignored_mouseup();
            self.interception.open_window(
                SuppressionReason::PostDrag,
                now,
                self.config.post_release_block(),
            );
            self.reset_drag_state(now);
            return EventVerdict::SUPPRESS;
        }

        let mut verdict = EventVerdict::PASS;
        if self.state.phase() == Phase::Dragging && self.state.has_actually_dragged() {
            if let Some(content) = self.state.content() {
                match resolve_action(content, self.search_engine) {
                    Some(action) => {
                        tracing::debug!(url = action.url(), "drag committed");
                        self.sink.dispatch(action);
                    }
                    None => tracing::debug!(kind = content.kind(), "drag produced no action"),
                }
                verdict = EventVerdict::CONSUME;
            }
        }
        self.reset_drag_state(now);
        verdict
    }

    fn on_click(&mut self, now: Instant) -> EventVerdict {
        if self.interception.policy().should_suppress(
            EventKind::Click,
            self.state.has_actually_dragged(),
            now,
        ) {
            EventVerdict::SUPPRESS
        } else {
            EventVerdict::PASS
        }
    }

    fn on_key_down(&mut self, key: &Key, now: Instant) -> EventVerdict {
        if *key != Key::Escape || !self.state.begin_cancel() {
            return EventVerdict::PASS;
        }
        tracing::debug!("drag cancelled");
        self.interception.open_window(
            SuppressionReason::PostEscape,
            now,
            self.config.post_escape(),
        );
        self.reset_drag_state(now);
        EventVerdict::SUPPRESS
    }

    /// Return to Idle and undo every page-visible effect of the gesture.
    /// Safe to call repeatedly.
    pub fn reset_drag_state(&mut self, now: Instant) {
        self.state.reset(now, self.config.drag_flag_clear());
        self.preview.remove();
        self.hint.hide();
        if self.page_styled {
            self.dom.set_drag_styling(false);
            self.page_styled = false;
        }
    }
}
