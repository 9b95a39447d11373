#![forbid(unsafe_code)]

//! Headless, host-driven map engine.
//!
//! Design goals:
//! - **Host-driven events**: nothing is delivered until the caller pumps the
//!   view's queue with [`HeadlessMap::pump`], one event-loop turn at a time.
//! - **Deterministic**: no threads, no clocks, no tiles. Bounds come from a
//!   [`WebMercator`] projection of a fixed pixel viewport.
//! - **Observable**: the view records mutations, unsubscribes, overlays, and
//!   interaction flags so tests can assert on what the control did.
//!
//! Setters queue `move` and `moveend` the way an interactive engine would
//! fire them.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use minimap_core::{LngLat, LngLatBounds, Projector, Ring, ViewState, WebMercator, ZoomRange};

use crate::error::HostError;
use crate::host::{
    ControlPosition, EventDescriptor, Handler, HandlerId, Interactions, MapEngine, MapEvent,
    MapView, SecondaryViewOptions, events,
};

/// Viewport of a headless parent map, in pixels.
pub const DEFAULT_VIEWPORT: (f64, f64) = (800.0, 600.0);

/// Viewport of a headless secondary map, in pixels.
pub const SECONDARY_VIEWPORT: (f64, f64) = (150.0, 150.0);

struct InstalledHandler {
    id: HandlerId,
    descriptor: EventDescriptor,
    handler: Handler,
}

struct MapState {
    center: LngLat,
    zoom: f64,
    range: ZoomRange,
    width: f64,
    height: f64,
    loaded: bool,
    removed: bool,
    handlers: Vec<InstalledHandler>,
    next_handler: HandlerId,
    queue: VecDeque<MapEvent>,
    interactions: Interactions,
    polygons: BTreeMap<String, Ring>,
    positions: HashMap<String, ControlPosition>,
    fail_off: bool,
    mutations: u64,
    off_log: Vec<String>,
    container_id: Option<String>,
    style: Option<String>,
}

/// In-memory [`MapView`].
pub struct HeadlessMap {
    state: RefCell<MapState>,
}

impl std::fmt::Debug for HeadlessMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.state.borrow();
        f.debug_struct("HeadlessMap")
            .field("center", &s.center)
            .field("zoom", &s.zoom)
            .field("loaded", &s.loaded)
            .field("removed", &s.removed)
            .field("handlers", &s.handlers.len())
            .field("queued", &s.queue.len())
            .finish()
    }
}

impl HeadlessMap {
    /// A loaded map with the default viewport.
    #[must_use]
    pub fn new(center: LngLat, zoom: f64) -> Self {
        let map = Self::unloaded(center, zoom);
        map.state.borrow_mut().loaded = true;
        map
    }

    /// A map whose `load` signal has not fired yet.
    #[must_use]
    pub fn unloaded(center: LngLat, zoom: f64) -> Self {
        let (width, height) = DEFAULT_VIEWPORT;
        Self {
            state: RefCell::new(MapState {
                center,
                zoom,
                range: ZoomRange::DEFAULT,
                width,
                height,
                loaded: false,
                removed: false,
                handlers: Vec::new(),
                next_handler: 1,
                queue: VecDeque::new(),
                interactions: Interactions::all(),
                polygons: BTreeMap::new(),
                positions: HashMap::new(),
                fail_off: false,
                mutations: 0,
                off_log: Vec::new(),
                container_id: None,
                style: None,
            }),
        }
    }

    #[must_use]
    pub fn with_viewport(self, width: f64, height: f64) -> Self {
        {
            let mut s = self.state.borrow_mut();
            s.width = width;
            s.height = height;
        }
        self
    }

    #[must_use]
    pub fn with_zoom_range(self, range: ZoomRange) -> Self {
        {
            let mut s = self.state.borrow_mut();
            s.range = range;
            s.zoom = range.clamp(s.zoom);
        }
        self
    }

    /// Mark the map loaded and queue its `load` event.
    pub fn finish_loading(&self) {
        let mut s = self.state.borrow_mut();
        if s.loaded || s.removed {
            return;
        }
        s.loaded = true;
        s.queue.push_back(MapEvent::new(events::LOAD));
    }

    /// Move the map the way a user gesture or the host application would.
    ///
    /// Not counted in [`mutations`](Self::mutations), which only tracks calls
    /// made through [`MapView`].
    pub fn jump_to(&self, center: LngLat, zoom: f64) {
        let mut s = self.state.borrow_mut();
        s.center = center;
        s.zoom = s.range.clamp(zoom);
        Self::queue_move(&mut s);
    }

    /// Queue an arbitrary event.
    pub fn emit(&self, event: MapEvent) {
        let mut s = self.state.borrow_mut();
        if !s.removed {
            s.queue.push_back(event);
        }
    }

    /// Deliver queued events, including events queued by handlers while
    /// pumping. Returns the number of events delivered.
    ///
    /// Handlers are snapshotted per event and called with no borrow held,
    /// so they may call back into this map freely.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        loop {
            let Some(event) = self.state.borrow_mut().queue.pop_front() else {
                break;
            };
            let handlers: Vec<Handler> = self
                .state
                .borrow()
                .handlers
                .iter()
                .filter(|h| {
                    h.descriptor
                        .matches(&event.event_type, event.layer.as_deref())
                })
                .map(|h| Rc::clone(&h.handler))
                .collect();
            for handler in handlers {
                handler(&event);
            }
            delivered += 1;
        }
        delivered
    }

    /// Number of installed handlers.
    pub fn handler_count(&self) -> usize {
        self.state.borrow().handlers.len()
    }

    /// Number of installed handlers for `event_type`.
    pub fn handler_count_for(&self, event_type: &str) -> usize {
        self.state
            .borrow()
            .handlers
            .iter()
            .filter(|h| h.descriptor.event_type() == event_type)
            .count()
    }

    /// Event types of successful `off` calls, in order.
    pub fn off_log(&self) -> Vec<String> {
        self.state.borrow().off_log.clone()
    }

    /// Count of state-changing calls made through [`MapView`].
    pub fn mutations(&self) -> u64 {
        self.state.borrow().mutations
    }

    pub fn view_state(&self) -> ViewState {
        let s = self.state.borrow();
        ViewState::new(s.center, s.zoom)
    }

    /// Current ring of polygon layer `layer_id`.
    pub fn polygon(&self, layer_id: &str) -> Option<Ring> {
        self.state.borrow().polygons.get(layer_id).copied()
    }

    pub fn interactions(&self) -> Interactions {
        self.state.borrow().interactions
    }

    /// Record that the host placed `element_id` in `position`.
    pub fn place_control(&self, element_id: &str, position: ControlPosition) {
        self.state
            .borrow_mut()
            .positions
            .insert(element_id.to_owned(), position);
    }

    /// Forget where `element_id` was placed.
    pub fn clear_control(&self, element_id: &str) {
        self.state.borrow_mut().positions.remove(element_id);
    }

    /// Make every later `off` fail with [`HostError::Rejected`].
    pub fn fail_unsubscribes(&self, fail: bool) {
        self.state.borrow_mut().fail_off = fail;
    }

    pub fn is_removed(&self) -> bool {
        self.state.borrow().removed
    }

    pub fn container_id(&self) -> Option<String> {
        self.state.borrow().container_id.clone()
    }

    pub fn style(&self) -> Option<String> {
        self.state.borrow().style.clone()
    }

    fn queue_move(s: &mut MapState) {
        s.queue.push_back(MapEvent::new(events::MOVE));
        s.queue.push_back(MapEvent::new(events::MOVE_END));
    }

    fn mercator(s: &MapState) -> WebMercator {
        WebMercator::new(s.center, s.zoom, s.width, s.height)
    }
}

impl MapView for HeadlessMap {
    fn center(&self) -> LngLat {
        self.state.borrow().center
    }

    fn set_center(&self, center: LngLat) {
        let mut s = self.state.borrow_mut();
        s.center = center;
        s.mutations += 1;
        Self::queue_move(&mut s);
    }

    fn zoom(&self) -> f64 {
        self.state.borrow().zoom
    }

    fn set_zoom(&self, zoom: f64) {
        let mut s = self.state.borrow_mut();
        s.zoom = s.range.clamp(zoom);
        s.mutations += 1;
        Self::queue_move(&mut s);
    }

    fn zoom_range(&self) -> ZoomRange {
        self.state.borrow().range
    }

    fn bounds(&self) -> LngLatBounds {
        Self::mercator(&self.state.borrow()).visible_bounds()
    }

    fn pan_to_bounds(&self, bounds: LngLatBounds) {
        let mut s = self.state.borrow_mut();
        s.center = bounds.center();
        s.mutations += 1;
        Self::queue_move(&mut s);
    }

    fn projector(&self) -> Box<dyn Projector> {
        Box::new(Self::mercator(&self.state.borrow()))
    }

    fn on(&self, descriptor: &EventDescriptor, handler: Handler) -> HandlerId {
        let mut s = self.state.borrow_mut();
        let id = s.next_handler;
        s.next_handler += 1;
        s.handlers.push(InstalledHandler {
            id,
            descriptor: descriptor.clone(),
            handler,
        });
        id
    }

    fn off(&self, descriptor: &EventDescriptor, id: HandlerId) -> Result<(), HostError> {
        let mut s = self.state.borrow_mut();
        if s.removed {
            return Err(HostError::Removed);
        }
        if s.fail_off {
            return Err(HostError::Rejected("injected failure".into()));
        }
        let index = s
            .handlers
            .iter()
            .position(|h| h.id == id && &h.descriptor == descriptor)
            .ok_or(HostError::UnknownHandler(id))?;
        s.handlers.remove(index);
        s.off_log.push(descriptor.event_type().to_owned());
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        let s = self.state.borrow();
        s.loaded && !s.removed
    }

    fn set_interaction(&self, interaction: Interactions, enabled: bool) {
        self.state
            .borrow_mut()
            .interactions
            .set(interaction, enabled);
    }

    fn set_polygon(&self, layer_id: &str, ring: &Ring) {
        let mut s = self.state.borrow_mut();
        s.polygons.insert(layer_id.to_owned(), *ring);
        s.mutations += 1;
    }

    fn control_position(&self, element_id: &str) -> Option<ControlPosition> {
        self.state.borrow().positions.get(element_id).copied()
    }

    fn remove(&self) {
        let mut s = self.state.borrow_mut();
        s.removed = true;
        s.handlers.clear();
        s.queue.clear();
    }
}

/// [`MapEngine`] producing [`HeadlessMap`] secondary views.
#[derive(Debug, Default)]
pub struct HeadlessEngine {
    views: RefCell<Vec<Rc<HeadlessMap>>>,
    auto_load: bool,
}

impl HeadlessEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create views that are already loaded (their `load` event still queues).
    #[must_use]
    pub fn with_auto_load(mut self, auto_load: bool) -> Self {
        self.auto_load = auto_load;
        self
    }

    /// The most recently created view.
    pub fn last_view(&self) -> Option<Rc<HeadlessMap>> {
        self.views.borrow().last().cloned()
    }

    pub fn view_count(&self) -> usize {
        self.views.borrow().len()
    }
}

impl MapEngine for HeadlessEngine {
    fn create_view(&self, options: &SecondaryViewOptions) -> Rc<dyn MapView> {
        let (width, height) = SECONDARY_VIEWPORT;
        let map = HeadlessMap::unloaded(options.center, 0.0).with_viewport(width, height);
        {
            let mut s = map.state.borrow_mut();
            s.interactions = options.interactions;
            s.container_id = Some(options.container_id.clone());
            s.style = Some(options.style.clone());
        }
        if self.auto_load {
            map.finish_loading();
        }
        let map = Rc::new(map);
        self.views.borrow_mut().push(Rc::clone(&map));
        map
    }
}
