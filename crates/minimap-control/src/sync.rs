#![forbid(unsafe_code)]

//! Viewport synchronization between the parent and secondary views.
//!
//! # State machine
//!
//! ```text
//!             toggle (freeze)
//!   Expanded ─────────────────▶ Collapsed
//!      ▲  │                        │
//!      │  │ move / moveend         │ toggle (full resync)
//!      │  ▼                        │
//!   Expanded ◀─────────────────────┘
//! ```
//!
//! Non-minimizable controllers stay `Expanded`; `toggle` is a no-op.
//!
//! # Design
//!
//! Every entry point is an associated function on [`SharedSync`]. Each one
//! works in two phases: it borrows the controller to *plan* (read the
//! parent, update bookkeeping) and releases the borrow before *applying*
//! the plan to the views. Engines may fire events synchronously from a
//! setter; with no borrow held, such re-entry simply runs another update.
//!
//! # Invariants
//!
//! 1. After an applied update, `secondary.center == parent.center` and
//!    `secondary.zoom == clamp(parent.zoom - offset)`.
//! 2. While `Collapsed`, no view is mutated.
//! 3. At most one deferred (`load`) continuation is registered at a time;
//!    further requests coalesce into it, and it reads the latest parent
//!    state when it fires. When the owner already resyncs on the secondary
//!    view's `load` (see [`SyncController::resync_on_secondary_load`]), no
//!    continuation is registered on the secondary at all.
//! 4. Once disposed, every entry point is a no-op.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use minimap_core::{
    DisplayState, LngLat, LngLatBounds, Ring, ScreenPoint, ViewState, ZoomOffset,
    bounds_after_displacement, ring_from_bounds,
};
use tracing::{debug, trace, trace_span, warn};

use crate::cancellation::{CancellationSource, CancellationToken};
use crate::error::MinimapError;
use crate::host::{EventDescriptor, Handler, MapEvent, MapView, events};
use crate::registry::{DrainReport, ListenerId, ListenerRegistry};

/// Polygon layer holding the tracking rectangle on the secondary view.
pub const TRACKING_LAYER: &str = "minimap-tracking-rect";

/// Shared handle to a controller; what event handlers capture (weakly).
pub type SharedSync = Rc<RefCell<SyncController>>;

#[derive(Debug, Clone, Copy, Default)]
struct DragState {
    active: bool,
    last: Option<ScreenPoint>,
    /// Displacement not yet applied to the parent. Latest-wins accumulation.
    pending: ScreenPoint,
}

enum Step {
    Skip(&'static str),
    Defer(Rc<dyn MapView>),
    Apply(SyncPlan),
}

struct SyncPlan {
    secondary: ViewState,
    ring: Ring,
    pan_parent: Option<LngLatBounds>,
}

/// Keeps the secondary view and tracking rectangle in step with the parent.
pub struct SyncController {
    parent: Rc<dyn MapView>,
    secondary: Rc<dyn MapView>,
    registry: Rc<RefCell<ListenerRegistry>>,
    offset: ZoomOffset,
    minimizable: bool,
    state: DisplayState,
    ring: Option<Ring>,
    drag: DragState,
    pending_ready: Option<ListenerId>,
    secondary_load_hooked: bool,
    cancel: CancellationSource,
    resyncs: u64,
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("offset", &self.offset)
            .field("state", &self.state)
            .field("pending_ready", &self.pending_ready)
            .field("resyncs", &self.resyncs)
            .field("disposed", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl SyncController {
    /// Create a controller. It starts `Collapsed` only when it is
    /// minimizable and `initial_minimized` is set.
    pub fn new(
        parent: Rc<dyn MapView>,
        secondary: Rc<dyn MapView>,
        registry: Rc<RefCell<ListenerRegistry>>,
        offset: ZoomOffset,
        minimizable: bool,
        initial_minimized: bool,
    ) -> Self {
        let state = if minimizable && initial_minimized {
            DisplayState::Collapsed
        } else {
            DisplayState::Expanded
        };
        Self {
            parent,
            secondary,
            registry,
            offset,
            minimizable,
            state,
            ring: None,
            drag: DragState::default(),
            pending_ready: None,
            secondary_load_hooked: false,
            cancel: CancellationSource::new(),
            resyncs: 0,
        }
    }

    #[must_use]
    pub fn shared(self) -> SharedSync {
        Rc::new(RefCell::new(self))
    }

    #[inline]
    pub fn display_state(&self) -> DisplayState {
        self.state
    }

    #[inline]
    pub fn zoom_offset(&self) -> ZoomOffset {
        self.offset
    }

    /// Change the offset (clamped). Takes effect on the next update.
    pub fn set_zoom_offset(&mut self, requested: i64) {
        self.offset.set(requested);
    }

    /// Ring drawn by the last applied update.
    pub fn tracking_ring(&self) -> Option<Ring> {
        self.ring
    }

    /// Number of updates applied so far.
    pub fn resync_count(&self) -> u64 {
        self.resyncs
    }

    pub fn has_pending_update(&self) -> bool {
        self.pending_ready.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.active
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Declare that the owner requests an update when the secondary view
    /// fires `load`. Updates arriving before then wait for that one instead
    /// of registering their own continuation.
    pub fn resync_on_secondary_load(&mut self) {
        self.secondary_load_hooked = true;
    }

    /// Token cancelled when the controller is disposed.
    pub fn token(&self) -> CancellationToken {
        self.cancel.token()
    }

    /// Recompute the secondary view from the parent.
    pub fn request_update(this: &SharedSync) {
        let step = match this.try_borrow_mut() {
            Ok(mut sync) => sync.plan(),
            Err(_) => {
                trace!("update requested while controller busy; skipped");
                return;
            }
        };
        match step {
            Step::Skip(reason) => trace!(reason, "minimap update skipped"),
            Step::Defer(view) => Self::defer(this, &view),
            Step::Apply(plan) => Self::apply(this, plan),
        }
    }

    /// Flip between expanded and collapsed. Expanding resyncs immediately.
    ///
    /// Returns the resulting state; unchanged when not minimizable. Callers
    /// outside the crate go through `MinimapControl::toggle`, which also
    /// updates the element's class.
    pub(crate) fn toggle(this: &SharedSync) -> DisplayState {
        let state = {
            let mut sync = this.borrow_mut();
            if !sync.minimizable || sync.is_disposed() {
                return sync.state;
            }
            sync.state = sync.state.toggled();
            sync.drag = DragState::default();
            sync.state
        };
        debug!(state = ?state, "minimap toggled");
        if state == DisplayState::Expanded {
            Self::request_update(this);
        }
        state
    }

    /// Pointer pressed on the tracking rectangle.
    pub fn begin_drag(this: &SharedSync, point: Option<ScreenPoint>) {
        let mut sync = this.borrow_mut();
        if sync.state.is_collapsed() || sync.is_disposed() {
            return;
        }
        sync.drag = DragState {
            active: true,
            last: point,
            pending: ScreenPoint::ZERO,
        };
        trace!(?point, "tracking rectangle drag started");
    }

    /// Pointer moved while (possibly) dragging.
    pub fn drag_to(this: &SharedSync, point: ScreenPoint) {
        let moved = {
            let mut sync = this.borrow_mut();
            if !sync.drag.active {
                return;
            }
            match sync.drag.last.replace(point) {
                Some(last) => {
                    sync.drag.pending += point - last;
                    true
                }
                None => false,
            }
        };
        if moved {
            Self::request_update(this);
        }
    }

    /// Pointer released; applies any displacement still pending.
    pub fn end_drag(this: &SharedSync, point: Option<ScreenPoint>) {
        let flush = {
            let mut sync = this.borrow_mut();
            if !sync.drag.active {
                return;
            }
            if let (Some(point), Some(last)) = (point, sync.drag.last) {
                sync.drag.pending += point - last;
            }
            sync.drag.active = false;
            sync.drag.last = None;
            !sync.drag.pending.is_zero()
        };
        trace!(flush, "tracking rectangle drag ended");
        if flush {
            Self::request_update(this);
        }
    }

    /// Cancel deferred work and stop reacting. Idempotent.
    ///
    /// Returns the outcome of removing the pending continuation, if any.
    pub fn dispose(this: &SharedSync) -> DrainReport {
        let (pending, registry) = {
            let mut sync = this.borrow_mut();
            sync.cancel.cancel();
            sync.drag = DragState::default();
            (sync.pending_ready.take(), Rc::clone(&sync.registry))
        };
        let Some(id) = pending else {
            return DrainReport::default();
        };
        let report = registry.borrow_mut().unregister(id);
        debug!(
            listener_id = id,
            failed = report.failed,
            "pending deferred update cancelled"
        );
        report
    }

    fn plan(&mut self) -> Step {
        if self.is_disposed() {
            return Step::Skip("disposed");
        }
        if self.state.is_collapsed() {
            return Step::Skip("collapsed");
        }
        if !self.secondary.is_loaded() {
            if self.secondary_load_hooked {
                return Step::Skip("waiting for secondary load");
            }
            return Step::Defer(Rc::clone(&self.secondary));
        }
        if !self.parent.is_loaded() {
            return Step::Defer(Rc::clone(&self.parent));
        }

        let parent = ViewState::new(self.parent.center(), self.parent.zoom());
        let secondary = parent.derive_secondary(self.offset, self.secondary.zoom_range());
        let bounds = self.parent.bounds();

        let (ring, pan_parent) = if self.drag.pending.is_zero() {
            (ring_from_bounds(&bounds), None)
        } else {
            let displacement = std::mem::take(&mut self.drag.pending);
            let projector = self.secondary.projector();
            let moved = bounds_after_displacement(&bounds, displacement, projector.as_ref());
            (ring_from_bounds(&moved), Some(moved))
        };

        self.ring = Some(ring);
        self.resyncs += 1;
        Step::Apply(SyncPlan {
            secondary,
            ring,
            pan_parent,
        })
    }

    fn apply(this: &SharedSync, plan: SyncPlan) {
        let (parent, secondary) = {
            let sync = this.borrow();
            (Rc::clone(&sync.parent), Rc::clone(&sync.secondary))
        };
        let _span = trace_span!(
            "minimap.sync",
            zoom = plan.secondary.zoom,
            lng = plan.secondary.center.lng,
            lat = plan.secondary.center.lat
        )
        .entered();

        secondary.set_zoom(plan.secondary.zoom);
        secondary.set_center(plan.secondary.center);
        secondary.set_polygon(TRACKING_LAYER, &plan.ring);

        if let Some(bounds) = plan.pan_parent {
            let center: LngLat = bounds.center();
            debug!(lng = center.lng, lat = center.lat, "panning parent to dragged rectangle");
            parent.pan_to_bounds(bounds);
        }
    }

    fn defer(this: &SharedSync, view: &Rc<dyn MapView>) {
        let (registry, token) = {
            let sync = this.borrow();
            if sync.pending_ready.is_some() {
                trace!("update coalesced into pending deferred update");
                return;
            }
            (Rc::clone(&sync.registry), sync.token())
        };

        let weak_sync: Weak<RefCell<SyncController>> = Rc::downgrade(this);
        let weak_registry = Rc::downgrade(&registry);
        let continuation: Handler = Rc::new(move |_: &MapEvent| {
            if token.is_cancelled() {
                return;
            }
            let Some(sync) = weak_sync.upgrade() else {
                return;
            };
            let pending = match sync.try_borrow_mut() {
                Ok(mut s) => s.pending_ready.take(),
                Err(_) => return,
            };
            if let (Some(id), Some(registry)) = (pending, weak_registry.upgrade()) {
                registry.borrow_mut().unregister(id);
            }
            Self::request_update(&sync);
        });

        let target = Rc::downgrade(view);
        let registered = registry.borrow_mut().register(
            &target,
            EventDescriptor::new(events::LOAD),
            continuation,
        );
        match registered {
            Ok(id) => {
                this.borrow_mut().pending_ready = Some(id);
                debug!(
                    listener_id = id,
                    reason = %MinimapError::NotReady,
                    "update deferred until load"
                );
            }
            Err(err) => warn!(error = %err, "could not defer update"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessMap;
    use minimap_core::ZoomRange;

    struct Fixture {
        parent: Rc<HeadlessMap>,
        secondary: Rc<HeadlessMap>,
        registry: Rc<RefCell<ListenerRegistry>>,
        sync: SharedSync,
    }

    fn fixture(secondary_loaded: bool, minimizable: bool, initial_minimized: bool) -> Fixture {
        let parent = Rc::new(HeadlessMap::new(LngLat::new(10.0, 45.0), 12.0));
        let secondary = Rc::new(if secondary_loaded {
            HeadlessMap::new(LngLat::new(10.0, 45.0), 0.0)
        } else {
            HeadlessMap::unloaded(LngLat::new(10.0, 45.0), 0.0)
        });
        let registry = Rc::new(RefCell::new(ListenerRegistry::new()));
        let sync = SyncController::new(
            parent.clone(),
            secondary.clone(),
            registry.clone(),
            ZoomOffset::new(6),
            minimizable,
            initial_minimized,
        )
        .shared();
        Fixture {
            parent,
            secondary,
            registry,
            sync,
        }
    }

    #[test]
    fn update_mirrors_parent() {
        let f = fixture(true, true, false);
        SyncController::request_update(&f.sync);

        assert_eq!(f.secondary.center(), f.parent.center());
        assert_eq!(f.secondary.zoom(), 6.0);
        let ring = f.secondary.polygon(TRACKING_LAYER).unwrap();
        assert_eq!(ring.bbox(), f.parent.bounds());
        assert_eq!(f.sync.borrow().tracking_ring(), Some(ring));
        assert_eq!(f.sync.borrow().resync_count(), 1);
    }

    #[test]
    fn secondary_zoom_respects_engine_domain() {
        let parent = Rc::new(HeadlessMap::new(LngLat::default(), 3.0));
        let secondary = Rc::new(
            HeadlessMap::new(LngLat::default(), 0.0).with_zoom_range(ZoomRange::new(0.0, 22.0)),
        );
        let sync = SyncController::new(
            parent,
            secondary.clone(),
            Rc::new(RefCell::new(ListenerRegistry::new())),
            ZoomOffset::new(8),
            false,
            false,
        )
        .shared();
        SyncController::request_update(&sync);
        assert_eq!(secondary.zoom(), 0.0);
    }

    #[test]
    fn collapsed_updates_are_noops() {
        let f = fixture(true, true, true);
        assert_eq!(f.sync.borrow().display_state(), DisplayState::Collapsed);
        SyncController::request_update(&f.sync);
        assert_eq!(f.secondary.mutations(), 0);

        assert_eq!(SyncController::toggle(&f.sync), DisplayState::Expanded);
        assert_eq!(f.sync.borrow().resync_count(), 1);
        assert_eq!(f.secondary.center(), f.parent.center());
    }

    #[test]
    fn non_minimizable_ignores_toggle() {
        let f = fixture(true, false, true);
        assert_eq!(f.sync.borrow().display_state(), DisplayState::Expanded);
        assert_eq!(SyncController::toggle(&f.sync), DisplayState::Expanded);
        assert_eq!(f.sync.borrow().resync_count(), 0);
    }

    #[test]
    fn unready_update_defers_once_and_coalesces() {
        let f = fixture(false, true, false);
        SyncController::request_update(&f.sync);
        SyncController::request_update(&f.sync);
        SyncController::request_update(&f.sync);

        assert!(f.sync.borrow().has_pending_update());
        assert_eq!(f.registry.borrow().len(), 1);
        assert_eq!(f.secondary.handler_count_for(events::LOAD), 1);
        assert_eq!(f.secondary.mutations(), 0);

        f.parent.jump_to(LngLat::new(11.0, 46.0), 13.0);
        f.secondary.finish_loading();
        f.secondary.pump();

        assert!(!f.sync.borrow().has_pending_update());
        assert!(f.registry.borrow().is_empty());
        assert_eq!(f.sync.borrow().resync_count(), 1);
        assert_eq!(f.secondary.center(), LngLat::new(11.0, 46.0));
        assert_eq!(f.secondary.zoom(), 7.0);
    }

    #[test]
    fn hooked_secondary_load_registers_no_continuation() {
        let f = fixture(false, true, false);
        f.sync.borrow_mut().resync_on_secondary_load();
        SyncController::request_update(&f.sync);
        SyncController::request_update(&f.sync);

        assert!(!f.sync.borrow().has_pending_update());
        assert!(f.registry.borrow().is_empty());
        assert_eq!(f.secondary.handler_count_for(events::LOAD), 0);

        f.secondary.finish_loading();
        SyncController::request_update(&f.sync);
        assert_eq!(f.sync.borrow().resync_count(), 1);
    }

    #[test]
    fn dispose_cancels_deferred_update() {
        let f = fixture(false, true, false);
        SyncController::request_update(&f.sync);
        assert_eq!(
            SyncController::dispose(&f.sync),
            DrainReport {
                removed: 1,
                failed: 0
            }
        );
        assert_eq!(SyncController::dispose(&f.sync), DrainReport::default());

        assert!(f.registry.borrow().is_empty());
        f.secondary.finish_loading();
        f.secondary.pump();
        assert_eq!(f.secondary.mutations(), 0);

        SyncController::request_update(&f.sync);
        assert_eq!(f.sync.borrow().resync_count(), 0);
    }

    #[test]
    fn dragging_rectangle_pans_parent() {
        let f = fixture(true, true, false);
        SyncController::request_update(&f.sync);
        let before = f.parent.center();

        SyncController::begin_drag(&f.sync, Some(ScreenPoint::new(75.0, 75.0)));
        assert!(f.sync.borrow().is_dragging());
        SyncController::drag_to(&f.sync, ScreenPoint::new(85.0, 75.0));

        let after = f.parent.center();
        assert!(after.lng > before.lng, "parent should move east");
        assert!((after.lat - before.lat).abs() < 1e-3);

        // The next ordinary update follows the moved parent.
        SyncController::request_update(&f.sync);
        assert_eq!(f.secondary.center(), f.parent.center());
        assert_eq!(f.sync.borrow().resync_count(), 3);

        SyncController::end_drag(&f.sync, None);
        assert!(!f.sync.borrow().is_dragging());
    }

    #[test]
    fn drag_is_ignored_while_collapsed() {
        let f = fixture(true, true, true);
        SyncController::begin_drag(&f.sync, Some(ScreenPoint::new(0.0, 0.0)));
        SyncController::drag_to(&f.sync, ScreenPoint::new(30.0, 0.0));
        assert!(!f.sync.borrow().is_dragging());
        assert_eq!(f.parent.mutations(), 0);
    }

    #[test]
    fn zoom_offset_mutation_is_clamped() {
        let f = fixture(true, true, false);
        f.sync.borrow_mut().set_zoom_offset(2);
        assert_eq!(f.sync.borrow().zoom_offset().get(), 5);
        SyncController::request_update(&f.sync);
        assert_eq!(f.secondary.zoom(), 7.0);
    }
}
