#![forbid(unsafe_code)]

//! Listener bookkeeping for both map views.
//!
//! # Design
//!
//! [`ListenerRegistry`] is owned by one control instance. Every subscription
//! the control makes goes through [`ListenerRegistry::register`], which calls
//! [`MapView::on`] and records the matching `off` in the same step. There is
//! no global registry and no interception of engine methods.
//!
//! Targets are held as `Weak` handles: the registry reverses subscriptions
//! but never keeps a view alive.
//!
//! # Invariants
//!
//! 1. A record exists iff its handler is installed on the target (modulo
//!    the host removing the view behind the control's back).
//! 2. Each record is reversed at most once: [`drain`](ListenerRegistry::drain)
//!    takes the records out before calling `off`, so a second drain sees an
//!    empty registry.
//! 3. Records are reversed in registration order.
//!
//! # Failure Modes
//!
//! - **`off` fails** (view removed, handler unknown): logged at `warn` with
//!   the event descriptor, counted in [`DrainReport::failed`], and the drain
//!   continues with the next record.
//! - **Target dropped**: counted as a failure the same way.

use std::rc::Weak;

use tracing::{debug, warn};

use crate::error::MinimapError;
use crate::host::{EventDescriptor, Handler, HandlerId, MapView};

/// Registry-local identifier of a subscription.
pub type ListenerId = u64;

struct SubscriptionRecord {
    id: ListenerId,
    target: Weak<dyn MapView>,
    descriptor: EventDescriptor,
    handler_id: HandlerId,
}

/// Outcome of [`ListenerRegistry::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// Records whose `off` succeeded.
    pub removed: usize,
    /// Records whose `off` failed or whose target was gone.
    pub failed: usize,
}

impl DrainReport {
    #[inline]
    pub fn total(&self) -> usize {
        self.removed + self.failed
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: DrainReport) {
        self.removed += other.removed;
        self.failed += other.failed;
    }

    /// `Ok(removed)` when every record was reversed cleanly.
    pub fn into_result(self) -> Result<usize, MinimapError> {
        if self.failed == 0 {
            Ok(self.removed)
        } else {
            Err(MinimapError::TeardownPartialFailure {
                failed: self.failed,
                total: self.total(),
            })
        }
    }
}

/// Tracks every subscription made on either map view.
#[derive(Default)]
pub struct ListenerRegistry {
    records: Vec<SubscriptionRecord>,
    next_id: ListenerId,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.records.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` on `target` and record how to remove it.
    ///
    /// Fails with [`MinimapError::InvalidArgument`] and installs nothing if
    /// the target is gone or the descriptor is malformed.
    pub fn register(
        &mut self,
        target: &Weak<dyn MapView>,
        descriptor: EventDescriptor,
        handler: Handler,
    ) -> Result<ListenerId, MinimapError> {
        descriptor.validate()?;
        let view = target
            .upgrade()
            .ok_or(MinimapError::InvalidArgument("target view is gone"))?;

        let handler_id = view.on(&descriptor, handler);
        let id = self.next_id;
        self.next_id += 1;
        debug!(listener_id = id, event = %descriptor, "listener registered");

        self.records.push(SubscriptionRecord {
            id,
            target: target.clone(),
            descriptor,
            handler_id,
        });
        Ok(id)
    }

    /// Reverse and forget a single record.
    ///
    /// The record is dropped even when `off` fails; the failure is logged at
    /// `warn` and counted in the report. Unknown (or already drained) ids
    /// give an empty report.
    pub fn unregister(&mut self, id: ListenerId) -> DrainReport {
        let mut report = DrainReport::default();
        let Some(index) = self.records.iter().position(|r| r.id == id) else {
            return report;
        };
        let record = self.records.remove(index);
        if Self::reverse(&record) {
            report.removed = 1;
        } else {
            report.failed = 1;
        }
        report
    }

    /// Reverse every record in registration order and clear the registry.
    ///
    /// A second call is a no-op returning an empty report.
    pub fn drain(&mut self) -> DrainReport {
        let records = std::mem::take(&mut self.records);
        let mut report = DrainReport::default();
        for record in &records {
            if Self::reverse(record) {
                report.removed += 1;
            } else {
                report.failed += 1;
            }
        }
        if report.total() > 0 {
            debug!(
                removed = report.removed,
                failed = report.failed,
                "listener registry drained"
            );
        }
        report
    }

    fn reverse(record: &SubscriptionRecord) -> bool {
        let Some(view) = record.target.upgrade() else {
            warn!(
                listener_id = record.id,
                event = %record.descriptor,
                "listener target dropped before unsubscribe"
            );
            return false;
        };
        match view.off(&record.descriptor, record.handler_id) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    listener_id = record.id,
                    event = %record.descriptor,
                    error = %err,
                    "listener unsubscribe failed"
                );
                false
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Live records as `(id, descriptor)` in registration order.
    pub fn records(&self) -> impl Iterator<Item = (ListenerId, &EventDescriptor)> + '_ {
        self.records.iter().map(|r| (r.id, &r.descriptor))
    }

    /// Whether `id` is still recorded.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.records.iter().any(|r| r.id == id)
    }
}

impl Drop for ListenerRegistry {
    fn drop(&mut self) {
        if !self.records.is_empty() {
            debug!(len = self.records.len(), "registry dropped with live listeners");
            self.drain();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessMap;
    use crate::host::MapEvent;
    use minimap_core::LngLat;
    use std::cell::Cell;
    use std::rc::Rc;

    fn view() -> (Rc<HeadlessMap>, Weak<dyn MapView>) {
        let map = Rc::new(HeadlessMap::new(LngLat::new(0.0, 0.0), 4.0));
        let dyn_map: Rc<dyn MapView> = map.clone();
        let weak = Rc::downgrade(&dyn_map);
        (map, weak)
    }

    fn counter() -> (Rc<Cell<u32>>, Handler) {
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        (hits, Rc::new(move |_: &MapEvent| h.set(h.get() + 1)))
    }

    #[test]
    fn register_installs_and_records() {
        let (map, weak) = view();
        let mut registry = ListenerRegistry::new();
        let (hits, handler) = counter();

        let id = registry
            .register(&weak, EventDescriptor::new("move"), handler)
            .unwrap();
        assert!(registry.contains(id));
        assert_eq!(map.handler_count(), 1);

        map.emit(MapEvent::new("move"));
        map.pump();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn invalid_registration_attaches_nothing() {
        let (map, weak) = view();
        let mut registry = ListenerRegistry::new();
        let (_, handler) = counter();

        let err = registry
            .register(&weak, EventDescriptor::new(""), handler.clone())
            .unwrap_err();
        assert!(matches!(err, MinimapError::InvalidArgument(_)));
        assert_eq!(map.handler_count(), 0);
        assert!(registry.is_empty());

        drop(map);
        let err = registry
            .register(&weak, EventDescriptor::new("move"), handler)
            .unwrap_err();
        assert_eq!(err, MinimapError::InvalidArgument("target view is gone"));
        assert!(registry.is_empty());
    }

    #[test]
    fn drain_reverses_in_order_and_is_idempotent() {
        let (map, weak) = view();
        let mut registry = ListenerRegistry::new();
        for name in ["load", "move", "moveend"] {
            let (_, handler) = counter();
            registry
                .register(&weak, EventDescriptor::new(name), handler)
                .unwrap();
        }

        let report = registry.drain();
        assert_eq!(report, DrainReport { removed: 3, failed: 0 });
        assert_eq!(map.handler_count(), 0);
        assert_eq!(map.off_log(), vec!["load", "move", "moveend"]);

        assert_eq!(registry.drain(), DrainReport::default());
        assert_eq!(map.off_log().len(), 3);
    }

    #[test]
    fn drain_continues_past_failures() {
        let (healthy, healthy_weak) = view();
        let (broken, broken_weak) = view();
        let mut registry = ListenerRegistry::new();

        let (_, h1) = counter();
        let (_, h2) = counter();
        let (_, h3) = counter();
        registry
            .register(&healthy_weak, EventDescriptor::new("move"), h1)
            .unwrap();
        registry
            .register(&broken_weak, EventDescriptor::new("load"), h2)
            .unwrap();
        registry
            .register(&healthy_weak, EventDescriptor::new("moveend"), h3)
            .unwrap();

        broken.remove();
        let report = registry.drain();
        assert_eq!(report, DrainReport { removed: 2, failed: 1 });
        assert_eq!(healthy.handler_count(), 0);
        assert_eq!(
            report.into_result(),
            Err(MinimapError::TeardownPartialFailure { failed: 1, total: 3 })
        );
    }

    #[test]
    fn unregister_removes_one_record() {
        let (map, weak) = view();
        let mut registry = ListenerRegistry::new();
        let (_, h1) = counter();
        let (_, h2) = counter();
        let a = registry
            .register(&weak, EventDescriptor::new("load"), h1)
            .unwrap();
        let b = registry
            .register(&weak, EventDescriptor::new("move"), h2)
            .unwrap();

        assert_eq!(registry.unregister(a), DrainReport { removed: 1, failed: 0 });
        assert_eq!(registry.unregister(a), DrainReport::default());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(b));
        assert_eq!(map.handler_count(), 1);
    }

    #[test]
    fn failed_unregister_is_reported_and_forgotten() {
        let (map, weak) = view();
        let mut registry = ListenerRegistry::new();
        let (_, handler) = counter();
        let id = registry
            .register(&weak, EventDescriptor::new("load"), handler)
            .unwrap();
        map.fail_unsubscribes(true);

        assert_eq!(registry.unregister(id), DrainReport { removed: 0, failed: 1 });
        assert!(!registry.contains(id));
        assert_eq!(map.handler_count(), 1);
    }

    #[test]
    fn dropping_registry_unsubscribes() {
        let (map, weak) = view();
        {
            let mut registry = ListenerRegistry::new();
            let (_, handler) = counter();
            registry
                .register(&weak, EventDescriptor::new("move"), handler)
                .unwrap();
            assert_eq!(map.handler_count(), 1);
        }
        assert_eq!(map.handler_count(), 0);
    }
}
