#![forbid(unsafe_code)]

//! Attach and detach of the minimap control.
//!
//! # Design
//!
//! [`MinimapControl`] owns everything an attachment creates: the root
//! element, the secondary view, the listener registry, and the sync
//! controller. Handlers installed on either view capture only `Weak`
//! handles, so the views never keep the control alive.
//!
//! # Invariants
//!
//! 1. Every handler the control installs is recorded in its registry.
//! 2. Detach runs in a fixed order: cancel deferred work, drain the
//!    registry, remove the secondary view, remove the root element.
//! 3. After detach no handler of this control fires, and a second detach
//!    changes nothing.
//!
//! # Failure Modes
//!
//! - **A registration fails during attach**: everything created so far is
//!   torn down in detach order and the error is returned.
//! - **The element has no control position when the secondary view loads**:
//!   [`MinimapError::MissingAnchor`] is logged at `error` and kept for
//!   [`MinimapControl::anchor_error`]. The minimap keeps syncing with no
//!   toggle button.
//! - **Unsubscribes fail during detach**: logged per entry, teardown
//!   continues; the returned [`DrainReport`] counts every failure, the
//!   pending deferred continuation included.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use minimap_core::{DisplayState, Ring, ZoomOffset};
use tracing::{debug, debug_span, error, trace, warn};

use crate::config::{MinimapConfig, MinimapOptions};
use crate::element::ControlElement;
use crate::error::MinimapError;
use crate::host::{
    ControlPosition, EventDescriptor, Handler, Interactions, MapEngine, MapEvent, MapView,
    SecondaryViewOptions, events,
};
use crate::registry::{DrainReport, ListenerRegistry};
use crate::style::MINIMIZED_CLASS;
use crate::sync::{SharedSync, SyncController, TRACKING_LAYER};
use crate::toggle::ToggleButton;

type AnchorSlot = Rc<RefCell<Option<MinimapError>>>;

struct Attachment {
    secondary: Rc<dyn MapView>,
    element: Rc<ControlElement>,
    registry: Rc<RefCell<ListenerRegistry>>,
    sync: SharedSync,
    anchor_error: AnchorSlot,
}

impl Attachment {
    fn teardown(&self) -> DrainReport {
        let mut report = SyncController::dispose(&self.sync);
        report.merge(self.registry.borrow_mut().drain());
        self.secondary.remove();
        self.element.remove();
        report
    }
}

/// A minimap overlay for one parent map.
pub struct MinimapControl {
    config: MinimapConfig,
    attachment: Option<Attachment>,
}

impl std::fmt::Debug for MinimapControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MinimapControl")
            .field("id", &self.config.id)
            .field("attached", &self.attachment.is_some())
            .finish()
    }
}

impl Default for MinimapControl {
    fn default() -> Self {
        Self::new(MinimapConfig::default())
    }
}

impl MinimapControl {
    #[must_use]
    pub fn new(config: MinimapConfig) -> Self {
        Self {
            config,
            attachment: None,
        }
    }

    /// Resolve `options` leniently and build a control.
    #[must_use]
    pub fn from_options(options: &MinimapOptions) -> Self {
        Self::new(MinimapConfig::from_options(options))
    }

    #[inline]
    pub fn config(&self) -> &MinimapConfig {
        &self.config
    }

    /// Corner the host should mount the element in when none is requested.
    #[inline]
    pub const fn default_position(&self) -> ControlPosition {
        ControlPosition::BottomRight
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    /// Create the secondary view and start following `parent`.
    ///
    /// Returns the root element for the host to mount. The initial sync,
    /// interaction setup, and toggle button happen when the secondary view
    /// fires `load`.
    pub fn attach(
        &mut self,
        engine: &dyn MapEngine,
        parent: Rc<dyn MapView>,
    ) -> Result<Rc<ControlElement>, MinimapError> {
        if self.attachment.is_some() {
            return Err(MinimapError::AlreadyAttached);
        }
        let _span = debug_span!("minimap.attach", id = %self.config.id).entered();

        let element = Rc::new(ControlElement::new(&self.config));
        let secondary = engine.create_view(&SecondaryViewOptions {
            container_id: self.config.id.clone(),
            style: self.config.style.clone(),
            center: parent.center(),
            interactions: self.config.interactions,
            attribution: false,
        });
        let registry = Rc::new(RefCell::new(ListenerRegistry::new()));
        let sync = SyncController::new(
            Rc::clone(&parent),
            Rc::clone(&secondary),
            Rc::clone(&registry),
            self.config.zoom_offset,
            self.config.minimizable,
            self.config.initial_minimized,
        )
        .shared();
        // The secondary `load` handler below performs the first sync.
        sync.borrow_mut().resync_on_secondary_load();

        let attachment = Attachment {
            secondary,
            element: Rc::clone(&element),
            registry,
            sync,
            anchor_error: Rc::new(RefCell::new(None)),
        };

        if let Err(err) = self.wire(&attachment, &parent) {
            warn!(error = %err, "attach failed; rolling back");
            attachment.teardown();
            return Err(err);
        }

        debug!(
            listeners = attachment.registry.borrow().len(),
            collapsed = self.config.starts_collapsed(),
            "minimap attached"
        );
        self.attachment = Some(attachment);
        Ok(element)
    }

    fn wire(&self, attachment: &Attachment, parent: &Rc<dyn MapView>) -> Result<(), MinimapError> {
        let secondary_target: Weak<dyn MapView> = Rc::downgrade(&attachment.secondary);
        let parent_target: Weak<dyn MapView> = Rc::downgrade(parent);
        let mut registry = attachment.registry.borrow_mut();

        let on_load = SecondaryLoad {
            sync: Rc::downgrade(&attachment.sync),
            parent: parent_target.clone(),
            secondary: secondary_target.clone(),
            element: Rc::downgrade(&attachment.element),
            anchor_error: Rc::downgrade(&attachment.anchor_error),
            interactions: self.config.interactions,
            minimizable: self.config.minimizable,
        };
        let token = attachment.sync.borrow().token();
        registry.register(
            &secondary_target,
            EventDescriptor::new(events::LOAD),
            Rc::new(move |_: &MapEvent| {
                if !token.is_cancelled() {
                    on_load.run();
                }
            }),
        )?;

        for event_type in [events::MOVE, events::MOVE_END] {
            registry.register(
                &parent_target,
                EventDescriptor::new(event_type),
                sync_handler(&attachment.sync, |sync, _| SyncController::request_update(sync)),
            )?;
        }

        registry.register(
            &secondary_target,
            EventDescriptor::on_layer(events::MOUSE_DOWN, TRACKING_LAYER),
            sync_handler(&attachment.sync, |sync, event| {
                SyncController::begin_drag(sync, event.point);
            }),
        )?;
        registry.register(
            &secondary_target,
            EventDescriptor::new(events::MOUSE_MOVE),
            sync_handler(&attachment.sync, |sync, event| {
                if let Some(point) = event.point {
                    SyncController::drag_to(sync, point);
                }
            }),
        )?;
        registry.register(
            &secondary_target,
            EventDescriptor::new(events::MOUSE_UP),
            sync_handler(&attachment.sync, |sync, event| {
                SyncController::end_drag(sync, event.point);
            }),
        )?;

        Ok(())
    }

    /// Stop following the parent and release everything `attach` created.
    ///
    /// Idempotent; calls on a control that is not attached return an empty
    /// report.
    pub fn detach(&mut self) -> DrainReport {
        let Some(attachment) = self.attachment.take() else {
            trace!(id = %self.config.id, "detach on inactive control");
            return DrainReport::default();
        };
        let _span = debug_span!("minimap.detach", id = %self.config.id).entered();
        let report = attachment.teardown();
        if report.failed > 0 {
            warn!(
                failed = report.failed,
                total = report.total(),
                "minimap detached with unsubscribe failures"
            );
        } else {
            debug!(removed = report.removed, "minimap detached");
        }
        report
    }

    /// Flip between expanded and collapsed.
    ///
    /// Non-minimizable controls stay expanded.
    pub fn toggle(&self) -> Result<DisplayState, MinimapError> {
        let attachment = self.attachment.as_ref().ok_or(MinimapError::NotAttached)?;
        let state = SyncController::toggle(&attachment.sync);
        attachment
            .element
            .set_class(MINIMIZED_CLASS, state.is_collapsed());
        Ok(state)
    }

    pub fn display_state(&self) -> Option<DisplayState> {
        self.attachment
            .as_ref()
            .map(|a| a.sync.borrow().display_state())
    }

    /// Change the zoom offset (clamped to `[5, 8]`) and resync.
    pub fn set_zoom_offset(&mut self, requested: i64) -> ZoomOffset {
        self.config.zoom_offset.set(requested);
        if let Some(attachment) = &self.attachment {
            attachment.sync.borrow_mut().set_zoom_offset(requested);
            SyncController::request_update(&attachment.sync);
        }
        self.config.zoom_offset
    }

    pub fn secondary(&self) -> Option<Rc<dyn MapView>> {
        self.attachment.as_ref().map(|a| Rc::clone(&a.secondary))
    }

    pub fn element(&self) -> Option<Rc<ControlElement>> {
        self.attachment.as_ref().map(|a| Rc::clone(&a.element))
    }

    /// Rectangle drawn by the most recent sync.
    pub fn tracking_ring(&self) -> Option<Ring> {
        self.attachment
            .as_ref()
            .and_then(|a| a.sync.borrow().tracking_ring())
    }

    /// Number of syncs applied since attach.
    pub fn resync_count(&self) -> u64 {
        self.attachment
            .as_ref()
            .map_or(0, |a| a.sync.borrow().resync_count())
    }

    /// Listeners currently recorded for this attachment.
    pub fn listener_count(&self) -> usize {
        self.attachment
            .as_ref()
            .map_or(0, |a| a.registry.borrow().len())
    }

    /// Anchor failure recorded while building the toggle button, if any.
    pub fn anchor_error(&self) -> Option<MinimapError> {
        self.attachment
            .as_ref()
            .and_then(|a| a.anchor_error.borrow().clone())
    }
}

impl Drop for MinimapControl {
    fn drop(&mut self) {
        if self.attachment.is_some() {
            self.detach();
        }
    }
}

/// Handler forwarding an event to the controller while it is alive.
fn sync_handler(sync: &SharedSync, f: impl Fn(&SharedSync, &MapEvent) + 'static) -> Handler {
    let weak = Rc::downgrade(sync);
    Rc::new(move |event: &MapEvent| {
        if let Some(sync) = weak.upgrade() {
            f(&sync, event);
        }
    })
}

/// Work done once the secondary view has loaded.
struct SecondaryLoad {
    sync: Weak<RefCell<SyncController>>,
    parent: Weak<dyn MapView>,
    secondary: Weak<dyn MapView>,
    element: Weak<ControlElement>,
    anchor_error: Weak<RefCell<Option<MinimapError>>>,
    interactions: Interactions,
    minimizable: bool,
}

impl SecondaryLoad {
    fn run(&self) {
        let (Some(sync), Some(parent), Some(secondary), Some(element)) = (
            self.sync.upgrade(),
            self.parent.upgrade(),
            self.secondary.upgrade(),
            self.element.upgrade(),
        ) else {
            return;
        };

        SyncController::request_update(&sync);

        for flag in Interactions::all().iter() {
            secondary.set_interaction(flag, self.interactions.contains(flag));
        }

        if !self.minimizable || element.toggle_button().is_some() {
            return;
        }
        match parent.control_position(element.id()) {
            Some(position) => {
                element.set_toggle_button(ToggleButton::new(element.id(), position));
                debug!(position = %position, "toggle button created");
            }
            None => {
                let err = MinimapError::MissingAnchor {
                    element_id: element.id().to_owned(),
                };
                error!(error = %err, "minimap toggle button unavailable");
                if let Some(slot) = self.anchor_error.upgrade() {
                    *slot.borrow_mut() = Some(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessEngine, HeadlessMap};
    use minimap_core::LngLat;

    fn parent() -> Rc<HeadlessMap> {
        Rc::new(HeadlessMap::new(LngLat::new(2.35, 48.85), 10.0))
    }

    fn control() -> MinimapControl {
        MinimapControl::from_options(&MinimapOptions {
            id: Some("mini".into()),
            ..MinimapOptions::default()
        })
    }

    #[test]
    fn attach_registers_and_syncs_on_load() {
        let engine = HeadlessEngine::new();
        let parent = parent();
        parent.place_control("mini", ControlPosition::BottomRight);
        let mut control = control();

        let element = control.attach(&engine, parent.clone()).unwrap();
        assert_eq!(element.id(), "mini");
        assert_eq!(control.listener_count(), 6);
        assert_eq!(parent.handler_count(), 2);

        let secondary = engine.last_view().unwrap();
        assert_eq!(secondary.container_id().as_deref(), Some("mini"));
        assert_eq!(secondary.interactions(), Interactions::empty());

        secondary.finish_loading();
        secondary.pump();
        assert_eq!(secondary.center(), parent.center());
        assert_eq!(secondary.zoom(), 4.0);
        assert_eq!(
            element.toggle_button().map(|b| b.position()),
            Some(ControlPosition::BottomRight)
        );
        assert!(control.anchor_error().is_none());
    }

    #[test]
    fn second_attach_is_rejected() {
        let engine = HeadlessEngine::new();
        let mut control = control();
        control.attach(&engine, parent()).unwrap();
        assert_eq!(
            control.attach(&engine, parent()).unwrap_err(),
            MinimapError::AlreadyAttached
        );
        assert_eq!(engine.view_count(), 1);
    }

    #[test]
    fn detach_is_idempotent() {
        let engine = HeadlessEngine::new();
        let parent = parent();
        let mut control = control();
        let element = control.attach(&engine, parent.clone()).unwrap();
        let secondary = engine.last_view().unwrap();

        let report = control.detach();
        assert_eq!(report, DrainReport { removed: 6, failed: 0 });
        assert_eq!(parent.handler_count(), 0);
        assert!(secondary.is_removed());
        assert!(!element.is_mounted());

        assert_eq!(control.detach(), DrainReport::default());
        assert!(!control.is_attached());
    }

    #[test]
    fn toggle_requires_attachment() {
        assert_eq!(control().toggle(), Err(MinimapError::NotAttached));
    }

    #[test]
    fn toggle_updates_element_class() {
        let engine = HeadlessEngine::new().with_auto_load(true);
        let mut control = control();
        let element = control.attach(&engine, parent()).unwrap();

        assert_eq!(control.toggle(), Ok(DisplayState::Collapsed));
        assert!(element.has_class(MINIMIZED_CLASS));
        assert_eq!(control.toggle(), Ok(DisplayState::Expanded));
        assert!(!element.has_class(MINIMIZED_CLASS));
    }

    #[test]
    fn dropping_control_detaches() {
        let engine = HeadlessEngine::new();
        let parent = parent();
        {
            let mut control = control();
            control.attach(&engine, parent.clone()).unwrap();
        }
        assert_eq!(parent.handler_count(), 0);
        assert!(engine.last_view().unwrap().is_removed());
    }

    #[test]
    fn default_position_is_bottom_right() {
        assert_eq!(control().default_position(), ControlPosition::BottomRight);
    }
}
