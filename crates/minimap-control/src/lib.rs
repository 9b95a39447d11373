#![forbid(unsafe_code)]

//! Minimap Control
//!
//! An overlay control that shows a small secondary map following a parent
//! map, with a rectangle marking the parent's visible viewport.
//!
//! # Key Components
//!
//! - [`MinimapControl`] - attach / detach lifecycle and the public surface
//! - [`SyncController`] - keeps the secondary view and rectangle in step
//! - [`ListenerRegistry`] - records every subscription so detach can reverse it
//! - [`MapView`] / [`MapEngine`] - what the control needs from the host engine
//! - [`MinimapOptions`] / [`MinimapConfig`] - configuration and defaults
//! - [`HeadlessEngine`] - deterministic in-memory engine for tests and demos
//!
//! # Role
//! The geometry lives in `minimap-core`. This crate wires it to live map
//! views: it subscribes to parent movement, derives the secondary view,
//! redraws the tracking rectangle, and tears everything down exactly once.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use minimap_control::{ControlPosition, HeadlessEngine, HeadlessMap, MapView, MinimapControl};
//! use minimap_core::LngLat;
//!
//! let engine = HeadlessEngine::new();
//! let parent = Rc::new(HeadlessMap::new(LngLat::new(13.4, 52.5), 11.0));
//!
//! let mut control = MinimapControl::default();
//! let element = control.attach(&engine, parent.clone()).unwrap();
//! parent.place_control(element.id(), ControlPosition::BottomRight);
//!
//! let secondary = engine.last_view().unwrap();
//! secondary.finish_loading();
//! secondary.pump();
//! assert_eq!(secondary.zoom(), 5.0);
//!
//! control.detach();
//! assert_eq!(parent.handler_count(), 0);
//! ```

pub mod cancellation;
pub mod config;
pub mod control;
pub mod element;
pub mod error;
pub mod headless;
pub mod host;
pub mod registry;
pub mod style;
pub mod sync;
pub mod toggle;

pub use cancellation::{CancellationSource, CancellationToken};
pub use config::{ConfigError, InteractionOptions, MinimapConfig, MinimapOptions};
pub use control::MinimapControl;
pub use element::ControlElement;
pub use error::{HostError, MinimapError};
pub use headless::{HeadlessEngine, HeadlessMap};
pub use host::{
    ControlPosition, EventDescriptor, Handler, HandlerId, Interactions, MapEngine, MapEvent,
    MapView, SecondaryViewOptions, events,
};
pub use registry::{DrainReport, ListenerId, ListenerRegistry};
pub use style::{CssLength, CssUnit, MINIMIZED_CLASS};
pub use sync::{SharedSync, SyncController, TRACKING_LAYER};
pub use toggle::ToggleButton;
