#![forbid(unsafe_code)]

//! Error types for the minimap control.
//!
//! # Propagation
//!
//! | Kind | Handling |
//! |------|----------|
//! | [`MinimapError::InvalidArgument`] | returned to the caller, nothing attached |
//! | [`MinimapError::NotReady`] | absorbed: the update is deferred until `load` |
//! | [`MinimapError::TeardownPartialFailure`] | logged per entry, drain continues |
//! | [`MinimapError::MissingAnchor`] | logged at error, kept for [`crate::MinimapControl::anchor_error`] |

use thiserror::Error;

/// Failure reported by a map engine for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The view was already removed.
    #[error("map view has been removed")]
    Removed,
    /// The engine does not know this handler.
    #[error("no handler {0} registered")]
    UnknownHandler(u64),
    /// Any other engine-side refusal.
    #[error("engine rejected the call: {0}")]
    Rejected(String),
}

/// Errors surfaced by the minimap control.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinimapError {
    /// A registration was malformed (dangling target, empty event type, empty layer id).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A view has not fired its `load` signal yet.
    #[error("map view not ready")]
    NotReady,

    /// Some removal actions failed while draining the registry.
    #[error("{failed} of {total} listeners failed to unsubscribe")]
    TeardownPartialFailure { failed: usize, total: usize },

    /// The host no longer maps the control's element to a corner.
    #[error("toggle button not created: element `{element_id}` has no control position")]
    MissingAnchor { element_id: String },

    /// `attach` was called on a control that is attached or was detached.
    #[error("minimap control is already attached")]
    AlreadyAttached,

    /// The operation needs an attached control.
    #[error("minimap control is not attached")]
    NotAttached,

    #[error(transparent)]
    Host(#[from] HostError),
}
