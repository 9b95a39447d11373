//! Cancellation for deferred continuations on the event loop.
//!
//! A [`CancellationSource`] is held by the control; every deferred
//! continuation captures a [`CancellationToken`] and checks it before doing
//! anything. Detaching cancels the source, so a `load` continuation that
//! still fires afterwards becomes a no-op instead of touching torn-down
//! state.
//!
//! Everything runs on one event loop, so the flag is an `Rc<Cell<bool>>`
//! rather than an atomic, and the types are deliberately `!Send`.
//!
//! # Example
//!
//! ```
//! use minimap_control::cancellation::CancellationSource;
//!
//! let source = CancellationSource::new();
//! let token = source.token();
//! let continuation = move || {
//!     if token.is_cancelled() {
//!         return;
//!     }
//!     // resync ...
//! };
//! source.cancel();
//! continuation();
//! ```

#![forbid(unsafe_code)]

use std::cell::Cell;
use std::rc::Rc;

/// Observes cancellation of its [`CancellationSource`].
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Rc<Cell<bool>>,
}

/// Control side of a cancellation flag.
///
/// Dropping the source does **not** cancel its tokens; call
/// [`cancel`](Self::cancel) explicitly.
#[derive(Debug)]
pub struct CancellationSource {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self {
            cancelled: Rc::new(Cell::new(false)),
        }
    }

    /// A token observing this source.
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            cancelled: Rc::clone(&self.cancelled),
        }
    }

    /// Cancel every token derived from this source. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}
