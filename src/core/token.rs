//! # Activation Tokens
//!
//! One-shot liveness signal for a single Foreground activation of a screen.
//!
//! ```text
//!   Screen::foreground()  →  ActivationToken (Live)
//!   Screen::background()  →  token.cancel()  (Live → Cancelled, once)
//! ```
//!
//! Clones share the same signal. Background work holds a clone and checks it
//! before doing anything expensive and again right before applying results.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Returned by [`ActivationToken::check`] when the activation is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("activation cancelled")]
pub struct Cancelled;

#[derive(Clone)]
pub struct ActivationToken {
    generation: u64,
    fired: Arc<AtomicBool>,
    signal: CancellationToken,
}

impl ActivationToken {
    /// Creates a live token for the given activation generation.
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            fired: Arc::new(AtomicBool::new(false)),
            signal: CancellationToken::new(),
        }
    }

    /// The activation number of the screen that issued this token.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_live(&self) -> bool {
        !self.is_cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Cancels the activation. Returns `true` only for the call that
    /// performed the Live → Cancelled transition; later calls are no-ops.
    pub fn cancel(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.signal.cancel();
        true
    }

    /// `Err(Cancelled)` once the activation is over.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the token is cancelled. Resolves immediately if it
    /// already is.
    pub async fn cancelled(&self) {
        self.signal.cancelled().await
    }

    /// True when both handles observe the same activation.
    pub fn same_activation(&self, other: &ActivationToken) -> bool {
        Arc::ptr_eq(&self.fired, &other.fired)
    }
}

impl fmt::Debug for ActivationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationToken")
            .field("generation", &self.generation)
            .field("live", &self.is_live())
            .finish()
    }
}
