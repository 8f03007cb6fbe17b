//! Cancellation and deadline propagation
//!
//! A [`ValidationContext`] travels unchanged from the caller through the
//! validator into the Issuer Key Service. It is the only thing that bounds the
//! network-bound part of a validation call.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context-bound operation stopped early
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("validation cancelled")]
    Cancelled,

    #[error("validation deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token plus optional deadline for one validation call
///
/// Clones share the same cancellation token, so cancelling any clone cancels
/// them all.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl ValidationContext {
    /// Context with a fresh cancellation token and no deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    /// Set a deadline. An earlier existing deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Use the caller's cancellation token instead of a fresh one
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fail fast if the context is already cancelled or past its deadline
    ///
    /// # Errors
    ///
    /// Returns [`ContextError`] describing why the context is no longer usable.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(ContextError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `future` to completion unless the context is cancelled or expires first
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Cancelled`] or [`ContextError::DeadlineExceeded`]
    /// when the context ends before `future` completes. The future is dropped.
    pub async fn run<F>(&self, future: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        self.check()?;

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                () = self.cancellation.cancelled() => Err(ContextError::Cancelled),
                () = tokio::time::sleep_until(deadline) => Err(ContextError::DeadlineExceeded),
                output = future => Ok(output),
            },
            None => tokio::select! {
                biased;
                () = self.cancellation.cancelled() => Err(ContextError::Cancelled),
                output = future => Ok(output),
            },
        }
    }
}
