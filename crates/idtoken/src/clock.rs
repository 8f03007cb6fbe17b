//! Time source for validation
//!
//! Only [`crate::IdTokenValidator::validate`] reads a clock, once per call.
//! Everything below it takes `now` as a parameter.

use chrono::{DateTime, Utc};

/// Clock for current time (enables testing with deterministic timestamps)
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
