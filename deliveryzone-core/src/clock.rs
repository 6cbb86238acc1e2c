//! Source of the current instant.
//!
//! Opening-hours checks and cache expiry read time through [`Clock`] so tests
//! can pin it. The `test-support` feature provides a manual clock.

use chrono::{DateTime, Utc};

/// Supplies the current UTC instant.
pub trait Clock {
    /// Return the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
