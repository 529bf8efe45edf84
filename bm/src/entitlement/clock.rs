//! Injected wall clock
//!
//! The entitlement engine never reads time directly; it asks the clock
//! for "now" and for the next daily-reset boundary. The boundary is the
//! next local midnight, which makes it a timezone concern and therefore
//! the clock's job - tests swap in a fixed clock and stay deterministic.

use chrono::{DateTime, Duration, Local, TimeZone, Utc};

/// Source of the current time and the next daily-reset boundary
pub trait Clock: Send + Sync {
    /// The current instant
    fn now(&self) -> DateTime<Utc>;

    /// The next local-midnight boundary strictly after `now`
    fn next_midnight(&self) -> DateTime<Utc>;
}

/// Real wall clock using the system's local timezone for midnight
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn next_midnight(&self) -> DateTime<Utc> {
        let local = Local::now();
        let fallback = Utc::now() + Duration::days(1);

        let Some(tomorrow) = local.date_naive().succ_opt() else {
            return fallback;
        };
        let Some(midnight) = tomorrow.and_hms_opt(0, 0, 0) else {
            return fallback;
        };

        // A DST gap can make local midnight ambiguous or nonexistent;
        // take the earliest valid interpretation.
        Local
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(fallback)
    }
}
