// taskgraph-core/src/core/time.rs
// ============================================================================
// Module: Taskgraph Time
// Description: Unix-second timestamps and ISO-8601 rendering for events.
// Purpose: Give the event journal and task state a single timestamp type.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! Task state carries integer Unix-second timestamps (`0` meaning "never
//! created"). Event records additionally need an ISO-8601 UTC rendering for
//! the external event-record contract; [`Timestamp::to_iso8601`] produces it
//! without pulling a second timestamp representation into the data model.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Integer Unix-second timestamp. `0` means "never created" per the task
/// state contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The zero timestamp, meaning "never created".
    pub const NEVER: Self = Self(0);

    /// Creates a timestamp from a raw Unix-second value.
    #[must_use]
    pub const fn from_unix_seconds(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Returns the raw Unix-second value.
    #[must_use]
    pub const fn unix_seconds(self) -> i64 {
        self.0
    }

    /// Returns true if this timestamp is after the zero sentinel, i.e. the
    /// entity it describes has actually been created.
    #[must_use]
    pub const fn is_set(self) -> bool {
        self.0 > 0
    }

    /// Renders this timestamp as an ISO-8601 UTC string for event records.
    ///
    /// Falls back to the zero-second epoch string if the underlying value is
    /// out of `OffsetDateTime`'s representable range, which cannot happen
    /// for any timestamp produced by this crate's own clock reads.
    #[must_use]
    pub fn to_iso8601(self) -> String {
        OffsetDateTime::from_unix_timestamp(self.0)
            .ok()
            .and_then(|dt| dt.format(&Rfc3339).ok())
            .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string())
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::Timestamp;

    #[test]
    fn never_is_not_set() {
        assert!(!Timestamp::NEVER.is_set());
    }

    #[test]
    fn positive_timestamp_is_set() {
        assert!(Timestamp::from_unix_seconds(1000).is_set());
    }

    #[test]
    fn iso8601_round_trips_epoch() {
        assert_eq!(Timestamp::from_unix_seconds(0).to_iso8601(), "1970-01-01T00:00:00Z");
    }
}
