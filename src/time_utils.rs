// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for refresh deadlines.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Wall-clock instant `delay` from now.
pub fn deadline_after(delay: Duration) -> DateTime<Utc> {
    let delta = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_with_z_suffix() {
        let date = DateTime::parse_from_rfc3339("2026-03-01T12:30:00+00:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_utc_rfc3339(date), "2026-03-01T12:30:00Z");
    }

    #[test]
    fn deadline_is_in_the_future() {
        let deadline = deadline_after(Duration::from_secs(300));
        let delta = deadline - Utc::now();
        assert!(delta.num_seconds() > 290 && delta.num_seconds() <= 300);
    }
}
