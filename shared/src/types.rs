//! Common types used across the platform

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Date range for queries, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `days` days from `start`, e.g. an expiry warning window
    pub fn window(start: NaiveDate, days: i64) -> Self {
        Self {
            start,
            end: start + Duration::days(days.max(0)),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
