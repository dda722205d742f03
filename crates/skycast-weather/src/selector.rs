//! Midday forecast selection.
//!
//! Picks the forecast slots that fall on a given local hour within the next
//! few calendar days. Days are counted by calendar date in the reference's
//! time zone, not by elapsed hours, so a reference late in the evening does not
//! shift the window by a day.

use chrono::{DateTime, TimeZone, Timelike};

use crate::types::{ForecastEntry, Summary};

/// Which slots count as "upcoming midday"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionWindow {
    /// Largest allowed calendar-day difference from the reference date
    pub days_ahead: u32,
    /// Local hour a slot must start at
    pub hour_of_day: u32,
    /// Maximum number of slots returned
    pub max_entries: usize,
}

impl Default for SelectionWindow {
    fn default() -> Self {
        Self {
            days_ahead: 3,
            hour_of_day: 12,
            max_entries: 3,
        }
    }
}

/// Select upcoming slots from an ascending forecast sequence.
///
/// Input order is preserved. Empty input or no match yields an empty vector.
pub fn select_upcoming<Tz: TimeZone>(
    entries: &[ForecastEntry],
    reference: &DateTime<Tz>,
    window: &SelectionWindow,
) -> Vec<ForecastEntry> {
    let tz = reference.timezone();
    let today = reference.date_naive();
    let days_ahead = i64::from(window.days_ahead);

    entries
        .iter()
        .filter(|entry| {
            let local = entry.timestamp.with_timezone(&tz);
            if local.hour() != window.hour_of_day {
                return false;
            }
            let day_diff = local.date_naive().signed_duration_since(today).num_days();
            (0..=days_ahead).contains(&day_diff)
        })
        .take(window.max_entries)
        .cloned()
        .collect()
}

impl Summary {
    /// Derive a summary from a full forecast.
    pub fn from_forecast<Tz: TimeZone>(
        entries: &[ForecastEntry],
        reference: &DateTime<Tz>,
        window: &SelectionWindow,
    ) -> Self {
        Self {
            upcoming: select_upcoming(entries, reference, window),
            reference_date: reference.date_naive(),
        }
    }
}
