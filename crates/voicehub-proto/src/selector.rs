//! Picks the one day of the feed to show.
//!
//! Today's entries win. Without them the nearest future day is used. Past
//! days and entries with an unparsable `playDate` are never shown.

use std::fmt;

use chrono::NaiveDate;
use tracing::warn;

use crate::schedule::ScheduleEntry;

/// Why nothing is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The feed was empty or every entry had an invalid date.
    NoValidEntries,
    /// Only past days are scheduled.
    NoUpcomingSchedule,
    /// Every candidate failed the date re-check.
    DateInconsistency,
}

impl EmptyReason {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoValidEntries => "No valid schedule entries",
            Self::NoUpcomingSchedule => "No upcoming schedule",
            Self::DateInconsistency => "Schedule date inconsistency",
        }
    }
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// The entries of a single day, sorted by `sequence`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySchedule {
    pub display_date: NaiveDate,
    pub entries: Vec<ScheduleEntry>,
    /// Candidates dropped by the date re-check.
    pub dropped_inconsistent: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Day(DaySchedule),
    Empty(EmptyReason),
}

/// Select the entries to display for `today`.
///
/// Entries with equal `sequence` keep their feed order.
pub fn select(feed: &[ScheduleEntry], today: NaiveDate) -> Selection {
    let valid: Vec<(NaiveDate, &ScheduleEntry)> = feed
        .iter()
        .filter_map(|e| e.play_day().map(|d| (d, e)))
        .collect();

    if valid.is_empty() {
        return Selection::Empty(EmptyReason::NoValidEntries);
    }

    let display_date = if valid.iter().any(|(d, _)| *d == today) {
        today
    } else {
        match valid.iter().map(|(d, _)| *d).filter(|d| *d > today).min() {
            Some(d) => d,
            None => return Selection::Empty(EmptyReason::NoUpcomingSchedule),
        }
    };

    let mut candidates: Vec<&ScheduleEntry> = valid
        .iter()
        .filter(|(d, _)| *d == display_date)
        .map(|(_, e)| *e)
        .collect();
    // `sort_by_key` is stable, so ties stay in feed order.
    candidates.sort_by_key(|e| e.sequence);

    let before = candidates.len();
    candidates.retain(|e| e.play_day() == Some(display_date));
    let dropped_inconsistent = before - candidates.len();
    if dropped_inconsistent > 0 {
        warn!(
            "[selector] dropped {} entries not dated {}",
            dropped_inconsistent, display_date
        );
    }

    if candidates.is_empty() {
        return Selection::Empty(EmptyReason::DateInconsistency);
    }

    Selection::Day(DaySchedule {
        display_date,
        entries: candidates.into_iter().cloned().collect(),
        dropped_inconsistent,
    })
}
