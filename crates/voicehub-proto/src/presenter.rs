//! Status text for the display surface.

use std::time::Duration;

use crate::selector::{DaySchedule, Selection};
use crate::state::DisplayState;

/// Failure categories that get their own user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Timeout,
    Parse,
    Other,
}

/// `"{label} | YYYY/MM/DD: #01 Artist - Title - Requester | #02 …"`
pub fn format_schedule(label: &str, day: &DaySchedule) -> String {
    let segments: Vec<String> = day
        .entries
        .iter()
        .map(|e| {
            format!(
                "#{} {} - {} - {}",
                sequence_label(e.sequence),
                e.song.artist,
                e.song.title,
                e.song.requester
            )
        })
        .collect();
    format!(
        "{} | {}: {}",
        label,
        day.display_date.format("%Y/%m/%d"),
        segments.join(" | ")
    )
}

/// Two-digit zero padding after the sign: `1` is `01`, `-1` is `-01`.
fn sequence_label(sequence: i64) -> String {
    let sign = if sequence < 0 { "-" } else { "" };
    format!("{}{:02}", sign, sequence.unsigned_abs())
}

/// Map a selection to the state shown after a successful fetch.
pub fn present(label: &str, selection: &Selection) -> DisplayState {
    match selection {
        Selection::Day(day) => DisplayState::Normal(format_schedule(label, day)),
        Selection::Empty(reason) => DisplayState::NoSchedule(reason.message().to_string()),
    }
}

pub fn retry_message(attempt: u32, max_retries: u32) -> String {
    format!("Load failed, retrying ({}/{})...", attempt, max_retries)
}

/// Terminal message once retries are exhausted.
pub fn failure_message(kind: FailureKind, cooldown: Duration) -> String {
    let minutes = cooldown.as_secs().div_ceil(60);
    let lead = match kind {
        FailureKind::Transport => "Network error",
        FailureKind::Timeout => "Request timed out",
        FailureKind::Parse => "Data format error",
        FailureKind::Other => "Failed to load schedule",
    };
    format!("{}, retry in {} minutes", lead, minutes)
}

/// `"Waiting, retry in M:SS"`. Partial seconds round up so `0:00` only
/// shows once the cooldown has actually run out.
pub fn cooldown_wait_message(remaining: Duration) -> String {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    format!("Waiting, retry in {}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{ScheduleEntry, Song};
    use crate::selector::EmptyReason;
    use chrono::NaiveDate;

    fn entry(seq: i64, artist: &str, title: &str, requester: &str) -> ScheduleEntry {
        ScheduleEntry {
            play_date: "2024-01-03".into(),
            sequence: seq,
            song: Song {
                title: title.into(),
                artist: artist.into(),
                requester: requester.into(),
                vote_count: 0,
            },
        }
    }

    fn day_schedule(entries: Vec<ScheduleEntry>) -> DaySchedule {
        DaySchedule {
            display_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            entries,
            dropped_inconsistent: 0,
        }
    }

    #[test]
    fn test_format_schedule() {
        let day = day_schedule(vec![
            entry(1, "The Beatles", "Hey Jude", "amy"),
            entry(12, "Nina Simone", "Sinnerman", "bo"),
        ]);
        assert_eq!(
            format_schedule("Broadcast schedule", &day),
            "Broadcast schedule | 2024/01/03: #01 The Beatles - Hey Jude - amy | \
             #12 Nina Simone - Sinnerman - bo"
        );
    }

    #[test]
    fn test_negative_sequence_pads_after_sign() {
        let day = day_schedule(vec![
            entry(-1, "a", "t", "r"),
            entry(0, "b", "u", "s"),
            entry(123, "c", "v", "q"),
        ]);
        assert_eq!(
            format_schedule("L", &day),
            "L | 2024/01/03: #-01 a - t - r | #00 b - u - s | #123 c - v - q"
        );
    }

    #[test]
    fn test_segment_count_matches_entries() {
        let day = day_schedule((1..=5).map(|i| entry(i, "a", "t", "r")).collect());
        let text = format_schedule("L", &day);
        let body = text.split_once(": ").unwrap().1;
        assert_eq!(body.split(" | ").count(), 5);
    }

    #[test]
    fn test_present_empty() {
        let state = present("L", &Selection::Empty(EmptyReason::NoUpcomingSchedule));
        assert_eq!(state, DisplayState::NoSchedule("No upcoming schedule".into()));
    }

    #[test]
    fn test_failure_messages() {
        let ten = Duration::from_secs(600);
        assert_eq!(
            failure_message(FailureKind::Transport, ten),
            "Network error, retry in 10 minutes"
        );
        assert_eq!(
            failure_message(FailureKind::Timeout, ten),
            "Request timed out, retry in 10 minutes"
        );
        assert_eq!(
            failure_message(FailureKind::Parse, ten),
            "Data format error, retry in 10 minutes"
        );
        assert_eq!(
            failure_message(FailureKind::Other, ten),
            "Failed to load schedule, retry in 10 minutes"
        );
    }

    #[test]
    fn test_cooldown_wait_message() {
        assert_eq!(cooldown_wait_message(Duration::from_secs(540)), "Waiting, retry in 9:00");
        assert_eq!(cooldown_wait_message(Duration::from_secs(65)), "Waiting, retry in 1:05");
        assert_eq!(cooldown_wait_message(Duration::from_millis(59_200)), "Waiting, retry in 1:00");
    }

    #[test]
    fn test_retry_message() {
        assert_eq!(retry_message(2, 3), "Load failed, retrying (2/3)...");
    }
}
