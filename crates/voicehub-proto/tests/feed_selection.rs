//! Raw response body → selection → display text, using feeds shaped like the
//! live endpoint.

use chrono::NaiveDate;
use voicehub_proto::presenter::present;
use voicehub_proto::schedule::parse_feed;
use voicehub_proto::selector::{select, EmptyReason, Selection};
use voicehub_proto::state::DisplayState;

const LABEL: &str = "Broadcast schedule";

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn song(title: &str, artist: &str, requester: &str) -> serde_json::Value {
    serde_json::json!({ "title": title, "artist": artist, "requester": requester, "voteCount": 1 })
}

#[test]
fn today_entries_are_ordered_by_sequence() {
    let body = serde_json::json!([
        { "playDate": "2024-01-01", "sequence": 2, "song": song("Sinnerman", "Nina Simone", "bo") },
        { "playDate": "2024-01-01", "sequence": 1, "song": song("Hey Jude", "The Beatles", "amy") },
    ])
    .to_string();

    let feed = parse_feed(&body).unwrap();
    let selection = select(&feed, day(2024, 1, 1));
    let Selection::Day(ref schedule) = selection else {
        panic!("expected today's schedule, got {:?}", selection);
    };
    let order: Vec<i64> = schedule.entries.iter().map(|e| e.sequence).collect();
    assert_eq!(order, vec![1, 2]);

    assert_eq!(
        present(LABEL, &selection),
        DisplayState::Normal(
            "Broadcast schedule | 2024/01/01: #01 The Beatles - Hey Jude - amy | \
             #02 Nina Simone - Sinnerman - bo"
                .into()
        )
    );
}

#[test]
fn past_only_feed_has_no_upcoming_schedule() {
    let body = serde_json::json!([
        { "playDate": "2023-12-25", "sequence": 1, "song": song("Last Christmas", "Wham!", "cy") },
    ])
    .to_string();

    let feed = parse_feed(&body).unwrap();
    let selection = select(&feed, day(2024, 1, 1));
    assert_eq!(selection, Selection::Empty(EmptyReason::NoUpcomingSchedule));
    assert_eq!(
        present(LABEL, &selection),
        DisplayState::NoSchedule("No upcoming schedule".into())
    );
}

#[test]
fn earliest_future_day_is_shown() {
    let body = serde_json::json!([
        { "playDate": "2024-01-05", "sequence": 1, "song": song("Five", "A", "x") },
        { "playDate": "2024-01-03", "sequence": 1, "song": song("Three", "B", "y") },
        { "playDate": "2024-1-2", "sequence": 1, "song": song("Malformed", "C", "z") },
    ])
    .to_string();

    let feed = parse_feed(&body).unwrap();
    match select(&feed, day(2024, 1, 1)) {
        Selection::Day(schedule) => {
            assert_eq!(schedule.display_date, day(2024, 1, 3));
            assert_eq!(schedule.entries.len(), 1);
            assert_eq!(schedule.entries[0].song.title, "Three");
        }
        other => panic!("expected a future day, got {:?}", other),
    }
}

#[test]
fn invalid_dates_never_surface() {
    let body = serde_json::json!([
        { "playDate": "", "sequence": 1, "song": song("Blank", "A", "x") },
        { "playDate": "2024-01-01T08:00:00", "sequence": 2, "song": song("Timestamp", "A", "x") },
        { "sequence": 3, "song": song("Missing", "A", "x") },
        { "playDate": "2024-01-02", "sequence": 4, "song": song("Valid", "A", "x") },
    ])
    .to_string();

    let feed = parse_feed(&body).unwrap();
    assert_eq!(feed.len(), 4);
    match select(&feed, day(2024, 1, 1)) {
        Selection::Day(schedule) => {
            assert!(schedule.entries.iter().all(|e| e.song.title == "Valid"));
        }
        other => panic!("expected the valid day, got {:?}", other),
    }
}

#[test]
fn empty_feed_reports_no_valid_entries() {
    let feed = parse_feed("[]").unwrap();
    assert_eq!(
        present(LABEL, &select(&feed, day(2024, 1, 1))),
        DisplayState::NoSchedule("No valid schedule entries".into())
    );
}
