//! Feed model for the public songs endpoint.
//!
//! The endpoint returns a JSON array of entries:
//!
//! ```json
//! [{ "playDate": "2024-01-01", "sequence": 1,
//!    "song": { "title": "…", "artist": "…", "requester": "…", "voteCount": 3 } }]
//! ```
//!
//! Decoding is lenient per field: a missing or `null` field takes its
//! default, so one sloppy entry never rejects the whole feed. An entry whose
//! `playDate` ends up unparsable is kept here and dropped by the selector.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Wire format of `playDate`.
pub const PLAY_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artist: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requester: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vote_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Calendar day in `YYYY-MM-DD` form, as sent by the server.
    #[serde(default, deserialize_with = "null_as_default")]
    pub play_date: String,
    /// Position within the day.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sequence: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub song: Song,
}

impl ScheduleEntry {
    /// Parsed `play_date`, or `None` when it is not a strict `YYYY-MM-DD` date.
    pub fn play_day(&self) -> Option<NaiveDate> {
        parse_play_date(&self.play_date)
    }
}

/// One fetch worth of entries, in server order.
pub type Feed = Vec<ScheduleEntry>;

/// Strict `YYYY-MM-DD`: exactly ten characters, zero-padded, no whitespace.
pub fn parse_play_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(s, PLAY_DATE_FORMAT).ok()
}

/// Decode a response body. A bare `null` is an empty feed.
pub fn parse_feed(body: &str) -> Result<Feed, serde_json::Error> {
    let entries: Option<Feed> = serde_json::from_str(body)?;
    Ok(entries.unwrap_or_default())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
