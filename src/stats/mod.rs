//! Client-side statistics transforms.
//!
//! - **Records**: [`StatRecord`] rows for users and channels, and the
//!   [`Totals`] derived from them
//! - **Sort**: stable table sorting by plain or derived keys
//! - **Timeline**: fixed-width bucketing of per-minute message counts
//!
//! Everything here is pure: no I/O, no clock, no shared state.

pub mod sort;
pub mod timeline;

use serde::{Deserialize, Serialize};

pub use sort::{SortConfig, SortDirection, SortKey, sort_records};
pub use timeline::{IntervalBucket, TimelineSample, aggregate, peak_bucket};

// ---------------------------------------------------------------------------
// Stat record
// ---------------------------------------------------------------------------

/// A per-user or per-channel aggregate statistics row.
///
/// The backend names the identity field `user_name` or `channel_name` and
/// the busiest counterpart `most_active_channel` or `most_active_user`
/// depending on the list; both spellings deserialize into the same fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    #[serde(alias = "user_name", alias = "channel_name")]
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub total_words: u64,
    #[serde(default)]
    pub total_characters: u64,
    #[serde(default)]
    pub attachments: u64,
    #[serde(default)]
    pub mentions: u64,
    #[serde(default)]
    pub emojis: u64,
    #[serde(
        default,
        alias = "most_active_channel",
        alias = "most_active_user",
        skip_serializing_if = "Option::is_none"
    )]
    pub most_active_peer: Option<String>,
    #[serde(
        default,
        alias = "most_active_channel_percentage",
        alias = "most_active_user_percentage",
        skip_serializing_if = "Option::is_none"
    )]
    pub most_active_peer_percentage: Option<f64>,
}

impl StatRecord {
    /// Build a record with the given identity and counts; every other field
    /// is empty.
    pub fn new(name: impl Into<String>, messages: u64, words: u64, characters: u64) -> Self {
        Self {
            name: name.into(),
            nickname: None,
            is_bot: false,
            message_count: messages,
            total_words: words,
            total_characters: characters,
            attachments: 0,
            mentions: 0,
            emojis: 0,
            most_active_peer: None,
            most_active_peer_percentage: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Sums across the currently visible records.
///
/// Used as the denominator for the percentage columns and the derived
/// percentage sort keys. Recomputed whenever the visible set changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub total_messages: u64,
    pub total_words: u64,
    pub total_characters: u64,
    #[serde(default)]
    pub attachments: u64,
    #[serde(default)]
    pub mentions: u64,
    #[serde(default)]
    pub emojis: u64,
}

impl Totals {
    /// Sum every counted field over `records`.
    pub fn from_records(records: &[StatRecord]) -> Self {
        records.iter().fold(Self::default(), |acc, r| Self {
            total_messages: acc.total_messages + r.message_count,
            total_words: acc.total_words + r.total_words,
            total_characters: acc.total_characters + r.total_characters,
            attachments: acc.attachments + r.attachments,
            mentions: acc.mentions + r.mentions,
            emojis: acc.emojis + r.emojis,
        })
    }
}
