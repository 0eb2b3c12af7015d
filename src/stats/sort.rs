/// Stable table sorting for [`StatRecord`] rows.
///
/// Sort keys are an explicit enumeration. Each variant maps to an
/// extractor that yields either a text or a numeric value for a record:
///
/// | Key                            | Value                                   |
/// |--------------------------------|-----------------------------------------|
/// | `name`                         | record name (text)                      |
/// | raw counters                   | the field verbatim                      |
/// | `percent_*`                    | `percentage(field, totals.<field>)`     |
/// | `words_per_message` / `characters_per_message` | `field / max(messages, 1)` |
///
/// The percentage keys need a [`Totals`] context; without one the sort
/// yields an empty result instead of failing.
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{StatRecord, Totals};
use crate::utils::format::percentage;

// ---------------------------------------------------------------------------
// Sort key
// ---------------------------------------------------------------------------

/// A column a stat table can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    MessageCount,
    TotalWords,
    TotalCharacters,
    Attachments,
    Mentions,
    Emojis,
    MostActivePeerPercentage,
    PercentMessages,
    PercentWords,
    PercentCharacters,
    CharactersPerMessage,
    WordsPerMessage,
}

impl SortKey {
    /// Every key, in column order.
    pub const ALL: [SortKey; 13] = [
        Self::Name,
        Self::MessageCount,
        Self::TotalWords,
        Self::TotalCharacters,
        Self::Attachments,
        Self::Mentions,
        Self::Emojis,
        Self::MostActivePeerPercentage,
        Self::PercentMessages,
        Self::PercentWords,
        Self::PercentCharacters,
        Self::CharactersPerMessage,
        Self::WordsPerMessage,
    ];

    /// The wire/CLI spelling of this key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::MessageCount => "message_count",
            Self::TotalWords => "total_words",
            Self::TotalCharacters => "total_characters",
            Self::Attachments => "attachments",
            Self::Mentions => "mentions",
            Self::Emojis => "emojis",
            Self::MostActivePeerPercentage => "most_active_peer_percentage",
            Self::PercentMessages => "percent_messages",
            Self::PercentWords => "percent_words",
            Self::PercentCharacters => "percent_characters",
            Self::CharactersPerMessage => "characters_per_message",
            Self::WordsPerMessage => "words_per_message",
        }
    }

    /// Whether resolving this key needs the [`Totals`] context.
    pub fn needs_totals(self) -> bool {
        matches!(
            self,
            Self::PercentMessages | Self::PercentWords | Self::PercentCharacters
        )
    }

    fn value<'a>(self, record: &'a StatRecord, totals: Option<&Totals>) -> Option<SortValue<'a>> {
        let number = |n: u64| Some(SortValue::Number(n as f64));
        let per_message = |n: u64| {
            Some(SortValue::Number(n as f64 / record.message_count.max(1) as f64))
        };

        match self {
            Self::Name => Some(SortValue::Text(&record.name)),
            Self::MessageCount => number(record.message_count),
            Self::TotalWords => number(record.total_words),
            Self::TotalCharacters => number(record.total_characters),
            Self::Attachments => number(record.attachments),
            Self::Mentions => number(record.mentions),
            Self::Emojis => number(record.emojis),
            Self::MostActivePeerPercentage => Some(SortValue::Number(
                record.most_active_peer_percentage.unwrap_or(0.0),
            )),
            Self::PercentMessages => totals.map(|t| {
                SortValue::Number(percentage(
                    record.message_count as f64,
                    t.total_messages as f64,
                ))
            }),
            Self::PercentWords => totals.map(|t| {
                SortValue::Number(percentage(record.total_words as f64, t.total_words as f64))
            }),
            Self::PercentCharacters => totals.map(|t| {
                SortValue::Number(percentage(
                    record.total_characters as f64,
                    t.total_characters as f64,
                ))
            }),
            Self::CharactersPerMessage => per_message(record.total_characters),
            Self::WordsPerMessage => per_message(record.total_words),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown sort key '{s}' (expected one of: {})", valid.join(", "))
            })
    }
}

/// A resolved comparison value.
#[derive(Debug, Clone, Copy)]
enum SortValue<'a> {
    Text(&'a str),
    Number(f64),
}

impl SortValue<'_> {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            _ => Ordering::Equal,
        }
    }
}

// ---------------------------------------------------------------------------
// Sort config
// ---------------------------------------------------------------------------

/// Sort direction for a table column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Arrow shown next to the active column header.
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Ascending => "↑",
            Self::Descending => "↓",
        }
    }
}

/// Which column a table is sorted by, and in which direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key: SortKey::MessageCount,
            direction: SortDirection::default(),
        }
    }
}

impl SortConfig {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Select `key` as if its column header were clicked.
    ///
    /// Selecting the active key again flips the direction; selecting a
    /// different key starts over in the default (descending) direction.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flipped();
        } else {
            self.key = key;
            self.direction = SortDirection::default();
        }
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Return `records` ordered by `config`.
///
/// The input is left untouched. Equal keys keep their original relative
/// order in both directions. Returns an empty vector when `records` is
/// empty or when a percentage key is requested without `totals`.
pub fn sort_records(
    records: &[StatRecord],
    config: &SortConfig,
    totals: Option<&Totals>,
) -> Vec<StatRecord> {
    if records.is_empty() || (config.key.needs_totals() && totals.is_none()) {
        return Vec::new();
    }

    let mut keyed: Vec<(SortValue<'_>, &StatRecord)> = records
        .iter()
        .filter_map(|r| config.key.value(r, totals).map(|v| (v, r)))
        .collect();

    // slice::sort_by is stable; reversing the comparator (not the output)
    // keeps ties in input order for descending sorts too.
    match config.direction {
        SortDirection::Ascending => keyed.sort_by(|(a, _), (b, _)| a.compare(b)),
        SortDirection::Descending => keyed.sort_by(|(a, _), (b, _)| b.compare(a)),
    }

    keyed.into_iter().map(|(_, r)| r.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(records: &[StatRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let records = vec![StatRecord::new("a", 1, 0, 0), StatRecord::new("b", 1, 0, 0)];
        let asc = SortConfig::new(SortKey::MessageCount, SortDirection::Ascending);
        assert_eq!(names(&sort_records(&records, &asc, None)), ["a", "b"]);

        let desc = SortConfig::new(SortKey::MessageCount, SortDirection::Descending);
        assert_eq!(names(&sort_records(&records, &desc, None)), ["a", "b"]);
    }

    #[test]
    fn percent_messages_uses_totals() {
        let records = vec![StatRecord::new("ten", 10, 0, 0), StatRecord::new("thirty", 30, 0, 0)];
        let totals = Totals {
            total_messages: 100,
            ..Totals::default()
        };
        let config = SortConfig::new(SortKey::PercentMessages, SortDirection::Descending);

        let sorted = sort_records(&records, &config, Some(&totals));
        assert_eq!(names(&sorted), ["thirty", "ten"]);
    }

    #[test]
    fn percent_key_without_totals_yields_nothing() {
        let records = vec![StatRecord::new("a", 1, 1, 1)];
        let config = SortConfig::new(SortKey::PercentWords, SortDirection::Ascending);
        assert!(sort_records(&records, &config, None).is_empty());
    }

    #[test]
    fn raw_key_without_totals_still_sorts() {
        let records = vec![StatRecord::new("a", 1, 5, 1), StatRecord::new("b", 1, 9, 1)];
        let config = SortConfig::new(SortKey::TotalWords, SortDirection::Descending);
        assert_eq!(names(&sort_records(&records, &config, None)), ["b", "a"]);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let totals = Totals::default();
        let config = SortConfig::default();
        assert!(sort_records(&[], &config, Some(&totals)).is_empty());
    }

    #[test]
    fn per_message_keys_guard_zero_messages() {
        // zero messages divides by 1, so "silent" ranks by its raw total
        let records = vec![
            StatRecord::new("chatty", 10, 50, 500),
            StatRecord::new("silent", 0, 7, 70),
        ];
        let config = SortConfig::new(SortKey::WordsPerMessage, SortDirection::Descending);
        assert_eq!(names(&sort_records(&records, &config, None)), ["silent", "chatty"]);

        let config = SortConfig::new(SortKey::CharactersPerMessage, SortDirection::Ascending);
        assert_eq!(names(&sort_records(&records, &config, None)), ["chatty", "silent"]);
    }

    #[test]
    fn name_sorts_as_text() {
        let records = vec![
            StatRecord::new("carol", 1, 0, 0),
            StatRecord::new("alice", 3, 0, 0),
            StatRecord::new("bob", 2, 0, 0),
        ];
        let config = SortConfig::new(SortKey::Name, SortDirection::Ascending);
        assert_eq!(names(&sort_records(&records, &config, None)), ["alice", "bob", "carol"]);
    }

    #[test]
    fn input_is_not_mutated() {
        let records = vec![StatRecord::new("a", 1, 0, 0), StatRecord::new("b", 2, 0, 0)];
        let before = records.clone();
        let _ = sort_records(&records, &SortConfig::default(), None);
        assert_eq!(records, before);
    }

    #[test]
    fn toggle_flips_same_key_and_resets_new_key() {
        let mut config = SortConfig::default();
        assert_eq!(config.direction, SortDirection::Descending);

        config.toggle(SortKey::MessageCount);
        assert_eq!(config.direction, SortDirection::Ascending);

        config.toggle(SortKey::MessageCount);
        assert_eq!(config.direction, SortDirection::Descending);

        config.toggle(SortKey::MessageCount);
        config.toggle(SortKey::Name);
        assert_eq!(config.key, SortKey::Name);
        assert_eq!(config.direction, SortDirection::Descending);
    }

    #[test]
    fn sort_key_parses_names() {
        assert_eq!("percent_messages".parse::<SortKey>(), Ok(SortKey::PercentMessages));
        assert_eq!("words-per-message".parse::<SortKey>(), Ok(SortKey::WordsPerMessage));
        assert_eq!("NAME".parse::<SortKey>(), Ok(SortKey::Name));
        assert!("bogus".parse::<SortKey>().is_err());

        for key in SortKey::ALL {
            assert_eq!(key.to_string().parse::<SortKey>(), Ok(key));
        }
    }
}
