/// Response and request bodies exchanged with the statistics backend.
///
/// Field names follow the backend's JSON. Unknown fields are ignored and
/// nullable aggregates (sums over zero rows come back as `null`) are
/// modelled as `Option` or defaulted so a sparse archive still parses.
use serde::{Deserialize, Serialize};

use crate::stats::{StatRecord, TimelineSample, Totals};

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Request body for `POST /api/token/`.
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Request body for `POST /api/user/register/`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

/// The account created by a registration; the password is never echoed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    #[serde(default)]
    pub id: Option<u64>,
    pub username: String,
}

/// Access/refresh pair issued by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPair {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// The dashboard account behind the current token (`/api/user/me/`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    #[serde(default)]
    pub id: Option<u64>,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_staff: bool,
}

impl AccountInfo {
    /// "First Last" when a name is set, otherwise the username.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Messages posted on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayCount {
    pub date: String,
    pub count: u64,
}

/// Archive-wide summary (`/api/stats/message-stats/`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageStats {
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub total_words: Option<u64>,
    #[serde(default)]
    pub total_characters: Option<u64>,
    #[serde(default)]
    pub messages_last_24_hours: u64,
    #[serde(default)]
    pub average_messages_per_day: f64,
    #[serde(default)]
    pub most_active_day: Option<DayCount>,
    #[serde(default)]
    pub least_active_day: Option<DayCount>,
    #[serde(default)]
    pub daily_messages: Vec<DayCount>,
}

impl MessageStats {
    pub fn totals(&self) -> Totals {
        Totals {
            total_messages: self.total_messages,
            total_words: self.total_words.unwrap_or(0),
            total_characters: self.total_characters.unwrap_or(0),
            ..Totals::default()
        }
    }
}

/// Per-minute message counts for the last 24 hours.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub intervals: Vec<TimelineSample>,
}

/// A row of the recent-messages feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentMessage {
    pub id: String,
    pub user_name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub channel_name: String,
    pub timestamp: String,
    #[serde(default)]
    pub relative_time: Option<String>,
    #[serde(default)]
    pub char_count: u64,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub message_content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentMessages {
    #[serde(default)]
    pub messages: Vec<RecentMessage>,
}

// ---------------------------------------------------------------------------
// Per-user / per-channel lists
// ---------------------------------------------------------------------------

/// Envelope of `/api/stats/users/` and `/api/stats/channels/`.
///
/// The totals cover every message matching the request's exclusions; the
/// records sit under `users` or `channels` depending on the endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsList {
    #[serde(default)]
    pub total_messages: Option<u64>,
    #[serde(default)]
    pub total_words: Option<u64>,
    #[serde(default)]
    pub total_characters: Option<u64>,
    #[serde(default, alias = "users", alias = "channels")]
    pub records: Vec<StatRecord>,
}

impl StatsList {
    /// Totals reported by the backend, with missing sums read as zero.
    pub fn totals(&self) -> Totals {
        let summed = Totals::from_records(&self.records);
        Totals {
            total_messages: self.total_messages.unwrap_or(0),
            total_words: self.total_words.unwrap_or(0),
            total_characters: self.total_characters.unwrap_or(0),
            ..summed
        }
    }
}

/// Exclusions applied server-side to the stat lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsFilter {
    pub exclude_bots: bool,
    pub exclude_users: Vec<String>,
    pub exclude_channels: Vec<String>,
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub position: i64,
}

/// `/api/discorduser/{name}/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub total_words: u64,
    #[serde(default)]
    pub total_characters: u64,
    #[serde(default)]
    pub roles: Vec<Role>,
}

/// `/api/channel/{name}/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelProfile {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub total_messages: u64,
    #[serde(default)]
    pub total_words: u64,
    #[serde(default)]
    pub total_characters: u64,
    #[serde(default)]
    pub guild_icon_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Message database
// ---------------------------------------------------------------------------

/// Page envelope used by the paginated endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Number of pages for `page_size`-sized pages, at least 1.
    pub fn total_pages(&self, page_size: u32) -> u64 {
        self.count.div_ceil(u64::from(page_size.max(1))).max(1)
    }
}

/// A row of the message database listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseMessage {
    pub id: String,
    #[serde(default)]
    pub server_name: Option<String>,
    pub channel_name: String,
    pub user_name: String,
    pub timestamp: String,
    #[serde(default)]
    pub char_count: u64,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub contains_attachment: bool,
    #[serde(default)]
    pub contains_mention: bool,
    #[serde(default)]
    pub contains_emoji: bool,
    #[serde(default)]
    pub message_content: String,
}

/// Filters for the message database listing.
///
/// `date` is a local calendar day (`YYYY-MM-DD`) interpreted by the backend
/// in `timezone`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageFilters {
    pub server: Option<String>,
    pub channel: Option<String>,
    pub user: Option<String>,
    pub date: Option<String>,
    pub has_attachment: bool,
    pub has_mention: bool,
    pub has_emoji: bool,
}

impl MessageFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A fully specified database query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageQuery {
    pub page: u32,
    pub page_size: u32,
    pub timezone: String,
    pub filters: MessageFilters,
}

impl MessageQuery {
    /// Query-string pairs in the order the backend documents them. Empty
    /// filters are omitted; the timezone is only sent alongside a date.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.max(1).to_string()),
            ("page_size", self.page_size.max(1).to_string()),
        ];
        let f = &self.filters;
        let text = [("server", &f.server), ("channel", &f.channel), ("user", &f.user)];
        for (name, value) in text {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                params.push((name, v.to_string()));
            }
        }
        if let Some(date) = f.date.as_deref().filter(|d| !d.is_empty()) {
            params.push(("date", date.to_string()));
            params.push(("timezone", self.timezone.clone()));
        }
        for (name, on) in [
            ("has_attachment", f.has_attachment),
            ("has_mention", f.has_mention),
            ("has_emoji", f.has_emoji),
        ] {
            if on {
                params.push((name, "true".to_string()));
            }
        }
        params
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencedMessage {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
}

/// Full message record (`/api/database/messages/{id}/`).
///
/// Reactions, attachments, embeds and the like are free-form JSON in the
/// archive and are kept as raw values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDetail {
    pub id: String,
    #[serde(default)]
    pub guild: Option<GuildRef>,
    pub channel: ChannelRef,
    pub author: AuthorRef,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
    #[serde(default)]
    pub timestamp_edited: Option<String>,
    #[serde(default)]
    pub call_ended: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub reference_message: Option<ReferencedMessage>,
    #[serde(default)]
    pub reactions: serde_json::Value,
    #[serde(default)]
    pub attachments: serde_json::Value,
    #[serde(default)]
    pub embeds: serde_json::Value,
    #[serde(default)]
    pub stickers: serde_json::Value,
    #[serde(default)]
    pub mentions: serde_json::Value,
    #[serde(default)]
    pub inline_emojis: serde_json::Value,
}

/// Values available to the database filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub servers: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub users: Vec<String>,
}

/// The synthetic "average message" built from the most common character
/// and word at each position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AverageMessage {
    #[serde(default)]
    pub average_message_chars: String,
    #[serde(default)]
    pub average_message_words: String,
}
