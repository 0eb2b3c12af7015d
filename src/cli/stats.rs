//! Statistics views: summary, timeline, recent messages, the per-user and
//! per-channel tables, single profiles, and `watch`.

use std::io::{self, IsTerminal};

use anyhow::Result;
use chrono::Local;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use tracing::info;

use super::{Context, OutputFormat, csv_field, one_line, print_json, print_title};
use crate::api::ApiError;
use crate::api::models::{ChannelProfile, MessageStats, StatsList, UserProfile};
use crate::refresh::{CancelToken, Poller, StopReason};
use crate::session::RefreshSettings;
use crate::stats::{
    IntervalBucket, SortConfig, StatRecord, Totals, aggregate, peak_bucket, sort_records,
};
use crate::utils::format::{average_per_message, format_count, format_number, percentage, truncate};

/// Widest bar drawn in the timeline and daily charts.
const BAR_WIDTH: u64 = 40;

// ---------------------------------------------------------------------------
// chatstat summary
// ---------------------------------------------------------------------------

pub fn run_summary(ctx: &Context, format: OutputFormat) -> Result<()> {
    let stats = ctx.client.message_stats()?;
    match format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Csv => print_daily_csv(&stats),
        OutputFormat::Table => print_summary_table(&stats),
    }
    Ok(())
}

fn print_summary_table(stats: &MessageStats) {
    print_title("Message statistics", 50);

    if stats.total_messages == 0 {
        println!("{}", "No messages archived yet.".yellow());
        return;
    }

    let words = stats.total_words.unwrap_or(0);
    let characters = stats.total_characters.unwrap_or(0);
    println!("  {} {}", "Total messages:  ".bold(), format_number(stats.total_messages));
    println!("  {} {}", "Total words:     ".bold(), format_count(stats.total_words));
    println!("  {} {}", "Total characters:".bold(), format_count(stats.total_characters));
    println!(
        "  {} {}",
        "Words / message: ".bold(),
        average_per_message(words, stats.total_messages)
    );
    println!(
        "  {} {}",
        "Chars / message: ".bold(),
        average_per_message(characters, stats.total_messages)
    );
    println!(
        "  {} {}",
        "Last 24 hours:   ".bold(),
        format_number(stats.messages_last_24_hours)
    );
    println!(
        "  {} {:.1}",
        "Average per day: ".bold(),
        stats.average_messages_per_day
    );
    if let Some(day) = &stats.most_active_day {
        println!(
            "  {} {} ({})",
            "Most active day: ".bold(),
            day.date,
            format_number(day.count)
        );
    }
    if let Some(day) = &stats.least_active_day {
        println!(
            "  {} {} ({})",
            "Least active day:".bold(),
            day.date,
            format_number(day.count)
        );
    }

    if !stats.daily_messages.is_empty() {
        println!();
        println!("{}", "Daily messages".bold().cyan());
        let max = stats.daily_messages.iter().map(|d| d.count).max().unwrap_or(0);
        for day in &stats.daily_messages {
            println!(
                "  {:<12} {:>8} {}",
                day.date,
                format_number(day.count),
                bar(day.count, max).blue()
            );
        }
    }
}

fn print_daily_csv(stats: &MessageStats) {
    println!("date,count");
    for day in &stats.daily_messages {
        println!("{},{}", csv_field(&day.date), day.count);
    }
}

// ---------------------------------------------------------------------------
// chatstat timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct TimelineReport {
    bucket_minutes: u32,
    buckets: Vec<IntervalBucket>,
    peak: Option<IntervalBucket>,
}

/// Last 24 hours of activity in `bucket_minutes`-wide windows.
pub fn run_timeline(ctx: &Context, bucket_minutes: u32, format: OutputFormat) -> Result<()> {
    let timeline = ctx.client.message_timeline()?;
    let buckets = aggregate(&timeline.intervals, bucket_minutes);
    let report = TimelineReport {
        bucket_minutes: bucket_minutes.max(1),
        peak: peak_bucket(&buckets).cloned(),
        buckets,
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Csv => {
            println!("bucket_start,count");
            for b in &report.buckets {
                println!("{},{}", b.bucket_start, b.count);
            }
        }
        OutputFormat::Table => print_timeline_table(&report),
    }
    Ok(())
}

fn print_timeline_table(report: &TimelineReport) {
    print_title(
        &format!("Activity, last 24h ({}-minute windows)", report.bucket_minutes),
        60,
    );

    if report.buckets.is_empty() {
        println!("{}", "No messages in the last 24 hours.".yellow());
        return;
    }

    let max = report.peak.as_ref().map_or(0, |p| p.count);
    for bucket in &report.buckets {
        let label = window_label(bucket, report.bucket_minutes);
        let line = format!(
            "  {:<24} {:>7} {}",
            label,
            format_number(bucket.count),
            bar(bucket.count, max)
        );
        if report.peak.as_ref() == Some(bucket) {
            println!("{}", line.yellow().bold());
        } else {
            println!("{line}");
        }
    }

    if let Some(peak) = &report.peak {
        println!();
        println!(
            "  {} {} ({} messages)",
            "Peak:".bold(),
            window_label(peak, report.bucket_minutes),
            format_number(peak.count)
        );
    }
}

/// `MM-DD HH:MM–HH:MM` in UTC, or the raw start when unparseable.
fn window_label(bucket: &IntervalBucket, width_minutes: u32) -> String {
    match (bucket.start(), bucket.end(width_minutes)) {
        (Some(start), Some(end)) => format!(
            "{}–{} UTC",
            start.format("%m-%d %H:%M"),
            end.format("%H:%M")
        ),
        _ => bucket.bucket_start.clone(),
    }
}

/// Proportional bar of at most [`BAR_WIDTH`] cells.
fn bar(value: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let cells = (value.saturating_mul(BAR_WIDTH) / max) as usize;
    let cells = if value > 0 { cells.max(1) } else { 0 };
    "█".repeat(cells)
}

// ---------------------------------------------------------------------------
// chatstat recent
// ---------------------------------------------------------------------------

pub fn run_recent(ctx: &Context, limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let mut recent = ctx.client.recent_messages()?.messages;
    if let Some(limit) = limit {
        recent.truncate(limit);
    }

    match format {
        OutputFormat::Json => print_json(&recent)?,
        OutputFormat::Csv => {
            println!("id,timestamp,user,channel,words,characters,content");
            for m in &recent {
                println!(
                    "{},{},{},{},{},{},{}",
                    csv_field(&m.id),
                    csv_field(&m.timestamp),
                    csv_field(&m.user_name),
                    csv_field(&m.channel_name),
                    m.word_count,
                    m.char_count,
                    csv_field(&m.message_content),
                );
            }
        }
        OutputFormat::Table => {
            print_title("Recent messages", 90);
            if recent.is_empty() {
                println!("{}", "No recent messages.".yellow());
                return Ok(());
            }
            for (i, m) in recent.iter().enumerate() {
                let when = m.relative_time.as_deref().unwrap_or(&m.timestamp);
                let line = format!(
                    "  {:<14} {:<18} #{:<16} {}",
                    truncate(when, 14),
                    truncate(m.nickname.as_deref().unwrap_or(&m.user_name), 18),
                    truncate(&m.channel_name, 16),
                    truncate(&one_line(&m.message_content), 60),
                );
                if i % 2 == 0 {
                    println!("{line}");
                } else {
                    println!("{}", line.dimmed());
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// chatstat users | channels
// ---------------------------------------------------------------------------

/// Presentation options shared by the two stat tables.
#[derive(Debug, Clone, Default)]
pub struct TableOptions {
    pub sort: SortConfig,
    /// Ignore the configured exclusions.
    pub include_bots: bool,
    pub limit: Option<usize>,
}

/// One rendered table row with its derived columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatRow {
    pub name: String,
    pub is_bot: bool,
    pub messages: u64,
    pub percent_messages: f64,
    pub words: u64,
    pub percent_words: f64,
    pub characters: u64,
    pub percent_characters: f64,
    pub words_per_message: String,
    pub characters_per_message: String,
    pub attachments: u64,
    pub mentions: u64,
    pub emojis: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_active: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_active_percentage: Option<f64>,
}

impl StatRow {
    fn new(record: &StatRecord, totals: &Totals) -> Self {
        Self {
            name: record.name.clone(),
            is_bot: record.is_bot,
            messages: record.message_count,
            percent_messages: percentage(
                record.message_count as f64,
                totals.total_messages as f64,
            ),
            words: record.total_words,
            percent_words: percentage(record.total_words as f64, totals.total_words as f64),
            characters: record.total_characters,
            percent_characters: percentage(
                record.total_characters as f64,
                totals.total_characters as f64,
            ),
            words_per_message: average_per_message(record.total_words, record.message_count),
            characters_per_message: average_per_message(
                record.total_characters,
                record.message_count,
            ),
            attachments: record.attachments,
            mentions: record.mentions,
            emojis: record.emojis,
            most_active: record.most_active_peer.clone(),
            most_active_percentage: record.most_active_peer_percentage,
        }
    }
}

/// A sorted, possibly truncated stat table.
///
/// `totals` are the backend's sums over every record and are the
/// denominators for the percentage columns; `shown` sums only `rows`.
#[derive(Debug, Serialize)]
pub struct StatTable {
    pub sort: SortConfig,
    pub totals: Totals,
    pub shown: Totals,
    /// Records cut off by `--limit`.
    pub hidden: usize,
    pub rows: Vec<StatRow>,
}

/// Sort `list` and build the display rows.
pub fn build_stat_rows(list: &StatsList, options: &TableOptions) -> StatTable {
    let totals = list.totals();
    let sorted = sort_records(&list.records, &options.sort, Some(&totals));
    let visible = &sorted[..sorted.len().min(options.limit.unwrap_or(usize::MAX))];
    StatTable {
        sort: options.sort,
        totals,
        shown: Totals::from_records(visible),
        hidden: sorted.len() - visible.len(),
        rows: visible.iter().map(|r| StatRow::new(r, &totals)).collect(),
    }
}

pub fn run_users(ctx: &Context, options: &TableOptions, format: OutputFormat) -> Result<()> {
    let filter = ctx.config.stats.filter(options.include_bots);
    let list = ctx.client.user_stats(&filter)?;
    print_stat_list("Users", "user", "Top channel", &list, options, format)
}

pub fn run_channels(ctx: &Context, options: &TableOptions, format: OutputFormat) -> Result<()> {
    let filter = ctx.config.stats.filter(options.include_bots);
    let list = ctx.client.channel_stats(&filter)?;
    print_stat_list("Channels", "channel", "Top user", &list, options, format)
}

fn print_stat_list(
    title: &str,
    name_column: &str,
    peer_column: &str,
    list: &StatsList,
    options: &TableOptions,
    format: OutputFormat,
) -> Result<()> {
    let table = build_stat_rows(list, options);

    match format {
        OutputFormat::Json => print_json(&table)?,
        OutputFormat::Csv => print_stat_csv(name_column, &table.rows),
        OutputFormat::Table => print_stat_table(title, peer_column, &table),
    }
    Ok(())
}

fn print_stat_table(title: &str, peer_column: &str, table: &StatTable) {
    let sort = &table.sort;
    print_title(
        &format!("{title} (by {} {})", sort.key, sort.direction.arrow()),
        118,
    );

    if table.rows.is_empty() {
        println!("{}", "No data.".yellow());
        return;
    }

    println!(
        "  {:<20} {:>9} {:>6} {:>10} {:>6} {:>11} {:>6} {:>6} {:>6} {:>5} {:>5} {:>5}  {}",
        "Name", "Messages", "%", "Words", "%", "Characters", "%", "W/M", "C/M", "Att", "Men", "Emo",
        peer_column
    );
    println!("  {}", "-".repeat(116));

    for (i, row) in table.rows.iter().enumerate() {
        let name = if row.is_bot {
            format!("{} [bot]", truncate(&row.name, 14))
        } else {
            truncate(&row.name, 20)
        };
        let peer = match (&row.most_active, row.most_active_percentage) {
            (Some(peer), Some(pct)) => format!("{} ({pct:.1}%)", truncate(peer, 16)),
            (Some(peer), None) => truncate(peer, 16),
            _ => String::new(),
        };
        let line = format!(
            "  {:<20} {:>9} {:>5.1}% {:>10} {:>5.1}% {:>11} {:>5.1}% {:>6} {:>6} {:>5} {:>5} {:>5}  {}",
            name,
            format_number(row.messages),
            row.percent_messages,
            format_number(row.words),
            row.percent_words,
            format_number(row.characters),
            row.percent_characters,
            row.words_per_message,
            row.characters_per_message,
            row.attachments,
            row.mentions,
            row.emojis,
            peer,
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    println!("  {}", "-".repeat(116));
    if table.hidden == 0 {
        println!("{}", total_line("Total", &table.shown, &table.totals).bold());
    } else {
        let label = format!("Shown ({})", table.rows.len());
        println!("{}", total_line(&label, &table.shown, &table.totals).bold());
        let label = format!("All (+{} more)", table.hidden);
        println!("{}", total_line(&label, &table.totals, &table.totals).dimmed());
    }
}

/// A summary row: sums of `sums`, with percentages against `of`.
fn total_line(label: &str, sums: &Totals, of: &Totals) -> String {
    format!(
        "  {:<20} {:>9} {:>5.1}% {:>10} {:>5.1}% {:>11} {:>5.1}% {:>6} {:>6} {:>5} {:>5} {:>5}",
        label,
        format_number(sums.total_messages),
        percentage(sums.total_messages as f64, of.total_messages as f64),
        format_number(sums.total_words),
        percentage(sums.total_words as f64, of.total_words as f64),
        format_number(sums.total_characters),
        percentage(sums.total_characters as f64, of.total_characters as f64),
        average_per_message(sums.total_words, sums.total_messages),
        average_per_message(sums.total_characters, sums.total_messages),
        sums.attachments,
        sums.mentions,
        sums.emojis,
    )
}

fn print_stat_csv(name_column: &str, rows: &[StatRow]) {
    println!(
        "{name_column},is_bot,messages,percent_messages,words,percent_words,characters,percent_characters,words_per_message,characters_per_message,attachments,mentions,emojis,most_active,most_active_percentage"
    );
    for r in rows {
        println!(
            "{},{},{},{:.1},{},{:.1},{},{:.1},{},{},{},{},{},{},{}",
            csv_field(&r.name),
            r.is_bot,
            r.messages,
            r.percent_messages,
            r.words,
            r.percent_words,
            r.characters,
            r.percent_characters,
            r.words_per_message,
            r.characters_per_message,
            r.attachments,
            r.mentions,
            r.emojis,
            csv_field(r.most_active.as_deref().unwrap_or("")),
            r.most_active_percentage
                .map(|p| format!("{p:.1}"))
                .unwrap_or_default(),
        );
    }
}

// ---------------------------------------------------------------------------
// chatstat user | channel
// ---------------------------------------------------------------------------

pub fn run_user(ctx: &Context, name: &str, format: OutputFormat) -> Result<()> {
    let profile = ctx.client.user_profile(name)?;
    match format {
        OutputFormat::Json => print_json(&profile)?,
        OutputFormat::Csv => print_fields_csv(&user_fields(&profile)),
        OutputFormat::Table => print_user_table(&profile),
    }
    Ok(())
}

fn user_fields(p: &UserProfile) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("id", p.id.clone()),
        ("name", p.name.clone()),
        ("nickname", p.nickname.clone().unwrap_or_default()),
        ("is_bot", p.is_bot.to_string()),
        ("color", p.color.clone().unwrap_or_default()),
        ("total_messages", p.total_messages.to_string()),
        ("total_words", p.total_words.to_string()),
        ("total_characters", p.total_characters.to_string()),
        (
            "words_per_message",
            average_per_message(p.total_words, p.total_messages),
        ),
        (
            "characters_per_message",
            average_per_message(p.total_characters, p.total_messages),
        ),
    ];
    let roles: Vec<&str> = roles_by_position(p)
        .into_iter()
        .map(|r| r.name.as_str())
        .collect();
    fields.push(("roles", roles.join(";")));
    fields
}

fn roles_by_position(p: &UserProfile) -> Vec<&crate::api::models::Role> {
    let mut roles: Vec<_> = p.roles.iter().collect();
    roles.sort_by(|a, b| b.position.cmp(&a.position));
    roles
}

fn print_user_table(p: &UserProfile) {
    let heading = match &p.nickname {
        Some(nick) if nick != &p.name => format!("{} ({nick})", p.name),
        _ => p.name.clone(),
    };
    let heading = match p.color.as_deref().and_then(parse_hex_color) {
        Some((r, g, b)) => heading.truecolor(r, g, b).bold(),
        None => heading.bold().cyan(),
    };
    println!("{heading}");
    println!("{}", "=".repeat(50));

    println!("  {} {}", "ID:              ".bold(), p.id);
    if p.is_bot {
        println!("  {} {}", "Account:         ".bold(), "bot".yellow());
    }
    println!("  {} {}", "Messages:        ".bold(), format_number(p.total_messages));
    println!("  {} {}", "Words:           ".bold(), format_number(p.total_words));
    println!("  {} {}", "Characters:      ".bold(), format_number(p.total_characters));
    println!(
        "  {} {}",
        "Words / message: ".bold(),
        average_per_message(p.total_words, p.total_messages)
    );
    println!(
        "  {} {}",
        "Chars / message: ".bold(),
        average_per_message(p.total_characters, p.total_messages)
    );

    let roles = roles_by_position(p);
    if !roles.is_empty() {
        println!();
        println!("{}", "Roles".bold().cyan());
        for role in roles {
            println!("  {}", role_label(&role.name, role.color.as_deref()));
        }
    }
}

fn role_label(name: &str, color: Option<&str>) -> ColoredString {
    match color.and_then(parse_hex_color) {
        Some((r, g, b)) => name.truecolor(r, g, b),
        None => name.normal(),
    }
}

/// Parse `#rrggbb` (leading `#` optional). Black means "no color" in the
/// archive and is treated as absent.
fn parse_hex_color(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match (channel(0)?, channel(2)?, channel(4)?) {
        (0, 0, 0) => None,
        rgb => Some(rgb),
    }
}

pub fn run_channel(ctx: &Context, name: &str, format: OutputFormat) -> Result<()> {
    let profile = ctx.client.channel_profile(name)?;
    match format {
        OutputFormat::Json => print_json(&profile)?,
        OutputFormat::Csv => print_fields_csv(&channel_fields(&profile)),
        OutputFormat::Table => {
            println!("{}", format!("#{}", profile.name).bold().cyan());
            println!("{}", "=".repeat(50));
            for (label, value) in channel_fields(&profile) {
                if !value.is_empty() {
                    println!("  {:<24} {}", format!("{label}:").bold(), value);
                }
            }
        }
    }
    Ok(())
}

fn channel_fields(p: &ChannelProfile) -> Vec<(&'static str, String)> {
    vec![
        ("id", p.id.clone()),
        ("name", p.name.clone()),
        ("type", p.kind.clone().unwrap_or_default()),
        ("category", p.category_name.clone().unwrap_or_default()),
        ("topic", p.topic.clone().unwrap_or_default()),
        ("total_messages", p.total_messages.to_string()),
        ("total_words", p.total_words.to_string()),
        ("total_characters", p.total_characters.to_string()),
        (
            "words_per_message",
            average_per_message(p.total_words, p.total_messages),
        ),
        (
            "characters_per_message",
            average_per_message(p.total_characters, p.total_messages),
        ),
    ]
}

fn print_fields_csv(fields: &[(&str, String)]) {
    println!("field,value");
    for (name, value) in fields {
        println!("{},{}", name, csv_field(value));
    }
}

// ---------------------------------------------------------------------------
// chatstat random
// ---------------------------------------------------------------------------

/// The "average message" assembled from the most common character and
/// word at each position.
pub fn run_random(ctx: &Context, format: OutputFormat) -> Result<()> {
    let average = ctx.client.average_message()?;
    match format {
        OutputFormat::Json => print_json(&average)?,
        OutputFormat::Csv => print_fields_csv(&[
            ("by_characters", average.average_message_chars.clone()),
            ("by_words", average.average_message_words.clone()),
        ]),
        OutputFormat::Table => {
            print_title("The average message", 50);
            println!("  {} {}", "By characters:".bold(), average.average_message_chars);
            println!("  {} {}", "By words:     ".bold(), average.average_message_words);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// chatstat watch
// ---------------------------------------------------------------------------

/// Views that can be refreshed live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum WatchView {
    Summary,
    Timeline,
    Users,
    Channels,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub interval_ms: Option<u64>,
    /// Render once instead of polling.
    pub once: bool,
    pub count: Option<u64>,
    pub bucket_minutes: u32,
    pub table: TableOptions,
}

/// Re-render `view` on the refresh interval until interrupted.
///
/// Polling stops early when the backend rejects the token, since every
/// later request would fail the same way.
pub fn run_watch(
    ctx: &Context,
    view: WatchView,
    options: &WatchOptions,
    format: OutputFormat,
) -> Result<()> {
    let settings = RefreshSettings::default();
    if let Some(ms) = options.interval_ms {
        settings.set_interval_ms(ms);
    }
    if options.once {
        settings.set_enabled(false);
    }

    let cancel = CancelToken::new();
    let mut poller = Poller::new(settings.clone(), cancel.clone());
    if let Some(count) = options.count {
        poller = poller.with_max_ticks(count);
    }

    let redraw = format == OutputFormat::Table && io::stdout().is_terminal();
    info!(?view, interval_ms = settings.get().interval_ms, "starting watch");

    let summary = poller.run(|tick| -> Result<()> {
        if redraw {
            print!("\x1b[2J\x1b[H");
            println!(
                "{}",
                format!(
                    "chatstat watch {:?} · every {}ms · {} · #{tick}",
                    view,
                    settings.get().interval_ms,
                    Local::now().format("%H:%M:%S")
                )
                .to_lowercase()
                .dimmed()
            );
        }
        let result = match view {
            WatchView::Summary => run_summary(ctx, format),
            WatchView::Timeline => run_timeline(ctx, options.bucket_minutes, format),
            WatchView::Users => run_users(ctx, &options.table, format),
            WatchView::Channels => run_channels(ctx, &options.table, format),
        };
        if let Err(e) = &result
            && matches!(e.downcast_ref::<ApiError>(), Some(ApiError::Unauthorized { .. }))
        {
            cancel.cancel();
        }
        result
    });

    if summary.reason == StopReason::Cancelled && summary.errors > 0 {
        anyhow::bail!("stopped watching: not authorized; run `chatstat login` first");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{SortDirection, SortKey};

    fn list() -> StatsList {
        let mut bot = StatRecord::new("helper", 10, 20, 100);
        bot.is_bot = true;
        StatsList {
            total_messages: Some(40),
            total_words: Some(200),
            total_characters: Some(1000),
            records: vec![
                StatRecord::new("alice", 20, 100, 600),
                bot,
                StatRecord::new("bob", 10, 80, 300),
            ],
        }
    }

    #[test]
    fn rows_follow_sort_and_limit() {
        let options = TableOptions {
            sort: SortConfig::new(SortKey::TotalWords, SortDirection::Ascending),
            include_bots: false,
            limit: Some(2),
        };
        let table = build_stat_rows(&list(), &options);
        assert_eq!(table.totals.total_messages, 40);
        let names: Vec<&str> = table.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["helper", "bob"]);
    }

    #[test]
    fn limited_tables_sum_only_visible_rows() {
        let options = TableOptions {
            limit: Some(2),
            ..TableOptions::default()
        };
        let table = build_stat_rows(&list(), &options);
        assert_eq!(table.hidden, 1);
        assert_eq!(table.shown.total_messages, 30);
        assert_eq!(table.shown.total_words, 120);
        assert_eq!(table.shown.total_characters, 700);
        assert_eq!(table.totals.total_messages, 40);

        let line = total_line("Shown (2)", &table.shown, &table.totals);
        assert!(line.contains("75.0%"), "{line}");

        let all = build_stat_rows(&list(), &TableOptions::default());
        assert_eq!(all.hidden, 0);
        assert_eq!(all.shown.total_messages, 40);
    }

    #[test]
    fn rows_carry_percentages_against_totals() {
        let rows = build_stat_rows(&list(), &TableOptions::default()).rows;
        let alice = &rows[0];
        assert_eq!(alice.name, "alice");
        assert_eq!(alice.percent_messages, 50.0);
        assert_eq!(alice.percent_words, 50.0);
        assert_eq!(alice.percent_characters, 60.0);
        assert_eq!(alice.words_per_message, "5.0");
        assert_eq!(alice.characters_per_message, "30.0");
    }

    #[test]
    fn zero_totals_give_zero_percentages() {
        let list = StatsList {
            total_messages: None,
            total_words: None,
            total_characters: None,
            records: vec![StatRecord::new("quiet", 0, 0, 0)],
        };
        let rows = build_stat_rows(&list, &TableOptions::default()).rows;
        assert_eq!(rows[0].percent_messages, 0.0);
        assert_eq!(rows[0].words_per_message, "0");
    }

    #[test]
    fn bars_scale_to_max() {
        assert_eq!(bar(0, 0), "");
        assert_eq!(bar(10, 10).chars().count(), BAR_WIDTH as usize);
        assert_eq!(bar(5, 10).chars().count(), (BAR_WIDTH / 2) as usize);
        assert_eq!(bar(1, 1000).chars().count(), 1);
        assert_eq!(bar(0, 1000), "");
    }

    #[test]
    fn hex_colors_parse() {
        assert_eq!(parse_hex_color("#ff8000"), Some((255, 128, 0)));
        assert_eq!(parse_hex_color("00ff00"), Some((0, 255, 0)));
        assert_eq!(parse_hex_color("#000000"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn window_labels_cover_the_bucket() {
        let bucket = IntervalBucket {
            bucket_start: "2024-03-01T10:30:00Z".to_string(),
            count: 4,
        };
        assert_eq!(window_label(&bucket, 30), "03-01 10:30–11:00 UTC");

        let odd = IntervalBucket {
            bucket_start: "yesterday".to_string(),
            count: 1,
        };
        assert_eq!(window_label(&odd, 30), "yesterday");
    }
}
