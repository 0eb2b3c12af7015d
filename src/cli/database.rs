//! Message database commands: paginated listing, single-message detail,
//! deletion, and the values available to the listing filters.

use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDate};
use colored::Colorize;

use super::{Context, OutputFormat, csv_field, one_line, print_json, print_title};
use crate::api::models::{DatabaseMessage, MessageDetail, MessageFilters, MessageQuery, Page};
use crate::session::preferences::PreferenceStore;
use crate::utils::format::{format_number, truncate};

// ---------------------------------------------------------------------------
// chatstat messages
// ---------------------------------------------------------------------------

/// Arguments of `chatstat messages`.
///
/// Anything left unset falls back to the remembered preferences. Giving any
/// filter flag replaces the whole remembered filter set.
#[derive(Debug, Clone, Default)]
pub struct MessageArgs {
    pub filters: MessageFilters,
    pub page: u32,
    pub page_size: Option<u32>,
    pub timezone: Option<String>,
    /// Forget remembered filters, page size and timezone first.
    pub reset: bool,
}

/// Fold `args` into the preferences and build the query to send.
pub fn resolve_query(prefs: &PreferenceStore, args: &MessageArgs) -> Result<MessageQuery> {
    if let Some(date) = args.filters.date.as_deref() {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid --date '{date}', expected YYYY-MM-DD"))?;
    }

    if args.reset {
        prefs.reset();
    }
    if !args.filters.is_empty() {
        prefs.set_filters(args.filters.clone());
    }
    if let Some(size) = args.page_size {
        prefs.set_page_size(size);
    }
    if let Some(tz) = args.timezone.as_deref().filter(|tz| !tz.is_empty()) {
        prefs.set_timezone(tz);
    }

    Ok(prefs.get().query(args.page))
}

pub fn run_messages(ctx: &Context, args: &MessageArgs, format: OutputFormat) -> Result<()> {
    let query = resolve_query(&ctx.preferences, args)?;
    let page = ctx.client.database_messages(&query)?;
    ctx.preferences.save();

    match format {
        OutputFormat::Json => print_json(&page)?,
        OutputFormat::Csv => print_messages_csv(&page.results),
        OutputFormat::Table => print_messages_table(&page, &query),
    }
    Ok(())
}

fn print_messages_table(page: &Page<DatabaseMessage>, query: &MessageQuery) {
    print_title(
        &format!(
            "Messages (page {} of {}, {} total)",
            query.page,
            page.total_pages(query.page_size),
            format_number(page.count)
        ),
        120,
    );
    let active = describe_filters(&query.filters, &query.timezone);
    if !active.is_empty() {
        println!("  {} {}", "Filters:".dimmed(), active.dimmed());
    }

    if page.results.is_empty() {
        println!("{}", "No messages match.".yellow());
        return;
    }

    println!(
        "  {:<20} {:<19} {:<14} {:<16} {:>5} {:>6} {:<3} Content",
        "ID", "Time", "Channel", "User", "Words", "Chars", ""
    );
    println!("  {}", "-".repeat(118));
    for (i, m) in page.results.iter().enumerate() {
        let line = format!(
            "  {:<20} {:<19} {:<14} {:<16} {:>5} {:>6} {:<3} {}",
            truncate(&m.id, 20),
            display_time(&m.timestamp),
            truncate(&m.channel_name, 14),
            truncate(&m.user_name, 16),
            m.word_count,
            m.char_count,
            content_flags(m),
            truncate(&one_line(&m.message_content), 40),
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }

    if page.has_more() {
        println!();
        println!(
            "  {}",
            format!("Next page: chatstat messages --page {}", query.page + 1).dimmed()
        );
    }
}

fn print_messages_csv(messages: &[DatabaseMessage]) {
    println!(
        "id,timestamp,server,channel,user,words,characters,attachment,mention,emoji,content"
    );
    for m in messages {
        println!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            csv_field(&m.id),
            csv_field(&m.timestamp),
            csv_field(m.server_name.as_deref().unwrap_or("")),
            csv_field(&m.channel_name),
            csv_field(&m.user_name),
            m.word_count,
            m.char_count,
            m.contains_attachment,
            m.contains_mention,
            m.contains_emoji,
            csv_field(&m.message_content),
        );
    }
}

/// `A`, `M`, `E` markers for attachments, mentions and emojis.
fn content_flags(m: &DatabaseMessage) -> String {
    [
        (m.contains_attachment, 'A'),
        (m.contains_mention, 'M'),
        (m.contains_emoji, 'E'),
    ]
    .into_iter()
    .map(|(on, c)| if on { c } else { '·' })
    .collect()
}

/// `YYYY-MM-DD HH:MM:SS` for RFC 3339 input, otherwise the raw value.
fn display_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| truncate(timestamp, 19))
}

fn describe_filters(filters: &MessageFilters, timezone: &str) -> String {
    let mut parts = Vec::new();
    let text = [
        ("server", &filters.server),
        ("channel", &filters.channel),
        ("user", &filters.user),
    ];
    for (name, value) in text {
        if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
            parts.push(format!("{name}={v}"));
        }
    }
    if let Some(date) = filters.date.as_deref().filter(|d| !d.is_empty()) {
        parts.push(format!("date={date} ({timezone})"));
    }
    for (name, on) in [
        ("attachments", filters.has_attachment),
        ("mentions", filters.has_mention),
        ("emojis", filters.has_emoji),
    ] {
        if on {
            parts.push(format!("with {name}"));
        }
    }
    parts.join(", ")
}

// ---------------------------------------------------------------------------
// chatstat message
// ---------------------------------------------------------------------------

pub fn run_message(ctx: &Context, id: &str, format: OutputFormat) -> Result<()> {
    let detail = ctx.client.message_detail(id)?;
    match format {
        OutputFormat::Json | OutputFormat::Csv => print_json(&detail)?,
        OutputFormat::Table => print_message_detail(&detail),
    }
    Ok(())
}

fn print_message_detail(m: &MessageDetail) {
    let author = match &m.author.nickname {
        Some(nick) if nick != &m.author.name => format!("{} ({nick})", m.author.name),
        _ => m.author.name.clone(),
    };
    print_title(&format!("Message {}", m.id), 60);
    if let Some(guild) = &m.guild {
        println!("  {} {}", "Server: ".bold(), guild.name);
    }
    println!("  {} #{}", "Channel:".bold(), m.channel.name);
    println!("  {} {}", "Author: ".bold(), author);
    println!("  {} {}", "Sent:   ".bold(), display_time(&m.timestamp));
    if let Some(edited) = &m.timestamp_edited {
        println!("  {} {}", "Edited: ".bold(), display_time(edited));
    }
    if m.is_pinned {
        println!("  {} {}", "Pinned: ".bold(), "yes".yellow());
    }
    if let Some(reply) = &m.reference_message {
        let who = reply.author.as_deref().unwrap_or("unknown");
        println!(
            "  {} {}: {}",
            "Reply to:".bold(),
            who,
            truncate(&one_line(&reply.content), 60).dimmed()
        );
    }

    println!();
    if m.content.is_empty() {
        println!("  {}", "(no text content)".dimmed());
    } else {
        for line in m.content.lines() {
            println!("  {line}");
        }
    }

    let counts = [
        ("attachments", json_len(&m.attachments)),
        ("embeds", json_len(&m.embeds)),
        ("reactions", json_len(&m.reactions)),
        ("mentions", json_len(&m.mentions)),
        ("stickers", json_len(&m.stickers)),
        ("emojis", json_len(&m.inline_emojis)),
    ];
    let present: Vec<String> = counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(name, n)| format!("{n} {name}"))
        .collect();
    if !present.is_empty() {
        println!();
        println!("  {}", present.join(", ").dimmed());
    }
}

/// Element count of a free-form JSON list; anything else counts as empty.
fn json_len(value: &serde_json::Value) -> usize {
    value.as_array().map_or(0, Vec::len)
}

// ---------------------------------------------------------------------------
// chatstat delete
// ---------------------------------------------------------------------------

/// Delete messages one at a time, stopping at the first failure.
pub fn run_delete(ctx: &Context, ids: &[String], confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!(
            "refusing to delete {} message(s) without --yes",
            ids.len()
        );
    }

    for (done, id) in ids.iter().enumerate() {
        ctx.client.delete_message(id).with_context(|| {
            format!(
                "failed to delete message {id} ({done} of {} deleted)",
                ids.len()
            )
        })?;
        println!("{} Deleted {}", "✓".green().bold(), id);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// chatstat filter-options
// ---------------------------------------------------------------------------

pub fn run_filter_options(ctx: &Context, format: OutputFormat) -> Result<()> {
    let options = ctx.client.filter_options()?;
    let groups = [
        ("server", &options.servers),
        ("channel", &options.channels),
        ("user", &options.users),
    ];

    match format {
        OutputFormat::Json => print_json(&options)?,
        OutputFormat::Csv => {
            println!("kind,value");
            for (kind, values) in groups {
                for value in values {
                    println!("{},{}", kind, csv_field(value));
                }
            }
        }
        OutputFormat::Table => {
            for (kind, values) in groups {
                println!(
                    "{} {}",
                    format!("{kind}s").bold().cyan(),
                    format!("({})", values.len()).dimmed()
                );
                for value in values {
                    println!("  {value}");
                }
                println!();
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
