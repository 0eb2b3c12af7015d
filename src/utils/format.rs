//! Numeric display helpers shared by the stat tables and summaries.
//!
//! All functions are pure and total: a zero or missing denominator yields
//! `0` rather than NaN or infinity. Rounding is left to the caller except
//! where a function returns a display string.

/// Percentage of `value` relative to `total`.
///
/// Returns `0.0` when `total <= 0`. The result is not rounded.
pub fn percentage(value: f64, total: f64) -> f64 {
    if total > 0.0 {
        (value / total) * 100.0
    } else {
        0.0
    }
}

/// Average of `total` per message, formatted with exactly one decimal.
///
/// Returns `"0"` when there are no messages.
pub fn average_per_message(total: u64, message_count: u64) -> String {
    if message_count == 0 {
        return "0".to_string();
    }
    format!("{:.1}", total as f64 / message_count as f64)
}

/// Format an optional count with `,` thousands separators.
///
/// `None` renders as `"0"`.
pub fn format_count(value: Option<u64>) -> String {
    match value {
        Some(n) => format_number(n),
        None => "0".to_string(),
    }
}

/// Format a number with comma separators for readability.
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result.chars().rev().collect()
}

/// Truncate a string to `max_len` characters, appending "…" if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
