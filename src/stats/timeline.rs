/// Fixed-width bucketing of timeline samples.
///
/// The backend reports message counts per minute for the last 24 hours.
/// For display these are merged into wider windows (30 minutes by default):
/// every sample's timestamp is floored to the start of its window in UTC,
/// counts sharing a window are summed, and the windows come back in
/// ascending order.
///
/// Windows restart at every hour: the minute of the hour is floored to a
/// multiple of the width, so any width of 60 or more yields the hour start.
///
/// Aggregation never reads the clock, so re-aggregating its own output is
/// a no-op.
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Default window width in minutes.
pub const DEFAULT_BUCKET_MINUTES: u32 = 30;

/// A single `(timestamp, count)` point as delivered by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineSample {
    /// ISO-8601 timestamp.
    pub timestamp: String,
    pub count: u64,
}

impl TimelineSample {
    pub fn new(timestamp: impl Into<String>, count: u64) -> Self {
        Self {
            timestamp: timestamp.into(),
            count,
        }
    }
}

/// A merged window of samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalBucket {
    /// Window start, formatted `YYYY-MM-DDTHH:MM:SSZ`.
    pub bucket_start: String,
    pub count: u64,
}

impl IntervalBucket {
    /// Parsed window start.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.bucket_start)
    }

    /// Exclusive window end for a bucket of `width_minutes`.
    pub fn end(&self, width_minutes: u32) -> Option<DateTime<Utc>> {
        self.start()
            .map(|s| s + Duration::minutes(i64::from(effective_width(width_minutes))))
    }
}

impl From<&IntervalBucket> for TimelineSample {
    fn from(bucket: &IntervalBucket) -> Self {
        Self::new(bucket.bucket_start.clone(), bucket.count)
    }
}

/// Merge `samples` into `width_minutes`-wide windows.
///
/// Samples whose timestamp cannot be parsed are skipped. A width of zero is
/// treated as one minute.
pub fn aggregate(samples: &[TimelineSample], width_minutes: u32) -> Vec<IntervalBucket> {
    let width = i64::from(effective_width(width_minutes));

    let mut windows: BTreeMap<i64, u64> = BTreeMap::new();
    for sample in samples {
        let Some(ts) = parse_timestamp(&sample.timestamp) else {
            continue;
        };
        let start = window_start(ts.timestamp(), width);
        *windows.entry(start).or_default() += sample.count;
    }

    windows
        .into_iter()
        .filter_map(|(start, count)| {
            DateTime::<Utc>::from_timestamp(start, 0).map(|dt| IntervalBucket {
                bucket_start: dt.to_rfc3339_opts(SecondsFormat::Secs, true),
                count,
            })
        })
        .collect()
}

/// The bucket with the highest count; the earliest one wins ties.
pub fn peak_bucket(buckets: &[IntervalBucket]) -> Option<&IntervalBucket> {
    let mut iter = buckets.iter();
    let first = iter.next()?;
    Some(iter.fold(first, |max, b| if b.count > max.count { b } else { max }))
}

/// Floor `secs` to the hour, then add the minute of the hour rounded down
/// to a multiple of `width`.
fn window_start(secs: i64, width: i64) -> i64 {
    let into_hour = secs.rem_euclid(3600);
    let minute = into_hour / 60;
    secs - into_hour + (minute / width) * width * 60
}

fn effective_width(width_minutes: u32) -> u32 {
    width_minutes.max(1)
}

/// Parse an RFC 3339 timestamp, or a naive one taken to be UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
