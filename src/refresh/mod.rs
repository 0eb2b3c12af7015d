/// Live refresh loop for `chatstat watch`.
///
/// [`Poller::run`] calls a tick function immediately and then on a fixed
/// grid of `interval_ms` while refresh is enabled. Ticks run on the calling
/// thread, one at a time: when a tick overruns, the grid points it covered
/// are skipped rather than queued, so two requests never overlap.
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::session::RefreshSettings;

/// Longest single sleep between cancellation checks.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Shared stop flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why [`Poller::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Refresh was (or became) disabled.
    Disabled,
    Cancelled,
    /// The configured tick limit was reached.
    TickLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub ticks: u64,
    pub errors: u64,
    pub skipped: u64,
    pub reason: StopReason,
}

pub struct Poller {
    settings: RefreshSettings,
    cancel: CancelToken,
    max_ticks: Option<u64>,
}

impl Poller {
    pub fn new(settings: RefreshSettings, cancel: CancelToken) -> Self {
        Self {
            settings,
            cancel,
            max_ticks: None,
        }
    }

    /// Stop after `n` ticks.
    pub fn with_max_ticks(mut self, n: u64) -> Self {
        self.max_ticks = Some(n.max(1));
        self
    }

    /// Run until disabled, cancelled or the tick limit is hit.
    ///
    /// `tick` receives the 1-based tick number. Errors are logged and
    /// counted; they never stop the loop. Settings are re-read after every
    /// tick, so a changed interval takes effect from the next one.
    pub fn run<E: Display>(&self, mut tick: impl FnMut(u64) -> Result<(), E>) -> PollSummary {
        let mut summary = PollSummary {
            ticks: 0,
            errors: 0,
            skipped: 0,
            reason: StopReason::Disabled,
        };
        let mut scheduled = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                summary.reason = StopReason::Cancelled;
                break;
            }

            summary.ticks += 1;
            if let Err(e) = tick(summary.ticks) {
                summary.errors += 1;
                warn!(tick = summary.ticks, error = %e, "refresh failed");
            }

            if self.max_ticks.is_some_and(|max| summary.ticks >= max) {
                summary.reason = StopReason::TickLimit;
                break;
            }
            if self.cancel.is_cancelled() {
                summary.reason = StopReason::Cancelled;
                break;
            }

            let prefs = self.settings.get();
            if !prefs.enabled {
                summary.reason = StopReason::Disabled;
                break;
            }

            let interval_ms = prefs.interval_ms.max(1);
            scheduled += Duration::from_millis(interval_ms);

            let now = Instant::now();
            if now > scheduled {
                let behind = (now - scheduled).as_millis() as u64;
                let missed = behind / interval_ms + 1;
                summary.skipped += missed;
                scheduled += Duration::from_millis(interval_ms.saturating_mul(missed));
                debug!(missed, "tick overran the refresh interval");
            }

            self.sleep_until(scheduled);
        }

        debug!(?summary, "poller stopped");
        summary
    }

    fn sleep_until(&self, deadline: Instant) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(CANCEL_POLL));
        }
    }
}
