#![forbid(unsafe_code)]

//! Re-apply scheduling for a page that changes under the widget.
//!
//! The watcher never touches the DOM itself. It is a pure deadline state
//! machine: the host layer reports triggers (filtered structural mutations,
//! navigation events) with millisecond timestamps and polls
//! [`ChangeWatcher::poll`] from its timer; the watcher answers "re-apply
//! now" or "not yet".
//!
//! # Decision Rule
//!
//! 1. A content mutation schedules a re-apply at `now + debounce_ms`; more
//!    mutations inside the window are absorbed (earliest deadline wins), so
//!    a burst of N triggers yields exactly one re-apply and a continuous
//!    stream cannot push the deadline forever.
//! 2. A navigation event schedules at `now + nav_delay_ms` — single-page
//!    hosts replace content asynchronously *after* the navigation fires, so
//!    re-applying immediately would hit the old document.
//! 3. Independently of 1–2, a re-apply becomes due once
//!    `fallback_interval_ms` has elapsed since the last apply. This bounds
//!    staleness even for change paths the mutation and navigation hooks
//!    never observe, at a small constant background cost.
//!
//! A redundant re-apply is harmless (the apply engine is idempotent), so
//! none of these deadlines are correctness-critical — they only bound wasted
//! work and staleness.

/// Trigger policy for the watcher. Injectable per host.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Quiet delay after a content mutation before re-applying (ms).
    /// Default: 100 — long enough for a host to finish a render batch.
    pub debounce_ms: u64,

    /// Delay after a navigation event before re-applying (ms).
    /// Default: 200 — single-page hosts render the new route async.
    pub nav_delay_ms: u64,

    /// Unconditional re-apply interval (ms). Upper bound on staleness for
    /// unobserved change paths. Default: 2000.
    pub fallback_interval_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            nav_delay_ms: 200,
            fallback_interval_ms: 2000,
        }
    }
}

/// Decides when the apply engine must re-run. Driven entirely by timestamps
/// supplied by the host layer; owns no timers itself.
#[derive(Debug, Clone)]
pub struct ChangeWatcher {
    config: WatcherConfig,
    /// Earliest scheduled re-apply deadline, if any.
    deadline: Option<u64>,
    /// Timestamp of the last completed apply pass.
    last_apply: Option<u64>,
}

impl ChangeWatcher {
    #[must_use]
    pub fn new(config: WatcherConfig) -> Self {
        Self {
            config,
            deadline: None,
            last_apply: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Report a content mutation (already filtered against the content
    /// selectors by the caller).
    pub fn on_mutation(&mut self, now: u64) {
        self.schedule(now.saturating_add(self.config.debounce_ms));
    }

    /// Report a navigation event (history push/replace, back/forward, hash
    /// change).
    pub fn on_navigation(&mut self, now: u64) {
        self.schedule(now.saturating_add(self.config.nav_delay_ms));
    }

    fn schedule(&mut self, at: u64) {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(at),
            None => at,
        });
    }

    /// Whether a re-apply is due at `now`. Consumes the pending deadline
    /// when it answers `true`; the caller must run the apply pass and then
    /// call [`note_applied`](Self::note_applied).
    #[must_use]
    pub fn poll(&mut self, now: u64) -> bool {
        let deadline_due = self.deadline.is_some_and(|at| now >= at);
        let fallback_due = self
            .last_apply
            .is_some_and(|at| now.saturating_sub(at) >= self.config.fallback_interval_ms);
        if deadline_due || fallback_due {
            self.deadline = None;
            true
        } else {
            false
        }
    }

    /// Record that an apply pass just completed. Resets the fallback clock
    /// and clears any pending deadline (the pass already covered it).
    pub fn note_applied(&mut self, now: u64) {
        self.deadline = None;
        self.last_apply = Some(now);
    }

    /// Whether a re-apply is currently scheduled.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// The currently scheduled deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.deadline
    }
}
