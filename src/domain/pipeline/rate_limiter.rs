use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Quota settings for one synthesis provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Requests that may go out immediately before throttling starts
    pub burst: u32,
    /// Requests allowed per window once the burst is spent
    pub steady_rate: u32,
    pub window: Duration,
}

impl RateLimitSettings {
    /// Spacing between requests in the steady state
    pub fn interval(&self) -> Duration {
        self.window / self.steady_rate.max(1)
    }
}

#[derive(Debug)]
struct RateLimiterState {
    /// Theoretical arrival time of the next request if traffic were perfectly paced
    next_slot: Option<Instant>,
    dispatched: u64,
    penalties: u64,
}

/// Process-wide limiter for the synthesis provider.
///
/// Generic cell rate algorithm: every admitted request pushes the theoretical
/// arrival time forward by one interval, and a request may go out as soon as it
/// is no further than `burst - 1` intervals ahead of that time. Time passing rolls
/// slots back into availability, which is the rolling window.
#[derive(Debug)]
pub struct RateLimiter {
    settings: RateLimitSettings,
    state: Mutex<RateLimiterState>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(RateLimiterState {
                next_slot: None,
                dispatched: 0,
                penalties: 0,
            }),
        }
    }

    /// Reserve a dispatch slot and return how long the caller must wait for it.
    ///
    /// The slot is reserved before this returns, so concurrent callers never
    /// compute a zero wait for the same slot.
    pub fn admit(&self) -> Duration {
        self.admit_at(Instant::now())
    }

    fn admit_at(&self, now: Instant) -> Duration {
        let interval = self.settings.interval();
        let tolerance = interval * self.settings.burst.saturating_sub(1);

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let tat = state.next_slot.map_or(now, |slot| slot.max(now));
        let allowed_at = tat.checked_sub(tolerance).map_or(now, |t| t.max(now));

        state.next_slot = Some(tat + interval);
        state.dispatched += 1;

        let wait = allowed_at - now;
        if !wait.is_zero() {
            tracing::debug!(
                wait_ms = wait.as_millis() as u64,
                dispatched = state.dispatched,
                "Rate limiter throttling request"
            );
        }
        wait
    }

    /// Tighten the limiter after the provider rejected a request for quota.
    ///
    /// Drains whatever burst is left and moves the next free slot at least one
    /// interval into the future.
    pub fn penalize(&self) {
        let now = Instant::now();
        let interval = self.settings.interval();
        let tolerance = interval * self.settings.burst.saturating_sub(1);

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let tat = state.next_slot.map_or(now, |slot| slot.max(now));
        let penalized = tat.max(now + tolerance + interval);
        state.next_slot = Some(penalized);
        state.penalties += 1;

        tracing::warn!(
            penalties = state.penalties,
            next_free_in_ms = (penalized - tolerance - now).as_millis() as u64,
            "Synthesis quota rejected, rate limiter penalized"
        );
    }

    pub fn dispatched(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).dispatched
    }

    pub fn penalties(&self) -> u64 {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).penalties
    }
}
