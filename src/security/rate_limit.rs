//! Fixed-window rate limiting per client address.
//!
//! Each client key owns one [`WindowEntry`]. A request inside the current
//! window increments the count; a request after the window has elapsed
//! starts a new window at count 1. Exceeding `max_requests` denies the
//! request, and with a non-zero block duration also starts a penalty during
//! which the client is denied regardless of window rollover.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::security::client::client_ip;

/// Per-client counter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    pub window_start: Instant,
    pub count: u32,
    pub blocked_until: Option<Instant>,
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { remaining: u32 },
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// Storage for window entries.
///
/// `update` must run its closure while holding exclusive access to `key`,
/// so concurrent checks for one client never lose an increment.
pub trait RateStore: Send + Sync {
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(&mut Option<WindowEntry>) -> Admission,
    ) -> Admission;

    /// Drop every entry for which `keep` is false; returns how many went.
    fn retain(&self, keep: &dyn Fn(&WindowEntry) -> bool) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store on a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryRateStore {
    entries: DashMap<String, WindowEntry>,
}

impl MemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateStore for MemoryRateStore {
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(&mut Option<WindowEntry>) -> Admission,
    ) -> Admission {
        // The shard lock is held by the entry guard until the end of each arm.
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let mut slot = Some(*occupied.get());
                let admission = f(&mut slot);
                match slot {
                    Some(entry) => *occupied.get_mut() = entry,
                    None => {
                        occupied.remove();
                    }
                }
                admission
            }
            Entry::Vacant(vacant) => {
                let mut slot = None;
                let admission = f(&mut slot);
                if let Some(entry) = slot {
                    vacant.insert(entry);
                }
                admission
            }
        }
    }

    fn retain(&self, keep: &dyn Fn(&WindowEntry) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| keep(entry));
        before.saturating_sub(self.entries.len())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Longest penalty a limiter will apply.
pub const MAX_BLOCK: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Fixed-window limiter over a [`RateStore`].
pub struct FixedWindowLimiter {
    store: Arc<dyn RateStore>,
    max_requests: u32,
    window: Duration,
    block: Duration,
}

impl FixedWindowLimiter {
    /// `block` is capped at [`MAX_BLOCK`].
    pub fn new(
        store: Arc<dyn RateStore>,
        max_requests: u32,
        window: Duration,
        block: Duration,
    ) -> Self {
        Self {
            store,
            max_requests,
            window,
            block: block.min(MAX_BLOCK),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            Arc::new(MemoryRateStore::new()),
            config.max_requests,
            Duration::from_secs(config.window_duration_secs),
            Duration::from_secs(config.blocked_duration_mins.saturating_mul(60)),
        )
    }

    pub fn check(&self, key: &str) -> Admission {
        self.check_at(key, Instant::now())
    }

    /// Admission check at an explicit instant.
    pub fn check_at(&self, key: &str, now: Instant) -> Admission {
        let (max, window, block) = (self.max_requests, self.window, self.block);

        self.store.update(key, &mut |slot: &mut Option<WindowEntry>| {
            if let Some(entry) = slot.as_mut() {
                if let Some(until) = entry.blocked_until.filter(|until| now < *until) {
                    return Admission::Denied { retry_after: until - now };
                }

                let elapsed = now.saturating_duration_since(entry.window_start);
                if elapsed < window {
                    entry.count = entry.count.saturating_add(1);
                    if entry.count <= max {
                        return Admission::Allowed { remaining: max - entry.count };
                    }
                    return match now.checked_add(block).filter(|_| !block.is_zero()) {
                        Some(until) => {
                            entry.blocked_until = Some(until);
                            Admission::Denied { retry_after: block }
                        }
                        None => Admission::Denied { retry_after: window - elapsed },
                    };
                }
            }

            *slot = Some(WindowEntry {
                window_start: now,
                count: 1,
                blocked_until: None,
            });
            Admission::Allowed { remaining: max.saturating_sub(1) }
        })
    }

    /// Evict entries whose window and penalty have both ended.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let window = self.window;
        self.store.retain(&|entry: &WindowEntry| {
            now.saturating_duration_since(entry.window_start) < window
                || entry.blocked_until.is_some_and(|until| now < until)
        })
    }

    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }

    /// Periodically sweep stale entries until shutdown.
    pub async fn run_sweeper(
        self: Arc<Self>,
        every: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!(interval_secs = every.as_secs(), "Rate limit sweeper starting");

        let mut ticker = time::interval(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.sweep_at(Instant::now());
                    if evicted > 0 {
                        tracing::debug!(
                            evicted,
                            remaining = self.tracked_clients(),
                            "Swept rate limit entries"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limit sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Middleware state.
#[derive(Clone)]
pub struct RateLimitState {
    pub limiter: Arc<FixedWindowLimiter>,
    pub trust_forwarded_for: bool,
}

pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_ip(request.headers(), request.extensions(), state.trust_forwarded_for)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match state.limiter.check(&key) {
        Admission::Allowed { .. } => next.run(request).await,
        Admission::Denied { retry_after } => {
            tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
            metrics::record_rate_limited();

            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn limiter(max: u32, window_secs: u64, block_secs: u64) -> FixedWindowLimiter {
        FixedWindowLimiter::new(
            Arc::new(MemoryRateStore::new()),
            max,
            Duration::from_secs(window_secs),
            Duration::from_secs(block_secs),
        )
    }

    #[test]
    fn test_fixed_window() {
        let limiter = limiter(3, 10, 0);
        let t0 = Instant::now();

        for i in 0..3 {
            assert!(limiter.check_at("1.2.3.4", t0 + Duration::from_secs(i)).is_allowed());
        }
        assert_eq!(
            limiter.check_at("1.2.3.4", t0 + Duration::from_secs(4)),
            Admission::Denied { retry_after: Duration::from_secs(6) }
        );

        // New window resets the count to 1.
        assert_eq!(
            limiter.check_at("1.2.3.4", t0 + Duration::from_secs(10)),
            Admission::Allowed { remaining: 2 }
        );
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 10, 0);
        let now = Instant::now();
        assert!(limiter.check_at("a", now).is_allowed());
        assert!(!limiter.check_at("a", now).is_allowed());
        assert!(limiter.check_at("b", now).is_allowed());
    }

    #[test]
    fn test_penalty_outlives_window() {
        let limiter = limiter(2, 10, 60);
        let t0 = Instant::now();

        assert!(limiter.check_at("c", t0).is_allowed());
        assert!(limiter.check_at("c", t0).is_allowed());
        assert_eq!(
            limiter.check_at("c", t0 + Duration::from_secs(1)),
            Admission::Denied { retry_after: Duration::from_secs(60) }
        );

        // Window rolled over, penalty still running.
        assert_eq!(
            limiter.check_at("c", t0 + Duration::from_secs(31)),
            Admission::Denied { retry_after: Duration::from_secs(30) }
        );
        assert!(limiter.check_at("c", t0 + Duration::from_secs(61)).is_allowed());
    }

    #[test]
    fn test_oversized_penalty_is_capped() {
        let config = RateLimitConfig {
            max_requests: 1,
            window_duration_secs: 10,
            blocked_duration_mins: u64::MAX / 60,
            ..RateLimitConfig::default()
        };
        let limiter = FixedWindowLimiter::from_config(&config);
        let t0 = Instant::now();

        assert!(limiter.check_at("d", t0).is_allowed());
        assert_eq!(
            limiter.check_at("d", t0),
            Admission::Denied { retry_after: MAX_BLOCK }
        );
        assert!(!limiter.check_at("d", t0 + Duration::from_secs(3600)).is_allowed());

        let limiter = FixedWindowLimiter::from_config(&RateLimitConfig {
            blocked_duration_mins: u64::MAX,
            ..config
        });
        limiter.check_at("e", t0);
        assert!(!limiter.check_at("e", t0).is_allowed());
    }

    #[test]
    fn test_sweep_evicts_stale_entries() {
        let limiter = limiter(1, 10, 60);
        let t0 = Instant::now();

        limiter.check_at("idle", t0);
        limiter.check_at("blocked", t0);
        limiter.check_at("blocked", t0);
        limiter.check_at("fresh", t0 + Duration::from_secs(15));

        assert_eq!(limiter.sweep_at(t0 + Duration::from_secs(20)), 1);
        assert_eq!(limiter.tracked_clients(), 2);

        assert_eq!(limiter.sweep_at(t0 + Duration::from_secs(120)), 2);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_concurrent_checks_lose_no_updates() {
        const N: u32 = 64;
        let limiter = limiter(N, 60, 0);
        let now = Instant::now();
        let allowed = AtomicU32::new(0);

        std::thread::scope(|scope| {
            for _ in 0..N {
                scope.spawn(|| {
                    if limiter.check_at("same", now).is_allowed() {
                        allowed.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(allowed.load(Ordering::SeqCst), N);
        assert!(!limiter.check_at("same", now).is_allowed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_tasks() {
        let limiter = Arc::new(limiter(10, 60, 0));
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.check("task").is_allowed() })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 10);
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let limiter = Arc::new(limiter(1, 1, 0));
        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(limiter.run_sweeper(Duration::from_millis(10), rx));

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }
}
