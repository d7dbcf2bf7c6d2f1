use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::config::RateLimitConfig;

const MAX_TRACKED_CLIENTS: usize = 4096;

#[derive(Debug, Clone)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client.
///
/// At most `capacity` clients are tracked. A new client arriving at capacity
/// first drops expired windows, then the oldest one.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
    capacity: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACKED_CLIENTS)
    }
}

impl RateLimiter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn allow(&self, key: &str, cfg: &RateLimitConfig) -> bool {
        self.allow_at(key, cfg, Instant::now()).await
    }

    pub(crate) async fn allow_at(&self, key: &str, cfg: &RateLimitConfig, now: Instant) -> bool {
        let mut lock = self.windows.lock().await;
        if !lock.contains_key(key) && lock.len() >= self.capacity {
            lock.retain(|_, window| now.duration_since(window.started) < cfg.window);
            if lock.len() >= self.capacity {
                let oldest = lock
                    .iter()
                    .min_by_key(|(_, window)| window.started)
                    .map(|(client, _)| client.clone());
                if let Some(oldest) = oldest {
                    lock.remove(&oldest);
                }
            }
        }
        let window = lock.entry(key.to_string()).or_insert_with(|| Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= cfg.window {
            window.started = now;
            window.count = 0;
        }
        if window.count >= cfg.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cfg(max_requests: u32) -> RateLimitConfig {
        RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn rejects_after_max_requests_in_window() {
        let limiter = RateLimiter::default();
        let cfg = cfg(2);
        let now = Instant::now();
        assert!(limiter.allow_at("1.2.3.4", &cfg, now).await);
        assert!(limiter.allow_at("1.2.3.4", &cfg, now).await);
        assert!(!limiter.allow_at("1.2.3.4", &cfg, now).await);
        assert!(limiter.allow_at("5.6.7.8", &cfg, now).await);
    }

    #[tokio::test]
    async fn new_clients_at_capacity_evict_the_oldest_window() {
        let limiter = RateLimiter::with_capacity(2);
        let cfg = cfg(1);
        let now = Instant::now();
        assert!(limiter.allow_at("a", &cfg, now).await);
        assert!(limiter.allow_at("b", &cfg, now + Duration::from_secs(1)).await);
        assert!(limiter.allow_at("c", &cfg, now + Duration::from_secs(2)).await);
        assert_eq!(limiter.windows.lock().await.len(), 2);

        let later = now + Duration::from_secs(3);
        assert!(!limiter.allow_at("b", &cfg, later).await);
        assert!(!limiter.allow_at("c", &cfg, later).await);
        // "a" was evicted, so it starts a fresh window.
        assert!(limiter.allow_at("a", &cfg, later).await);
    }

    #[tokio::test]
    async fn window_resets_after_it_elapses() {
        let limiter = RateLimiter::default();
        let cfg = cfg(1);
        let now = Instant::now();
        assert!(limiter.allow_at("client", &cfg, now).await);
        assert!(!limiter.allow_at("client", &cfg, now + Duration::from_secs(59)).await);
        assert!(limiter.allow_at("client", &cfg, now + Duration::from_secs(60)).await);
    }
}
