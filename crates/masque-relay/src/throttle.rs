//! Token-bucket flood control, keyed by whatever identifies the caller.
//!
//! The relay keys it by account; the HTTP layer keys it by client IP.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn try_consume(&mut self, rate: f64, capacity: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;

        self.tokens = (self.tokens + elapsed * rate).min(capacity);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// `rate` tokens per second refill, at most `capacity` banked.
pub struct Throttle<K> {
    buckets: Arc<Mutex<HashMap<K, TokenBucket>>>,
    rate: f64,
    capacity: f64,
}

impl<K> Clone for Throttle<K> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            rate: self.rate,
            capacity: self.capacity,
        }
    }
}

impl<K: Eq + Hash> Throttle<K> {
    pub fn new(rate: f64, capacity: f64) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate,
            capacity,
        }
    }

    /// Take one token for `key`. `false` means the caller is over budget.
    pub async fn check(&self, key: K) -> bool {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new(self.capacity));
        bucket.try_consume(self.rate, self.capacity)
    }

    pub async fn purge_stale(&self, max_idle_secs: f64) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.retain(|_, bucket| {
            now.duration_since(bucket.last_refill).as_secs_f64() < max_idle_secs
        });
    }
}

impl<K: Eq + Hash> Default for Throttle<K> {
    fn default() -> Self {
        Self::new(10.0, 30.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use masque_shared::AccountId;

    #[tokio::test]
    async fn test_burst_then_refuse() {
        let throttle = Throttle::new(0.001, 3.0);
        for _ in 0..3 {
            assert!(throttle.check(AccountId(1)).await);
        }
        assert!(!throttle.check(AccountId(1)).await);
        // Another account has its own bucket.
        assert!(throttle.check(AccountId(2)).await);
    }

    #[tokio::test]
    async fn test_purge_stale() {
        let throttle = Throttle::new(10.0, 5.0);
        assert!(throttle.check(AccountId(1)).await);

        throttle.purge_stale(0.0).await;

        let buckets = throttle.buckets.lock().await;
        assert!(buckets.is_empty());
    }
}
