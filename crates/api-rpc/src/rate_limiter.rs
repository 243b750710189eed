//! Token bucket rate limiter for mutating RPC methods.
//!
//! Lock-free: the token count and the last refill time share one atomic word.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Tokens are tracked in thousandths so slow refill rates still accumulate
const SCALE: u64 = 1000;

pub struct RateLimiter {
    // Upper 32 bits: tokens * SCALE. Lower 32 bits: ms since `origin` of the last refill.
    packed: AtomicU64,
    origin: Instant,
    capacity: u64,
    refill_per_sec: u64,
}

fn pack(millitokens: u64, at_ms: u32) -> u64 {
    (millitokens << 32) | at_ms as u64
}

fn unpack(packed: u64) -> (u64, u32) {
    (packed >> 32, (packed & 0xFFFF_FFFF) as u32)
}

impl RateLimiter {
    /// `burst` requests at once, `per_second` sustained
    pub fn new(burst: u32, per_second: u32) -> Self {
        let capacity = burst as u64 * SCALE;
        Self {
            packed: AtomicU64::new(pack(capacity, 0)),
            origin: Instant::now(),
            capacity,
            refill_per_sec: per_second as u64,
        }
    }

    /// Take one token. False when the bucket is empty.
    pub fn try_acquire(&self) -> bool {
        loop {
            let current = self.packed.load(Ordering::Acquire);
            let (millitokens, last_ms) = unpack(current);

            let now_ms = self.origin.elapsed().as_millis() as u32;
            let elapsed = now_ms.wrapping_sub(last_ms) as u64;
            let refilled = (millitokens + elapsed * self.refill_per_sec).min(self.capacity);

            let (next, allowed) = if refilled >= SCALE {
                (refilled - SCALE, true)
            } else {
                (refilled, false)
            };

            if self
                .packed
                .compare_exchange(current, pack(next, now_ms), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return allowed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_burst_then_denied() {
        let limiter = RateLimiter::new(10, 1);
        for _ in 0..10 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_refills_over_time() {
        let limiter = RateLimiter::new(2, 20);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_the_burst() {
        let limiter = Arc::new(RateLimiter::new(100, 1));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { (0..20).filter(|_| limiter.try_acquire()).count() })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            allowed += handle.await.unwrap();
        }

        // 200 attempts against a burst of 100 with a trickle of refill
        assert!((100..=102).contains(&allowed), "allowed {}", allowed);
    }
}
