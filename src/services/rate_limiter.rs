//! Token-bucket limiter shared by every provider call in a scan.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Clone)]
pub struct TokenBucket {
    inner: Arc<Mutex<Bucket>>,
}

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }
}

impl TokenBucket {
    /// Bucket starting full with `burst` tokens, refilling at `rate_per_sec`.
    ///
    /// Both values are floored at a small positive number so the bucket
    /// can always make progress.
    pub fn new(rate_per_sec: f64, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            inner: Arc::new(Mutex::new(Bucket {
                tokens: capacity,
                capacity,
                refill_per_sec: rate_per_sec.max(0.001),
                last_refill: Instant::now(),
            })),
        }
    }

    /// Wait until a token is available, then take it.
    pub async fn acquire(&self, context: &str) {
        loop {
            let wait = {
                let mut bucket = self.inner.lock().await;
                bucket.refill();

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }

                let missing = 1.0 - bucket.tokens;
                Duration::from_secs_f64(missing / bucket.refill_per_sec)
            };

            debug!(
                "Rate limit saturated for [{}], waiting {:.0}ms",
                context,
                wait.as_secs_f64() * 1000.0
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Take a token if one is available right now.
    pub async fn try_acquire(&self) -> bool {
        let mut bucket = self.inner.lock().await;
        bucket.refill();
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}
