// ABOUTME: Token-bucket rate limiter and retry backoff for Notion requests
// ABOUTME: Paces sequential calls and honors Retry-After on rate-limit responses

use rand::Rng;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Notion's documented average limit is three requests per second.
pub const DEFAULT_RATE: f64 = 3.0;

/// Longest a server-supplied `Retry-After` is honored.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

struct Bucket {
    tokens: f64,
    last: Instant,
}

pub struct RateLimiter {
    capacity: f64,
    per_second: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(per_second: f64) -> Self {
        let capacity = per_second.max(1.0);
        RateLimiter {
            capacity,
            per_second,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last: Instant::now(),
            }),
        }
    }

    pub fn per_second(&self) -> f64 {
        self.per_second
    }

    /// How long the caller must wait before a token is available, consuming it.
    fn reserve(&self, now: Instant) -> Duration {
        let mut bucket = match self.bucket.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.per_second).min(self.capacity);
        bucket.last = now;

        bucket.tokens -= 1.0;
        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-bucket.tokens / self.per_second)
        }
    }

    /// Blocks until the next request may be sent.
    pub fn acquire(&self) {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            log::debug!("rate limiter sleeping {:?}", wait);
            std::thread::sleep(wait);
        }
    }
}

/// Delay before retry number `attempt` (0-based) after a 429/503.
///
/// A `Retry-After` value wins, capped at [`MAX_RETRY_AFTER`]; otherwise
/// exponential backoff from 500ms with up to 250ms of jitter.
pub fn retry_delay(attempt: u32, retry_after: Option<&str>) -> Duration {
    if let Some(secs) = retry_after.and_then(|v| v.trim().parse::<f64>().ok()) {
        if secs.is_finite() && secs >= 0.0 {
            return Duration::from_secs_f64(secs.min(MAX_RETRY_AFTER.as_secs_f64()));
        }
    }

    let base = 500u64.saturating_mul(1u64 << attempt.min(6));
    let jitter = rand::thread_rng().gen_range(0..=250);
    Duration::from_millis(base + jitter)
}
