use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::AppError;

/// Token bucket capping analysis submissions per minute.
///
/// The bucket holds at most `per_minute` tokens and refills continuously.
#[derive(Clone)]
pub struct RateLimiter {
    per_minute: u32,
    state: Arc<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

impl RateLimiter {
    /// `ANALYSIS_RATE_LIMIT_PER_MIN`; unset or zero disables limiting.
    pub fn from_env() -> Option<Self> {
        std::env::var("ANALYSIS_RATE_LIMIT_PER_MIN")
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .and_then(Self::new)
    }

    pub fn new(per_minute: u32) -> Option<Self> {
        if per_minute == 0 {
            return None;
        }
        Some(Self {
            per_minute,
            state: Arc::new(Mutex::new(Bucket {
                tokens: per_minute as f64,
                last: Instant::now(),
            })),
        })
    }

    pub fn per_minute(&self) -> u32 {
        self.per_minute
    }

    pub async fn acquire(&self) -> Result<(), AppError> {
        let mut bucket = self.state.lock().await;
        self.acquire_at(&mut bucket, Instant::now())
    }

    fn acquire_at(&self, bucket: &mut Bucket, now: Instant) -> Result<(), AppError> {
        let capacity = self.per_minute as f64;
        let per_sec = capacity / 60.0;

        let elapsed = now.saturating_duration_since(bucket.last);
        bucket.last = now;
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * per_sec).min(capacity);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        let retry_after = Duration::from_secs_f64((1.0 - bucket.tokens) / per_sec);
        Err(AppError::RateLimited { retry_after })
    }
}
