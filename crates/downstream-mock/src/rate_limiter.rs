//! Fixed-window per-IP rate limiter backed by a single atomic Lua script.
//!
//! The script increments a counter keyed by IP, sets its expiry on first
//! touch, and reports admission in one round trip so concurrent requests
//! from the same IP can't race past the cap between a read and a write.

use redis::aio::ConnectionManager;
use redis::Script;
use tracing::error;

const RATE_LIMIT_SCRIPT: &str = r#"
local current = redis.call("INCR", KEYS[1])
if current == 1 then
    redis.call("EXPIRE", KEYS[1], ARGV[2])
end
if current > tonumber(ARGV[1]) then
    return 0
end
return 1
"#;

pub const RATE_LIMIT: u32 = 3;
pub const WINDOW_SECS: u32 = 1;

pub struct RateLimiter {
    manager: ConnectionManager,
    script: Script,
}

impl RateLimiter {
    pub fn new(manager: ConnectionManager) -> Self {
        Self {
            manager,
            script: Script::new(RATE_LIMIT_SCRIPT),
        }
    }

    /// Fails open: any Redis error is logged and the request is admitted.
    /// The limiter exists to shield a best-effort mock, so its own
    /// availability is not allowed to take the mock down with it.
    pub async fn allow(&self, client_ip: &str) -> bool {
        let key = format!("rate_limit:{client_ip}");

        let result: redis::RedisResult<i32> = self
            .script
            .key(key)
            .arg(RATE_LIMIT)
            .arg(WINDOW_SECS)
            .invoke_async(&mut self.manager.clone())
            .await;

        match result {
            Ok(allowed) => allowed == 1,
            Err(err) => {
                error!(ip = client_ip, error = %err, "rate limiter unavailable, failing open");
                true
            }
        }
    }
}

/// Prefer the leftmost `X-Forwarded-For` entry, else the literal peer
/// address supplied by the caller, else `"unknown"`.
pub fn extract_client_ip(forwarded_for: Option<&str>, peer_addr: Option<&str>) -> String {
    if let Some(forwarded) = forwarded_for {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    peer_addr.unwrap_or("unknown").to_string()
}
