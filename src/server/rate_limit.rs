//! Per-client request rate limiting.
//!
//! A counter per client IP over a rolling window anchored at the client's
//! first request; when the window elapses the counter resets. Exceeding the
//! cap rejects with an advisory retry-after until the window rolls over.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Advisory wait returned to a throttled client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAfter(pub Duration);

impl RetryAfter {
    /// Whole seconds for the `Retry-After` header, at least 1.
    pub fn secs(&self) -> u64 {
        self.0.as_secs().max(1)
    }
}

#[derive(Debug)]
struct Window {
    count: u32,
    started: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<IpAddr, Window>> {
        self.clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record one request from `client`. `Ok` admits it; `Err` carries the
    /// advisory wait until the client's window rolls over.
    pub fn check(&self, client: IpAddr) -> Result<(), RetryAfter> {
        let now = Instant::now();
        let mut clients = self.lock();
        match clients.get_mut(&client) {
            None => {
                clients.insert(
                    client,
                    Window {
                        count: 1,
                        started: now,
                    },
                );
                Ok(())
            }
            Some(window) => {
                let elapsed = now.duration_since(window.started);
                if elapsed > self.window {
                    window.count = 1;
                    window.started = now;
                    Ok(())
                } else if window.count >= self.max_requests {
                    Err(RetryAfter(self.window.saturating_sub(elapsed)))
                } else {
                    window.count += 1;
                    Ok(())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, last))
    }

    #[test]
    fn admits_up_to_the_cap_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check(ip(1)).is_ok());
        }
        let retry = limiter.check(ip(1)).unwrap_err();
        assert!(retry.0 <= Duration::from_secs(60));
        assert!(retry.secs() >= 1);
    }

    #[test]
    fn clients_are_tracked_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(2)).is_ok());
        assert!(limiter.check(ip(1)).is_err());
        assert!(limiter.check(ip(2)).is_err());
    }

    #[test]
    fn window_rollover_resets_the_counter() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.check(ip(1)).is_ok());
        assert!(limiter.check(ip(1)).is_err());
        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check(ip(1)).is_ok());
    }

    #[test]
    fn rejections_do_not_extend_the_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(40));
        assert!(limiter.check(ip(1)).is_ok());
        for _ in 0..5 {
            let _ = limiter.check(ip(1));
        }
        std::thread::sleep(Duration::from_millis(50));
        // Window is anchored at the first admitted request, not the rejects.
        assert!(limiter.check(ip(1)).is_ok());
    }

    #[test]
    fn retry_after_rounds_up_to_a_second() {
        let limiter = RateLimiter::new(1, Duration::from_millis(500));
        assert!(limiter.check(ip(1)).is_ok());
        let retry = limiter.check(ip(1)).unwrap_err();
        assert_eq!(retry.secs(), 1);
    }
}
