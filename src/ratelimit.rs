//! Per-IP sliding-window rate limiting for the contact endpoint.
//!
//! Process-local by construction: a fixed-capacity map of request
//! timestamps, pruned opportunistically. This bounds abuse per source IP on
//! a single instance; a multi-instance deployment must externalize the
//! counters into a shared store instead.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const MAX_TRACKED_CLIENTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Limited,
}

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: Mutex<HashMap<IpAddr, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests as usize,
            window,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, ip: IpAddr) -> Decision {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Decision {
        let mut clients = match self.clients.lock() {
            Ok(guard) => guard,
            // A poisoned lock only means another checker panicked; the
            // timestamps themselves are still usable.
            Err(poisoned) => poisoned.into_inner(),
        };

        if clients.len() >= MAX_TRACKED_CLIENTS && !clients.contains_key(&ip) {
            self.prune(&mut clients, now);
        }

        let hits = clients.entry(ip).or_default();
        while let Some(first) = hits.front() {
            if now.duration_since(*first) >= self.window {
                hits.pop_front();
            } else {
                break;
            }
        }

        if hits.len() >= self.max_requests {
            return Decision::Limited;
        }
        hits.push_back(now);
        Decision::Allowed
    }

    /// Drop clients whose entire window has expired.
    fn prune(&self, clients: &mut HashMap<IpAddr, VecDeque<Instant>>, now: Instant) {
        clients.retain(|_, hits| {
            hits.back()
                .map(|last| now.duration_since(*last) < self.window)
                .unwrap_or(false)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn sixth_request_in_window_is_limited() {
        let limiter = RateLimiter::new(5, Duration::from_secs(900));
        let t0 = Instant::now();
        for _ in 0..5 {
            assert_eq!(limiter.check_at(ip(1), t0), Decision::Allowed);
        }
        assert_eq!(limiter.check_at(ip(1), t0), Decision::Limited);
    }

    #[test]
    fn window_slides_past_oldest_request() {
        let limiter = RateLimiter::new(5, Duration::from_secs(900));
        let t0 = Instant::now();
        for i in 0..5 {
            let t = t0 + Duration::from_secs(i * 10);
            assert_eq!(limiter.check_at(ip(2), t), Decision::Allowed);
        }
        assert_eq!(
            limiter.check_at(ip(2), t0 + Duration::from_secs(60)),
            Decision::Limited
        );
        // Once the window slides past the first request, a new one succeeds
        assert_eq!(
            limiter.check_at(ip(2), t0 + Duration::from_secs(901)),
            Decision::Allowed
        );
    }

    #[test]
    fn clients_are_isolated() {
        let limiter = RateLimiter::new(1, Duration::from_secs(900));
        let t0 = Instant::now();
        assert_eq!(limiter.check_at(ip(3), t0), Decision::Allowed);
        assert_eq!(limiter.check_at(ip(3), t0), Decision::Limited);
        assert_eq!(limiter.check_at(ip(4), t0), Decision::Allowed);
    }

    #[test]
    fn expired_clients_are_pruned() {
        let limiter = RateLimiter::new(5, Duration::from_secs(10));
        let t0 = Instant::now();
        limiter.check_at(ip(5), t0);
        {
            let mut clients = limiter.clients.lock().unwrap();
            let now = t0 + Duration::from_secs(11);
            limiter.prune(&mut clients, now);
            assert!(clients.is_empty());
        }
    }
}
