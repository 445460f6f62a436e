//! Active-viewer session tracking.
//!
//! Purely observational: the registry maps each web client's address to the
//! last instant it polled status, and anything idle past the configured
//! window is pruned. The count feeds the "active users" field of the status
//! report and carries no control authority.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct SessionRegistry {
    idle_window: Duration,
    inner: Mutex<HashMap<IpAddr, Instant>>,
}

impl SessionRegistry {
    pub fn new(idle_window: Duration) -> Self {
        Self {
            idle_window,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Record a status poll from `addr` at `now`, drop every entry idle
    /// longer than the window, and return the resulting active count.
    pub fn touch_at(&self, addr: IpAddr, now: Instant) -> usize {
        let mut map = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        map.insert(addr, now);
        map.retain(|_, seen| now.duration_since(*seen) <= self.idle_window);
        map.len()
    }

    /// Record a status poll from `addr` now.
    pub fn touch(&self, addr: IpAddr) -> usize {
        self.touch_at(addr, Instant::now())
    }

    /// Number of clients seen within the idle window as of `now`.
    pub fn active_count_at(&self, now: Instant) -> usize {
        let mut map = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        map.retain(|_, seen| now.duration_since(*seen) <= self.idle_window);
        map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([192, 168, 1, last])
    }

    #[test]
    fn touch_counts_distinct_addresses() {
        let reg = SessionRegistry::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert_eq!(reg.touch_at(ip(1), t0), 1);
        assert_eq!(reg.touch_at(ip(2), t0), 2);
        // Re-touching the same address does not double-count.
        assert_eq!(reg.touch_at(ip(1), t0), 2);
    }

    #[test]
    fn idle_addresses_are_pruned() {
        let reg = SessionRegistry::new(Duration::from_secs(5));
        let t0 = Instant::now();
        reg.touch_at(ip(1), t0);
        reg.touch_at(ip(2), t0 + Duration::from_secs(3));

        // At t0+6s, ip(1) has been idle 6s (> 5s) and drops out; ip(2) stays.
        let count = reg.touch_at(ip(3), t0 + Duration::from_secs(6));
        assert_eq!(count, 2);
        assert_eq!(reg.active_count_at(t0 + Duration::from_secs(6)), 2);
    }

    #[test]
    fn boundary_idle_time_still_counts() {
        let reg = SessionRegistry::new(Duration::from_secs(5));
        let t0 = Instant::now();
        reg.touch_at(ip(1), t0);
        // Exactly at the window edge the entry is retained.
        assert_eq!(reg.active_count_at(t0 + Duration::from_secs(5)), 1);
    }
}
