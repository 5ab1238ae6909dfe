//! Process memory watchdog
//!
//! Building a tree over a hostile dump can outgrow the host. The watchdog
//! samples resident-set size from `/proc/self/statm` on a fixed interval
//! and, when the configured limit is exceeded, logs the fact and delivers
//! `SIGKILL` to its own process. There is no graceful path: partial state
//! is worthless and the kernel reclaims everything.

use std::thread;
use std::time::Duration;

use tracing::{debug, error};

/// Periodic RSS check with a hard kill on breach.
#[derive(Debug, Clone)]
pub struct MemoryWatchdog {
    limit_bytes: u64,
    interval: Duration,
}

impl MemoryWatchdog {
    /// Watchdog with `limit_mb` megabytes of resident set allowed, checked
    /// every `interval_secs` seconds.
    pub fn new(limit_mb: u64, interval_secs: u64) -> Self {
        Self {
            limit_bytes: limit_mb * 1024 * 1024,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    /// Spawn the sampling thread. The thread runs for the life of the
    /// process; the handle is detached.
    pub fn spawn(self) {
        thread::Builder::new()
            .name("mem-watchdog".to_string())
            .spawn(move || self.run())
            .expect("spawning watchdog thread");
    }

    fn run(self) {
        loop {
            thread::sleep(self.interval);
            match resident_set_bytes() {
                Ok(rss) => {
                    if rss > self.limit_bytes {
                        error!(
                            rss_mb = rss / (1024 * 1024),
                            limit_mb = self.limit_bytes / (1024 * 1024),
                            "memory limit exceeded, killing process"
                        );
                        // SAFETY: signalling our own pid.
                        unsafe {
                            libc::kill(libc::getpid(), libc::SIGKILL);
                        }
                    } else {
                        debug!(rss_mb = rss / (1024 * 1024), "memory check");
                    }
                }
                Err(err) => debug!(%err, "memory check unavailable"),
            }
        }
    }
}

/// Resident-set size of the current process in bytes, from the second
/// field of `/proc/self/statm` (pages).
fn resident_set_bytes() -> std::io::Result<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm")?;
    let resident_pages: u64 = statm
        .split_whitespace()
        .nth(1)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed statm")
        })?;

    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    let page_size = if page_size > 0 { page_size as u64 } else { 4096 };
    Ok(resident_pages * page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resident_set_is_nonzero() {
        // A running test process always has resident pages.
        let rss = resident_set_bytes().unwrap();
        assert!(rss > 0);
    }

    #[test]
    fn test_interval_floor() {
        let wd = MemoryWatchdog::new(1024, 0);
        assert_eq!(wd.interval, Duration::from_secs(1));
    }
}
