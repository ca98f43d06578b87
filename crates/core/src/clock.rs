// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so schedulers and timeouts are deterministic under test.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time for anything that needs to compare timestamps
/// or sleep: the task scheduler's stuck-timeout check, the admission loop's
/// tick interval, and job liveness pings all go through this trait instead
/// of calling `SystemTime::now()` directly.
pub trait Clock: Send + Sync {
    /// Current time in whole milliseconds since the Unix epoch.
    fn now_ms(&self) -> u64;

    /// Block the calling thread for `ms` milliseconds.
    fn sleep_ms(&self, ms: u64);
}

/// Real wall-clock backed by the OS.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}

/// Deterministic clock for tests: `now_ms` returns a value the test controls,
/// and `sleep_ms` advances that value instead of blocking.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    now_ms: Arc<Mutex<u64>>,
}

impl FakeClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(Mutex::new(start_ms)),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        *self.now_ms.lock() += ms;
    }

    pub fn set_ms(&self, ms: u64) {
        *self.now_ms.lock() = ms;
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        *self.now_ms.lock()
    }

    fn sleep_ms(&self, ms: u64) {
        self.advance_ms(ms);
    }
}
