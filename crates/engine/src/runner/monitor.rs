// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rolling resource-usage tracker for one supervised job (§4.5 step 4).
//! Pure logic, polled once per supervise tick with a fresh RSS/GPU reading;
//! holds no I/O of its own.

/// Result of folding one usage reading into the monitor's running state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOutcome {
    pub healthy: bool,
    pub peak_sys_memory_mb: f64,
    pub peak_gpu_memory_mb: f64,
    /// Set when the dynamic-growth path decided the reservation should grow
    /// instead of failing the job (§4.5 step 4, SPEC_FULL §10.5).
    pub grow_sys_memory_mb: Option<f64>,
    pub grow_gpu_memory_mb: Option<f64>,
}

/// Tracks peak/rolling memory use against a job's reservation and decides
/// whether it's still within budget, optionally extrapolating a linear
/// growth trend instead of failing outright.
pub struct ResourceMonitor {
    growth_pct: f64,
    dynamic_growth: bool,
    extrapolation_window_secs: f64,
    peak_sys_memory_mb: f64,
    peak_gpu_memory_mb: f64,
    sample_count: u64,
    avg_sys_memory_mb: f64,
    avg_gpu_memory_mb: f64,
    last_sample: Option<(u64, f64, f64)>,
}

impl ResourceMonitor {
    pub fn new(growth_pct: f64, dynamic_growth: bool, extrapolation_window_secs: f64) -> Self {
        Self {
            growth_pct,
            dynamic_growth,
            extrapolation_window_secs,
            peak_sys_memory_mb: 0.0,
            peak_gpu_memory_mb: 0.0,
            sample_count: 0,
            avg_sys_memory_mb: 0.0,
            avg_gpu_memory_mb: 0.0,
            last_sample: None,
        }
    }

    pub fn average_sys_memory_mb(&self) -> f64 {
        self.avg_sys_memory_mb
    }

    pub fn average_gpu_memory_mb(&self) -> f64 {
        self.avg_gpu_memory_mb
    }

    /// Fold one poll's reading in. `reserved_*_mb` of `0.0` means "no
    /// reservation configured for this device," which never trips a breach.
    pub fn sample(
        &mut self,
        now_ms: u64,
        sys_memory_mb: f64,
        gpu_memory_mb: f64,
        reserved_sys_memory_mb: f64,
        reserved_gpu_memory_mb: f64,
    ) -> SampleOutcome {
        self.peak_sys_memory_mb = self.peak_sys_memory_mb.max(sys_memory_mb);
        self.peak_gpu_memory_mb = self.peak_gpu_memory_mb.max(gpu_memory_mb);
        self.sample_count += 1;
        let n = self.sample_count as f64;
        self.avg_sys_memory_mb += (sys_memory_mb - self.avg_sys_memory_mb) / n;
        self.avg_gpu_memory_mb += (gpu_memory_mb - self.avg_gpu_memory_mb) / n;

        let prev = self.last_sample.replace((now_ms, sys_memory_mb, gpu_memory_mb));

        // The first reading only establishes a baseline; there's no trend
        // yet to judge a breach against (mirrors the Python original, which
        // returns healthy unconditionally on its first call).
        let Some((prev_ms, prev_sys, prev_gpu)) = prev else {
            return SampleOutcome {
                healthy: true,
                peak_sys_memory_mb: self.peak_sys_memory_mb,
                peak_gpu_memory_mb: self.peak_gpu_memory_mb,
                grow_sys_memory_mb: None,
                grow_gpu_memory_mb: None,
            };
        };

        let mut over_sys = reserved_sys_memory_mb > 0.0
            && self.peak_sys_memory_mb > reserved_sys_memory_mb * self.growth_pct;
        let mut over_gpu = reserved_gpu_memory_mb > 0.0
            && self.peak_gpu_memory_mb > reserved_gpu_memory_mb * self.growth_pct;

        let mut grow_sys_memory_mb = None;
        let mut grow_gpu_memory_mb = None;

        if (over_sys || over_gpu) && self.dynamic_growth {
            let delta_t = ((now_ms.saturating_sub(prev_ms)) as f64 / 1000.0).max(f64::EPSILON);
            let rate = self.extrapolation_window_secs / delta_t;

            if over_sys {
                let predicted = (sys_memory_mb - prev_sys) * rate + prev_sys;
                let delta = predicted - reserved_sys_memory_mb;
                if delta < 0.0 {
                    over_sys = false;
                } else {
                    grow_sys_memory_mb = Some(delta);
                }
            }
            if over_gpu {
                let predicted = (gpu_memory_mb - prev_gpu) * rate + prev_gpu;
                let delta = predicted - reserved_gpu_memory_mb;
                if delta < 0.0 {
                    over_gpu = false;
                } else {
                    grow_gpu_memory_mb = Some(delta);
                }
            }
        }

        SampleOutcome {
            healthy: !(over_sys || over_gpu),
            peak_sys_memory_mb: self.peak_sys_memory_mb,
            peak_gpu_memory_mb: self.peak_gpu_memory_mb,
            grow_sys_memory_mb,
            grow_gpu_memory_mb,
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
