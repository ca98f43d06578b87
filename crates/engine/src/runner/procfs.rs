// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-tree resource sampling (§4.5 step 4): RSS summed from `/proc`,
//! GPU memory summed from `nvidia-smi`. No syscalls, no `unsafe` — plain
//! file reads and a shelled-out query, the same posture the backend adapter
//! takes toward its scheduler's CLI rather than linking a client library.

use std::collections::HashMap;
use std::fs;

fn parse_ppid(stat: &str) -> Option<u32> {
    let close = stat.rfind(')')?;
    let rest = stat.get(close + 1..)?;
    let mut fields = rest.split_whitespace();
    fields.next()?; // state
    fields.next()?.parse().ok()
}

fn parse_vmrss_kb(status: &str) -> Option<u64> {
    for line in status.lines() {
        if let Some(rest) = line.strip_prefix("VmRSS:") {
            return rest.trim().split_whitespace().next()?.parse().ok();
        }
    }
    None
}

/// Every live pid whose ppid chain (direct or transitive) roots at `root`,
/// including `root` itself. Returns just `[root]` if `/proc` can't be read.
pub fn descendant_pids(root: u32) -> Vec<u32> {
    let mut parent_of: HashMap<u32, u32> = HashMap::new();
    let Ok(entries) = fs::read_dir("/proc") else {
        return vec![root];
    };
    for entry in entries.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let Ok(stat) = fs::read_to_string(entry.path().join("stat")) else {
            continue;
        };
        if let Some(ppid) = parse_ppid(&stat) {
            parent_of.insert(pid, ppid);
        }
    }

    let mut result = vec![root];
    let mut frontier = vec![root];
    while let Some(next) = frontier.pop() {
        for (&pid, &ppid) in &parent_of {
            if ppid == next && !result.contains(&pid) {
                result.push(pid);
                frontier.push(pid);
            }
        }
    }
    result
}

/// Sum of `VmRSS` (MB) across every pid in `pids`; pids that have already
/// exited are silently skipped.
pub fn sum_rss_mb(pids: &[u32]) -> f64 {
    let mut total_kb = 0u64;
    for &pid in pids {
        if let Ok(status) = fs::read_to_string(format!("/proc/{pid}/status")) {
            total_kb += parse_vmrss_kb(&status).unwrap_or(0);
        }
    }
    total_kb as f64 / 1024.0
}

fn parse_nvidia_smi(output: &str, pids: &[u32]) -> f64 {
    let mut total = 0.0;
    for line in output.lines() {
        let mut cols = line.split(',').map(str::trim);
        let Some(pid) = cols.next().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let Some(mib) = cols.next().and_then(|s| s.parse::<f64>().ok()) else {
            continue;
        };
        if pids.contains(&pid) {
            total += mib;
        }
    }
    total
}

/// GPU memory (MB) in use by `pids`, or `0.0` if `nvidia-smi` is unavailable
/// or reports nothing for them.
pub fn sum_gpu_mb(pids: &[u32]) -> f64 {
    let output = std::process::Command::new("nvidia-smi")
        .args(["--query-compute-apps=pid,used_memory", "--format=csv,noheader,nounits"])
        .output();
    match output {
        Ok(out) if out.status.success() => parse_nvidia_smi(&String::from_utf8_lossy(&out.stdout), pids),
        _ => 0.0,
    }
}
