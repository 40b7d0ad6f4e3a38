//! `crs check` — sanity-check worker pools against the local host.
//!
//! Findings are warnings only. A worker pool is usually describing some
//! other machine, so nothing here fails the command.

use std::path::Path;

use anyhow::Context;
use crs_core::{ConfigDir, ResourceConfig, format_memory};
use tracing::warn;

/// Cores and memory visible on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostResources {
    pub cpu_count: usize,
    pub memory_mb: u64,
}

impl HostResources {
    pub fn measure() -> Self {
        let cpu_count = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1);
        let memory_mb = std::fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|content| parse_meminfo_total_mb(&content))
            .unwrap_or(0);

        Self {
            cpu_count,
            memory_mb,
        }
    }
}

fn parse_meminfo_total_mb(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        if parts.next()? != "MemTotal:" {
            return None;
        }
        let kb: u64 = parts.next()?.parse().ok()?;
        Some(kb / 1024)
    })
}

/// Compare host capacity with the minimums and with every worker pool.
pub fn findings(
    host: HostResources,
    config: &ResourceConfig,
    required_cpus: usize,
    required_memory_mb: u64,
) -> Vec<String> {
    let mut out = Vec::new();

    if host.cpu_count < required_cpus {
        out.push(format!(
            "host has {} cores, fewer than the required {required_cpus}",
            host.cpu_count
        ));
    }
    if host.memory_mb == 0 {
        out.push("host memory could not be determined".to_string());
    } else if host.memory_mb < required_memory_mb {
        out.push(format!(
            "host has {} of memory, less than the required {}",
            format_memory(host.memory_mb),
            format_memory(required_memory_mb)
        ));
    }

    for worker in &config.workers {
        if let Some(max) = worker.cpuset.max().filter(|&m| m as usize >= host.cpu_count) {
            out.push(format!(
                "worker '{}' uses core {max} but this host only has cores 0-{}",
                worker.name,
                host.cpu_count.saturating_sub(1)
            ));
        }
        if host.memory_mb > 0 && worker.memory_mb > host.memory_mb {
            out.push(format!(
                "worker '{}' declares {} of memory but this host has {}",
                worker.name,
                format_memory(worker.memory_mb),
                format_memory(host.memory_mb)
            ));
        }
    }

    out
}

pub fn check(
    config_dir: &Path,
    required_cpus: usize,
    required_memory_gb: u64,
) -> anyhow::Result<()> {
    let config = ConfigDir::load(config_dir)
        .with_context(|| format!("loading configuration from {}", config_dir.display()))?;
    let host = HostResources::measure();

    println!(
        "Host: {} cores, {} memory",
        host.cpu_count,
        format_memory(host.memory_mb)
    );

    let found = findings(
        host,
        &config.resources,
        required_cpus,
        required_memory_gb.saturating_mul(1024),
    );
    if found.is_empty() {
        println!("✓ Host satisfies every configured worker");
        return Ok(());
    }

    for finding in &found {
        warn!("{finding}");
        println!("⚠️  {finding}");
    }
    println!(
        "Adjust {} if these workers are meant to run on this machine.",
        config.resource_path.display()
    );
    Ok(())
}
