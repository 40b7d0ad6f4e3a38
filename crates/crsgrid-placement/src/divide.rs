//! Auto-division of whatever explicit claims left over.
//!
//! The remaining cores (ascending) and memory are split into `n` equal
//! chunks in config order. The last CRS absorbs the integer-division
//! remainder of both, so the union of all chunks is exactly the leftover
//! pool.

use crs_core::WorkerSpec;
use tracing::debug;

use crate::allocation::Allocation;
use crate::error::{PlanError, PlanResult, Shortfall};
use crate::validate::Usage;

/// Smallest memory slice an auto-divided CRS may receive.
pub const MIN_MEMORY_PER_CRS_MB: u64 = 512;

/// Divide the worker's unclaimed cores and memory across `auto`.
pub fn divide_remaining(
    worker: &WorkerSpec,
    usage: &Usage<'_>,
    auto: &[&str],
) -> PlanResult<Vec<Allocation>> {
    let count = auto.len();
    if count == 0 {
        return Ok(Vec::new());
    }

    let remaining_cores = worker.cpuset.difference(&usage.cores).to_vec();
    let remaining_memory = worker.memory_mb.saturating_sub(usage.memory_mb);

    if remaining_cores.len() < count {
        return Err(PlanError::InsufficientResources {
            worker: worker.name.clone(),
            shortfall: Shortfall::Cores {
                instances: count,
                available: remaining_cores.len(),
            },
        });
    }

    let required_memory = count as u64 * MIN_MEMORY_PER_CRS_MB;
    if remaining_memory < required_memory {
        return Err(PlanError::InsufficientResources {
            worker: worker.name.clone(),
            shortfall: Shortfall::Memory {
                instances: count,
                required_mb: required_memory,
                available_mb: remaining_memory,
            },
        });
    }

    let cores_per_crs = remaining_cores.len() / count;
    let memory_per_crs = remaining_memory / count as u64;
    let last = count - 1;

    let allocations = auto
        .iter()
        .enumerate()
        .map(|(idx, crs_name)| {
            let start = idx * cores_per_crs;
            let (end, memory_mb) = if idx == last {
                (
                    remaining_cores.len(),
                    remaining_memory - memory_per_crs * last as u64,
                )
            } else {
                (start + cores_per_crs, memory_per_crs)
            };

            let cpuset = remaining_cores[start..end].iter().copied().collect();
            Allocation::runner(crs_name, cpuset, memory_mb)
        })
        .collect::<Vec<_>>();

    debug!(
        worker = %worker.name,
        instances = count,
        cores_per_crs,
        memory_per_crs,
        "divided remaining resources"
    );

    Ok(allocations)
}
