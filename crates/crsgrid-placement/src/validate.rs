//! Explicit claim validation.
//!
//! Claims are checked in config order and folded into a [`Usage`]
//! accumulator. Every claim must stay inside the worker's cpuset and must
//! not overlap a claim accepted before it; the first violation aborts.

use std::collections::BTreeMap;

use crs_core::{CpuSet, WorkerSpec, parse_memory_mb};
use tracing::debug;

use crate::allocation::Allocation;
use crate::classify::ExplicitClaim;
use crate::error::{PlanError, PlanResult};

/// Cores and memory already handed out on one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Usage<'a> {
    pub cores: CpuSet,
    pub memory_mb: u64,
    owners: BTreeMap<u32, &'a str>,
}

impl<'a> Usage<'a> {
    /// The CRS that claimed `core`, if any.
    pub fn owner(&self, core: u32) -> Option<&'a str> {
        self.owners.get(&core).copied()
    }

    fn claim(&mut self, crs_name: &'a str, cores: &CpuSet, memory_mb: u64) {
        self.cores.extend_from(cores);
        self.owners.extend(cores.iter().map(|core| (core, crs_name)));
        self.memory_mb = self.memory_mb.saturating_add(memory_mb);
    }
}

/// Result of validating a worker's explicit claims.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validated<'a> {
    pub allocations: Vec<Allocation>,
    pub usage: Usage<'a>,
}

/// Validate explicit claims against `worker` and turn them into allocations.
pub fn validate_explicit<'a>(
    worker: &WorkerSpec,
    explicit: &[ExplicitClaim<'a>],
) -> PlanResult<Validated<'a>> {
    explicit
        .iter()
        .try_fold(Validated::default(), |mut acc, claim| {
            let parse_err = |source| PlanError::Parse {
                crs: claim.crs_name.to_string(),
                worker: worker.name.clone(),
                source,
            };
            let cores = CpuSet::parse(claim.cpuset).map_err(parse_err)?;
            let memory_mb = parse_memory_mb(claim.memory).map_err(parse_err)?;

            if !cores.is_subset(&worker.cpuset) {
                return Err(PlanError::OutOfRange {
                    crs: claim.crs_name.to_string(),
                    worker: worker.name.clone(),
                    cores: cores.difference(&worker.cpuset),
                    worker_cpuset: worker.cpuset.clone(),
                });
            }

            let overlap = cores.intersection(&acc.usage.cores);
            let first_overlap = overlap.iter().next();
            if let Some(core) = first_overlap {
                let other = acc.usage.owner(core).unwrap_or_default();
                return Err(PlanError::Conflict {
                    crs: claim.crs_name.to_string(),
                    other: other.to_string(),
                    worker: worker.name.clone(),
                    cores: overlap,
                });
            }

            debug!(
                worker = %worker.name,
                crs = claim.crs_name,
                cpuset = %cores,
                memory_mb,
                "accepted explicit claim"
            );
            acc.usage.claim(claim.crs_name, &cores, memory_mb);
            acc.allocations
                .push(Allocation::runner(claim.crs_name, cores, memory_mb));
            Ok(acc)
        })
}
