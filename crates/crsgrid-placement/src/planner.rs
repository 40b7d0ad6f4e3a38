//! Planner — runs classify → validate → divide for every worker.
//!
//! Workers are planned in config order. Any error aborts the whole plan:
//! the caller either gets allocations for every worker or none at all.

use crs_core::{CrsRequest, ResourceConfig, WorkerSpec};
use tracing::{debug, info, warn};

use crate::allocation::{AllocationPlan, WorkerPlan};
use crate::classify::classify;
use crate::divide::divide_remaining;
use crate::error::{PlanError, PlanResult};
use crate::validate::validate_explicit;

/// How explicit claims are checked against a worker's memory budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemoryPolicy {
    /// Explicit claims may exceed the budget; the overcommit is only logged.
    /// Auto-division still enforces its own per-instance floor.
    #[default]
    Lenient,
    /// Explicit claims that exceed the budget are rejected.
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
    pub memory_policy: MemoryPolicy,
}

/// Plan a single worker. Explicit allocations come first, then auto ones,
/// each in config order.
pub fn plan_worker(
    worker: &WorkerSpec,
    requests: &[CrsRequest],
    options: &PlanOptions,
) -> PlanResult<WorkerPlan> {
    let classification = classify(&worker.name, requests);
    if classification.is_empty() {
        info!(worker = %worker.name, "no CRS instances configured for worker");
        return Ok(WorkerPlan {
            worker: worker.name.clone(),
            allocations: Vec::new(),
        });
    }

    let validated = validate_explicit(worker, &classification.explicit)?;

    if validated.usage.memory_mb > worker.memory_mb {
        match options.memory_policy {
            MemoryPolicy::Strict => {
                return Err(PlanError::MemoryOvercommit {
                    worker: worker.name.clone(),
                    claimed_mb: validated.usage.memory_mb,
                    budget_mb: worker.memory_mb,
                });
            }
            MemoryPolicy::Lenient => warn!(
                worker = %worker.name,
                claimed_mb = validated.usage.memory_mb,
                budget_mb = worker.memory_mb,
                "explicit claims exceed the worker memory budget"
            ),
        }
    }

    let auto = divide_remaining(worker, &validated.usage, &classification.auto)?;

    let mut allocations = validated.allocations;
    allocations.extend(auto);

    for alloc in &allocations {
        debug!(
            worker = %worker.name,
            crs = %alloc.crs_name,
            cpuset = %alloc.cpuset,
            memory = %alloc.memory_limit(),
            "planned allocation"
        );
    }
    info!(
        worker = %worker.name,
        explicit = classification.explicit.len(),
        auto = classification.auto.len(),
        "planned worker"
    );

    Ok(WorkerPlan {
        worker: worker.name.clone(),
        allocations,
    })
}

/// Plan every worker in `config`.
pub fn compute_plan(config: &ResourceConfig, options: &PlanOptions) -> PlanResult<AllocationPlan> {
    if config.workers.is_empty() {
        return Err(PlanError::Configuration(
            "no workers defined in resource config".to_string(),
        ));
    }

    for request in &config.crs {
        if request.workers.is_empty() {
            warn!(crs = %request.name, "CRS is not assigned to any worker");
        }
        for name in &request.workers {
            if config.worker(name).is_none() {
                warn!(crs = %request.name, worker = %name, "CRS references an undeclared worker");
            }
        }
    }

    let workers = config
        .workers
        .iter()
        .map(|worker| plan_worker(worker, &config.crs, options))
        .collect::<PlanResult<Vec<_>>>()?;

    Ok(AllocationPlan { workers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crs_core::{CpuSet, ResourceClaim, ResourceSpec};

    fn worker(name: &str, cpuset: &str, memory_mb: u64) -> WorkerSpec {
        WorkerSpec {
            name: name.to_string(),
            cpuset: CpuSet::parse(cpuset).unwrap(),
            memory_mb,
        }
    }

    fn global(name: &str, workers: &[&str], cpuset: &str, memory: &str) -> CrsRequest {
        CrsRequest {
            name: name.to_string(),
            workers: workers.iter().map(|w| w.to_string()).collect(),
            resources: ResourceSpec::Global {
                claim: ResourceClaim {
                    cpuset: cpuset.to_string(),
                    memory: memory.to_string(),
                },
            },
        }
    }

    fn auto(name: &str, workers: &[&str]) -> CrsRequest {
        CrsRequest {
            name: name.to_string(),
            workers: workers.iter().map(|w| w.to_string()).collect(),
            resources: ResourceSpec::Absent,
        }
    }

    #[test]
    fn explicit_before_auto() {
        let w = worker("w1", "0-7", 8192);
        let requests = vec![
            auto("first-auto", &["w1"]),
            global("pinned", &["w1"], "6-7", "2G"),
            auto("second-auto", &["w1"]),
        ];

        let plan = plan_worker(&w, &requests, &PlanOptions::default()).unwrap();
        let names: Vec<_> = plan.allocations.iter().map(|a| a.crs_name.as_str()).collect();
        assert_eq!(names, ["pinned", "first-auto", "second-auto"]);

        let cpusets: Vec<_> = plan.allocations.iter().map(|a| a.cpuset.to_string()).collect();
        assert_eq!(cpusets, ["6,7", "0,1,2", "3,4,5"]);
        assert_eq!(plan.memory_limit_total_mb(), 8192);
    }

    #[test]
    fn lenient_policy_allows_explicit_overcommit() {
        let w = worker("w1", "0-3", 1024);
        let requests = vec![global("big", &["w1"], "0-3", "4G")];

        let plan = plan_worker(&w, &requests, &PlanOptions::default()).unwrap();
        assert_eq!(plan.allocations[0].memory_limit(), "4G");
    }

    #[test]
    fn strict_policy_rejects_explicit_overcommit() {
        let w = worker("w1", "0-3", 1024);
        let requests = vec![global("big", &["w1"], "0-3", "4G")];
        let options = PlanOptions {
            memory_policy: MemoryPolicy::Strict,
        };

        let err = plan_worker(&w, &requests, &options).unwrap_err();
        assert!(matches!(
            err,
            PlanError::MemoryOvercommit {
                claimed_mb: 4096,
                budget_mb: 1024,
                ..
            }
        ));
    }

    #[test]
    fn overcommit_starves_auto_division() {
        let w = worker("w1", "0-7", 1024);
        let requests = vec![global("big", &["w1"], "0-3", "2G"), auto("small", &["w1"])];

        let err = plan_worker(&w, &requests, &PlanOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::InsufficientResources { .. }));
    }

    #[test]
    fn requires_workers() {
        let config = ResourceConfig::default();
        let err = compute_plan(&config, &PlanOptions::default()).unwrap_err();
        assert!(matches!(err, PlanError::Configuration(_)));
    }

    #[test]
    fn global_claim_repeats_on_every_worker() {
        let config = ResourceConfig {
            workers: vec![worker("w1", "0-3", 4096), worker("w2", "0-3", 4096)],
            crs: vec![global("everywhere", &["w1", "w2"], "0-1", "1G")],
        };

        let plan = compute_plan(&config, &PlanOptions::default()).unwrap();
        assert_eq!(plan.workers.len(), 2);
        for wp in &plan.workers {
            assert_eq!(wp.allocations[0].cpuset.to_string(), "0,1");
        }
    }
}
