//! Planner output: what each CRS gets on each worker.

use crs_core::{CpuSet, format_memory};
use serde::{Serialize, Serializer};

/// Label appended to every CRS service name in the rendered manifest.
pub const RUNNER_SUFFIX: &str = "runner";

/// The cores and memory reserved for one CRS on one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub crs_name: String,
    pub cpuset: CpuSet,
    pub memory_limit_mb: u64,
    pub suffix: &'static str,
}

impl Allocation {
    pub fn runner(crs_name: &str, cpuset: CpuSet, memory_limit_mb: u64) -> Self {
        Self {
            crs_name: crs_name.to_string(),
            cpuset,
            memory_limit_mb,
            suffix: RUNNER_SUFFIX,
        }
    }

    /// Memory limit as a compose-ready string (`4G`, `1536M`).
    pub fn memory_limit(&self) -> String {
        format_memory(self.memory_limit_mb)
    }
}

#[derive(Serialize)]
struct RenderedAllocation<'a> {
    name: &'a str,
    cpuset: String,
    memory_limit: String,
    suffix: &'a str,
}

impl Serialize for Allocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RenderedAllocation {
            name: &self.crs_name,
            cpuset: self.cpuset.to_string(),
            memory_limit: self.memory_limit(),
            suffix: self.suffix,
        }
        .serialize(serializer)
    }
}

/// All allocations for a single worker, explicit claims first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerPlan {
    pub worker: String,
    pub allocations: Vec<Allocation>,
}

impl WorkerPlan {
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn allocation(&self, crs_name: &str) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.crs_name == crs_name)
    }

    pub fn memory_limit_total_mb(&self) -> u64 {
        self.allocations.iter().map(|a| a.memory_limit_mb).sum()
    }
}

/// The complete plan, one entry per configured worker in config order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AllocationPlan {
    pub workers: Vec<WorkerPlan>,
}

impl AllocationPlan {
    pub fn worker(&self, name: &str) -> Option<&WorkerPlan> {
        self.workers.iter().find(|w| w.worker == name)
    }

    pub fn total_allocations(&self) -> usize {
        self.workers.iter().map(|w| w.allocations.len()).sum()
    }
}
