//! Typed view of the resource configuration.

use crate::cpuset::CpuSet;

/// Default cpuset when a worker or claim omits one.
pub const DEFAULT_CPUSET: &str = "0-3";
/// Default memory when a worker or claim omits one.
pub const DEFAULT_MEMORY: &str = "4G";

/// A host offering a fixed pool of cores and memory.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSpec {
    pub name: String,
    pub cpuset: CpuSet,
    pub memory_mb: u64,
}

/// Raw cpu/memory specs for a single explicit claim.
///
/// Kept as strings: claims are parsed (and rejected) by the planner so the
/// error can name the CRS and worker they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceClaim {
    pub cpuset: String,
    pub memory: String,
}

impl Default for ResourceClaim {
    fn default() -> Self {
        Self {
            cpuset: DEFAULT_CPUSET.to_string(),
            memory: DEFAULT_MEMORY.to_string(),
        }
    }
}

/// How a CRS asks for resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSpec {
    /// Separate claims keyed by worker name. Workers without an entry get
    /// an automatic share.
    PerWorker { claims: Vec<(String, ResourceClaim)> },
    /// One claim applied verbatim on every worker the CRS runs on.
    Global { claim: ResourceClaim },
    /// No claim at all: divide whatever is left.
    Absent,
}

impl ResourceSpec {
    /// The explicit claim for `worker`, if any.
    pub fn claim_for(&self, worker: &str) -> Option<&ResourceClaim> {
        match self {
            ResourceSpec::PerWorker { claims } => claims
                .iter()
                .find(|(name, _)| name == worker)
                .map(|(_, claim)| claim),
            ResourceSpec::Global { claim } => Some(claim),
            ResourceSpec::Absent => None,
        }
    }
}

/// A configured CRS instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CrsRequest {
    pub name: String,
    pub workers: Vec<String>,
    pub resources: ResourceSpec,
}

impl CrsRequest {
    pub fn runs_on(&self, worker: &str) -> bool {
        self.workers.iter().any(|w| w == worker)
    }
}
