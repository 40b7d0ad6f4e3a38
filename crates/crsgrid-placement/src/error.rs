//! Planner error types.

use std::fmt;

use crs_core::{CpuSet, ParseError};
use thiserror::Error;

/// Fatal planning errors. Any of these aborts the whole plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("crs '{crs}' on worker '{worker}': {source}")]
    Parse {
        crs: String,
        worker: String,
        #[source]
        source: ParseError,
    },

    #[error(
        "crs '{crs}' on worker '{worker}' uses cpus {cores} which are outside the worker's cpuset {worker_cpuset}"
    )]
    OutOfRange {
        crs: String,
        worker: String,
        cores: CpuSet,
        worker_cpuset: CpuSet,
    },

    #[error(
        "crs '{crs}' on worker '{worker}' conflicts with crs '{other}': cpus {cores} are already allocated"
    )]
    Conflict {
        crs: String,
        other: String,
        worker: String,
        cores: CpuSet,
    },

    #[error("not enough resources on worker '{worker}' for auto-division: {shortfall}")]
    InsufficientResources {
        worker: String,
        shortfall: Shortfall,
    },

    #[error(
        "explicit claims on worker '{worker}' total {claimed_mb}MB, over the worker budget of {budget_mb}MB"
    )]
    MemoryOvercommit {
        worker: String,
        claimed_mb: u64,
        budget_mb: u64,
    },
}

/// Which auto-division floor was not met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortfall {
    Cores { instances: usize, available: usize },
    Memory {
        instances: usize,
        required_mb: u64,
        available_mb: u64,
    },
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortfall::Cores {
                instances,
                available,
            } => write!(
                f,
                "need at least {instances} cores for {instances} CRS instances, \
                 but only {available} remain after explicit allocations"
            ),
            Shortfall::Memory {
                instances,
                required_mb,
                available_mb,
            } => write!(
                f,
                "only {available_mb}MB remain for {instances} CRS instances \
                 ({required_mb}MB required at the per-instance minimum)"
            ),
        }
    }
}

pub type PlanResult<T> = Result<T, PlanError>;
