//! CRS resource planner — per-worker cpuset and memory allocation.
//!
//! This crate decides how each worker's core pool and memory budget is
//! split between the CRS instances scheduled on it. It performs no I/O;
//! the CLI loads configuration and renders manifests from the plan.
//!
//! # Components
//!
//! - **`classify`** — Split a worker's CRS into explicit claims and auto requests
//! - **`validate`** — Bounds and overlap checks for explicit claims
//! - **`divide`** — Even division of the leftover pool across auto requests
//! - **`planner`** — Per-worker pipeline and whole-config plan

pub mod allocation;
pub mod classify;
pub mod divide;
pub mod error;
pub mod planner;
pub mod validate;

pub use allocation::{Allocation, AllocationPlan, RUNNER_SUFFIX, WorkerPlan};
pub use classify::{Classification, ExplicitClaim, classify};
pub use divide::{MIN_MEMORY_PER_CRS_MB, divide_remaining};
pub use error::{PlanError, PlanResult, Shortfall};
pub use planner::{MemoryPolicy, PlanOptions, compute_plan, plan_worker};
pub use validate::{Usage, Validated, validate_explicit};
