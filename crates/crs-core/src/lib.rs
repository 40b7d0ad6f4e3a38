//! Core types for the CRS resource planner.
//!
//! - **`cpuset`** — core-id set parsing and formatting (`0-3,8,12-15`)
//! - **`memory`** — memory size parsing and formatting (`4G`, `512M`)
//! - **`types`** — workers, CRS requests and their resource claims
//! - **`config`** — configuration directory loading (YAML or TOML)

pub mod config;
pub mod cpuset;
pub mod error;
pub mod memory;
pub mod types;

pub use config::{ConfigDir, OrderedMap, ResourceConfig};
pub use cpuset::CpuSet;
pub use error::{ConfigError, ParseError};
pub use memory::{format_memory, parse_memory_mb};
pub use types::*;
