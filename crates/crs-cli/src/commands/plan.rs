use std::path::Path;

use anyhow::Context;
use crs_core::ConfigDir;
use crsgrid_placement::{AllocationPlan, PlanOptions, compute_plan};

pub fn plan(config_dir: &Path, format: &str, options: PlanOptions) -> anyhow::Result<()> {
    let config = ConfigDir::load(config_dir)
        .with_context(|| format!("loading configuration from {}", config_dir.display()))?;
    let plan = compute_plan(&config.resources, &options)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        _ => {
            print!("{}", format_plan(&plan));
        }
    }

    Ok(())
}

/// Human-readable plan, one block per worker.
pub fn format_plan(plan: &AllocationPlan) -> String {
    let mut out = String::new();
    for wp in &plan.workers {
        out.push_str(&format!("worker {}\n", wp.worker));
        if wp.is_empty() {
            out.push_str("  (no CRS instances)\n");
            continue;
        }
        for alloc in &wp.allocations {
            out.push_str(&format!(
                "  - {}: CPUs={}, Memory={}\n",
                alloc.crs_name,
                alloc.cpuset,
                alloc.memory_limit()
            ));
        }
    }
    out
}
