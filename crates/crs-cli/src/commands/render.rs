//! `crs render` — plan every worker, then write one compose file per worker.
//!
//! Nothing touches the output directory until the full plan and every
//! manifest have been produced, so a bad config never leaves half a set of
//! compose files behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use askama::Template;
use crs_core::ConfigDir;
use crsgrid_placement::{PlanOptions, compute_plan};
use tracing::info;

use crate::manifest::{ComposeTemplate, ManifestContext};

pub struct RenderArgs {
    pub config_dir: PathBuf,
    pub output_dir: PathBuf,
    pub env_file: Option<PathBuf>,
    pub crs_path: PathBuf,
    pub oss_fuzz_path: PathBuf,
    pub project: String,
    pub fuzzer_command: Vec<String>,
    pub options: PlanOptions,
}

/// What a successful render produced.
#[derive(Debug)]
pub struct RenderSummary {
    pub workers_processed: usize,
    pub total_crs: usize,
    pub written: Vec<PathBuf>,
}

pub fn render(args: &RenderArgs) -> Result<RenderSummary> {
    if args.fuzzer_command.is_empty() {
        bail!("fuzzer command is required");
    }

    println!("Loading configuration from: {}", args.config_dir.display());
    let config = ConfigDir::load(&args.config_dir)
        .with_context(|| format!("loading configuration from {}", args.config_dir.display()))?;
    let plan = compute_plan(&config.resources, &args.options)?;

    let env_file = match &args.env_file {
        Some(path) if !path.is_file() => bail!("environment file not found: {}", path.display()),
        Some(path) => Some(absolute(path)?),
        None => None,
    };

    let ctx = ManifestContext {
        project: args.project.clone(),
        crs_path: absolute(&args.crs_path)?.display().to_string(),
        oss_fuzz_path: absolute(&args.oss_fuzz_path)?.display().to_string(),
        config_dir: absolute(&config.root)?.display().to_string(),
        config_resource_file: config
            .resource_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        fuzzer_command: ManifestContext::fuzzer_command_json(&args.fuzzer_command)?,
        has_env_file: env_file.is_some(),
    };

    let mut manifests = Vec::new();
    for wp in &plan.workers {
        println!("\nProcessing worker: {}", wp.worker);
        if wp.is_empty() {
            println!("  No CRS instances configured for worker '{}', skipping...", wp.worker);
            continue;
        }

        println!("  Found {} CRS instance(s):", wp.allocations.len());
        for alloc in &wp.allocations {
            println!(
                "    - {}: CPUs={}, Memory={}",
                alloc.crs_name,
                alloc.cpuset,
                alloc.memory_limit()
            );
        }

        let rendered = ComposeTemplate::new(wp, &ctx)
            .map_err(anyhow::Error::from)
            .and_then(|template| Ok(template.render()?))
            .with_context(|| format!("rendering compose file for worker {}", wp.worker))?;
        let output = args.output_dir.join(format!("compose-{}.yaml", wp.worker));
        manifests.push((output, rendered));
    }

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    if let Some(env_file) = &env_file {
        let dest = args.output_dir.join(".env");
        std::fs::copy(env_file, &dest)
            .with_context(|| format!("copying {} to {}", env_file.display(), dest.display()))?;
        println!("Copied environment file to: {}", dest.display());
    }

    let mut written = Vec::with_capacity(manifests.len());
    for (path, content) in manifests {
        std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        println!("  Written: {}", path.display());
        written.push(path);
    }

    let summary = RenderSummary {
        workers_processed: plan.workers.len(),
        total_crs: plan.total_allocations(),
        written,
    };

    println!("\nSummary:");
    println!("  Workers processed: {}", summary.workers_processed);
    println!("  Total CRS instances: {}", summary.total_crs);
    println!("  Output directory: {}", args.output_dir.display());
    info!(
        workers = summary.workers_processed,
        crs = summary.total_crs,
        files = summary.written.len(),
        "render complete"
    );

    Ok(summary)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("resolving {}", path.display()))
}
