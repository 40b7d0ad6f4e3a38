use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crsgrid_placement::{MemoryPolicy, PlanOptions};

mod commands;
mod manifest;

#[derive(Parser)]
#[command(
    name = "crs",
    about = "CRS resource planner — split worker cores and memory between CRS instances",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the per-worker allocation plan
    Plan {
        /// Directory containing config-resource.yaml
        #[arg(short, long)]
        config_dir: PathBuf,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
        /// Reject explicit claims that exceed a worker's memory budget
        #[arg(long)]
        strict_memory: bool,
    },
    /// Render compose-<worker>.yaml for every worker with CRS instances.
    ///
    /// The whole plan is computed before anything is written; if any
    /// worker fails validation no file is produced.
    Render {
        /// Directory containing config-resource.yaml, config-worker.yaml, config-crs.yaml
        #[arg(short, long)]
        config_dir: PathBuf,
        /// Directory to write compose-<worker>.yaml files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
        /// Environment file copied to <output-dir>/.env and referenced by every service
        #[arg(long)]
        env_file: Option<PathBuf>,
        /// Path to the CRS directory
        #[arg(long)]
        crs_path: PathBuf,
        /// Path to the OSS-Fuzz checkout mounted into every service
        #[arg(long, default_value = ".")]
        oss_fuzz_path: PathBuf,
        /// OSS-Fuzz project name
        #[arg(long)]
        project: String,
        /// Reject explicit claims that exceed a worker's memory budget
        #[arg(long)]
        strict_memory: bool,
        /// Fuzzer command and arguments run in each container (after `--`)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        fuzzer_command: Vec<String>,
    },
    /// Compare the configured worker pools with this host's cores and memory
    Check {
        #[arg(short, long)]
        config_dir: PathBuf,
        /// Minimum number of cores the host should offer
        #[arg(long, default_value = "16")]
        required_cpus: usize,
        /// Minimum host memory in GiB
        #[arg(long, default_value = "64")]
        required_memory_gb: u64,
    },
}

fn plan_options(strict_memory: bool) -> PlanOptions {
    PlanOptions {
        memory_policy: if strict_memory {
            MemoryPolicy::Strict
        } else {
            MemoryPolicy::Lenient
        },
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("crs=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan {
            config_dir,
            format,
            strict_memory,
        } => commands::plan::plan(&config_dir, &format, plan_options(strict_memory)),
        Commands::Render {
            config_dir,
            output_dir,
            env_file,
            crs_path,
            oss_fuzz_path,
            project,
            strict_memory,
            fuzzer_command,
        } => {
            let args = commands::render::RenderArgs {
                config_dir,
                output_dir,
                env_file,
                crs_path,
                oss_fuzz_path,
                project,
                fuzzer_command,
                options: plan_options(strict_memory),
            };
            commands::render::render(&args).map(|_| ())
        }
        Commands::Check {
            config_dir,
            required_cpus,
            required_memory_gb,
        } => commands::check::check(&config_dir, required_cpus, required_memory_gb),
    }
}
