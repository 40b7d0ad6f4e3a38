//! Compose manifest rendering.
//!
//! The template receives pre-formatted strings only; every cpuset and
//! memory value is already rendered by the planner.

use askama::Template;
use crsgrid_placement::WorkerPlan;

/// Values shared by every worker's manifest.
pub struct ManifestContext {
    pub project: String,
    pub crs_path: String,
    pub oss_fuzz_path: String,
    pub config_dir: String,
    pub config_resource_file: String,
    /// Fuzzer command as a JSON array, which YAML reads as a flow sequence.
    pub fuzzer_command: String,
    pub has_env_file: bool,
}

impl ManifestContext {
    pub fn fuzzer_command_json(command: &[String]) -> serde_json::Result<String> {
        serde_json::to_string(command)
    }
}

pub struct ComposeRunner {
    pub service: String,
    pub image: String,
    pub crs_name: String,
    pub cpuset: String,
    pub memory_limit: String,
}

/// A string as a double-quoted YAML scalar. JSON string syntax is a subset
/// of YAML's double-quoted style.
fn quoted(value: &str) -> serde_json::Result<String> {
    serde_json::to_string(value)
}

#[derive(Template)]
#[template(path = "compose.yaml", escape = "none")]
pub struct ComposeTemplate<'a> {
    pub worker_name: &'a str,
    pub compose_name: String,
    pub worker_value: String,
    pub project: String,
    pub config_resource_path: String,
    pub volumes: Vec<String>,
    pub runners: Vec<ComposeRunner>,
    pub ctx: &'a ManifestContext,
}

impl<'a> ComposeTemplate<'a> {
    pub fn new(plan: &'a WorkerPlan, ctx: &'a ManifestContext) -> serde_json::Result<Self> {
        let runners = plan
            .allocations
            .iter()
            .map(|alloc| {
                Ok(ComposeRunner {
                    service: quoted(&format!("{}-{}", alloc.crs_name, alloc.suffix))?,
                    image: quoted(&format!("crs-{}:latest", alloc.crs_name))?,
                    crs_name: quoted(&alloc.crs_name)?,
                    cpuset: quoted(&alloc.cpuset.to_string())?,
                    memory_limit: alloc.memory_limit(),
                })
            })
            .collect::<serde_json::Result<Vec<_>>>()?;

        let volumes = [
            format!("{}:/oss-fuzz", ctx.oss_fuzz_path),
            format!("{}:/crs:ro", ctx.crs_path),
            format!("{}:/config:ro", ctx.config_dir),
        ]
        .iter()
        .map(|v| quoted(v))
        .collect::<serde_json::Result<Vec<_>>>()?;

        Ok(Self {
            worker_name: &plan.worker,
            compose_name: quoted(&format!("crs-{}", plan.worker))?,
            worker_value: quoted(&plan.worker)?,
            project: quoted(&ctx.project)?,
            config_resource_path: quoted(&format!("/config/{}", ctx.config_resource_file))?,
            volumes,
            runners,
            ctx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crs_core::CpuSet;
    use crsgrid_placement::Allocation;

    fn context(has_env_file: bool) -> ManifestContext {
        ManifestContext {
            project: "libxml2".to_string(),
            crs_path: "/srv/crs".to_string(),
            oss_fuzz_path: "/srv/oss-fuzz".to_string(),
            config_dir: "/srv/config".to_string(),
            config_resource_file: "config-resource.yaml".to_string(),
            fuzzer_command: ManifestContext::fuzzer_command_json(&[
                "run_fuzzer".to_string(),
                "--jobs=4".to_string(),
                "xml \"read\"".to_string(),
            ])
            .unwrap(),
            has_env_file,
        }
    }

    fn worker_plan() -> WorkerPlan {
        WorkerPlan {
            worker: "worker-a".to_string(),
            allocations: vec![
                Allocation::runner("libfuzzer", CpuSet::parse("0-3").unwrap(), 8192),
                Allocation::runner("aflpp", CpuSet::parse("4-5").unwrap(), 1536),
            ],
        }
    }

    #[test]
    fn renders_valid_compose_yaml() {
        let ctx = context(false);
        let plan = worker_plan();
        let rendered = ComposeTemplate::new(&plan, &ctx).unwrap().render().unwrap();

        let doc: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(doc["name"].as_str(), Some("crs-worker-a"));

        let services = doc["services"].as_mapping().unwrap();
        let names: Vec<_> = services.keys().filter_map(|k| k.as_str()).collect();
        assert_eq!(names, ["libfuzzer-runner", "aflpp-runner"]);

        let lf = &doc["services"]["libfuzzer-runner"];
        assert_eq!(lf["cpuset"].as_str(), Some("0,1,2,3"));
        assert_eq!(lf["mem_limit"].as_str(), Some("8G"));
        assert_eq!(lf["environment"]["PROJECT"].as_str(), Some("libxml2"));
        assert!(lf.get("env_file").is_none());

        let command: Vec<_> = lf["command"]
            .as_sequence()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(command, ["run_fuzzer", "--jobs=4", "xml \"read\""]);

        assert_eq!(doc["services"]["aflpp-runner"]["mem_limit"].as_str(), Some("1536M"));
    }

    #[test]
    fn quotes_free_form_values() {
        let mut ctx = context(false);
        ctx.project = "lib: \"png\" # main".to_string();
        ctx.crs_path = "/srv/my crs: v2".to_string();
        let plan = worker_plan();
        let rendered = ComposeTemplate::new(&plan, &ctx).unwrap().render().unwrap();

        let doc: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
        let lf = &doc["services"]["libfuzzer-runner"];
        assert_eq!(lf["environment"]["PROJECT"].as_str(), Some("lib: \"png\" # main"));
        assert_eq!(lf["volumes"][1].as_str(), Some("/srv/my crs: v2:/crs:ro"));
        assert_eq!(lf["environment"]["WORKER_NAME"].as_str(), Some("worker-a"));
    }

    #[test]
    fn references_env_file_when_present() {
        let ctx = context(true);
        let plan = worker_plan();
        let rendered = ComposeTemplate::new(&plan, &ctx).unwrap().render().unwrap();

        let doc: serde_yaml::Value = serde_yaml::from_str(&rendered).unwrap();
        let env_file = &doc["services"]["aflpp-runner"]["env_file"];
        assert_eq!(env_file[0].as_str(), Some(".env"));
    }
}
