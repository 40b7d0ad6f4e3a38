//! Resource configuration loading.
//!
//! The resource file (`config-resource.yaml`, or its TOML twin) declares the
//! worker pools and which CRS instances run where:
//!
//! ```yaml
//! workers:
//!   worker-a: { cpuset: "0-7", memory: "16G" }
//! crs:
//!   libfuzzer:
//!     workers: [worker-a]
//!     resources:
//!       worker-a: { cpuset: "0-3", memory: "8G" }
//!   aflpp:
//!     workers: [worker-a]
//! ```
//!
//! Map order is significant (it decides processing order and tie-breaks),
//! so every mapping is read through [`OrderedMap`].

use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use crate::cpuset::CpuSet;
use crate::error::ConfigError;
use crate::memory::parse_memory_mb;
use crate::types::{
    CrsRequest, DEFAULT_CPUSET, DEFAULT_MEMORY, ResourceClaim, ResourceSpec, WorkerSpec,
};

pub const RESOURCE_FILE: &str = "config-resource.yaml";
pub const RESOURCE_FILE_TOML: &str = "config-resource.toml";
pub const WORKER_FILE: &str = "config-worker.yaml";
pub const CRS_FILE: &str = "config-crs.yaml";

/// A string-keyed map that keeps document order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        OrderedMap(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
    type Value = OrderedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(OrderedMap::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, V)> = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(serde::de::Error::custom(format!("duplicate key '{key}'")));
            }
            entries.push((key, value));
        }
        Ok(OrderedMap(entries))
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// A spec value written either as a string or a bare number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(u64),
    Text(String),
}

impl Scalar {
    fn into_spec(self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWorker {
    pub cpuset: Option<Scalar>,
    pub memory: Option<Scalar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawClaim {
    pub cpuset: Option<Scalar>,
    pub memory: Option<Scalar>,
}

impl RawClaim {
    fn into_claim(self) -> ResourceClaim {
        ResourceClaim {
            cpuset: self.cpuset.map_or_else(|| DEFAULT_CPUSET.to_string(), Scalar::into_spec),
            memory: self.memory.map_or_else(|| DEFAULT_MEMORY.to_string(), Scalar::into_spec),
        }
    }
}

/// A single entry under `resources:`, either a global field or a worker block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawResourceEntry {
    Field(Scalar),
    Worker(RawClaim),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCrs {
    #[serde(default)]
    pub workers: Vec<String>,
    #[serde(default)]
    pub resources: Option<OrderedMap<Option<RawResourceEntry>>>,
}

/// The resource file exactly as written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResourceConfig {
    #[serde(default)]
    pub workers: OrderedMap<Option<RawWorker>>,
    #[serde(default)]
    pub crs: OrderedMap<Option<RawCrs>>,
}

/// Validated configuration: parsed worker pools and shaped CRS requests,
/// both in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceConfig {
    pub workers: Vec<WorkerSpec>,
    pub crs: Vec<CrsRequest>,
}

impl ResourceConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawResourceConfig = serde_yaml::from_str(content)?;
        Self::from_raw(raw)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawResourceConfig = toml::from_str(content)?;
        Self::from_raw(raw)
    }

    /// Load a resource file, choosing the format from its extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    pub fn from_raw(raw: RawResourceConfig) -> Result<Self, ConfigError> {
        let workers = raw
            .workers
            .into_iter()
            .map(|(name, worker)| build_worker(name, worker.unwrap_or_default()))
            .collect::<Result<Vec<_>, _>>()?;

        let crs = raw
            .crs
            .into_iter()
            .map(|(name, crs)| build_crs(name, crs.unwrap_or_default()))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(workers = workers.len(), crs = crs.len(), "loaded resource config");
        Ok(ResourceConfig { workers, crs })
    }

    pub fn worker(&self, name: &str) -> Option<&WorkerSpec> {
        self.workers.iter().find(|w| w.name == name)
    }
}

/// Worker and CRS names end up in compose service names and file names.
fn check_name(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

fn build_worker(name: String, raw: RawWorker) -> Result<WorkerSpec, ConfigError> {
    check_name("worker", &name)?;
    let cpuset_spec = raw.cpuset.map_or_else(|| DEFAULT_CPUSET.to_string(), Scalar::into_spec);
    let memory_spec = raw.memory.map_or_else(|| DEFAULT_MEMORY.to_string(), Scalar::into_spec);

    let cpuset = CpuSet::parse(&cpuset_spec).map_err(|source| ConfigError::Worker {
        worker: name.clone(),
        source,
    })?;
    let memory_mb = parse_memory_mb(&memory_spec).map_err(|source| ConfigError::Worker {
        worker: name.clone(),
        source,
    })?;

    Ok(WorkerSpec {
        name,
        cpuset,
        memory_mb,
    })
}

fn build_crs(name: String, raw: RawCrs) -> Result<CrsRequest, ConfigError> {
    check_name("crs", &name)?;
    let resources = shape_resources(&name, raw.resources)?;
    Ok(CrsRequest {
        name,
        workers: raw.workers,
        resources,
    })
}

const GLOBAL_FIELDS: [&str; 2] = ["cpuset", "memory"];

/// Decide the shape of a `resources` block. Only a `cpuset` key makes the
/// block global; a lone `memory` carries no claim and is ignored.
fn shape_resources(
    crs: &str,
    resources: Option<OrderedMap<Option<RawResourceEntry>>>,
) -> Result<ResourceSpec, ConfigError> {
    let Some(resources) = resources.filter(|r| !r.is_empty()) else {
        return Ok(ResourceSpec::Absent);
    };

    let has_cpuset = resources.keys().any(|k| k == "cpuset");
    let has_workers = resources.keys().any(|k| !GLOBAL_FIELDS.contains(&k));
    let invalid = |reason: String| ConfigError::Crs {
        crs: crs.to_string(),
        reason,
    };

    if has_cpuset && has_workers {
        return Err(invalid(
            "resources mixes a global cpuset with per-worker entries; \
             per-worker entries never override a global claim, use one form"
                .to_string(),
        ));
    }

    if has_cpuset {
        let mut claim = RawClaim::default();
        for (key, entry) in resources {
            let value = match entry {
                Some(RawResourceEntry::Field(value)) => Some(value),
                None => None,
                Some(RawResourceEntry::Worker(_)) => {
                    return Err(invalid(format!("resources.{key} must be a string")));
                }
            };
            if key == "cpuset" {
                claim.cpuset = value;
            } else {
                claim.memory = value;
            }
        }
        return Ok(ResourceSpec::Global {
            claim: claim.into_claim(),
        });
    }

    let mut claims = Vec::with_capacity(resources.len());
    for (worker, entry) in resources {
        if GLOBAL_FIELDS.contains(&worker.as_str()) {
            warn!(crs, field = %worker, "ignoring global field without a cpuset");
            continue;
        }
        let claim = match entry {
            Some(RawResourceEntry::Worker(claim)) => claim,
            None => RawClaim::default(),
            Some(RawResourceEntry::Field(_)) => {
                return Err(invalid(format!("resources.{worker} must be a mapping")));
            }
        };
        claims.push((worker, claim.into_claim()));
    }

    if claims.is_empty() {
        return Ok(ResourceSpec::Absent);
    }
    Ok(ResourceSpec::PerWorker { claims })
}

/// A configuration directory as consumed by the renderer.
#[derive(Debug, Clone)]
pub struct ConfigDir {
    pub root: PathBuf,
    pub resource_path: PathBuf,
    pub worker_path: Option<PathBuf>,
    pub crs_path: Option<PathBuf>,
    pub resources: ResourceConfig,
}

impl ConfigDir {
    /// Load `config-resource.yaml` (or `.toml`) and note which optional
    /// companion files are present.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let yaml = dir.join(RESOURCE_FILE);
        let toml = dir.join(RESOURCE_FILE_TOML);
        let resource_path = if yaml.is_file() {
            yaml
        } else if toml.is_file() {
            toml
        } else {
            return Err(ConfigError::MissingFile(yaml));
        };

        let resources = ResourceConfig::from_file(&resource_path)?;
        let optional = |file: &str| Some(dir.join(file)).filter(|p| p.is_file());

        Ok(ConfigDir {
            root: dir.to_path_buf(),
            resource_path,
            worker_path: optional(WORKER_FILE),
            crs_path: optional(CRS_FILE),
            resources,
        })
    }
}
