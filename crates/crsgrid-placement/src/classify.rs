//! Sort a worker's CRS instances into explicit claims and auto requests.

use crs_core::CrsRequest;

/// An explicit cpu/memory claim, still in spec form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplicitClaim<'a> {
    pub crs_name: &'a str,
    pub cpuset: &'a str,
    pub memory: &'a str,
}

/// CRS instances eligible for one worker, in config order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification<'a> {
    pub explicit: Vec<ExplicitClaim<'a>>,
    pub auto: Vec<&'a str>,
}

impl Classification<'_> {
    pub fn is_empty(&self) -> bool {
        self.explicit.is_empty() && self.auto.is_empty()
    }
}

/// Classify every request that may run on `worker`.
///
/// A per-worker entry for this worker wins; a global claim applies as-is;
/// anything else (no resources, or per-worker entries for other workers
/// only) is divided automatically.
pub fn classify<'a>(worker: &str, requests: &'a [CrsRequest]) -> Classification<'a> {
    let mut out = Classification::default();

    for request in requests.iter().filter(|r| r.runs_on(worker)) {
        match request.resources.claim_for(worker) {
            Some(claim) => out.explicit.push(ExplicitClaim {
                crs_name: &request.name,
                cpuset: &claim.cpuset,
                memory: &claim.memory,
            }),
            None => out.auto.push(&request.name),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crs_core::{ResourceClaim, ResourceSpec};

    fn claim(cpuset: &str, memory: &str) -> ResourceClaim {
        ResourceClaim {
            cpuset: cpuset.to_string(),
            memory: memory.to_string(),
        }
    }

    fn request(name: &str, workers: &[&str], resources: ResourceSpec) -> CrsRequest {
        CrsRequest {
            name: name.to_string(),
            workers: workers.iter().map(|w| w.to_string()).collect(),
            resources,
        }
    }

    #[test]
    fn classifies_all_three_shapes() {
        let requests = vec![
            request("auto-a", &["w1"], ResourceSpec::Absent),
            request(
                "per-worker",
                &["w1", "w2"],
                ResourceSpec::PerWorker {
                    claims: vec![("w1".to_string(), claim("0-1", "1G"))],
                },
            ),
            request("global", &["w1"], ResourceSpec::Global { claim: claim("2", "512M") }),
            request("auto-b", &["w1"], ResourceSpec::Absent),
        ];

        let c = classify("w1", &requests);
        assert_eq!(
            c.explicit,
            vec![
                ExplicitClaim {
                    crs_name: "per-worker",
                    cpuset: "0-1",
                    memory: "1G",
                },
                ExplicitClaim {
                    crs_name: "global",
                    cpuset: "2",
                    memory: "512M",
                },
            ]
        );
        assert_eq!(c.auto, vec!["auto-a", "auto-b"]);
    }

    #[test]
    fn per_worker_without_entry_is_auto() {
        let requests = vec![request(
            "per-worker",
            &["w1", "w2"],
            ResourceSpec::PerWorker {
                claims: vec![("w1".to_string(), claim("0-1", "1G"))],
            },
        )];

        let c = classify("w2", &requests);
        assert!(c.explicit.is_empty());
        assert_eq!(c.auto, vec!["per-worker"]);
    }

    #[test]
    fn skips_ineligible_requests() {
        let requests = vec![
            request("elsewhere", &["w2"], ResourceSpec::Global { claim: claim("0", "1G") }),
            request("nowhere", &[], ResourceSpec::Absent),
        ];

        assert!(classify("w1", &requests).is_empty());
    }
}
