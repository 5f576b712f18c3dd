//! Collector-config synthesizer.
//!
//! Pure function from a shard's tenant bindings to the pipeline config the
//! collector on that shard should run. The output is a tagged variant with
//! an explicit typed serializer: identical inputs yield byte-identical JSON,
//! which keeps the OpAMP config hash stable across heartbeats.

use std::collections::BTreeMap;

use serde::Serialize;

const RECEIVER_KEY: &str = "otlp/hyperdx";
const GRPC_ENDPOINT: &str = "0.0.0.0:4317";
const HTTP_ENDPOINT: &str = "0.0.0.0:4318";

/// Managed-connection credential of the tenant bound to a shard.
#[derive(Debug, Clone)]
pub struct TenantBinding {
    pub team_id: String,
    pub password: String,
}

/// The two configurations a shard can run.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectorConfig {
    /// No tenant bound: receivers stay open, signals drain into `nop`.
    Nop,
    /// One tenant bound: signals route into the tenant's database.
    Tenant { team_id: String, password: String },
}

/// Computes the config for `shard_id` given the distinct teams with active
/// tokens on it (sorted) and the chosen team's managed connection.
pub fn synthesize(
    shard_id: &str,
    teams: &[String],
    binding: Option<&TenantBinding>,
) -> CollectorConfig {
    let Some(team_id) = teams.iter().min() else {
        return CollectorConfig::Nop;
    };

    if teams.len() > 1 {
        tracing::warn!(
            shard_id,
            team_count = teams.len(),
            team_id = %team_id,
            "Multiple tenants active on one shard; routing the lexicographically smallest"
        );
    }

    match binding {
        Some(binding) if binding.team_id == *team_id => CollectorConfig::Tenant {
            team_id: team_id.clone(),
            password: binding.password.clone(),
        },
        _ => {
            tracing::error!(
                shard_id,
                team_id = %team_id,
                "Tenant has no managed connection; emitting nop config"
            );
            CollectorConfig::Nop
        }
    }
}

impl CollectorConfig {
    /// Serializes the config document. Field order is fixed by the struct
    /// declarations and map keys are sorted, so the bytes are deterministic.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&self.render())
    }

    fn render(&self) -> Document {
        match self {
            CollectorConfig::Nop => nop_document(),
            CollectorConfig::Tenant { team_id, password } => tenant_document(team_id, password),
        }
    }
}

#[derive(Serialize)]
struct Document {
    receivers: BTreeMap<&'static str, OtlpReceiver>,
    #[serde(skip_serializing_if = "Option::is_none")]
    processors: Option<BTreeMap<&'static str, Processor>>,
    exporters: BTreeMap<&'static str, Exporter>,
    extensions: BTreeMap<&'static str, Empty>,
    service: Service,
}

#[derive(Serialize)]
struct OtlpReceiver {
    protocols: OtlpProtocols,
}

#[derive(Serialize)]
struct OtlpProtocols {
    grpc: OtlpEndpoint,
    http: OtlpHttpEndpoint,
}

#[derive(Serialize)]
struct OtlpEndpoint {
    endpoint: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_metadata: Option<bool>,
}

#[derive(Serialize)]
struct OtlpHttpEndpoint {
    endpoint: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    include_metadata: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cors: Option<Cors>,
}

#[derive(Serialize)]
struct Cors {
    allowed_origins: Vec<&'static str>,
    allowed_headers: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Processor {
    MemoryLimiter {
        check_interval: &'static str,
        limit_percentage: u32,
        spike_limit_percentage: u32,
    },
    Batch(Empty),
}

#[derive(Serialize)]
#[serde(untagged)]
enum Exporter {
    Nop(Empty),
    Clickhouse {
        endpoint: &'static str,
        database: String,
        username: String,
        password: String,
        ttl: &'static str,
        timeout: &'static str,
        retry_on_failure: RetryOnFailure,
    },
}

#[derive(Serialize)]
struct RetryOnFailure {
    enabled: bool,
    initial_interval: &'static str,
    max_interval: &'static str,
    max_elapsed_time: &'static str,
}

#[derive(Serialize)]
struct Service {
    extensions: Vec<&'static str>,
    pipelines: BTreeMap<&'static str, Pipeline>,
}

#[derive(Serialize)]
struct Pipeline {
    receivers: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    processors: Vec<&'static str>,
    exporters: Vec<&'static str>,
}

#[derive(Serialize)]
struct Empty {}

fn nop_document() -> Document {
    let receivers = BTreeMap::from([(
        RECEIVER_KEY,
        OtlpReceiver {
            protocols: OtlpProtocols {
                grpc: OtlpEndpoint {
                    endpoint: GRPC_ENDPOINT,
                    include_metadata: None,
                },
                http: OtlpHttpEndpoint {
                    endpoint: HTTP_ENDPOINT,
                    include_metadata: None,
                    cors: None,
                },
            },
        },
    )]);

    let nop_pipeline = || Pipeline {
        receivers: vec![RECEIVER_KEY],
        processors: vec![],
        exporters: vec!["nop"],
    };

    Document {
        receivers,
        processors: None,
        exporters: BTreeMap::from([("nop", Exporter::Nop(Empty {}))]),
        extensions: BTreeMap::from([("health_check", Empty {})]),
        service: Service {
            extensions: vec!["health_check"],
            pipelines: BTreeMap::from([
                ("logs/nop", nop_pipeline()),
                ("traces/nop", nop_pipeline()),
                ("metrics/nop", nop_pipeline()),
            ]),
        },
    }
}

fn tenant_document(team_id: &str, password: &str) -> Document {
    let receivers = BTreeMap::from([(
        RECEIVER_KEY,
        OtlpReceiver {
            protocols: OtlpProtocols {
                grpc: OtlpEndpoint {
                    endpoint: GRPC_ENDPOINT,
                    include_metadata: Some(true),
                },
                http: OtlpHttpEndpoint {
                    endpoint: HTTP_ENDPOINT,
                    include_metadata: Some(true),
                    cors: Some(Cors {
                        allowed_origins: vec!["*"],
                        allowed_headers: vec!["*"],
                    }),
                },
            },
        },
    )]);

    let processors = BTreeMap::from([
        (
            "memory_limiter",
            Processor::MemoryLimiter {
                check_interval: "1s",
                limit_percentage: 80,
                spike_limit_percentage: 25,
            },
        ),
        ("batch", Processor::Batch(Empty {})),
    ]);

    let exporters = BTreeMap::from([(
        "clickhouse",
        Exporter::Clickhouse {
            endpoint: "${env:CLICKHOUSE_ENDPOINT}",
            database: format!("tenant_{team_id}"),
            username: format!("tenant_{team_id}"),
            password: password.to_string(),
            ttl: "720h",
            timeout: "5s",
            retry_on_failure: RetryOnFailure {
                enabled: true,
                initial_interval: "5s",
                max_interval: "30s",
                max_elapsed_time: "300s",
            },
        },
    )]);

    let tenant_pipeline = || Pipeline {
        receivers: vec![RECEIVER_KEY],
        processors: vec!["memory_limiter", "batch"],
        exporters: vec!["clickhouse"],
    };

    Document {
        receivers,
        processors: Some(processors),
        exporters,
        extensions: BTreeMap::from([("health_check", Empty {})]),
        service: Service {
            extensions: vec!["health_check"],
            pipelines: BTreeMap::from([
                ("logs", tenant_pipeline()),
                ("traces", tenant_pipeline()),
                ("metrics", tenant_pipeline()),
            ]),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(team: &str) -> TenantBinding {
        TenantBinding {
            team_id: team.to_string(),
            password: "0123456789abcdef".to_string(),
        }
    }

    fn parse(config: &CollectorConfig) -> serde_json::Value {
        serde_json::from_slice(&config.to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn empty_shard_gets_nop_config() {
        let config = synthesize("shard-0", &[], None);
        assert_eq!(config, CollectorConfig::Nop);

        let doc = parse(&config);
        for pipeline in ["logs/nop", "traces/nop", "metrics/nop"] {
            assert_eq!(
                doc["service"]["pipelines"][pipeline]["exporters"],
                serde_json::json!(["nop"]),
            );
        }
        assert!(doc["exporters"].get("clickhouse").is_none());
        assert!(doc["extensions"].get("health_check").is_some());
    }

    #[test]
    fn single_tenant_gets_routed_config() {
        let teams = vec!["T1".to_string()];
        let config = synthesize("shard-0", &teams, Some(&binding("T1")));

        let doc = parse(&config);
        let exporter = &doc["exporters"]["clickhouse"];
        assert_eq!(exporter["database"], "tenant_T1");
        assert_eq!(exporter["username"], "tenant_T1");
        assert_eq!(exporter["ttl"], "720h");
        assert_eq!(exporter["retry_on_failure"]["enabled"], true);
        assert_eq!(exporter["retry_on_failure"]["max_elapsed_time"], "300s");

        for pipeline in ["logs", "traces", "metrics"] {
            let p = &doc["service"]["pipelines"][pipeline];
            assert_eq!(p["receivers"], serde_json::json!(["otlp/hyperdx"]));
            assert_eq!(
                p["processors"],
                serde_json::json!(["memory_limiter", "batch"])
            );
            assert_eq!(p["exporters"], serde_json::json!(["clickhouse"]));
        }

        let grpc = &doc["receivers"]["otlp/hyperdx"]["protocols"]["grpc"];
        assert_eq!(grpc["include_metadata"], true);
        let http = &doc["receivers"]["otlp/hyperdx"]["protocols"]["http"];
        assert_eq!(http["cors"]["allowed_origins"], serde_json::json!(["*"]));
    }

    #[test]
    fn policy_violation_routes_smallest_team() {
        let teams = vec!["T_alpha".to_string(), "T_beta".to_string()];
        let config = synthesize("shard-0", &teams, Some(&binding("T_alpha")));
        assert!(matches!(
            config,
            CollectorConfig::Tenant { ref team_id, .. } if team_id == "T_alpha"
        ));
    }

    #[test]
    fn missing_connection_falls_back_to_nop() {
        let teams = vec!["T1".to_string()];
        let config = synthesize("shard-0", &teams, None);
        assert_eq!(config, CollectorConfig::Nop);
    }

    #[test]
    fn mismatched_binding_falls_back_to_nop() {
        let teams = vec!["T1".to_string()];
        let config = synthesize("shard-0", &teams, Some(&binding("T2")));
        assert_eq!(config, CollectorConfig::Nop);
    }

    #[test]
    fn serialization_is_deterministic() {
        let teams = vec!["T1".to_string()];
        let a = synthesize("shard-0", &teams, Some(&binding("T1")))
            .to_bytes()
            .unwrap();
        let b = synthesize("shard-0", &teams, Some(&binding("T1")))
            .to_bytes()
            .unwrap();
        assert_eq!(a, b);

        let nop_a = CollectorConfig::Nop.to_bytes().unwrap();
        let nop_b = CollectorConfig::Nop.to_bytes().unwrap();
        assert_eq!(nop_a, nop_b);
    }
}
