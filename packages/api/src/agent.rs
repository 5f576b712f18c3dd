//! In-memory registry of collector agents, keyed by OpAMP instance uid.
//!
//! State is ephemeral: entries appear on the first heartbeat, are refreshed
//! on every subsequent one, and fall out after the idle TTL. For
//! multi-replica deployments this map would move behind an external
//! key-value store with the same contract.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hdx_opamp::{AgentToServer, agent_capabilities};
use moka::sync::Cache;

/// Idle eviction window: five heartbeat intervals at the default 30 s.
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(150);

/// Where an agent sits in the configuration handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentLifecycle {
    /// Heartbeat seen, no config delivered yet.
    Registered,
    /// The server has handed the agent a remote config.
    Configured,
    /// A delivered config differed from the previous one.
    ConfigChanged,
}

#[derive(Debug, Clone)]
pub struct AgentState {
    pub instance_uid: Vec<u8>,
    pub identifying_attributes: BTreeMap<String, String>,
    pub capabilities: u64,
    pub sequence_num: u64,
    pub lifecycle: AgentLifecycle,
    /// Hash of the last remote config this server delivered.
    pub last_config_hash: Option<Vec<u8>>,
    pub last_seen_at: Instant,
}

impl AgentState {
    pub fn accepts_remote_config(&self) -> bool {
        self.capabilities & agent_capabilities::ACCEPTS_REMOTE_CONFIG != 0
    }

    pub fn shard_id(&self) -> Option<&str> {
        self.identifying_attributes
            .get("hdx.shard_id")
            .map(String::as_str)
    }
}

pub struct AgentRegistry {
    agents: Cache<Vec<u8>, Arc<AgentState>>,
}

impl AgentRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            agents: Cache::builder()
                .max_capacity(10_000)
                .time_to_idle(idle_ttl)
                .build(),
        }
    }

    /// Merges a heartbeat into the stored entry, creating it if absent.
    /// The per-key upsert is atomic, so concurrent heartbeats from the same
    /// instance cannot lose fields.
    pub fn process(&self, message: &AgentToServer) -> Arc<AgentState> {
        self.agents
            .entry(message.instance_uid.clone())
            .and_upsert_with(|existing| {
                let previous = existing.map(|entry| entry.into_value());
                Arc::new(merge(previous.as_deref(), message))
            })
            .into_value()
    }

    /// Records that a config with `config_hash` was handed to the agent and
    /// advances its lifecycle accordingly.
    pub fn record_config_delivered(&self, instance_uid: &[u8], config_hash: &[u8]) {
        self.agents
            .entry(instance_uid.to_vec())
            .and_upsert_with(|existing| {
                let Some(entry) = existing else {
                    // Config delivery for an unseen agent; start a fresh entry.
                    return Arc::new(AgentState {
                        instance_uid: instance_uid.to_vec(),
                        identifying_attributes: BTreeMap::new(),
                        capabilities: 0,
                        sequence_num: 0,
                        lifecycle: AgentLifecycle::Configured,
                        last_config_hash: Some(config_hash.to_vec()),
                        last_seen_at: Instant::now(),
                    });
                };

                let previous = entry.into_value();
                let lifecycle = match &previous.last_config_hash {
                    None => AgentLifecycle::Configured,
                    Some(last) if last != config_hash => AgentLifecycle::ConfigChanged,
                    Some(_) => previous.lifecycle,
                };

                Arc::new(AgentState {
                    lifecycle,
                    last_config_hash: Some(config_hash.to_vec()),
                    ..(*previous).clone()
                })
            });
    }

    pub fn get(&self, instance_uid: &[u8]) -> Option<Arc<AgentState>> {
        self.agents.get(instance_uid)
    }

    pub fn len(&self) -> u64 {
        self.agents.run_pending_tasks();
        self.agents.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TTL)
    }
}

fn merge(previous: Option<&AgentState>, message: &AgentToServer) -> AgentState {
    let identifying_attributes = match &message.agent_description {
        Some(description) => description
            .identifying_attributes
            .iter()
            .filter_map(|kv| {
                kv.value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .map(|v| (kv.key.clone(), v.to_string()))
            })
            .collect(),
        // A compressed heartbeat omits the description; keep what we have.
        None => previous
            .map(|p| p.identifying_attributes.clone())
            .unwrap_or_default(),
    };

    let capabilities = if message.capabilities != 0 {
        message.capabilities
    } else {
        previous.map(|p| p.capabilities).unwrap_or(0)
    };

    AgentState {
        instance_uid: message.instance_uid.clone(),
        identifying_attributes,
        capabilities,
        sequence_num: message.sequence_num,
        lifecycle: previous
            .map(|p| p.lifecycle)
            .unwrap_or(AgentLifecycle::Registered),
        last_config_hash: previous.and_then(|p| p.last_config_hash.clone()),
        last_seen_at: Instant::now(),
    }
}

#[cfg(test)]
mod tests {
    use hdx_opamp::{AgentDescription, KeyValue};

    use super::*;

    fn heartbeat(uid: &[u8], seq: u64, shard: Option<&str>) -> AgentToServer {
        AgentToServer {
            instance_uid: uid.to_vec(),
            sequence_num: seq,
            agent_description: shard.map(|s| AgentDescription {
                identifying_attributes: vec![KeyValue::string("hdx.shard_id", s)],
                non_identifying_attributes: vec![],
            }),
            capabilities: agent_capabilities::REPORTS_STATUS
                | agent_capabilities::ACCEPTS_REMOTE_CONFIG,
            remote_config_status: None,
            flags: 0,
        }
    }

    #[test]
    fn first_heartbeat_registers_the_agent() {
        let registry = AgentRegistry::default();
        let agent = registry.process(&heartbeat(b"uid-1", 1, Some("shard-0")));
        assert_eq!(agent.lifecycle, AgentLifecycle::Registered);
        assert_eq!(agent.shard_id(), Some("shard-0"));
        assert!(agent.accepts_remote_config());
    }

    #[test]
    fn compressed_heartbeat_keeps_known_attributes() {
        let registry = AgentRegistry::default();
        registry.process(&heartbeat(b"uid-1", 1, Some("shard-2")));
        let agent = registry.process(&heartbeat(b"uid-1", 2, None));
        assert_eq!(agent.shard_id(), Some("shard-2"));
        assert_eq!(agent.sequence_num, 2);
    }

    #[test]
    fn config_delivery_advances_lifecycle() {
        let registry = AgentRegistry::default();
        registry.process(&heartbeat(b"uid-1", 1, Some("shard-0")));

        registry.record_config_delivered(b"uid-1", b"hash-a");
        assert_eq!(
            registry.get(b"uid-1").unwrap().lifecycle,
            AgentLifecycle::Configured
        );

        // Same hash: no transition.
        registry.record_config_delivered(b"uid-1", b"hash-a");
        assert_eq!(
            registry.get(b"uid-1").unwrap().lifecycle,
            AgentLifecycle::Configured
        );

        registry.record_config_delivered(b"uid-1", b"hash-b");
        assert_eq!(
            registry.get(b"uid-1").unwrap().lifecycle,
            AgentLifecycle::ConfigChanged
        );
    }

    #[test]
    fn lifecycle_survives_later_heartbeats() {
        let registry = AgentRegistry::default();
        registry.process(&heartbeat(b"uid-1", 1, Some("shard-0")));
        registry.record_config_delivered(b"uid-1", b"hash-a");
        let agent = registry.process(&heartbeat(b"uid-1", 2, Some("shard-0")));
        assert_eq!(agent.lifecycle, AgentLifecycle::Configured);
        assert_eq!(agent.last_config_hash.as_deref(), Some(&b"hash-a"[..]));
    }

    #[test]
    fn concurrent_heartbeats_are_safe() {
        let registry = Arc::new(AgentRegistry::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for seq in 0..100u64 {
                        registry.process(&heartbeat(b"uid-shared", seq * 8 + i, Some("shard-0")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let agent = registry.get(b"uid-shared").unwrap();
        assert_eq!(agent.shard_id(), Some("shard-0"));
    }

    #[test]
    fn distinct_agents_get_distinct_entries() {
        let registry = AgentRegistry::default();
        registry.process(&heartbeat(b"uid-1", 1, Some("shard-0")));
        registry.process(&heartbeat(b"uid-2", 1, Some("shard-1")));
        assert_eq!(registry.len(), 2);
    }
}
