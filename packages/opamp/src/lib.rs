//! OpAMP wire types for the agent-management loop.
//!
//! The collector fleet speaks the plain-HTTP OpAMP transport: one
//! length-delimited protobuf message per request body. Only the subset of the
//! protocol the control plane actually exchanges is declared here; prost skips
//! unknown fields, so agents built against the full schema interoperate.

use std::collections::HashMap;

pub use prost::Message;

/// Agent capability bits (`AgentToServer.capabilities`).
pub mod agent_capabilities {
    pub const REPORTS_STATUS: u64 = 0x0000_0001;
    pub const ACCEPTS_REMOTE_CONFIG: u64 = 0x0000_0002;
    pub const REPORTS_EFFECTIVE_CONFIG: u64 = 0x0000_0004;
}

/// Server capability bits (`ServerToAgent.capabilities`).
pub mod server_capabilities {
    pub const ACCEPTS_STATUS: u64 = 0x0000_0001;
    pub const OFFERS_REMOTE_CONFIG: u64 = 0x0000_0002;
}

/// Status message sent by a collector on every heartbeat.
#[derive(Clone, PartialEq, Message)]
pub struct AgentToServer {
    /// Globally unique agent instance identifier, stable across restarts.
    #[prost(bytes = "vec", tag = "1")]
    pub instance_uid: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub sequence_num: u64,
    #[prost(message, optional, tag = "3")]
    pub agent_description: Option<AgentDescription>,
    #[prost(uint64, tag = "4")]
    pub capabilities: u64,
    #[prost(message, optional, tag = "7")]
    pub remote_config_status: Option<RemoteConfigStatus>,
    #[prost(uint64, tag = "10")]
    pub flags: u64,
}

/// Server response carrying the (optional) remote configuration.
#[derive(Clone, PartialEq, Message)]
pub struct ServerToAgent {
    #[prost(bytes = "vec", tag = "1")]
    pub instance_uid: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub remote_config: Option<AgentRemoteConfig>,
    #[prost(uint64, tag = "6")]
    pub flags: u64,
    #[prost(uint64, tag = "7")]
    pub capabilities: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct AgentDescription {
    #[prost(message, repeated, tag = "1")]
    pub identifying_attributes: Vec<KeyValue>,
    #[prost(message, repeated, tag = "2")]
    pub non_identifying_attributes: Vec<KeyValue>,
}

impl AgentDescription {
    /// Looks up a string-valued identifying attribute by key.
    pub fn identifying_attribute(&self, key: &str) -> Option<&str> {
        self.identifying_attributes
            .iter()
            .find(|kv| kv.key == key)
            .and_then(|kv| kv.value.as_ref())
            .and_then(AnyValue::as_str)
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct KeyValue {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(message, optional, tag = "2")]
    pub value: Option<AnyValue>,
}

impl KeyValue {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(AnyValue {
                value: Some(any_value::Value::StringValue(value.into())),
            }),
        }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct AnyValue {
    #[prost(oneof = "any_value::Value", tags = "1, 2, 3, 4")]
    pub value: Option<any_value::Value>,
}

impl AnyValue {
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Some(any_value::Value::StringValue(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

pub mod any_value {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(string, tag = "1")]
        StringValue(String),
        #[prost(bool, tag = "2")]
        BoolValue(bool),
        #[prost(int64, tag = "3")]
        IntValue(i64),
        #[prost(double, tag = "4")]
        DoubleValue(f64),
    }
}

/// Remote configuration offered to an agent.
#[derive(Clone, PartialEq, Message)]
pub struct AgentRemoteConfig {
    #[prost(message, optional, tag = "1")]
    pub config: Option<AgentConfigMap>,
    /// Hash over the config content; the agent echoes it back in
    /// `RemoteConfigStatus` so the server can detect convergence.
    #[prost(bytes = "vec", tag = "2")]
    pub config_hash: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AgentConfigMap {
    #[prost(map = "string, message", tag = "1")]
    pub config_map: HashMap<String, AgentConfigFile>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AgentConfigFile {
    #[prost(bytes = "vec", tag = "1")]
    pub body: Vec<u8>,
    #[prost(string, tag = "2")]
    pub content_type: String,
}

/// Agent-side report of the last applied remote config.
#[derive(Clone, PartialEq, Message)]
pub struct RemoteConfigStatus {
    #[prost(bytes = "vec", tag = "1")]
    pub last_remote_config_hash: Vec<u8>,
    #[prost(enumeration = "RemoteConfigStatuses", tag = "2")]
    pub status: i32,
    #[prost(string, tag = "3")]
    pub error_message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
pub enum RemoteConfigStatuses {
    Unset = 0,
    Applied = 1,
    Applying = 2,
    Failed = 3,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_heartbeat() -> AgentToServer {
        AgentToServer {
            instance_uid: vec![1, 2, 3, 4],
            sequence_num: 7,
            agent_description: Some(AgentDescription {
                identifying_attributes: vec![
                    KeyValue::string("service.name", "otel-collector"),
                    KeyValue::string("hdx.shard_id", "shard-3"),
                ],
                non_identifying_attributes: vec![],
            }),
            capabilities: agent_capabilities::REPORTS_STATUS
                | agent_capabilities::ACCEPTS_REMOTE_CONFIG,
            remote_config_status: None,
            flags: 0,
        }
    }

    #[test]
    fn roundtrip_length_delimited() {
        let msg = sample_heartbeat();
        let mut buf = Vec::new();
        msg.encode_length_delimited(&mut buf).unwrap();
        let decoded = AgentToServer::decode_length_delimited(buf.as_slice()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn identifying_attribute_lookup() {
        let msg = sample_heartbeat();
        let desc = msg.agent_description.unwrap();
        assert_eq!(desc.identifying_attribute("hdx.shard_id"), Some("shard-3"));
        assert_eq!(desc.identifying_attribute("missing"), None);
    }

    #[test]
    fn non_string_attribute_is_not_a_str() {
        let desc = AgentDescription {
            identifying_attributes: vec![KeyValue {
                key: "pid".into(),
                value: Some(AnyValue {
                    value: Some(any_value::Value::IntValue(42)),
                }),
            }],
            non_identifying_attributes: vec![],
        };
        assert_eq!(desc.identifying_attribute("pid"), None);
    }

    #[test]
    fn server_to_agent_carries_config() {
        let mut config_map = HashMap::new();
        config_map.insert(
            String::new(),
            AgentConfigFile {
                body: br#"{"receivers":{}}"#.to_vec(),
                content_type: "application/json".into(),
            },
        );
        let msg = ServerToAgent {
            instance_uid: vec![9],
            remote_config: Some(AgentRemoteConfig {
                config: Some(AgentConfigMap { config_map }),
                config_hash: vec![0xab; 32],
            }),
            flags: 0,
            capabilities: server_capabilities::ACCEPTS_STATUS
                | server_capabilities::OFFERS_REMOTE_CONFIG,
        };
        let buf = msg.encode_length_delimited_to_vec();
        let decoded = ServerToAgent::decode_length_delimited(buf.as_slice()).unwrap();
        assert_eq!(decoded, msg);
        let file = &decoded.remote_config.unwrap().config.unwrap().config_map[""];
        assert_eq!(file.content_type, "application/json");
    }

    #[test]
    fn decode_garbage_fails() {
        let garbage = [0xff, 0xff, 0xff, 0xff, 0xff];
        assert!(AgentToServer::decode_length_delimited(&garbage[..]).is_err());
    }
}
