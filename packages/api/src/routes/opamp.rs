//! OpAMP endpoint: one binary request/response exchange per heartbeat.
//!
//! The collectors poll this endpoint; there is no server-initiated push.
//! Each heartbeat updates the agent registry and, for agents that accept
//! remote configuration, returns the pipeline config synthesized for the
//! shard named in the agent's `hdx.shard_id` identifying attribute.

use std::collections::HashMap;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::post,
};
use hdx_opamp::{
    AgentConfigFile, AgentConfigMap, AgentRemoteConfig, AgentToServer, Message, ServerToAgent,
    server_capabilities,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use sha2::{Digest, Sha256};

use crate::{
    collector::{self, TenantBinding},
    entity::connection,
    error::ApiError,
    state::AppState,
    tokens::registry,
};

const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/opamp", post(opamp))
}

#[tracing::instrument(name = "POST /v1/opamp", skip(state, headers, body))]
pub async fn opamp(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if content_type != PROTOBUF_CONTENT_TYPE {
        return Err(ApiError::unsupported_media_type(format!(
            "OpAMP requires {PROTOBUF_CONTENT_TYPE}, got '{content_type}'"
        )));
    }

    let message = AgentToServer::decode_length_delimited(body.as_ref())
        .map_err(|err| ApiError::invalid(format!("Malformed AgentToServer frame: {err}")))?;

    let agent = state.agents.process(&message);

    let mut response = ServerToAgent {
        instance_uid: message.instance_uid.clone(),
        remote_config: None,
        flags: 0,
        capabilities: server_capabilities::ACCEPTS_STATUS
            | server_capabilities::OFFERS_REMOTE_CONFIG,
    };

    if agent.accepts_remote_config() {
        let Some(shard_id) = agent.shard_id().map(str::to_string) else {
            // The collector must set hdx.shard_id via OTEL_RESOURCE_ATTRIBUTES.
            return Err(ApiError::agent_misconfigured(
                "Agent accepts remote config but reported no hdx.shard_id identifying attribute",
            ));
        };

        let teams = registry::active_teams_on_shard(&state.db, &shard_id).await?;

        let binding = match teams.first() {
            Some(team_id) => connection::Entity::find()
                .filter(connection::Column::TeamId.eq(team_id))
                .one(&state.db)
                .await?
                .map(|conn| TenantBinding {
                    team_id: conn.team_id,
                    password: conn.password,
                }),
            None => None,
        };

        let config = collector::synthesize(&shard_id, &teams, binding.as_ref());
        let config_body = config
            .to_bytes()
            .map_err(|err| ApiError::internal(format!("Config serialization failed: {err}")))?;
        let config_hash = Sha256::digest(&config_body).to_vec();

        state
            .agents
            .record_config_delivered(&message.instance_uid, &config_hash);

        let mut config_map = HashMap::new();
        config_map.insert(
            String::new(),
            AgentConfigFile {
                body: config_body,
                content_type: "application/json".to_string(),
            },
        );
        response.remote_config = Some(AgentRemoteConfig {
            config: Some(AgentConfigMap { config_map }),
            config_hash,
        });
    }

    let payload = response.encode_length_delimited_to_vec();
    Ok(([(CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)], payload).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{HeaderValue, StatusCode};
    use chrono::Utc;
    use hdx_opamp::{AgentDescription, KeyValue, agent_capabilities};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

    use super::*;
    use crate::config::Config;
    use crate::entity::{ingestion_token, sea_orm_active_enums::TokenStatus};
    use crate::state::State as ControlPlaneState;

    fn test_config() -> Config {
        Config {
            api_port: 8000,
            opamp_port: 4320,
            shard_count: 2,
            provisioning_enabled: false,
            database_url: String::new(),
            clickhouse_admin_url: String::new(),
            clickhouse_query_host: "localhost".to_string(),
            session_secret: "test-secret".to_string(),
        }
    }

    fn app_state(db: DatabaseConnection) -> AppState {
        Arc::new(ControlPlaneState::for_tests(test_config(), db))
    }

    fn protobuf_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(PROTOBUF_CONTENT_TYPE),
        );
        headers
    }

    fn heartbeat(shard: Option<&str>, capabilities: u64) -> AgentToServer {
        AgentToServer {
            instance_uid: b"agent-1".to_vec(),
            sequence_num: 1,
            agent_description: Some(AgentDescription {
                identifying_attributes: shard
                    .map(|s| vec![KeyValue::string("hdx.shard_id", s)])
                    .unwrap_or_default(),
                non_identifying_attributes: vec![],
            }),
            capabilities,
            remote_config_status: None,
            flags: 0,
        }
    }

    fn encode(message: &AgentToServer) -> Bytes {
        Bytes::from(message.encode_length_delimited_to_vec())
    }

    async fn response_message(response: Response) -> ServerToAgent {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        ServerToAgent::decode_length_delimited(body.as_ref()).unwrap()
    }

    fn active_token(team: &str, shard: &str) -> ingestion_token::Model {
        let now = Utc::now().naive_utc();
        ingestion_token::Model {
            id: "tok1".to_string(),
            team_id: team.to_string(),
            token_hash: "hash".to_string(),
            token_prefix: "hdx_ingest_x".to_string(),
            status: TokenStatus::Active,
            assigned_shard: Some(shard.to_string()),
            description: None,
            last_used_at: None,
            revoked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn managed_connection(team: &str) -> connection::Model {
        let now = Utc::now().naive_utc();
        connection::Model {
            id: "conn1".to_string(),
            team_id: team.to_string(),
            name: "Default".to_string(),
            host: "localhost".to_string(),
            username: format!("tenant_{team}"),
            password: "cafe0123".to_string(),
            is_managed: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn wrong_content_type_is_415() {
        let state = app_state(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let err = opamp(
            State(state),
            headers,
            encode(&heartbeat(Some("shard-0"), 0)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn undecodable_body_is_400() {
        let state = app_state(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let err = opamp(
            State(state),
            protobuf_headers(),
            Bytes::from_static(&[0xff, 0xff, 0xff, 0xff]),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_shard_attribute_is_500() {
        let state = app_state(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let err = opamp(
            State(state),
            protobuf_headers(),
            encode(&heartbeat(
                None,
                agent_capabilities::ACCEPTS_REMOTE_CONFIG,
            )),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn status_only_agent_gets_no_remote_config() {
        let state = app_state(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let response = opamp(
            State(state),
            protobuf_headers(),
            encode(&heartbeat(
                Some("shard-0"),
                agent_capabilities::REPORTS_STATUS,
            )),
        )
        .await
        .unwrap();

        let message = response_message(response).await;
        assert!(message.remote_config.is_none());
        assert_eq!(message.instance_uid, b"agent-1");
    }

    #[tokio::test]
    async fn unbound_shard_gets_nop_config() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<ingestion_token::Model>::new()])
            .into_connection();
        let state = app_state(db);

        let response = opamp(
            State(state.clone()),
            protobuf_headers(),
            encode(&heartbeat(
                Some("shard-0"),
                agent_capabilities::REPORTS_STATUS | agent_capabilities::ACCEPTS_REMOTE_CONFIG,
            )),
        )
        .await
        .unwrap();

        let message = response_message(response).await;
        let remote = message.remote_config.unwrap();
        assert_eq!(remote.config_hash.len(), 32);

        let file = &remote.config.unwrap().config_map[""];
        assert_eq!(file.content_type, "application/json");
        let doc: serde_json::Value = serde_json::from_slice(&file.body).unwrap();
        assert!(doc["service"]["pipelines"].get("logs/nop").is_some());
        assert!(doc["exporters"].get("clickhouse").is_none());

        // Delivery is tracked in the agent registry.
        let agent = state.agents.get(b"agent-1").unwrap();
        assert_eq!(agent.last_config_hash.as_deref(), Some(&remote.config_hash[..]));
    }

    #[tokio::test]
    async fn bound_shard_gets_tenant_config() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![active_token("T1", "shard-0")]])
            .append_query_results([vec![managed_connection("T1")]])
            .into_connection();
        let state = app_state(db);

        let response = opamp(
            State(state),
            protobuf_headers(),
            encode(&heartbeat(
                Some("shard-0"),
                agent_capabilities::REPORTS_STATUS | agent_capabilities::ACCEPTS_REMOTE_CONFIG,
            )),
        )
        .await
        .unwrap();

        let message = response_message(response).await;
        let remote = message.remote_config.unwrap();
        let file = &remote.config.unwrap().config_map[""];
        let doc: serde_json::Value = serde_json::from_slice(&file.body).unwrap();

        assert_eq!(doc["exporters"]["clickhouse"]["database"], "tenant_T1");
        assert_eq!(doc["exporters"]["clickhouse"]["username"], "tenant_T1");
        for pipeline in ["logs", "traces", "metrics"] {
            assert_eq!(
                doc["service"]["pipelines"][pipeline]["exporters"],
                serde_json::json!(["clickhouse"])
            );
        }
    }
}
