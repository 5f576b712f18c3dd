use std::sync::Arc;
use std::time::Duration;

use clickhouse_rs::Pool;
use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::Deserialize;

use crate::agent::AgentRegistry;
use crate::config::Config;
use crate::provision::TenantProvisioner;

pub type AppState = Arc<State>;

pub struct State {
    pub config: Config,
    pub db: DatabaseConnection,
    /// Present only when `PROVISIONING_ENABLED` is set.
    pub provisioner: Option<TenantProvisioner>,
    pub agents: AgentRegistry,
    /// sub -> team id. Short TTL so membership changes propagate quickly.
    team_cache: moka::sync::Cache<String, Arc<String>>,
}

/// Claims of the session bearer token minted by the auth service.
#[derive(Debug, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: Option<String>,
    pub exp: u64,
}

impl State {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mut opt = ConnectOptions::new(config.database_url.clone());
        opt.max_connections(10)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let db = Database::connect(opt).await?;

        let provisioner = config
            .provisioning_enabled
            .then(|| TenantProvisioner::new(Pool::new(config.clickhouse_admin_url.clone())));

        Ok(Self {
            config,
            db,
            provisioner,
            agents: AgentRegistry::default(),
            team_cache: moka::sync::Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(120))
                .build(),
        })
    }

    /// State over an injected connection, for handler tests.
    #[cfg(test)]
    pub(crate) fn for_tests(config: Config, db: DatabaseConnection) -> Self {
        Self {
            config,
            db,
            provisioner: None,
            agents: AgentRegistry::default(),
            team_cache: moka::sync::Cache::builder().max_capacity(16).build(),
        }
    }

    pub fn validate_session(&self, token: &str) -> jsonwebtoken::errors::Result<SessionClaims> {
        let key = DecodingKey::from_secret(self.config.session_secret.as_bytes());
        let data = decode::<SessionClaims>(token, &key, &Validation::default())?;
        Ok(data.claims)
    }

    pub fn cached_team(&self, sub: &str) -> Option<Arc<String>> {
        self.team_cache.get(sub)
    }

    pub fn put_team(&self, sub: &str, team_id: Arc<String>) {
        self.team_cache.insert(sub.to_string(), team_id);
    }

    pub fn invalidate_team(&self, sub: &str) {
        self.team_cache.invalidate(sub);
    }
}
