use std::env;

/// Control-plane configuration, sourced from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// Port of the authenticated HTTP API.
    pub api_port: u16,
    /// Port of the unauthenticated OpAMP endpoint the collectors poll.
    pub opamp_port: u16,
    /// Number of collector shards available for tenant assignment.
    pub shard_count: usize,
    /// Whether tenant storage is provisioned on team creation.
    pub provisioning_enabled: bool,
    /// Postgres registry URL.
    pub database_url: String,
    /// ClickHouse admin endpoint used for tenant DDL.
    pub clickhouse_admin_url: String,
    /// Host the per-tenant managed connections point at (query side).
    pub clickhouse_query_host: String,
    /// HS256 secret for session bearer tokens.
    pub session_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_port = parse_port("API_PORT", 8000)?;
        let opamp_port = parse_port("OPAMP_PORT", 4320)?;

        let shard_count: usize = env::var("SHARD_COUNT")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("SHARD_COUNT".to_string()))?;
        if shard_count == 0 {
            return Err(ConfigError::InvalidValue(
                "SHARD_COUNT must be at least 1".to_string(),
            ));
        }

        let provisioning_enabled = match env::var("PROVISIONING_ENABLED") {
            Ok(v) => match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => return Err(ConfigError::InvalidValue("PROVISIONING_ENABLED".to_string())),
            },
            Err(_) => false,
        };

        Ok(Config {
            api_port,
            opamp_port,
            shard_count,
            provisioning_enabled,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
            clickhouse_admin_url: env::var("CLICKHOUSE_ADMIN_URL")
                .unwrap_or_else(|_| "tcp://localhost:9000".to_string()),
            clickhouse_query_host: env::var("CLICKHOUSE_QUERY_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            session_secret: env::var("SESSION_SECRET")
                .map_err(|_| ConfigError::MissingVar("SESSION_SECRET"))?,
        })
    }

    /// Shard identifiers this deployment can assign, `shard-0 .. shard-N-1`.
    pub fn shard_ids(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.shard_count).map(|i| format!("shard-{i}"))
    }
}

fn parse_port(var: &'static str, default: u16) -> Result<u16, ConfigError> {
    env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(var.to_string()))
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVar(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(var) => write!(f, "Invalid value for: {}", var),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_ids_enumerate_from_zero() {
        let config = Config {
            api_port: 8000,
            opamp_port: 4320,
            shard_count: 3,
            provisioning_enabled: false,
            database_url: String::new(),
            clickhouse_admin_url: String::new(),
            clickhouse_query_host: String::new(),
            session_secret: String::new(),
        };
        let ids: Vec<String> = config.shard_ids().collect();
        assert_eq!(ids, vec!["shard-0", "shard-1", "shard-2"]);
    }
}
