//! Tenant storage provisioner.
//!
//! Materializes a tenant's isolated database, write user, grants, and the
//! canonical tables against the ClickHouse admin endpoint. Every statement
//! is idempotent, so a failed run leaves nothing to clean up; the caller
//! simply retries.

use std::time::Duration;

use anyhow::{Context, Result};
use clickhouse_rs::Pool;
use rand::{TryRngCore, rngs::OsRng};

pub mod schema;

/// Per-statement deadline against the admin endpoint.
const STATEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Length of the generated tenant password, in hex characters.
const PASSWORD_HEX_LEN: usize = 48;

/// Credentials of a freshly provisioned tenant. The password exists only in
/// this value and in the ManagedConnection record the caller writes.
pub struct TenantCredentials {
    pub database: String,
    pub username: String,
    pub password: String,
}

pub struct TenantProvisioner {
    pool: Pool,
}

impl TenantProvisioner {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Round-trip to the admin endpoint, for readiness probes.
    pub async fn ping(&self) -> Result<()> {
        let mut handle = self
            .pool
            .get_handle()
            .await
            .context("getting ClickHouse admin handle")?;
        handle
            .ping()
            .await
            .context("pinging ClickHouse admin endpoint")?;
        Ok(())
    }

    /// Runs the full provisioning sequence for a team. Safe to call again
    /// for an already provisioned tenant; the DDL is a no-op then, though a
    /// fresh (unused) password is minted either way, so callers must keep
    /// the first credentials they stored.
    pub async fn ensure_tenant_storage(&self, team_id: &str) -> Result<TenantCredentials> {
        let database = format!("tenant_{team_id}");
        let username = format!("tenant_{team_id}");
        let password = generate_password()?;

        let mut handle = self
            .pool
            .get_handle()
            .await
            .context("getting ClickHouse admin handle")?;

        for (label, sql) in schema::provisioning_statements(&database, &username, &password) {
            tokio::time::timeout(STATEMENT_TIMEOUT, handle.execute(sql.as_str()))
                .await
                .map_err(|_| anyhow::anyhow!("statement timed out after 10s"))
                .and_then(|res| res.map_err(Into::into))
                .with_context(|| format!("provisioning step failed: {label}"))?;
        }

        tracing::info!(database = %database, "Provisioned tenant storage");

        Ok(TenantCredentials {
            database,
            username,
            password,
        })
    }
}

/// High-entropy tenant credential: 24 random bytes as 48 hex characters.
fn generate_password() -> Result<String> {
    let mut bytes = [0u8; PASSWORD_HEX_LEN / 2];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| anyhow::anyhow!("failed to draw password randomness: {e}"))?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_48_hex_chars() {
        let password = generate_password().unwrap();
        assert_eq!(password.len(), 48);
        assert!(password.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn passwords_are_unique() {
        assert_ne!(generate_password().unwrap(), generate_password().unwrap());
    }
}
