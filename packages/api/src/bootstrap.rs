//! Tenant bootstrap: storage provisioning, the managed connection, and the
//! four canonical sources with their cross-link graph.
//!
//! Runs when a team is created. Nothing here may fail team creation: every
//! error is logged and the bootstrap can be retried on the next trigger
//! because each step is an upsert.

use anyhow::{Context, Result};
use chrono::Utc;
use cuid2::create_id;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entity::{connection, sea_orm_active_enums::SourceKind, source};
use crate::provision::TenantProvisioner;

/// Table backing a source kind, `None` for metrics (which carry a table per
/// metric type instead).
fn canonical_table(kind: SourceKind) -> Option<&'static str> {
    match kind {
        SourceKind::Log => Some("otel_logs"),
        SourceKind::Trace => Some("otel_traces"),
        SourceKind::Session => Some("hyperdx_sessions"),
        SourceKind::Metric => None,
    }
}

fn metric_tables() -> serde_json::Value {
    serde_json::json!({
        "gauge": "otel_metrics_gauge",
        "sum": "otel_metrics_sum",
        "histogram": "otel_metrics_histogram",
    })
}

fn source_name(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Log => "Logs",
        SourceKind::Trace => "Traces",
        SourceKind::Metric => "Metrics",
        SourceKind::Session => "Sessions",
    }
}

/// Bootstraps a team's storage and sources. Never fails the caller.
pub async fn bootstrap_team(
    db: &DatabaseConnection,
    provisioner: Option<&TenantProvisioner>,
    query_host: &str,
    team_id: &str,
) {
    if let Err(err) = try_bootstrap(db, provisioner, query_host, team_id).await {
        tracing::warn!(team_id, "Tenant bootstrap failed (will retry later): {err:#}");
    }
}

async fn try_bootstrap(
    db: &DatabaseConnection,
    provisioner: Option<&TenantProvisioner>,
    query_host: &str,
    team_id: &str,
) -> Result<()> {
    let database_name = if provisioner.is_some() {
        format!("tenant_{team_id}")
    } else {
        "default".to_string()
    };

    let conn = ensure_connection(db, provisioner, query_host, team_id).await?;
    ensure_sources(db, &conn, team_id, &database_name).await?;
    link_sources(db, team_id).await?;
    Ok(())
}

/// Returns the team's managed connection, provisioning storage and creating
/// the record on first call.
async fn ensure_connection(
    db: &DatabaseConnection,
    provisioner: Option<&TenantProvisioner>,
    query_host: &str,
    team_id: &str,
) -> Result<connection::Model> {
    if let Some(existing) = connection::Entity::find()
        .filter(connection::Column::TeamId.eq(team_id))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    let (username, password) = match provisioner {
        Some(provisioner) => {
            let credentials = provisioner
                .ensure_tenant_storage(team_id)
                .await
                .context("provisioning tenant storage")?;
            (credentials.username, credentials.password)
        }
        // Provisioning disabled: point the connection at the shared store.
        None => ("default".to_string(), String::new()),
    };

    let now = Utc::now().naive_utc();
    let created = connection::ActiveModel {
        id: Set(create_id()),
        team_id: Set(team_id.to_string()),
        name: Set("Default".to_string()),
        host: Set(query_host.to_string()),
        username: Set(username),
        password: Set(password),
        is_managed: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    tracing::info!(team_id, "Created managed connection");
    Ok(created)
}

/// Creates any missing canonical source, without cross-links.
async fn ensure_sources(
    db: &DatabaseConnection,
    conn: &connection::Model,
    team_id: &str,
    database_name: &str,
) -> Result<()> {
    for kind in SourceKind::ALL {
        let exists = source::Entity::find()
            .filter(source::Column::TeamId.eq(team_id))
            .filter(source::Column::Kind.eq(kind))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let now = Utc::now().naive_utc();
        source::ActiveModel {
            id: Set(create_id()),
            team_id: Set(team_id.to_string()),
            connection_id: Set(conn.id.clone()),
            kind: Set(kind),
            name: Set(source_name(kind).to_string()),
            database_name: Set(database_name.to_string()),
            table_name: Set(canonical_table(kind).map(str::to_string)),
            metric_tables: Set(matches!(kind, SourceKind::Metric).then(metric_tables)),
            log_source_id: Set(None),
            trace_source_id: Set(None),
            metric_source_id: Set(None),
            session_source_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Second pass: patch every source with the ids of the other three, forming
/// the complete cross-link graph. Traversal at query time is by id lookup,
/// so the cycle is only in the data.
async fn link_sources(db: &DatabaseConnection, team_id: &str) -> Result<()> {
    let sources = source::Entity::find()
        .filter(source::Column::TeamId.eq(team_id))
        .all(db)
        .await?;

    let id_of = |kind: SourceKind| {
        sources
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.id.clone())
    };
    let log_id = id_of(SourceKind::Log);
    let trace_id = id_of(SourceKind::Trace);
    let metric_id = id_of(SourceKind::Metric);
    let session_id = id_of(SourceKind::Session);

    for model in sources {
        let kind = model.kind;
        let wanted = (
            (kind != SourceKind::Log).then(|| log_id.clone()).flatten(),
            (kind != SourceKind::Trace).then(|| trace_id.clone()).flatten(),
            (kind != SourceKind::Metric).then(|| metric_id.clone()).flatten(),
            (kind != SourceKind::Session).then(|| session_id.clone()).flatten(),
        );
        let current = (
            model.log_source_id.clone(),
            model.trace_source_id.clone(),
            model.metric_source_id.clone(),
            model.session_source_id.clone(),
        );
        if current == wanted {
            continue;
        }

        let mut update: source::ActiveModel = model.into();
        update.log_source_id = Set(wanted.0);
        update.trace_source_id = Set(wanted.1);
        update.metric_source_id = Set(wanted.2);
        update.session_source_id = Set(wanted.3);
        update.updated_at = Set(Utc::now().naive_utc());
        update.update(db).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_tables_per_kind() {
        assert_eq!(canonical_table(SourceKind::Log), Some("otel_logs"));
        assert_eq!(canonical_table(SourceKind::Trace), Some("otel_traces"));
        assert_eq!(canonical_table(SourceKind::Session), Some("hyperdx_sessions"));
        assert_eq!(canonical_table(SourceKind::Metric), None);
    }

    #[test]
    fn metric_tables_list_all_three_kinds() {
        let tables = metric_tables();
        assert_eq!(tables["gauge"], "otel_metrics_gauge");
        assert_eq!(tables["sum"], "otel_metrics_sum");
        assert_eq!(tables["histogram"], "otel_metrics_histogram");
    }
}
