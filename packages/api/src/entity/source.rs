//! `SeaORM` Entity for Source
//!
//! Canonical query-time description of a tenant's data, one row per kind.
//! The four sources of a team cross-link each other by id, forming a
//! complete graph used by the query layer for correlation jumps.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::SourceKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "Source")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_name = "teamId", column_type = "Text")]
    pub team_id: String,
    #[sea_orm(column_name = "connectionId", column_type = "Text")]
    pub connection_id: String,
    pub kind: SourceKind,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    #[sea_orm(column_name = "databaseName", column_type = "Text")]
    pub database_name: String,
    /// Table backing this source. Empty for the metric source, which lists
    /// its per-kind tables in `metric_tables` instead.
    #[sea_orm(column_name = "tableName", column_type = "Text", nullable)]
    pub table_name: Option<String>,
    /// Metric source only: `{"gauge": ..., "sum": ..., "histogram": ...}`.
    #[sea_orm(column_name = "metricTables", column_type = "Json", nullable)]
    pub metric_tables: Option<Json>,
    #[sea_orm(column_name = "logSourceId", column_type = "Text", nullable)]
    pub log_source_id: Option<String>,
    #[sea_orm(column_name = "traceSourceId", column_type = "Text", nullable)]
    pub trace_source_id: Option<String>,
    #[sea_orm(column_name = "metricSourceId", column_type = "Text", nullable)]
    pub metric_source_id: Option<String>,
    #[sea_orm(column_name = "sessionSourceId", column_type = "Text", nullable)]
    pub session_source_id: Option<String>,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Team,
    #[sea_orm(
        belongs_to = "super::connection::Entity",
        from = "Column::ConnectionId",
        to = "super::connection::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Connection,
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl Related<super::connection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Connection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
