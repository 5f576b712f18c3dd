use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of an ingestion token. Tokens are never deleted, only revoked.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "revoked")]
    Revoked,
}

/// Kind of a canonical query-time source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[sea_orm(string_value = "log")]
    Log,
    #[sea_orm(string_value = "trace")]
    Trace,
    #[sea_orm(string_value = "metric")]
    Metric,
    #[sea_orm(string_value = "session")]
    Session,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Log,
        SourceKind::Trace,
        SourceKind::Metric,
        SourceKind::Session,
    ];
}
