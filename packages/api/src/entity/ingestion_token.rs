//! `SeaORM` Entity for IngestionToken
//!
//! Durable record of a tenant-scoped ingestion credential. Only the SHA-256
//! hash of the user-visible token is stored; the plaintext leaves the control
//! plane exactly once, at create or rotate time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::TokenStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "IngestionToken")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_name = "teamId", column_type = "Text")]
    pub team_id: String,
    /// Lowercase hex SHA-256 of the user-visible token. Globally unique.
    #[sea_orm(column_name = "tokenHash", column_type = "Text", unique)]
    pub token_hash: String,
    /// First 12 characters of the user-visible token, shown in the UI.
    #[sea_orm(column_name = "tokenPrefix", column_type = "Text")]
    pub token_prefix: String,
    pub status: TokenStatus,
    /// Collector shard this token's traffic lands on, e.g. `shard-3`.
    /// Null only during transient construction.
    #[sea_orm(column_name = "assignedShard", column_type = "Text", nullable)]
    pub assigned_shard: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(column_name = "lastUsedAt")]
    pub last_used_at: Option<DateTime>,
    #[sea_orm(column_name = "revokedAt")]
    pub revoked_at: Option<DateTime>,
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
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
