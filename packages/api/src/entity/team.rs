//! `SeaORM` Entity for Team
//!
//! The tenant. A team owns its ingestion tokens, at most one managed
//! connection, and the four canonical sources.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(schema_name = "public", table_name = "Team")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,
    #[sea_orm(column_type = "Text")]
    pub name: String,
    #[sea_orm(column_name = "createdAt")]
    pub created_at: DateTime,
    #[sea_orm(column_name = "updatedAt")]
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ingestion_token::Entity")]
    IngestionToken,
    #[sea_orm(has_many = "super::membership::Entity")]
    Membership,
    #[sea_orm(has_one = "super::connection::Entity")]
    Connection,
    #[sea_orm(has_many = "super::source::Entity")]
    Source,
}

impl Related<super::ingestion_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IngestionToken.def()
    }
}

impl Related<super::membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Membership.def()
    }
}

impl Related<super::connection::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Connection.def()
    }
}

impl Related<super::source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
