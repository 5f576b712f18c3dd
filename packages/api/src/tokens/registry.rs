//! Durable registry of ingestion tokens.
//!
//! All writes funnel through this module so the shard-assignment invariants
//! hold: every active token carries a shard, all active tokens of a team
//! share one shard, and a shard never serves two tenants unless an operator
//! explicitly overrides the assignment.

use std::collections::HashSet;

use chrono::Utc;
use cuid2::create_id;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::entity::{ingestion_token, sea_orm_active_enums::TokenStatus};
use crate::error::ApiError;

use super::{codec, shard};

#[derive(Debug)]
pub enum TokenError {
    /// Every shard in `0..SHARD_COUNT` already has a tenant.
    ShardsExhausted,
    /// Token does not exist within the addressed team.
    NotFound,
    Db(DbErr),
    Internal(anyhow::Error),
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::ShardsExhausted => write!(f, "no free ingestion shard available"),
            TokenError::NotFound => write!(f, "ingestion token not found"),
            TokenError::Db(err) => write!(f, "database error: {err}"),
            TokenError::Internal(err) => write!(f, "internal error: {err}"),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<DbErr> for TokenError {
    fn from(err: DbErr) -> Self {
        TokenError::Db(err)
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::ShardsExhausted => ApiError::shards_exhausted(),
            TokenError::NotFound => ApiError::not_found("Ingestion token not found"),
            TokenError::Db(db_err) => db_err.into(),
            TokenError::Internal(err) => err.into(),
        }
    }
}

/// Result of `create` / `rotate`: the only moment the plaintext exists.
#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub record: ingestion_token::Model,
}

/// Identity of an active token, as seen by the data plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token_id: String,
    pub team_id: String,
    pub assigned_shard: Option<String>,
}

/// Shard the team's active tokens currently live on, if any.
async fn team_active_shard<C: ConnectionTrait>(
    db: &C,
    team_id: &str,
) -> Result<Option<String>, DbErr> {
    let existing = ingestion_token::Entity::find()
        .filter(ingestion_token::Column::TeamId.eq(team_id))
        .filter(ingestion_token::Column::Status.eq(TokenStatus::Active))
        .filter(ingestion_token::Column::AssignedShard.is_not_null())
        .order_by_desc(ingestion_token::Column::CreatedAt)
        .one(db)
        .await?;
    Ok(existing.and_then(|t| t.assigned_shard))
}

/// Set of shards that currently carry at least one active token.
async fn occupied_shards<C: ConnectionTrait>(db: &C) -> Result<HashSet<String>, DbErr> {
    let active = ingestion_token::Entity::find()
        .filter(ingestion_token::Column::Status.eq(TokenStatus::Active))
        .filter(ingestion_token::Column::AssignedShard.is_not_null())
        .all(db)
        .await?;
    Ok(active.into_iter().filter_map(|t| t.assigned_shard).collect())
}

/// Inserts a fresh active token bound to `assigned_shard`.
async fn issue<C: ConnectionTrait>(
    db: &C,
    team_id: &str,
    description: Option<String>,
    assigned_shard: String,
) -> Result<IssuedToken, TokenError> {
    let token = codec::generate().map_err(TokenError::Internal)?;
    let now = Utc::now().naive_utc();

    let record = ingestion_token::ActiveModel {
        id: Set(create_id()),
        team_id: Set(team_id.to_string()),
        token_hash: Set(codec::hash(&token)),
        token_prefix: Set(codec::prefix(&token)),
        status: Set(TokenStatus::Active),
        assigned_shard: Set(Some(assigned_shard)),
        description: Set(description),
        last_used_at: Set(None),
        revoked_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(IssuedToken { token, record })
}

/// Creates a token for the team, inheriting the team's shard or allocating
/// the lowest free one.
pub async fn create<C: ConnectionTrait>(
    db: &C,
    shard_count: usize,
    team_id: &str,
    description: Option<String>,
) -> Result<IssuedToken, TokenError> {
    let assigned_shard = match team_active_shard(db, team_id).await? {
        Some(existing) => existing,
        None => {
            let occupied = occupied_shards(db).await?;
            shard::next_free_shard(shard_count, &occupied).ok_or(TokenError::ShardsExhausted)?
        }
    };

    issue(db, team_id, description, assigned_shard).await
}

/// Lists the team's tokens, newest first.
pub async fn list(
    db: &DatabaseConnection,
    team_id: &str,
) -> Result<Vec<ingestion_token::Model>, TokenError> {
    let tokens = ingestion_token::Entity::find()
        .filter(ingestion_token::Column::TeamId.eq(team_id))
        .order_by_desc(ingestion_token::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(tokens)
}

/// Revokes the old token and issues its replacement in one transaction, so
/// at no point are both plaintexts resolvable.
pub async fn rotate(
    db: &DatabaseConnection,
    shard_count: usize,
    team_id: &str,
    token_id: &str,
) -> Result<IssuedToken, TokenError> {
    let team_id = team_id.to_string();
    let token_id = token_id.to_string();

    db.transaction::<_, IssuedToken, TokenError>(move |txn| {
        Box::pin(async move {
            let old = ingestion_token::Entity::find_by_id(&token_id)
                .filter(ingestion_token::Column::TeamId.eq(&team_id))
                .one(txn)
                .await?
                .ok_or(TokenError::NotFound)?;

            let inherited = old.assigned_shard.clone();
            let now = Utc::now().naive_utc();

            let mut revoked: ingestion_token::ActiveModel = old.into();
            revoked.status = Set(TokenStatus::Revoked);
            revoked.revoked_at = Set(Some(now));
            revoked.updated_at = Set(now);
            revoked.update(txn).await?;

            let assigned_shard = match inherited {
                Some(shard) => shard,
                None => {
                    let occupied = occupied_shards(txn).await?;
                    shard::next_free_shard(shard_count, &occupied)
                        .ok_or(TokenError::ShardsExhausted)?
                }
            };

            issue(txn, &team_id, None, assigned_shard).await
        })
    })
    .await
    .map_err(|err| match err {
        sea_orm::TransactionError::Connection(db_err) => TokenError::Db(db_err),
        sea_orm::TransactionError::Transaction(token_err) => token_err,
    })
}

/// Marks a token revoked. The record is kept for audit.
pub async fn revoke(
    db: &DatabaseConnection,
    team_id: &str,
    token_id: &str,
) -> Result<ingestion_token::Model, TokenError> {
    let token = ingestion_token::Entity::find_by_id(token_id)
        .filter(ingestion_token::Column::TeamId.eq(team_id))
        .one(db)
        .await?
        .ok_or(TokenError::NotFound)?;

    let now = Utc::now().naive_utc();
    let mut revoked: ingestion_token::ActiveModel = token.into();
    revoked.status = Set(TokenStatus::Revoked);
    revoked.revoked_at = Set(Some(now));
    revoked.updated_at = Set(now);
    let updated = revoked.update(db).await?;
    Ok(updated)
}

/// Resolves a plaintext token to its active record. Never raises; lookup
/// failures resolve to `None` so the data plane treats them as unauthorized.
pub async fn resolve(db: &DatabaseConnection, plaintext: &str) -> Option<ResolvedToken> {
    let token_hash = codec::hash(plaintext);
    let lookup = ingestion_token::Entity::find()
        .filter(ingestion_token::Column::TokenHash.eq(token_hash))
        .filter(ingestion_token::Column::Status.eq(TokenStatus::Active))
        .one(db)
        .await;

    match lookup {
        Ok(record) => record.map(|t| ResolvedToken {
            token_id: t.id,
            team_id: t.team_id,
            assigned_shard: t.assigned_shard,
        }),
        Err(err) => {
            tracing::error!("Token resolution failed: {err}");
            None
        }
    }
}

/// Updates `last_used_at`. Best-effort: errors are logged and swallowed so
/// usage tracking never blocks ingestion.
pub async fn mark_used(db: &DatabaseConnection, token_id: &str) {
    use sea_orm::sea_query::Expr;

    let now = Utc::now().naive_utc();
    let result = ingestion_token::Entity::update_many()
        .col_expr(ingestion_token::Column::LastUsedAt, Expr::value(now))
        .filter(ingestion_token::Column::Id.eq(token_id))
        .exec(db)
        .await;

    if let Err(err) = result {
        tracing::warn!(token_id, "Failed to update last_used_at: {err}");
    }
}

/// Administrative shard override. Logs a warning when the move puts two
/// tenants on the same shard; the operator owns the consequences.
pub async fn assign_shard(
    db: &DatabaseConnection,
    team_id: &str,
    token_id: &str,
    new_shard: &str,
) -> Result<ingestion_token::Model, TokenError> {
    let token = ingestion_token::Entity::find_by_id(token_id)
        .filter(ingestion_token::Column::TeamId.eq(team_id))
        .one(db)
        .await?
        .ok_or(TokenError::NotFound)?;

    let foreign_tenant = ingestion_token::Entity::find()
        .filter(ingestion_token::Column::Status.eq(TokenStatus::Active))
        .filter(ingestion_token::Column::AssignedShard.eq(new_shard))
        .filter(ingestion_token::Column::TeamId.ne(team_id))
        .one(db)
        .await?;

    if let Some(other) = foreign_tenant {
        tracing::warn!(
            shard = new_shard,
            team_id,
            other_team_id = %other.team_id,
            "Shard override places two tenants on one shard"
        );
    }

    let mut update: ingestion_token::ActiveModel = token.into();
    update.assigned_shard = Set(Some(new_shard.to_string()));
    update.updated_at = Set(Utc::now().naive_utc());
    let updated = update.update(db).await?;
    Ok(updated)
}

/// Distinct teams with an active token on the shard, lexicographically
/// sorted. The synthesizer picks the smallest on a policy violation.
pub async fn active_teams_on_shard(
    db: &DatabaseConnection,
    shard_id: &str,
) -> Result<Vec<String>, TokenError> {
    let tokens = ingestion_token::Entity::find()
        .filter(ingestion_token::Column::Status.eq(TokenStatus::Active))
        .filter(ingestion_token::Column::AssignedShard.eq(shard_id))
        .all(db)
        .await?;

    let mut teams: Vec<String> = tokens.into_iter().map(|t| t.team_id).collect();
    teams.sort();
    teams.dedup();
    Ok(teams)
}
