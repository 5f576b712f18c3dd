use crate::{
    entity::{ingestion_token, sea_orm_active_enums::TokenStatus},
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
    tokens::registry,
};
use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenInfo {
    pub id: String,
    /// Non-secret display prefix; the full token is never readable again.
    pub token_prefix: String,
    pub status: String,
    pub assigned_shard: Option<String>,
    pub description: Option<String>,
    pub created_at: i64,
    pub last_used_at: Option<i64>,
    pub revoked_at: Option<i64>,
}

impl From<ingestion_token::Model> for TokenInfo {
    fn from(token: ingestion_token::Model) -> Self {
        let status = match token.status {
            TokenStatus::Active => "active",
            TokenStatus::Revoked => "revoked",
        };
        Self {
            id: token.id,
            token_prefix: token.token_prefix,
            status: status.to_string(),
            assigned_shard: token.assigned_shard,
            description: token.description,
            created_at: token.created_at.and_utc().timestamp(),
            last_used_at: token.last_used_at.map(|dt| dt.and_utc().timestamp()),
            revoked_at: token.revoked_at.map(|dt| dt.and_utc().timestamp()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenListOut {
    pub data: Vec<TokenInfo>,
}

#[utoipa::path(
    get,
    path = "/ingestion-tokens",
    tag = "ingestion-tokens",
    description = "List the team's ingestion tokens, newest first.",
    responses(
        (status = 200, description = "Token records without secrets", body = TokenListOut),
        (status = 401, description = "Unauthorized")
    )
)]
#[tracing::instrument(name = "GET /ingestion-tokens", skip(state, user))]
pub async fn list_tokens(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
) -> Result<Json<TokenListOut>, ApiError> {
    let team_id = user.team_id(&state).await?;

    let tokens = registry::list(&state.db, &team_id).await?;
    Ok(Json(TokenListOut {
        data: tokens.into_iter().map(TokenInfo::from).collect(),
    }))
}
