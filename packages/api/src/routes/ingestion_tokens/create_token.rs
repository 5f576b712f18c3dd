use crate::{
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
    tokens::registry::{self, IssuedToken},
};
use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateTokenInput {
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedTokenRecord {
    pub id: String,
    pub token_prefix: String,
    pub status: String,
    pub created_at: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatedTokenOut {
    /// The plaintext token. Returned exactly once; only its hash is stored.
    pub token: String,
    pub token_record: CreatedTokenRecord,
}

impl From<IssuedToken> for CreatedTokenOut {
    fn from(issued: IssuedToken) -> Self {
        Self {
            token: issued.token,
            token_record: CreatedTokenRecord {
                id: issued.record.id,
                token_prefix: issued.record.token_prefix,
                status: "active".to_string(),
                created_at: issued.record.created_at.and_utc().timestamp(),
            },
        }
    }
}

#[utoipa::path(
    post,
    path = "/ingestion-tokens",
    tag = "ingestion-tokens",
    description = "Issue an ingestion token. The plaintext is returned once and never stored.",
    request_body = CreateTokenInput,
    responses(
        (status = 200, description = "Token issued", body = CreatedTokenOut),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "No free ingestion shard available")
    )
)]
#[tracing::instrument(name = "POST /ingestion-tokens", skip(state, user, input))]
pub async fn create_token(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(input): Json<CreateTokenInput>,
) -> Result<Json<CreatedTokenOut>, ApiError> {
    let team_id = user.team_id(&state).await?;

    let issued = registry::create(
        &state.db,
        state.config.shard_count,
        &team_id,
        input.description,
    )
    .await?;

    tracing::info!(
        team_id,
        token_id = %issued.record.id,
        shard = issued.record.assigned_shard.as_deref().unwrap_or(""),
        "Issued ingestion token"
    );

    Ok(Json(issued.into()))
}
