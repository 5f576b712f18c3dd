use crate::{
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
    tokens::registry,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};

use super::create_token::CreatedTokenOut;

#[utoipa::path(
    post,
    path = "/ingestion-tokens/{token_id}/rotate",
    tag = "ingestion-tokens",
    description = "Revoke a token and issue its replacement atomically. \
                   The old plaintext stops resolving the moment the new one starts.",
    params(
        ("token_id" = String, Path, description = "Token to rotate")
    ),
    responses(
        (status = 200, description = "Replacement issued", body = CreatedTokenOut),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Token not found in the caller's team")
    )
)]
#[tracing::instrument(name = "POST /ingestion-tokens/{token_id}/rotate", skip(state, user))]
pub async fn rotate_token(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(token_id): Path<String>,
) -> Result<Json<CreatedTokenOut>, ApiError> {
    let team_id = user.team_id(&state).await?;

    let issued = registry::rotate(&state.db, state.config.shard_count, &team_id, &token_id).await?;

    tracing::info!(team_id, old_token_id = %token_id, new_token_id = %issued.record.id, "Rotated ingestion token");

    Ok(Json(issued.into()))
}
