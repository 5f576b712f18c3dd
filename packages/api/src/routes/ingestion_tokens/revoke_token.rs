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

use super::list_tokens::TokenInfo;

#[utoipa::path(
    delete,
    path = "/ingestion-tokens/{token_id}",
    tag = "ingestion-tokens",
    description = "Revoke a token. The record is kept for audit.",
    params(
        ("token_id" = String, Path, description = "Token to revoke")
    ),
    responses(
        (status = 200, description = "Token revoked", body = TokenInfo),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Token not found in the caller's team")
    )
)]
#[tracing::instrument(name = "DELETE /ingestion-tokens/{token_id}", skip(state, user))]
pub async fn revoke_token(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(token_id): Path<String>,
) -> Result<Json<TokenInfo>, ApiError> {
    let team_id = user.team_id(&state).await?;

    let revoked = registry::revoke(&state.db, &team_id, &token_id).await?;

    tracing::info!(team_id, token_id, "Revoked ingestion token");

    Ok(Json(revoked.into()))
}
