use crate::{
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
    tokens::{registry, shard::SHARD_PREFIX},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct AssignShardInput {
    pub assigned_shard: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignShardOut {
    pub id: String,
    pub assigned_shard: Option<String>,
}

#[utoipa::path(
    patch,
    path = "/ingestion-tokens/{token_id}/shard",
    tag = "ingestion-tokens",
    description = "Operator override of a token's shard assignment. \
                   Placing two tenants on one shard is permitted but logged.",
    params(
        ("token_id" = String, Path, description = "Token to reassign")
    ),
    request_body = AssignShardInput,
    responses(
        (status = 200, description = "Shard reassigned", body = AssignShardOut),
        (status = 400, description = "Malformed shard id"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Token not found in the caller's team")
    )
)]
#[tracing::instrument(name = "PATCH /ingestion-tokens/{token_id}/shard", skip(state, user, input))]
pub async fn assign_shard(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(token_id): Path<String>,
    Json(input): Json<AssignShardInput>,
) -> Result<Json<AssignShardOut>, ApiError> {
    let team_id = user.team_id(&state).await?;

    let valid = input
        .assigned_shard
        .strip_prefix(SHARD_PREFIX)
        .is_some_and(|index| index.parse::<usize>().is_ok());
    if !valid {
        return Err(crate::invalid!(
            "Invalid shard id '{}'; expected '{SHARD_PREFIX}<index>'",
            input.assigned_shard
        ));
    }

    let updated =
        registry::assign_shard(&state.db, &team_id, &token_id, &input.assigned_shard).await?;

    Ok(Json(AssignShardOut {
        id: updated.id,
        assigned_shard: updated.assigned_shard,
    }))
}
