use crate::{
    entity::source, error::ApiError, middleware::auth::AppUser, state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteSourceOut {
    pub success: bool,
}

#[utoipa::path(
    delete,
    path = "/sources/{source_id}",
    tag = "sources",
    description = "Delete a source. The delete is predicated on the caller's \
                   team, so a foreign id succeeds without touching anything.",
    params(
        ("source_id" = String, Path, description = "Source ID")
    ),
    responses(
        (status = 200, description = "Delete processed", body = DeleteSourceOut),
        (status = 401, description = "Unauthorized")
    )
)]
#[tracing::instrument(name = "DELETE /sources/{source_id}", skip(state, user))]
pub async fn delete_source(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(source_id): Path<String>,
) -> Result<Json<DeleteSourceOut>, ApiError> {
    let team_id = user.team_id(&state).await?;

    // Team-predicated delete: a foreign id matches zero rows and the call
    // still succeeds, so existence never leaks across tenants.
    source::Entity::delete_many()
        .filter(source::Column::Id.eq(&source_id))
        .filter(source::Column::TeamId.eq(&team_id))
        .exec(&state.db)
        .await?;

    Ok(Json(DeleteSourceOut { success: true }))
}
