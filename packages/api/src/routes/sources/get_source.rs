use crate::{
    entity::source, error::ApiError, middleware::auth::AppUser, state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

#[utoipa::path(
    get,
    path = "/sources/{source_id}",
    tag = "sources",
    params(
        ("source_id" = String, Path, description = "Source ID")
    ),
    responses(
        (status = 200, description = "The source"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Source not found in the caller's team")
    )
)]
#[tracing::instrument(name = "GET /sources/{source_id}", skip(state, user))]
pub async fn get_source(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(source_id): Path<String>,
) -> Result<Json<source::Model>, ApiError> {
    let team_id = user.team_id(&state).await?;

    // Predicated on the team so foreign ids read as absent, not forbidden.
    let source = source::Entity::find_by_id(&source_id)
        .filter(source::Column::TeamId.eq(&team_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| crate::not_found!("Source {source_id} not found"))?;

    Ok(Json(source))
}
