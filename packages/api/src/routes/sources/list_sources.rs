use crate::{
    entity::source, error::ApiError, middleware::auth::AppUser, routes::PaginationParams,
    state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SourceListOut {
    pub data: Vec<source::Model>,
}

#[utoipa::path(
    get,
    path = "/sources",
    tag = "sources",
    description = "List the team's canonical sources.",
    params(PaginationParams),
    responses(
        (status = 200, description = "Sources of the team"),
        (status = 401, description = "Unauthorized")
    )
)]
#[tracing::instrument(name = "GET /sources", skip(state, user))]
pub async fn list_sources(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<SourceListOut>, ApiError> {
    let team_id = user.team_id(&state).await?;

    let sources = source::Entity::find()
        .filter(source::Column::TeamId.eq(&team_id))
        .order_by_asc(source::Column::CreatedAt)
        .limit(pagination.limit.unwrap_or(100))
        .offset(pagination.offset.unwrap_or(0))
        .all(&state.db)
        .await?;

    Ok(Json(SourceListOut { data: sources }))
}
