use crate::{
    entity::source, error::ApiError, middleware::auth::AppUser, state::AppState,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSourceInput {
    pub name: Option<String>,
}

#[utoipa::path(
    patch,
    path = "/sources/{source_id}",
    tag = "sources",
    params(
        ("source_id" = String, Path, description = "Source ID")
    ),
    request_body = UpdateSourceInput,
    responses(
        (status = 200, description = "Updated source"),
        (status = 400, description = "Empty name"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Source not found in the caller's team")
    )
)]
#[tracing::instrument(name = "PATCH /sources/{source_id}", skip(state, user, input))]
pub async fn update_source(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Path(source_id): Path<String>,
    Json(input): Json<UpdateSourceInput>,
) -> Result<Json<source::Model>, ApiError> {
    let team_id = user.team_id(&state).await?;

    let source = source::Entity::find_by_id(&source_id)
        .filter(source::Column::TeamId.eq(&team_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Source not found"))?;

    let mut update: source::ActiveModel = source.into();
    if let Some(name) = input.name {
        if name.trim().is_empty() {
            return Err(ApiError::invalid("Source name must not be empty"));
        }
        update.name = Set(name);
    }
    update.updated_at = Set(Utc::now().naive_utc());
    let updated = update.update(&state.db).await?;

    Ok(Json(updated))
}
