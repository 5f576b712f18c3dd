use crate::{
    entity::{membership, team},
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
};
use axum::{Extension, Json, extract::State};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use super::create_team::TeamOut;

#[utoipa::path(
    get,
    path = "/teams",
    tag = "teams",
    description = "List the teams the caller belongs to.",
    responses(
        (status = 200, description = "Teams of the caller", body = Vec<TeamOut>),
        (status = 401, description = "Unauthorized")
    )
)]
#[tracing::instrument(name = "GET /teams", skip(state, user))]
pub async fn list_teams(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
) -> Result<Json<Vec<TeamOut>>, ApiError> {
    let sub = user.sub()?;

    let team_ids: Vec<String> = membership::Entity::find()
        .filter(membership::Column::UserId.eq(&sub))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|m| m.team_id)
        .collect();

    if team_ids.is_empty() {
        return Ok(Json(vec![]));
    }

    let teams = team::Entity::find()
        .filter(team::Column::Id.is_in(team_ids))
        .order_by_asc(team::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(teams.into_iter().map(TeamOut::from).collect()))
}
