use crate::{
    bootstrap,
    entity::{membership, team, user as user_entity},
    error::ApiError,
    middleware::auth::AppUser,
    state::AppState,
};
use axum::{Extension, Json, extract::State};
use chrono::Utc;
use cuid2::create_id;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateTeamInput {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TeamOut {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

impl From<team::Model> for TeamOut {
    fn from(team: team::Model) -> Self {
        Self {
            id: team.id,
            name: team.name,
            created_at: team.created_at.and_utc().timestamp(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/teams",
    tag = "teams",
    description = "Create a team and bootstrap its tenant storage. \
                   Storage failures are logged, not surfaced; bootstrap retries later.",
    request_body = CreateTeamInput,
    responses(
        (status = 200, description = "Team created", body = TeamOut),
        (status = 400, description = "Missing or empty name"),
        (status = 401, description = "Unauthorized")
    )
)]
#[tracing::instrument(name = "POST /teams", skip(state, user, input))]
pub async fn create_team(
    State(state): State<AppState>,
    Extension(user): Extension<AppUser>,
    Json(input): Json<CreateTeamInput>,
) -> Result<Json<TeamOut>, ApiError> {
    let sub = user.sub()?;

    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::invalid("Team name must not be empty"));
    }

    let now = Utc::now().naive_utc();

    // Make sure the session's subject exists as a user row; sessions are
    // minted upstream and may precede any control-plane write.
    if user_entity::Entity::find_by_id(&sub)
        .one(&state.db)
        .await?
        .is_none()
    {
        user_entity::ActiveModel {
            id: Set(sub.clone()),
            email: Set(user
                .email()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{sub}@unknown"))),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&state.db)
        .await?;
    }

    let created = team::ActiveModel {
        id: Set(create_id()),
        name: Set(name),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    membership::ActiveModel {
        user_id: Set(sub.clone()),
        team_id: Set(created.id.clone()),
        created_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    state.invalidate_team(&sub);

    tracing::info!(team_id = %created.id, "Created team");

    // Best-effort: a failure here never rolls the team back.
    bootstrap::bootstrap_team(
        &state.db,
        state.provisioner.as_ref(),
        &state.config.clickhouse_query_host,
        &created.id,
    )
    .await;

    Ok(Json(created.into()))
}
