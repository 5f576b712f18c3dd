use crate::state::AppState;
use axum::{Router, routing::get};

pub mod create_team;
pub mod list_teams;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(list_teams::list_teams).post(create_team::create_team),
    )
}
