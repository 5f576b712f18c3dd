use crate::state::AppState;
use axum::{Router, routing::get};

pub mod delete_source;
pub mod get_source;
pub mod list_sources;
pub mod update_source;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sources::list_sources))
        .route(
            "/{source_id}",
            get(get_source::get_source)
                .patch(update_source::update_source)
                .delete(delete_source::delete_source),
        )
}
