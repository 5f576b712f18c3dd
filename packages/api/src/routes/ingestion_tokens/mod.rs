use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, patch, post},
};

pub mod assign_shard;
pub mod create_token;
pub mod list_tokens;
pub mod revoke_token;
pub mod rotate_token;

pub use create_token::{CreateTokenInput, CreatedTokenOut, CreatedTokenRecord};
pub use list_tokens::{TokenInfo, TokenListOut};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_tokens::list_tokens).post(create_token::create_token),
        )
        .route("/{token_id}", delete(revoke_token::revoke_token))
        .route("/{token_id}/rotate", post(rotate_token::rotate_token))
        .route("/{token_id}/shard", patch(assign_shard::assign_shard))
}
