//! Session authentication middleware.
//!
//! Login and session minting live in the upstream auth service; this layer
//! only validates the bearer token and attaches the resulting user to the
//! request. Handlers resolve the user's team through `AppUser::team_id`,
//! which predicates every tenant-scoped query.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entity::membership;
use crate::error::{ApiError, AuthorizationError};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub enum AppUser {
    Session { sub: String, email: Option<String> },
    Unauthorized,
}

impl AppUser {
    pub fn sub(&self) -> Result<String, ApiError> {
        match self {
            AppUser::Session { sub, .. } => Ok(sub.clone()),
            AppUser::Unauthorized => Err(ApiError::unauthorized("No session on request")),
        }
    }

    pub fn email(&self) -> Option<&str> {
        match self {
            AppUser::Session { email, .. } => email.as_deref(),
            AppUser::Unauthorized => None,
        }
    }

    /// The team this request acts on: the caller's earliest membership.
    /// Callers without a team get 403, so tenant-scoped handlers can rely
    /// on the returned id.
    pub async fn team_id(&self, state: &AppState) -> Result<String, ApiError> {
        let sub = self.sub()?;

        if let Some(team_id) = state.cached_team(&sub) {
            return Ok(team_id.as_ref().clone());
        }

        let membership = membership::Entity::find()
            .filter(membership::Column::UserId.eq(&sub))
            .order_by_asc(membership::Column::CreatedAt)
            .one(&state.db)
            .await?
            .ok_or_else(|| ApiError::forbidden("Caller is not a member of any team"))?;

        state.put_team(&sub, Arc::new(membership.team_id.clone()));
        Ok(membership.team_id)
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response<Body>, AuthorizationError> {
    let mut request = request;

    if let Some(auth_header) = request.headers().get(AUTHORIZATION)
        && let Ok(token) = auth_header.to_str()
    {
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        match state.validate_session(token) {
            Ok(claims) => {
                request.extensions_mut().insert::<AppUser>(AppUser::Session {
                    sub: claims.sub,
                    email: claims.email,
                });
                return Ok(next.run(request).await);
            }
            Err(err) => {
                tracing::debug!("Session validation failed: {err}");
            }
        }
    }

    request
        .extensions_mut()
        .insert::<AppUser>(AppUser::Unauthorized);
    Ok(next.run(request).await)
}
