//! Access gateway: bearer token validation for protected routes

use auth::TokenIdentity;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::{debug, warn};

use crate::{error::ApiError, state::AppState};

/// Authenticated user information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl From<TokenIdentity> for AuthUser {
    fn from(identity: TokenIdentity) -> Self {
        Self {
            id: identity.user_id,
            username: identity.username,
        }
    }
}

/// Authentication middleware.
///
/// Missing, malformed and expired tokens all produce the same 401 before
/// the handler runs.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(Authorization(bearer)) = req.headers().typed_get::<Authorization<Bearer>>() else {
        debug!(path = %req.uri().path(), "Rejected request without bearer token");
        return Err(ApiError::Unauthorized);
    };

    let identity = state.jwt.validate(bearer.token()).map_err(|_| {
        warn!(path = %req.uri().path(), "Rejected request with invalid token");
        ApiError::Unauthorized
    })?;

    req.extensions_mut().insert(AuthUser::from(identity));

    Ok(next.run(req).await)
}
