use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use pantry_types::api::Claims;
use tracing::error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Decodes the bearer token, if any, and attaches its claims to the request.
/// Requests without an Authorization header pass through anonymously; a
/// header that is present but invalid is rejected.
pub async fn identify(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(claims) = bearer_claims(&req, &state.jwt_secret)? {
        let db = state.clone();
        let (id, username) = (claims.sub, claims.username.clone());
        tokio::task::spawn_blocking(move || db.db.ensure_user(id, &username))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal
            })?
            .map_err(|e| {
                error!("DB ensure_user error: {}", e);
                ApiError::Internal
            })?;

        req.extensions_mut().insert(claims);
    }
    Ok(next.run(req).await)
}

fn bearer_claims(req: &Request, secret: &str) -> Result<Option<Claims>, ApiError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized)?;

    Ok(Some(token_data.claims))
}

/// The authenticated caller. Rejects with 401 when the request is anonymous.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn id(&self) -> Uuid {
        self.0.sub
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or(ApiError::Unauthorized)
    }
}

/// The caller if authenticated, otherwise `None`. Never rejects.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<Uuid>);

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(parts.extensions.get::<Claims>().map(|c| c.sub)))
    }
}
