use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::admin::error::AdminError;
use crate::admin::AdminState;
use crate::store::StoreConnector;

/// Require `Authorization: Bearer <key>` when an API key is configured.
pub async fn admin_auth_middleware<C: StoreConnector>(
    State(state): State<AdminState<C>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AdminError> {
    let Some(key) = state.api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(key) {
        return Ok(next.run(request).await);
    }

    tracing::warn!(path = %request.uri().path(), "Rejected admin request: bad API key");
    Err(AdminError::Unauthorized)
}
