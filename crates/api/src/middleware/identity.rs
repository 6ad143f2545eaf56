use axum::{extract::Request, http::HeaderName, middleware::Next, response::Response};
use uuid::Uuid;

use crate::error::AppError;

/// Header carrying the caller's user id, set by the upstream identity proxy.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// The authenticated caller, available to resolvers via `ctx.data::<AuthenticatedUser>()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Reads the identity header and adds the caller to the request extensions
/// for the GraphQL context. Requests without the header pass through anonymous.
pub async fn identity_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    if let Some(value) = request.headers().get(&USER_ID_HEADER) {
        let user_id = value
            .to_str()
            .ok()
            .and_then(|s| Uuid::parse_str(s.trim()).ok())
            .ok_or_else(|| AppError::Unauthorized("Invalid user id header".to_string()))?;

        request
            .extensions_mut()
            .insert(AuthenticatedUser { user_id });
    }

    Ok(next.run(request).await)
}
