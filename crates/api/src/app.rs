use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{
        header::{HeaderValue, CONTENT_TYPE},
        Method, StatusCode,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::gql::AppSchema;
use crate::middleware::identity::{identity_middleware, AuthenticatedUser, USER_ID_HEADER};
use crate::routes::payments;
use crate::state::AppState;

/// Build the Axum router with health endpoint, GraphQL and the payment redirects.
pub fn build_router(state: AppState, schema: AppSchema) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    Router::new()
        // Simple liveness check; also proves DB connectivity.
        .route("/health", get(health))
        // Browser redirects from the payment provider
        .route("/payments/success", get(payments::success))
        .route("/payments/fail", get(payments::fail))
        // GraphQL endpoint with custom handler that puts the caller in context
        .route(
            "/graphql",
            post(move |req| graphql_handler(req, schema)),
        )
        .with_state(state)
        .layer(middleware::from_fn(identity_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE, USER_ID_HEADER])
                .allow_credentials(true),
        )
}

/// GraphQL handler that copies the caller (set by the identity middleware)
/// into the GraphQL context.
async fn graphql_handler(req: Request, schema: AppSchema) -> Result<Response, AppError> {
    let caller = req.extensions().get::<AuthenticatedUser>().copied();

    let (_parts, body) = req.into_parts();
    let body_bytes = axum::body::to_bytes(body, 2 * 1024 * 1024)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read request body: {}", e)))?;

    let mut gql_request: async_graphql::Request = serde_json::from_slice(&body_bytes)
        .map_err(|e| AppError::BadRequest(format!("Invalid GraphQL request: {}", e)))?;

    if let Some(caller) = caller {
        gql_request = gql_request.data(caller);
    }

    let gql_response = schema.execute(gql_request).await;

    Ok(Json(gql_response).into_response())
}

/// Liveness + quick DB probe.
async fn health(State(state): State<AppState>) -> Result<&'static str, AppError> {
    let _one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&state.db).await?;
    Ok("ok")
}
