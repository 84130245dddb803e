use crate::server::{error::ApiError, AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = state
        .sessions
        .resolve(request.headers())
        .await
        .ok_or(ApiError::Unauthenticated)?;

    tracing::debug!("Authenticated request from: {}", user.name);

    // Handlers pick the user up from request extensions
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
