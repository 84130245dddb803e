use crate::server::{app_state::AppState, handlers, middleware};
use axum::{
  extract::DefaultBodyLimit,
  middleware::from_fn_with_state,
  routing::{get, post},
  Router,
};

pub fn create_router(app_state: &AppState) -> Router<AppState> {
  let protected_routes = Router::new()
    .route("/api/ai/image-to-image", post(handlers::image_to_image))
    .layer(DefaultBodyLimit::max(app_state.max_upload_bytes))
    .route_layer(from_fn_with_state(
      app_state.clone(),
      middleware::auth_middleware,
    ));

  Router::new()
    .route("/health", get(handlers::health_check))
    .merge(protected_routes)
}
