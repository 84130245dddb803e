use crate::error::AppError;
use crate::server::app_state::AppState;
use crate::server::router::create_router;

pub async fn run_server(app_state: AppState, port: u16) -> Result<(), AppError> {
  let app = create_router(&app_state).with_state(app_state);
  let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

  tracing::info!("Server running on port {}", port);
  axum::serve(listener, app).await?;

  Ok(())
}
