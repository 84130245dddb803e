use async_trait::async_trait;
use axum::http::HeaderMap;

/// Identity attached to a request once its session checks out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
  pub name: String,
}

#[async_trait]
pub trait SessionResolver: Send + Sync + 'static {
  /// Resolve the caller from request headers; `None` means no valid session
  async fn resolve(&self, headers: &HeaderMap) -> Option<AuthenticatedUser>;
}
