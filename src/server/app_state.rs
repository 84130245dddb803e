use crate::domain::{generation::GenerationProvider, session::SessionResolver};
use crate::infra::storage_client::StorageClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub storage: Arc<StorageClient>,
  pub generation: Arc<dyn GenerationProvider>,
  pub sessions: Arc<dyn SessionResolver>,
  /// Request body limit for uploads
  pub max_upload_bytes: usize,
}
