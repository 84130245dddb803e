use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
  #[error("Server error: {0}")]
  Server(#[from] std::io::Error),
}
