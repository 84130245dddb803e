pub mod aws;
pub mod generation;
pub mod session;
pub mod storage_client;
