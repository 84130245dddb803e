pub mod config;
pub mod generation;
pub mod keys;
pub mod session;
pub mod storage;
pub mod yaml_config;
