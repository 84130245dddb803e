use crate::domain::config::{validate_http_url, ConfigError, TokenRegistry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum YamlConfigError {
  #[error("Failed to read config file: {0}")]
  FileRead(#[from] std::io::Error),
  #[error("Failed to parse YAML: {0}")]
  YamlParse(#[from] serde_yml::Error),
  #[error("Configuration validation error: {0}")]
  Validation(String),
  #[error("Environment variable not found: {0}")]
  EnvVarNotFound(String),
  #[error("{0}")]
  Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSection {
  /// S3-compatible endpoint (an R2 endpoint carries the account id)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub endpoint: Option<String>,

  #[serde(default = "default_region")]
  pub region: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub access_key_id: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub access_key_id_env: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub secret_access_key: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub secret_access_key_env: Option<String>,

  /// Default bucket for uploads that don't name one
  #[serde(default)]
  pub bucket: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub bucket_env: Option<String>,

  /// Public domain override, e.g. a CDN in front of the bucket
  #[serde(skip_serializing_if = "Option::is_none")]
  pub public_domain: Option<String>,

  #[serde(default = "default_true")]
  pub force_path_style: bool,

  /// S3 operation timeout in seconds
  #[serde(default = "default_storage_timeout")]
  pub timeout: u64,

  #[serde(default = "default_max_download_bytes")]
  pub max_download_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSection {
  pub base_url: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub api_key_env: Option<String>,

  #[serde(default = "default_model")]
  pub model: String,

  #[serde(default = "default_quality")]
  pub quality: String,

  /// Request timeout in seconds
  #[serde(default = "default_generation_timeout")]
  pub timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
  /// User identity reported for requests carrying this token
  pub name: String,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub access_token: Option<String>,

  #[serde(skip_serializing_if = "Option::is_none")]
  pub access_token_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YamlConfig {
  pub storage: StorageSection,

  pub generation: GenerationSection,

  pub sessions: Vec<SessionConfig>,

  /// HTTP server port (optional, defaults to 3000)
  #[serde(default = "default_port")]
  pub port: u16,

  /// Largest accepted request body in bytes
  #[serde(default = "default_max_upload_bytes")]
  pub max_upload_bytes: usize,

  #[serde(default)]
  pub debug: bool,
}

fn default_port() -> u16 {
  3000
}

fn default_region() -> String {
  "auto".to_string()
}

fn default_true() -> bool {
  true
}

fn default_storage_timeout() -> u64 {
  30
}

fn default_generation_timeout() -> u64 {
  60
}

fn default_max_upload_bytes() -> usize {
  20 * 1024 * 1024
}

fn default_max_download_bytes() -> u64 {
  50 * 1024 * 1024
}

fn default_model() -> String {
  "nano-banana-2-lite".to_string()
}

fn default_quality() -> String {
  "2K".to_string()
}

impl YamlConfig {
  /// Load configuration from a YAML file
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, YamlConfigError> {
    let content = fs::read_to_string(path)?;
    Self::parse(&content)
  }

  pub fn parse(content: &str) -> Result<Self, YamlConfigError> {
    let config: YamlConfig = serde_yml::from_str(content)?;
    config.validate()?;
    Ok(config)
  }

  /// Structural checks that don't need the environment
  pub fn validate(&self) -> Result<(), YamlConfigError> {
    if let Some(endpoint) = &self.storage.endpoint {
      validate_http_url(endpoint, "storage.endpoint must start with http:// or https://")?;
    }
    if let Some(domain) = &self.storage.public_domain {
      validate_http_url(domain, "storage.publicDomain must start with http:// or https://")?;
    }
    validate_http_url(
      &self.generation.base_url,
      "generation.baseUrl must start with http:// or https://",
    )?;

    if self.sessions.is_empty() {
      return Err(ConfigError::MissingField("sessions").into());
    }

    let mut names = std::collections::HashSet::new();
    for session in &self.sessions {
      if session.name.trim().is_empty() {
        return Err(YamlConfigError::Validation(
          "Session name cannot be empty".to_string(),
        ));
      }
      if !names.insert(&session.name) {
        return Err(YamlConfigError::Validation(format!(
          "Duplicate session name: {}",
          session.name
        )));
      }
      if session.access_token.is_none() && session.access_token_env.is_none() {
        return Err(YamlConfigError::Validation(format!(
          "Session '{}' must have either accessToken or accessTokenEnv",
          session.name
        )));
      }
    }

    if self.port == 0 {
      return Err(YamlConfigError::Validation(
        "Port must be greater than 0".to_string(),
      ));
    }
    if self.max_upload_bytes == 0 {
      return Err(YamlConfigError::Validation(
        "maxUploadBytes must be greater than 0".to_string(),
      ));
    }

    Ok(())
  }

  /// Resolve all environment variables and return a resolved configuration
  pub fn resolve_env_vars(&self) -> Result<ResolvedConfig, YamlConfigError> {
    let storage = &self.storage;

    let access_key_id =
      Self::resolve_optional_env(&storage.access_key_id, &storage.access_key_id_env);
    let secret_access_key =
      Self::resolve_optional_env(&storage.secret_access_key, &storage.secret_access_key_env);

    match (&access_key_id, &secret_access_key) {
      (Some(_), None) => return Err(ConfigError::MissingField("storage.secretAccessKey").into()),
      (None, Some(_)) => return Err(ConfigError::MissingField("storage.accessKeyId").into()),
      _ => {},
    }

    let bucket = if storage.bucket.is_empty() {
      Self::resolve_optional_env(&None, &storage.bucket_env).unwrap_or_default()
    } else {
      storage.bucket.clone()
    };

    let api_key = match Self::resolve_required_env(
      &self.generation.api_key,
      &self.generation.api_key_env,
      "generation.apiKey",
    ) {
      Err(YamlConfigError::Validation(_)) => {
        return Err(ConfigError::MissingField("generation.apiKey").into())
      },
      other => other?,
    };

    let mut sessions = Vec::new();
    for session in &self.sessions {
      let token = Self::resolve_required_env(
        &session.access_token,
        &session.access_token_env,
        &format!("Session '{}' accessToken", session.name),
      )?;
      sessions.push((session.name.clone(), token));
    }
    let sessions = TokenRegistry::from_pairs(sessions)?;

    Ok(ResolvedConfig {
      storage: ResolvedStorageConfig {
        endpoint: storage.endpoint.clone(),
        region: storage.region.clone(),
        access_key_id,
        secret_access_key,
        default_bucket: bucket,
        public_domain: storage
          .public_domain
          .as_deref()
          .map(Self::strip_trailing_slash),
        force_path_style: storage.force_path_style,
        timeout: storage.timeout,
        max_download_bytes: storage.max_download_bytes,
      },
      generation: ResolvedGenerationConfig {
        base_url: Self::strip_trailing_slash(&self.generation.base_url),
        api_key,
        model: self.generation.model.clone(),
        quality: self.generation.quality.clone(),
        timeout: self.generation.timeout,
      },
      sessions,
      port: self.port,
      max_upload_bytes: self.max_upload_bytes,
      debug: self.debug,
    })
  }

  fn resolve_optional_env(value: &Option<String>, env_var: &Option<String>) -> Option<String> {
    match (value, env_var) {
      (Some(v), _) => Some(v.clone()),
      (None, Some(env_name)) => std::env::var(env_name).ok(),
      (None, None) => None,
    }
  }

  fn resolve_required_env(
    value: &Option<String>,
    env_var: &Option<String>,
    field_name: &str,
  ) -> Result<String, YamlConfigError> {
    match (value, env_var) {
      (Some(v), _) => Ok(v.clone()),
      (None, Some(env_name)) => std::env::var(env_name).map_err(|_| {
        YamlConfigError::EnvVarNotFound(format!(
          "{}: environment variable '{}' not found",
          field_name, env_name
        ))
      }),
      (None, None) => Err(YamlConfigError::Validation(format!(
        "{}: must be provided",
        field_name
      ))),
    }
  }

  fn strip_trailing_slash(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
  }
}

/// Fully resolved configuration with all environment variables loaded
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
  pub storage: ResolvedStorageConfig,
  pub generation: ResolvedGenerationConfig,
  pub sessions: TokenRegistry,
  pub port: u16,
  pub max_upload_bytes: usize,
  pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedStorageConfig {
  pub endpoint: Option<String>,
  pub region: String,
  pub access_key_id: Option<String>,
  pub secret_access_key: Option<String>,
  /// May be empty; uploads then have to name their bucket
  pub default_bucket: String,
  pub public_domain: Option<String>,
  pub force_path_style: bool,
  pub timeout: u64,
  pub max_download_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ResolvedGenerationConfig {
  pub base_url: String,
  pub api_key: String,
  pub model: String,
  pub quality: String,
  pub timeout: u64,
}
