use std::collections::HashMap;
use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
  MissingField(&'static str),
  Invalid(&'static str),
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::MissingField(field) => {
        writeln!(f)?;
        writeln!(f, "Configuration Error: Missing required field")?;
        writeln!(f)?;

        match *field {
          "storage.secretAccessKey" => {
            writeln!(f, "Storage credentials must be provided as a complete pair.")?;
            writeln!(f)?;
            writeln!(f, "You provided accessKeyId but not secretAccessKey.")?;
          },
          "storage.accessKeyId" => {
            writeln!(f, "Storage credentials must be provided as a complete pair.")?;
            writeln!(f)?;
            writeln!(f, "You provided secretAccessKey but not accessKeyId.")?;
          },
          "generation.apiKey" => {
            writeln!(f, "An API key for the image generation provider is required.")?;
            writeln!(f)?;
            writeln!(f, "Provide it via:")?;
            writeln!(f, "  1. generation.apiKey in the config file")?;
            writeln!(f, "  2. generation.apiKeyEnv naming an environment variable")?;
          },
          "sessions" => {
            writeln!(f, "At least one session token is required for client authentication.")?;
            writeln!(f)?;
            writeln!(f, "Each entry needs a name and accessToken (or accessTokenEnv).")?;
          },
          _ => {
            writeln!(f, "Field: {}", field)?;
            writeln!(f)?;
            writeln!(f, "Please provide this required configuration parameter.")?;
          },
        }
      },
      ConfigError::Invalid(msg) => {
        writeln!(f)?;
        writeln!(f, "Configuration Error: Invalid value")?;
        writeln!(f)?;
        writeln!(f, "{}", msg)?;
        writeln!(f)?;
      },
    }

    writeln!(f, "Run with --help for more information.")
  }
}

/// Session tokens keyed by user name
#[derive(Debug, Clone)]
pub struct TokenRegistry {
  tokens: HashMap<String, String>, // user -> token
}

impl TokenRegistry {
  /// Build from `(user, token)` pairs; blank entries are rejected
  pub fn from_pairs<I>(pairs: I) -> Result<Self, ConfigError>
  where
    I: IntoIterator<Item = (String, String)>,
  {
    let mut tokens = HashMap::new();

    for (name, token) in pairs {
      let name = name.trim().to_string();
      let token = token.trim().to_string();

      if name.is_empty() || token.is_empty() {
        return Err(ConfigError::Invalid("Session name and token cannot be empty"));
      }
      if tokens.contains_key(&name) {
        return Err(ConfigError::Invalid("Session names must be unique"));
      }

      tokens.insert(name, token);
    }

    if tokens.is_empty() {
      return Err(ConfigError::MissingField("sessions"));
    }

    Ok(Self { tokens })
  }

  /// `(user, token)` pairs
  pub fn entries(&self) -> impl Iterator<Item = (&String, &String)> {
    self.tokens.iter()
  }

  pub fn user_names(&self) -> impl Iterator<Item = &String> {
    self.tokens.keys()
  }
}

/// Accepts only absolute http(s) URLs
pub fn validate_http_url(url: &str, message: &'static str) -> Result<(), ConfigError> {
  if !url.starts_with("http://") && !url.starts_with("https://") {
    return Err(ConfigError::Invalid(message));
  }
  Ok(())
}
