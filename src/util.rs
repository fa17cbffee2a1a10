pub mod date;

pub const USER_AGENT: &str =
  concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("YAML parse error: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("Invalid URL in config: {0}")]
  Url(#[from] url::ParseError),

  #[error("Invalid header value: {0}")]
  Header(#[from] http::header::InvalidHeaderValue),

  #[error("Failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),

  #[error("{0}")]
  Message(String),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Config error: {0}")]
  Config(#[from] ConfigError),
}
