use reqwest::StatusCode;

pub const CONNECTIVITY_MESSAGE: &str =
  "Unable to connect to the API. Please check your internet connection.";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
  #[error(
    "Client error: {} - {}",
    .status,
    .message.as_deref().unwrap_or("Bad request")
  )]
  ClientRequest {
    status: StatusCode,
    message: Option<String>,
  },

  #[error(
    "Server error: {} - {}",
    .status,
    .message.as_deref().unwrap_or("Server error")
  )]
  ServerRequest {
    status: StatusCode,
    message: Option<String>,
  },

  #[error("Network error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("Malformed response from the API: {0}")]
  Decode(#[from] serde_json::Error),

  #[error("{}", CONNECTIVITY_MESSAGE)]
  Connectivity,

  #[error("Invalid API URL: {0}")]
  InvalidUrl(#[from] url::ParseError),

  #[error("Invalid API path: {0}")]
  InvalidPath(String),
}

impl FetchError {
  /// Client errors are final; server and transport failures may be
  /// retried while the attempt budget lasts.
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      FetchError::ServerRequest { .. }
        | FetchError::Transport(_)
        | FetchError::Decode(_)
    )
  }
}
