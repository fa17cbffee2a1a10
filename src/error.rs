use std::error::Error as StdError;

use http::StatusCode;
use serde::Serialize;

use crate::{api::FetchError, image::relay::RelayError};

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  ClientRequest,
  ServerRequest,
  Transport,
  Connectivity,
  RelayValidation,
  RelayUpstream,
  Internal,
}

/// An error narrowed down to something safe to show: a coarse kind and a
/// plain message, never a debug dump.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
  pub kind: ErrorKind,
  pub message: String,
}

impl ErrorReport {
  pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
    let message = message.into();
    let message = if message.trim().is_empty() {
      UNKNOWN_ERROR.to_owned()
    } else {
      message
    };
    Self { kind, message }
  }

  /// Walks the source chain and reports the first error of a known type.
  /// Anything else becomes `Internal` with the outermost message.
  pub fn from_error(e: &(dyn StdError + 'static)) -> Self {
    let mut cause = Some(e);
    while let Some(current) = cause {
      if let Some(fetch) = current.downcast_ref::<FetchError>() {
        return Self::from(fetch);
      }
      if let Some(relay) = current.downcast_ref::<RelayError>() {
        return Self::from(relay);
      }
      cause = current.source();
    }

    Self::new(ErrorKind::Internal, e.to_string())
  }

  pub fn title(&self) -> &'static str {
    match self.kind {
      ErrorKind::Connectivity => "Connection problem",
      ErrorKind::ClientRequest => "Request rejected",
      ErrorKind::ServerRequest | ErrorKind::Transport => "Service unavailable",
      ErrorKind::RelayValidation | ErrorKind::RelayUpstream => "Image error",
      ErrorKind::Internal => "Something went wrong",
    }
  }

  /// The status a JSON endpoint answers with for this report.
  pub fn status(&self) -> StatusCode {
    match self.kind {
      ErrorKind::Connectivity => StatusCode::SERVICE_UNAVAILABLE,
      ErrorKind::ClientRequest
      | ErrorKind::ServerRequest
      | ErrorKind::Transport => StatusCode::BAD_GATEWAY,
      ErrorKind::RelayValidation => StatusCode::BAD_REQUEST,
      ErrorKind::RelayUpstream | ErrorKind::Internal => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl From<&FetchError> for ErrorReport {
  fn from(e: &FetchError) -> Self {
    let kind = match e {
      FetchError::ClientRequest { .. } => ErrorKind::ClientRequest,
      FetchError::ServerRequest { .. } => ErrorKind::ServerRequest,
      FetchError::Transport(_) | FetchError::Decode(_) => ErrorKind::Transport,
      FetchError::Connectivity => ErrorKind::Connectivity,
      FetchError::InvalidUrl(_) | FetchError::InvalidPath(_) => {
        ErrorKind::Internal
      }
    };
    Self::new(kind, e.to_string())
  }
}

impl From<&RelayError> for ErrorReport {
  fn from(e: &RelayError) -> Self {
    let kind = match e {
      RelayError::MissingUrl | RelayError::InvalidUrl(_) => {
        ErrorKind::RelayValidation
      }
      _ => ErrorKind::RelayUpstream,
    };
    Self::new(kind, e.to_string())
  }
}
