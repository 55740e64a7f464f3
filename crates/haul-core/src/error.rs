//! Error types for `haul-core`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the fallible helpers in this crate (persisted record codec).
#[derive(Debug, Error)]
pub enum Error {
  #[error("persisted record is corrupt: {0}")]
  CorruptRecord(String),

  #[error("unsupported persisted record version: {0}")]
  UnsupportedVersion(u32),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The observable reason a session attempt ended unauthenticated.
///
/// Carried inside [`SessionState::Unauthenticated`](crate::SessionState) so
/// consumers inspect state instead of handling errors.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ErrorKind {
  /// The backend was unreachable or timed out. Retried only by re-submit.
  #[error("network error: {0}")]
  Network(String),

  /// The backend refused the credentials.
  #[error("invalid credentials: {0}")]
  InvalidCredentials(String),

  /// The backend reported success but the payload lacked a token or user.
  #[error("malformed response: {0}")]
  MalformedResponse(String),

  /// The backend role maps to no application role. Holds the raw value.
  #[error("unsupported role: {0:?}")]
  UnsupportedRole(String),

  #[error("persistence error: {0}")]
  Persistence(String),

  #[error("corrupt persisted state: {0}")]
  CorruptPersistedState(String),
}

impl ErrorKind {
  /// Whether re-submitting the same request could succeed without a server
  /// side fix.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Network(_) | Self::InvalidCredentials(_))
  }
}
