//! The transport seams: the backend credential gate and the bearer slot.

use std::{future::Future, sync::Arc};

use serde_json::Value;
use thiserror::Error;

use crate::{BearerToken, ErrorKind};

/// Failure of a backend call, classified for the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
  /// Unreachable, timed out, or a server-side failure.
  #[error("network error: {0}")]
  Network(String),

  /// The backend refused the request (bad credentials, expired token).
  #[error("rejected: {0}")]
  Rejected(String),

  /// The backend answered with a body that is not a JSON document.
  #[error("malformed response: {0}")]
  Malformed(String),
}

impl From<GateError> for ErrorKind {
  fn from(err: GateError) -> Self {
    match err {
      GateError::Network(msg) => ErrorKind::Network(msg),
      GateError::Rejected(msg) => ErrorKind::InvalidCredentials(msg),
      GateError::Malformed(msg) => ErrorKind::MalformedResponse(msg),
    }
  }
}

/// Backend authentication endpoints.
///
/// Payloads are returned raw; validation happens in
/// [`crate::payload::session_from_login`].
pub trait CredentialGate: Send + Sync {
  /// Exchange credentials for `{ token, user }`.
  fn login<'a>(
    &'a self,
    email: &'a str,
    password: &'a str,
  ) -> impl Future<Output = Result<Value, GateError>> + Send + 'a;

  /// Invalidate the current credential server-side.
  fn logout(&self) -> impl Future<Output = Result<(), GateError>> + Send + '_;

  /// Read the current user's profile. Not part of the session lifecycle.
  fn fetch_profile(
    &self,
  ) -> impl Future<Output = Result<Value, GateError>> + Send + '_;
}

/// The transport's credential slot. Armed with the active token on login and
/// restore, disarmed on logout and failed restore.
pub trait BearerSink: Send + Sync {
  fn set_bearer_token(&self, token: Option<&BearerToken>);
}

impl<T: BearerSink + ?Sized> BearerSink for Arc<T> {
  fn set_bearer_token(&self, token: Option<&BearerToken>) {
    (**self).set_bearer_token(token);
  }
}
