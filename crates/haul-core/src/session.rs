//! The authenticated session snapshot and the controller's observable state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ErrorKind, Role};

// ─── Bearer token ────────────────────────────────────────────────────────────

/// An opaque bearer credential.
///
/// `Debug` and `Display` render a short SHA-256 fingerprint so a token can be
/// correlated across log lines without being written to them. Use
/// [`BearerToken::expose`] to obtain the value for an `Authorization` header.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
  pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

  pub fn expose(&self) -> &str { &self.0 }

  pub fn is_empty(&self) -> bool { self.0.trim().is_empty() }

  /// First four bytes of the SHA-256 digest, hex encoded.
  pub fn fingerprint(&self) -> String {
    let digest = Sha256::digest(self.0.as_bytes());
    hex::encode(&digest[..4])
  }
}

impl fmt::Debug for BearerToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "BearerToken({})", self.fingerprint())
  }
}

impl fmt::Display for BearerToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "sha256:{}", self.fingerprint())
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// The authenticated identity and credential bundle for the current user.
///
/// Sessions are only built from a validated login payload or a decoded
/// persisted record; an unmapped backend role never reaches this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
  /// Backend-assigned identifier, immutable once issued.
  pub subject_id:       String,
  pub email:            String,
  pub display_name:     String,
  pub role:             Role,
  pub token:            BearerToken,
  /// The unmodified backend user record. Display only; never consulted for
  /// authorization.
  pub raw_profile:      serde_json::Value,
  pub authenticated_at: DateTime<Utc>,
}

impl Session {
  /// Whether the session carries a usable credential.
  pub fn has_token(&self) -> bool { !self.token.is_empty() }
}

// ─── SessionState ────────────────────────────────────────────────────────────

/// The observable lifecycle phase of authentication. Exactly one variant is
/// active at a time; the initial value is [`SessionState::Idle`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
  /// No attempt yet.
  #[default]
  Idle,
  /// Loading the persisted session at startup.
  Restoring,
  /// A login request is in flight.
  Authenticating,
  Authenticated { session: Session },
  Unauthenticated { last_error: Option<ErrorKind> },
}

impl SessionState {
  pub fn signed_out() -> Self { Self::Unauthenticated { last_error: None } }

  pub fn failed(err: ErrorKind) -> Self {
    Self::Unauthenticated { last_error: Some(err) }
  }

  pub fn is_authenticated(&self) -> bool {
    matches!(self, Self::Authenticated { .. })
  }

  /// An operation is running and the state will change without caller input.
  pub fn is_pending(&self) -> bool {
    matches!(self, Self::Restoring | Self::Authenticating)
  }

  pub fn session(&self) -> Option<&Session> {
    match self {
      Self::Authenticated { session } => Some(session),
      _ => None,
    }
  }

  pub fn role(&self) -> Option<Role> { self.session().map(|s| s.role) }

  pub fn last_error(&self) -> Option<&ErrorKind> {
    match self {
      Self::Unauthenticated { last_error } => last_error.as_ref(),
      _ => None,
    }
  }

  /// Short lowercase name of the active variant, for logs.
  pub fn label(&self) -> &'static str {
    match self {
      Self::Idle => "idle",
      Self::Restoring => "restoring",
      Self::Authenticating => "authenticating",
      Self::Authenticated { .. } => "authenticated",
      Self::Unauthenticated { .. } => "unauthenticated",
    }
  }
}
