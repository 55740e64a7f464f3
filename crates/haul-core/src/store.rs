//! The `SessionStore` trait and the persisted record format.
//!
//! The trait is implemented by storage backends (e.g. `haul-store-sqlite`).
//! The controller depends on this abstraction, not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{Error, Result, Session};

/// The single reserved key under which the session record lives.
pub const SESSION_KEY: &str = "session";

/// Current version of the persisted record envelope.
pub const RECORD_VERSION: u32 = 1;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable persistence of at most one [`Session`].
///
/// Writing replaces any prior record atomically: readers observe either the
/// old record or the new one, never a mix.
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `session`, replacing any existing record.
  fn save<'a>(
    &'a self,
    session: &'a Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Load the stored session. Returns `None` if no record exists.
  ///
  /// A record that does not decode to a valid [`Session`] is an error, never
  /// a partially filled value.
  fn load(
    &self,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// Remove the record. Clearing an empty store succeeds.
  fn clear(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Record codec ────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct RecordOut<'a> {
  version: u32,
  session: &'a Session,
}

#[derive(Deserialize)]
struct RecordIn {
  version: u32,
  session: serde_json::Value,
}

/// Serialise `session` into the versioned JSON envelope.
pub fn encode_record(session: &Session) -> Result<String> {
  Ok(serde_json::to_string(&RecordOut {
    version: RECORD_VERSION,
    session,
  })?)
}

/// Decode a persisted envelope. Every failure maps to
/// [`Error::CorruptRecord`] or [`Error::UnsupportedVersion`].
pub fn decode_record(text: &str) -> Result<Session> {
  let record: RecordIn = serde_json::from_str(text)
    .map_err(|e| Error::CorruptRecord(e.to_string()))?;

  if record.version != RECORD_VERSION {
    return Err(Error::UnsupportedVersion(record.version));
  }

  let session: Session = serde_json::from_value(record.session)
    .map_err(|e| Error::CorruptRecord(e.to_string()))?;

  if session.subject_id.trim().is_empty() {
    return Err(Error::CorruptRecord("empty subject id".into()));
  }
  Ok(session)
}
