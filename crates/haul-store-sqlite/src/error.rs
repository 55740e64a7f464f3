//! Error type for `haul-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The stored record exists but does not decode to a valid session. The
  /// record has already been removed when this is returned.
  #[error("corrupt session record: {0}")]
  Corrupt(#[source] haul_core::Error),

  /// Encoding a session for storage failed.
  #[error("encode error: {0}")]
  Encode(#[source] haul_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),
}

impl Error {
  pub fn is_corrupt(&self) -> bool { matches!(self, Self::Corrupt(_)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
