//! [`SqliteSessionStore`]: the SQLite implementation of [`SessionStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use haul_core::{
  Session,
  store::{SESSION_KEY, SessionStore, decode_record, encode_record},
};

use crate::{Error, Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A session store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteSessionStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteSessionStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Write raw text under the session key, bypassing encoding.
  pub(crate) async fn put_raw(&self, value: String) -> Result<()> {
    let at_str = Utc::now().to_rfc3339();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO entries (key, value, written_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE SET
             value      = excluded.value,
             written_at = excluded.written_at",
          rusqlite::params![SESSION_KEY, value, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Read the raw text under the session key.
  pub(crate) async fn get_raw(&self) -> Result<Option<String>> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM entries WHERE key = ?1",
              rusqlite::params![SESSION_KEY],
              |row| row.get::<_, String>(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(raw)
  }

  async fn delete(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute(
          "DELETE FROM entries WHERE key = ?1",
          rusqlite::params![SESSION_KEY],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteSessionStore {
  type Error = Error;

  async fn save(&self, session: &Session) -> Result<()> {
    let text = encode_record(session).map_err(Error::Encode)?;
    self.put_raw(text).await?;
    tracing::debug!(subject = %session.subject_id, "session record written");
    Ok(())
  }

  async fn load(&self) -> Result<Option<Session>> {
    let Some(text) = self.get_raw().await? else {
      return Ok(None);
    };

    match decode_record(&text) {
      Ok(session) => Ok(Some(session)),
      Err(err) => {
        tracing::warn!(error = %err, "discarding corrupt session record");
        self.delete().await?;
        Err(Error::Corrupt(err))
      }
    }
  }

  async fn clear(&self) -> Result<()> { self.delete().await }
}
