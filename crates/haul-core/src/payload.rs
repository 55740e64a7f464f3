//! Validation of raw login payloads into [`Session`] values.
//!
//! The backend answers a successful login with
//! `{ "token": "...", "user": { "id": 1, "email": "...", "name": "...", "role": "..." } }`.
//! Older deployments name the role field `roleRaw`. A payload missing the
//! token, the user record, or the role field is rejected before role
//! resolution; an unresolvable role is rejected before any `Session` exists.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{BearerToken, ErrorKind, Session, role};

/// Keys that may carry the backend role, in lookup order.
const ROLE_KEYS: &[&str] = &["role", "roleRaw", "role_raw"];

#[derive(Debug, Deserialize)]
struct LoginPayload {
  #[serde(default)]
  token: Option<String>,
  #[serde(default)]
  user:  Option<Value>,
}

fn malformed(msg: impl Into<String>) -> ErrorKind {
  ErrorKind::MalformedResponse(msg.into())
}

/// Read an optional string field, rejecting non-string values.
fn text_field<'a>(user: &'a Value, key: &str) -> Result<Option<&'a str>, ErrorKind> {
  match user.get(key) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.as_str())),
    Some(_) => Err(malformed(format!("user field {key:?} is not a string"))),
  }
}

/// Backend ids arrive as strings or integers; both are kept as text.
fn subject_id(user: &Value) -> Option<String> {
  match user.get("id")? {
    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

/// Build a [`Session`] from a raw login payload.
///
/// `login_email` is the trimmed address the user submitted; it stands in when
/// the user record omits `email`.
pub fn session_from_login(
  payload: Value,
  login_email: &str,
  now: DateTime<Utc>,
) -> Result<Session, ErrorKind> {
  let LoginPayload { token, user } = serde_json::from_value(payload)
    .map_err(|e| malformed(format!("unexpected login payload shape: {e}")))?;

  let token = token
    .filter(|t| !t.trim().is_empty())
    .ok_or_else(|| malformed("response carries no token"))?;

  let user = user
    .filter(Value::is_object)
    .ok_or_else(|| malformed("response carries no user record"))?;

  let mut role_raw = None;
  for key in ROLE_KEYS {
    if let Some(raw) = text_field(&user, key)? {
      role_raw = Some(raw);
      break;
    }
  }
  let role_raw = role_raw.ok_or_else(|| malformed("user record has no role"))?;
  let role = role::resolve(Some(role_raw))?;

  let subject_id =
    subject_id(&user).ok_or_else(|| malformed("user record has no id"))?;
  let email = text_field(&user, "email")?
    .map(str::trim)
    .filter(|e| !e.is_empty())
    .unwrap_or(login_email)
    .to_owned();
  let display_name = text_field(&user, "name")?
    .map(str::trim)
    .filter(|n| !n.is_empty())
    .map(str::to_owned)
    .unwrap_or_else(|| email.clone());

  Ok(Session {
    subject_id,
    email,
    display_name,
    role,
    token: BearerToken::new(token),
    raw_profile: user,
    authenticated_at: now,
  })
}
