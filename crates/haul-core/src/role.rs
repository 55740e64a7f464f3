//! Application roles and the resolver that maps backend role text onto them.
//!
//! Backend role vocabularies vary ("Fisherman", "auction_agent",
//! "super_admin", ...), so resolution is a case-insensitive substring match
//! over an ordered rule table. The first matching rule wins: a value such as
//! `"super-fisher"` satisfies both the fisherman and staff rules and resolves
//! to [`Role::Fisherman`] because that rule is listed first.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ErrorKind;

// ─── Role ────────────────────────────────────────────────────────────────────

/// The closed set of application roles. Each selects exactly one top-level
/// view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Fisherman,
  MiddleMan,
  Exporter,
  MfdStaff,
}

impl Role {
  pub const ALL: [Role; 4] =
    [Self::Fisherman, Self::MiddleMan, Self::Exporter, Self::MfdStaff];

  /// The canonical tag, matching the serde representation.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Fisherman => "fisherman",
      Self::MiddleMan => "middle_man",
      Self::Exporter => "exporter",
      Self::MfdStaff => "mfd_staff",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Exact parse of a canonical tag. Use [`resolve`] for backend text.
impl FromStr for Role {
  type Err = RoleError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|role| role.as_str() == s)
      .ok_or_else(|| RoleError::Unsupported { raw: s.to_owned() })
  }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleError {
  #[error("unsupported role: {raw:?}")]
  Unsupported { raw: String },
}

impl From<RoleError> for ErrorKind {
  fn from(err: RoleError) -> Self {
    match err {
      RoleError::Unsupported { raw } => ErrorKind::UnsupportedRole(raw),
    }
  }
}

/// One row of the resolution table: any needle found in the normalised
/// input selects `role`.
#[derive(Debug, Clone, Copy)]
pub struct RoleRule {
  pub needles: &'static [&'static str],
  pub role:    Role,
}

impl RoleRule {
  /// `haystack` must already be trimmed and lower-cased.
  pub fn matches(&self, haystack: &str) -> bool {
    self.needles.iter().any(|needle| haystack.contains(needle))
  }
}

/// Resolution rules in precedence order.
///
/// "fish" subsumes "fisher", so every fisher-style tag and every tag
/// mentioning fish resolves to a fisherman.
pub const RULES: &[RoleRule] = &[
  RoleRule { needles: &["fish"],                  role: Role::Fisherman },
  RoleRule { needles: &["middle", "auction"],     role: Role::MiddleMan },
  RoleRule { needles: &["export"],                role: Role::Exporter },
  RoleRule { needles: &["mfd", "staff", "super"], role: Role::MfdStaff },
];

/// Map raw backend role text onto a [`Role`].
///
/// `None`, empty and whitespace-only input always fail.
pub fn resolve(raw: Option<&str>) -> Result<Role, RoleError> {
  let raw = raw.unwrap_or_default();
  let normalised = raw.trim().to_lowercase();
  if normalised.is_empty() {
    return Err(RoleError::Unsupported { raw: raw.to_owned() });
  }

  RULES
    .iter()
    .find(|rule| rule.matches(&normalised))
    .map(|rule| rule.role)
    .ok_or_else(|| RoleError::Unsupported { raw: raw.to_owned() })
}
