//! Top-level view selection from a [`SessionState`].

use crate::{ErrorKind, Role, SessionState};

/// The top-level experience to mount.
///
/// Exactly one role view corresponds to each [`Role`]; every state other
/// than `Authenticated` selects a non-role view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  /// Nothing decided yet (`Idle`, `Restoring`). Never a role view.
  Splash,
  /// The sign-in experience. `busy` while a login is in flight.
  SignIn {
    busy:  bool,
    error: Option<ErrorKind>,
  },
  FishermanHome,
  MiddleManHome,
  ExporterHome,
  MfdStaffHome,
}

impl Route {
  pub fn for_state(state: &SessionState) -> Self {
    match state {
      SessionState::Idle | SessionState::Restoring => Self::Splash,
      SessionState::Authenticating => Self::SignIn { busy: true, error: None },
      SessionState::Unauthenticated { last_error } => Self::SignIn {
        busy:  false,
        error: last_error.clone(),
      },
      SessionState::Authenticated { session } => Self::for_role(session.role),
    }
  }

  pub fn for_role(role: Role) -> Self {
    match role {
      Role::Fisherman => Self::FishermanHome,
      Role::MiddleMan => Self::MiddleManHome,
      Role::Exporter => Self::ExporterHome,
      Role::MfdStaff => Self::MfdStaffHome,
    }
  }

  /// The role this view belongs to, if it is a role view.
  pub fn role(&self) -> Option<Role> {
    match self {
      Self::FishermanHome => Some(Role::Fisherman),
      Self::MiddleManHome => Some(Role::MiddleMan),
      Self::ExporterHome => Some(Role::Exporter),
      Self::MfdStaffHome => Some(Role::MfdStaff),
      Self::Splash | Self::SignIn { .. } => None,
    }
  }

  pub fn path(&self) -> &'static str {
    match self {
      Self::Splash => "/",
      Self::SignIn { .. } => "/sign-in",
      Self::FishermanHome => "/fisherman",
      Self::MiddleManHome => "/middle-man",
      Self::ExporterHome => "/exporter",
      Self::MfdStaffHome => "/mfd",
    }
  }
}

impl From<&SessionState> for Route {
  fn from(state: &SessionState) -> Self { Self::for_state(state) }
}
