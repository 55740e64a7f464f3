//! [`SessionController`] is the authentication state machine.

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Mutex, watch};

use haul_core::{
  ErrorKind, Session, SessionState,
  gate::{BearerSink, CredentialGate, GateError},
  payload::session_from_login,
  store::SessionStore,
};

use crate::RouteWatcher;

/// Owns the current [`SessionState`] and the persisted session record.
///
/// Transitions:
///
/// | from                    | operation  | to                                   |
/// |-------------------------|------------|--------------------------------------|
/// | any idle state          | `restore`  | `Restoring` → `Authenticated` / `Unauthenticated(None)` |
/// | `Idle`, `Unauthenticated` | `login`  | `Authenticating` → `Authenticated` / `Unauthenticated(err)` |
/// | any                     | `logout`   | `Unauthenticated(None)`              |
///
/// Operations are serialised. A `login` issued while another operation is
/// in flight is ignored and returns the current state; `restore` and
/// `logout` wait for the in-flight operation to settle, so a logout issued
/// during a login always wins.
///
/// No operation returns an error: failures are captured in
/// [`SessionState::Unauthenticated`].
pub struct SessionController<G, S, B> {
  gate:   G,
  store:  S,
  bearer: B,
  state:  watch::Sender<SessionState>,
  op:     Mutex<()>,
}

impl<G, S, B> SessionController<G, S, B>
where
  G: CredentialGate,
  S: SessionStore,
  B: BearerSink,
{
  /// Build a controller in the [`SessionState::Idle`] state.
  pub fn new(gate: G, store: S, bearer: B) -> Self {
    let (state, _) = watch::channel(SessionState::Idle);
    Self {
      gate,
      store,
      bearer,
      state,
      op: Mutex::new(()),
    }
  }

  // ── Observation ───────────────────────────────────────────────────────────

  /// A snapshot of the current state.
  pub fn state(&self) -> SessionState { self.state.borrow().clone() }

  /// Receive every published transition.
  pub fn subscribe(&self) -> watch::Receiver<SessionState> {
    self.state.subscribe()
  }

  /// Receive the top-level route for every published transition.
  pub fn routes(&self) -> RouteWatcher { RouteWatcher::new(self.subscribe()) }

  pub fn gate(&self) -> &G { &self.gate }

  pub fn store(&self) -> &S { &self.store }

  fn publish(&self, next: SessionState) {
    let previous = self.state.send_replace(next);
    tracing::debug!(
      from = previous.label(),
      to = self.state.borrow().label(),
      "session state transition"
    );
  }

  fn arm(&self, session: &Session) {
    self.bearer.set_bearer_token(Some(&session.token));
  }

  fn disarm(&self) { self.bearer.set_bearer_token(None); }

  // ── Operations ────────────────────────────────────────────────────────────

  /// Load the persisted session. Must complete before the first routing
  /// decision.
  ///
  /// A stored session with a non-empty token authenticates the process and
  /// arms the transport. No record, an empty token, or an unreadable record
  /// leaves the process signed out with the transport disarmed. Restoring
  /// twice against an unchanged store yields the same state.
  pub async fn restore(&self) -> SessionState {
    let _guard = self.op.lock().await;
    self.publish(SessionState::Restoring);

    let next = match self.store.load().await {
      Ok(Some(session)) if session.has_token() => {
        tracing::info!(
          subject = %session.subject_id,
          role = %session.role,
          token = %session.token,
          "restored persisted session"
        );
        self.arm(&session);
        SessionState::Authenticated { session }
      }
      Ok(Some(session)) => {
        tracing::info!(
          subject = %session.subject_id,
          "persisted session has no token; starting signed out"
        );
        self.disarm();
        SessionState::signed_out()
      }
      Ok(None) => {
        tracing::debug!("no persisted session");
        self.disarm();
        SessionState::signed_out()
      }
      Err(err) => {
        let kind = ErrorKind::CorruptPersistedState(err.to_string());
        tracing::warn!(error = %kind, "ignoring unreadable persisted session");
        self.disarm();
        SessionState::signed_out()
      }
    };

    self.publish(next.clone());
    next
  }

  /// Authenticate against the backend.
  ///
  /// `Authenticating` is published before any I/O. Ignored (returning the
  /// current state) unless the controller is `Idle` or `Unauthenticated` and
  /// no other operation is in flight.
  pub async fn login(&self, email: &str, password: &str) -> SessionState {
    let Ok(_guard) = self.op.try_lock() else {
      tracing::debug!("login ignored: another session operation is in flight");
      return self.state();
    };

    let current = self.state();
    if !matches!(
      current,
      SessionState::Idle | SessionState::Unauthenticated { .. }
    ) {
      tracing::debug!(state = current.label(), "login ignored");
      return current;
    }

    self.publish(SessionState::Authenticating);

    let next = match self.authenticate(email.trim(), password).await {
      Ok(session) => {
        self.arm(&session);
        SessionState::Authenticated { session }
      }
      Err(err) => {
        tracing::warn!(error = %err, "login failed");
        SessionState::failed(err)
      }
    };

    self.publish(next.clone());
    next
  }

  async fn authenticate(
    &self,
    email: &str,
    password: &str,
  ) -> Result<Session, ErrorKind> {
    let payload = self.gate.login(email, password).await?;
    let session = session_from_login(payload, email, Utc::now())?;

    // A storage failure costs persistence across restarts, not this login.
    if let Err(err) = self.store.save(&session).await {
      let kind = ErrorKind::Persistence(err.to_string());
      tracing::warn!(
        error = %kind,
        "session not persisted; it will not survive a restart"
      );
    }

    tracing::info!(
      subject = %session.subject_id,
      role = %session.role,
      token = %session.token,
      "signed in"
    );
    Ok(session)
  }

  /// Sign out. Never fails.
  ///
  /// The backend is told on a best-effort basis when a session is active;
  /// the transport is always disarmed, the store always cleared, and
  /// `Unauthenticated(None)` always published.
  pub async fn logout(&self) -> SessionState {
    let _guard = self.op.lock().await;

    let signed_in = self.state.borrow().is_authenticated();
    if signed_in && let Err(err) = self.gate.logout().await {
      tracing::warn!(error = %err, "backend logout failed; clearing locally");
    }

    self.disarm();
    if let Err(err) = self.store.clear().await {
      tracing::warn!(error = %err, "failed to clear persisted session");
    }

    tracing::info!("signed out");
    let next = SessionState::signed_out();
    self.publish(next.clone());
    next
  }

  /// Fetch the current user's profile. Read-only; does not change state.
  pub async fn fetch_profile(&self) -> Result<Value, GateError> {
    let signed_in = self.state.borrow().is_authenticated();
    if !signed_in {
      return Err(GateError::Rejected("not signed in".into()));
    }
    self.gate.fetch_profile().await
  }
}
