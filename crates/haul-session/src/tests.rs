//! State machine tests with scripted collaborators.

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicUsize, Ordering},
};

use chrono::Utc;
use haul_core::{
  BearerToken, ErrorKind, Role, Route, Session, SessionState,
  gate::{BearerSink, CredentialGate, GateError},
  store::SessionStore,
};
use haul_store_sqlite::SqliteSessionStore;
use serde_json::{Value, json};
use tokio::sync::Notify;

use crate::SessionController;

// ─── Fakes ───────────────────────────────────────────────────────────────────

/// A gate whose replies are fixed up front. When `hold` is set, `login`
/// parks until it is notified.
#[derive(Default)]
struct ScriptedGate {
  login_reply:  Mutex<Option<Result<Value, GateError>>>,
  logout_reply: Mutex<Option<GateError>>,
  hold:         Option<Arc<Notify>>,
  logins:       Mutex<Vec<(String, String)>>,
  logouts:      AtomicUsize,
}

impl ScriptedGate {
  fn replying(reply: Result<Value, GateError>) -> Self {
    Self {
      login_reply: Mutex::new(Some(reply)),
      ..Self::default()
    }
  }

  fn failing_logout(self, err: GateError) -> Self {
    *self.logout_reply.lock().unwrap() = Some(err);
    self
  }

  fn held(mut self, hold: Arc<Notify>) -> Self {
    self.hold = Some(hold);
    self
  }

  fn login_count(&self) -> usize { self.logins.lock().unwrap().len() }
}

impl CredentialGate for ScriptedGate {
  async fn login(&self, email: &str, password: &str) -> Result<Value, GateError> {
    self
      .logins
      .lock()
      .unwrap()
      .push((email.to_owned(), password.to_owned()));
    let reply = self
      .login_reply
      .lock()
      .unwrap()
      .clone()
      .unwrap_or_else(|| Err(GateError::Network("no scripted reply".into())));
    if let Some(hold) = &self.hold {
      hold.notified().await;
    }
    reply
  }

  async fn logout(&self) -> Result<(), GateError> {
    self.logouts.fetch_add(1, Ordering::SeqCst);
    match self.logout_reply.lock().unwrap().clone() {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  async fn fetch_profile(&self) -> Result<Value, GateError> {
    Ok(json!({ "id": 1, "name": "Ali" }))
  }
}

/// Records every value the transport was armed with.
#[derive(Default)]
struct RecordingBearer {
  history: Mutex<Vec<Option<String>>>,
}

impl RecordingBearer {
  fn last(&self) -> Option<Option<String>> {
    self.history.lock().unwrap().last().cloned()
  }
}

impl BearerSink for RecordingBearer {
  fn set_bearer_token(&self, token: Option<&BearerToken>) {
    self
      .history
      .lock()
      .unwrap()
      .push(token.map(|t| t.expose().to_owned()));
  }
}

#[derive(Debug, thiserror::Error)]
enum FakeStoreError {
  #[error("disk full")]
  Full,
  #[error("record does not decode")]
  Corrupt,
}

/// In-memory store that counts writes and can be told to fail.
#[derive(Default)]
struct MemoryStore {
  record:    Mutex<Option<Session>>,
  saves:     AtomicUsize,
  fail_save: bool,
  corrupt:   bool,
}

impl SessionStore for MemoryStore {
  type Error = FakeStoreError;

  async fn save(&self, session: &Session) -> Result<(), FakeStoreError> {
    if self.fail_save {
      return Err(FakeStoreError::Full);
    }
    self.saves.fetch_add(1, Ordering::SeqCst);
    *self.record.lock().unwrap() = Some(session.clone());
    Ok(())
  }

  async fn load(&self) -> Result<Option<Session>, FakeStoreError> {
    if self.corrupt {
      return Err(FakeStoreError::Corrupt);
    }
    Ok(self.record.lock().unwrap().clone())
  }

  async fn clear(&self) -> Result<(), FakeStoreError> {
    *self.record.lock().unwrap() = None;
    Ok(())
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

type Controller<S = MemoryStore> =
  SessionController<ScriptedGate, S, Arc<RecordingBearer>>;

fn fisherman_reply() -> Result<Value, GateError> {
  Ok(json!({
    "token": "abc123",
    "user": { "id": 1, "email": "fish@demo.com", "name": "Ali", "roleRaw": "fisherman" }
  }))
}

fn stored_session(token: &str) -> Session {
  Session {
    subject_id:       "7".into(),
    email:            "export@demo.com".into(),
    display_name:     "Sara".into(),
    role:             Role::Exporter,
    token:            BearerToken::new(token),
    raw_profile:      json!({ "id": 7, "role": "exporter" }),
    authenticated_at: Utc::now(),
  }
}

fn controller_with<S: SessionStore>(
  gate: ScriptedGate,
  store: S,
) -> (Controller<S>, Arc<RecordingBearer>) {
  let bearer = Arc::new(RecordingBearer::default());
  (SessionController::new(gate, store, bearer.clone()), bearer)
}

fn controller(gate: ScriptedGate) -> (Controller, Arc<RecordingBearer>) {
  controller_with(gate, MemoryStore::default())
}

// ─── Restore ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn starts_idle() {
  let (ctl, _) = controller(ScriptedGate::default());
  assert_eq!(ctl.state(), SessionState::Idle);
  assert_eq!(ctl.routes().current(), Route::Splash);
}

#[tokio::test]
async fn restore_with_empty_store_is_signed_out() {
  let (ctl, bearer) = controller(ScriptedGate::default());

  let state = ctl.restore().await;

  assert_eq!(state, SessionState::signed_out());
  assert_eq!(ctl.state(), SessionState::signed_out());
  assert_eq!(bearer.last(), Some(None));
}

#[tokio::test]
async fn restore_with_persisted_session_authenticates_and_arms() {
  let store = MemoryStore::default();
  *store.record.lock().unwrap() = Some(stored_session("persisted"));
  let (ctl, bearer) = controller_with(ScriptedGate::default(), store);

  let state = ctl.restore().await;

  assert_eq!(state.role(), Some(Role::Exporter));
  assert_eq!(bearer.last(), Some(Some("persisted".into())));
  assert_eq!(ctl.routes().current(), Route::ExporterHome);
}

#[tokio::test]
async fn restore_with_empty_token_is_signed_out() {
  let store = MemoryStore::default();
  *store.record.lock().unwrap() = Some(stored_session(""));
  let (ctl, bearer) = controller_with(ScriptedGate::default(), store);

  assert_eq!(ctl.restore().await, SessionState::signed_out());
  assert_eq!(bearer.last(), Some(None));
}

#[tokio::test]
async fn restore_with_corrupt_record_is_signed_out() {
  let store = MemoryStore {
    corrupt: true,
    ..MemoryStore::default()
  };
  let (ctl, bearer) = controller_with(ScriptedGate::default(), store);

  assert_eq!(ctl.restore().await, SessionState::signed_out());
  assert_eq!(bearer.last(), Some(None));
}

#[tokio::test]
async fn restore_twice_yields_same_state() {
  let store = MemoryStore::default();
  *store.record.lock().unwrap() = Some(stored_session("persisted"));
  let (ctl, _) = controller_with(ScriptedGate::default(), store);

  let first = ctl.restore().await;
  let second = ctl.restore().await;
  assert_eq!(first, second);
  assert_eq!(ctl.store().saves.load(Ordering::SeqCst), 0);

  let (empty, _) = controller(ScriptedGate::default());
  assert_eq!(empty.restore().await, empty.restore().await);
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn demo_fisherman_login() {
  let (ctl, bearer) = controller(ScriptedGate::replying(fisherman_reply()));

  let state = ctl.login("fish@demo.com", "123456").await;

  let session = state.session().expect("authenticated");
  assert_eq!(session.role, Role::Fisherman);
  assert_eq!(session.token.expose(), "abc123");
  assert_eq!(session.display_name, "Ali");
  assert_eq!(bearer.last(), Some(Some("abc123".into())));
  assert_eq!(ctl.routes().current(), Route::FishermanHome);
}

#[tokio::test]
async fn login_persists_resolved_role_and_token() {
  let store = SqliteSessionStore::open_in_memory().await.unwrap();
  let (ctl, _) =
    controller_with(ScriptedGate::replying(fisherman_reply()), store);

  ctl.login("fish@demo.com", "123456").await;

  let loaded = ctl.store().load().await.unwrap().expect("record written");
  assert_eq!(loaded.role, Role::Fisherman);
  assert_eq!(loaded.token.expose(), "abc123");
}

#[tokio::test]
async fn login_trims_email_but_not_password() {
  let (ctl, _) = controller(ScriptedGate::replying(fisherman_reply()));

  ctl.login("  fish@demo.com \n", " 123456 ").await;

  let logins = ctl.gate().logins.lock().unwrap().clone();
  assert_eq!(logins, vec![(String::from("fish@demo.com"), String::from(" 123456 "))]);
}

#[tokio::test]
async fn unsupported_role_is_rejected_without_persisting() {
  let (ctl, bearer) = controller(ScriptedGate::replying(Ok(json!({
    "token": "t",
    "user": { "roleRaw": "accountant" }
  }))));

  let state = ctl.login("acc@demo.com", "pw").await;

  assert_eq!(
    state,
    SessionState::failed(ErrorKind::UnsupportedRole("accountant".into()))
  );
  assert_eq!(ctl.store().saves.load(Ordering::SeqCst), 0);
  assert!(ctl.store().load().await.unwrap().is_none());
  assert!(bearer.last().is_none());
}

#[tokio::test]
async fn missing_token_is_malformed_without_persisting() {
  let (ctl, _) = controller(ScriptedGate::replying(Ok(json!({
    "user": { "id": 1, "roleRaw": "fisherman" }
  }))));

  let state = ctl.login("fish@demo.com", "123456").await;

  assert!(matches!(
    state.last_error(),
    Some(ErrorKind::MalformedResponse(_))
  ));
  assert_eq!(ctl.store().saves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn network_failure_is_captured_in_state() {
  let (ctl, _) = controller(ScriptedGate::replying(Err(GateError::Network(
    "connection refused".into(),
  ))));

  let state = ctl.login("fish@demo.com", "123456").await;

  assert_eq!(
    state,
    SessionState::failed(ErrorKind::Network("connection refused".into()))
  );
  assert!(matches!(ctl.routes().current(), Route::SignIn { busy: false, error: Some(_) }));
}

#[tokio::test]
async fn rejected_credentials_are_reported() {
  let (ctl, _) = controller(ScriptedGate::replying(Err(GateError::Rejected(
    "wrong password".into(),
  ))));

  let state = ctl.login("fish@demo.com", "nope").await;
  assert!(matches!(
    state.last_error(),
    Some(ErrorKind::InvalidCredentials(_))
  ));
}

#[tokio::test]
async fn failed_save_still_authenticates_this_process() {
  let store = MemoryStore {
    fail_save: true,
    ..MemoryStore::default()
  };
  let (ctl, bearer) =
    controller_with(ScriptedGate::replying(fisherman_reply()), store);

  let state = ctl.login("fish@demo.com", "123456").await;

  assert!(state.is_authenticated());
  assert_eq!(bearer.last(), Some(Some("abc123".into())));
  assert!(ctl.store().load().await.unwrap().is_none());
}

#[tokio::test]
async fn login_after_failure_can_succeed() {
  let (ctl, _) = controller(ScriptedGate::replying(Err(GateError::Network(
    "timeout".into(),
  ))));
  assert!(!ctl.login("fish@demo.com", "123456").await.is_authenticated());

  *ctl.gate().login_reply.lock().unwrap() = Some(fisherman_reply());
  assert!(ctl.login("fish@demo.com", "123456").await.is_authenticated());
}

#[tokio::test]
async fn login_while_authenticated_is_ignored() {
  let (ctl, _) = controller(ScriptedGate::replying(fisherman_reply()));
  let first = ctl.login("fish@demo.com", "123456").await;

  let second = ctl.login("other@demo.com", "pw").await;

  assert_eq!(first, second);
  assert_eq!(ctl.gate().login_count(), 1);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_login_is_ignored() {
  let hold = Arc::new(Notify::new());
  let (ctl, _) = controller(
    ScriptedGate::replying(fisherman_reply()).held(hold.clone()),
  );

  let (first, second, ()) = tokio::join!(
    ctl.login("fish@demo.com", "123456"),
    async {
      tokio::task::yield_now().await;
      // The first login has published before reaching the network.
      assert_eq!(ctl.state(), SessionState::Authenticating);
      ctl.login("fish@demo.com", "123456").await
    },
    async {
      tokio::task::yield_now().await;
      tokio::task::yield_now().await;
      hold.notify_one();
    },
  );

  assert!(first.is_authenticated());
  assert_eq!(second, SessionState::Authenticating);
  assert_eq!(ctl.gate().login_count(), 1);
}

#[tokio::test]
async fn logout_during_login_wins() {
  let hold = Arc::new(Notify::new());
  let (ctl, bearer) = controller(
    ScriptedGate::replying(fisherman_reply()).held(hold.clone()),
  );

  let (login, logout, ()) = tokio::join!(
    ctl.login("fish@demo.com", "123456"),
    async {
      tokio::task::yield_now().await;
      ctl.logout().await
    },
    async {
      tokio::task::yield_now().await;
      tokio::task::yield_now().await;
      hold.notify_one();
    },
  );

  assert!(login.is_authenticated());
  assert_eq!(logout, SessionState::signed_out());
  assert_eq!(ctl.state(), SessionState::signed_out());
  assert_eq!(bearer.last(), Some(None));
  assert!(ctl.store().load().await.unwrap().is_none());
}

// ─── Logout ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn logout_clears_everything() {
  let (ctl, bearer) = controller(ScriptedGate::replying(fisherman_reply()));
  ctl.login("fish@demo.com", "123456").await;

  let state = ctl.logout().await;

  assert_eq!(state, SessionState::signed_out());
  assert_eq!(bearer.last(), Some(None));
  assert!(ctl.store().load().await.unwrap().is_none());
  assert_eq!(ctl.gate().logouts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn logout_clears_locally_when_network_fails() {
  let gate = ScriptedGate::replying(fisherman_reply())
    .failing_logout(GateError::Network("unreachable".into()));
  let (ctl, bearer) = controller(gate);
  ctl.login("fish@demo.com", "123456").await;

  let state = ctl.logout().await;

  assert_eq!(state, SessionState::signed_out());
  assert_eq!(bearer.last(), Some(None));
  assert!(ctl.store().load().await.unwrap().is_none());
}

#[tokio::test]
async fn logout_when_signed_out_skips_backend() {
  let (ctl, _) = controller(ScriptedGate::default());
  ctl.restore().await;

  assert_eq!(ctl.logout().await, SessionState::signed_out());
  assert_eq!(ctl.gate().logouts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn login_then_restart_restores_session() {
  let store = SqliteSessionStore::open_in_memory().await.unwrap();
  let (ctl, _) =
    controller_with(ScriptedGate::replying(fisherman_reply()), store.clone());
  ctl.login("fish@demo.com", "123456").await;
  drop(ctl);

  // A fresh controller over the same store stands in for a restarted process.
  let (restarted, bearer) = controller_with(ScriptedGate::default(), store);
  let state = restarted.restore().await;

  assert_eq!(state.role(), Some(Role::Fisherman));
  assert_eq!(bearer.last(), Some(Some("abc123".into())));
}

// ─── Profile & routes ────────────────────────────────────────────────────────

#[tokio::test]
async fn profile_requires_authentication() {
  let (ctl, _) = controller(ScriptedGate::replying(fisherman_reply()));
  assert!(matches!(
    ctl.fetch_profile().await,
    Err(GateError::Rejected(_))
  ));

  ctl.login("fish@demo.com", "123456").await;
  assert_eq!(ctl.fetch_profile().await.unwrap()["name"], "Ali");
  assert!(ctl.state().is_authenticated());
}

#[tokio::test]
async fn route_watcher_follows_transitions() {
  let (ctl, _) = controller(ScriptedGate::replying(fisherman_reply()));
  let mut routes = ctl.routes();

  ctl.restore().await;
  assert_eq!(
    routes.settled().await,
    Some(Route::SignIn { busy: false, error: None })
  );

  ctl.login("fish@demo.com", "123456").await;
  assert_eq!(routes.changed().await, Some(Route::FishermanHome));

  ctl.logout().await;
  assert_eq!(
    routes.changed().await,
    Some(Route::SignIn { busy: false, error: None })
  );
}

#[tokio::test]
async fn route_watcher_ends_with_controller() {
  let (ctl, _) = controller(ScriptedGate::default());
  let mut routes = ctl.routes();
  drop(ctl);
  assert_eq!(routes.changed().await, None);
}
