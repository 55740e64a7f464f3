//! Command dispatcher over a restored [`SessionController`].

use anyhow::{Result, bail};
use haul_core::{Route, SessionState};
use haul_session::{RouteWatcher, SessionController};
use haul_store_sqlite::SqliteSessionStore;

use crate::client::ApiClient;

pub type Controller = SessionController<ApiClient, SqliteSessionStore, ApiClient>;

/// A user-facing action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  Login { email: String, password: String },
  Logout,
  Status,
  Profile,
}

/// Top-level application state: the controller plus a route subscription.
pub struct App {
  pub controller: Controller,
  pub routes:     RouteWatcher,
}

impl App {
  /// Build the controller and run the startup restore. No routing decision
  /// is made before this returns.
  pub async fn start(client: ApiClient, store: SqliteSessionStore) -> Self {
    let controller = SessionController::new(client.clone(), store, client);
    let routes = controller.routes();
    tokio::spawn(log_routes(controller.routes()));

    controller.restore().await;
    Self { controller, routes }
  }

  /// Perform `action` and return the lines to print.
  pub async fn run(&self, action: Action) -> Result<Vec<String>> {
    match action {
      Action::Login { email, password } => {
        let state = self.controller.login(&email, &password).await;
        if let Some(err) = state.last_error() {
          bail!("sign-in failed: {err}");
        }
        if !state.is_authenticated() {
          bail!("sign-in skipped: session is {}", state.label());
        }
        Ok(self.describe())
      }
      Action::Logout => {
        self.controller.logout().await;
        Ok(self.describe())
      }
      Action::Status => Ok(self.describe()),
      Action::Profile => {
        let profile = self.controller.fetch_profile().await?;
        Ok(vec![serde_json::to_string_pretty(&profile)?])
      }
    }
  }

  /// Render the current state and route.
  pub fn describe(&self) -> Vec<String> {
    let state = self.routes.state();
    let route = Route::for_state(&state);
    let mut lines = vec![
      format!("state:  {}", state.label()),
      format!("route:  {}", route.path()),
    ];
    if let Some(err) = state.last_error() {
      lines.push(format!("error:  {err}"));
    }
    if let SessionState::Authenticated { session } = &state {
      lines.push(format!(
        "user:   {} <{}> ({})",
        session.display_name, session.email, session.role
      ));
      lines.push(format!("token:  {}", session.token));
      lines.push(format!("since:  {}", session.authenticated_at.to_rfc3339()));
    }
    let armed = self.controller.gate().is_armed();
    lines.push(format!("bearer: {}", if armed { "armed" } else { "none" }));
    lines
  }
}

async fn log_routes(mut routes: RouteWatcher) {
  while let Some(route) = routes.changed().await {
    tracing::info!(route = route.path(), "route changed");
  }
}

#[cfg(test)]
mod tests {
  use std::{net::SocketAddr, time::Duration};

  use axum::{Json, Router, http::StatusCode, routing::post};
  use haul_core::Role;
  use serde_json::{Value, json};
  use tokio::net::TcpListener;

  use super::*;
  use crate::client::ApiConfig;

  async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let reply = match body["email"].as_str() {
      Some("fish@demo.com") => json!({
        "token": "abc123",
        "user": { "id": 1, "email": "fish@demo.com", "name": "Ali", "roleRaw": "fisherman" }
      }),
      _ => json!({ "token": "t", "user": { "roleRaw": "accountant" } }),
    };
    (StatusCode::OK, Json(reply))
  }

  async fn serve() -> SocketAddr {
    let app = Router::new()
      .route("/api/auth/login", post(login))
      .route("/api/auth/logout", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
  }

  async fn app(addr: SocketAddr, store: SqliteSessionStore) -> App {
    let client = ApiClient::new(ApiConfig {
      base_url: format!("http://{addr}"),
      timeout:  Duration::from_secs(5),
    })
    .unwrap();
    App::start(client, store).await
  }

  #[tokio::test]
  async fn start_restores_before_returning() {
    let store = SqliteSessionStore::open_in_memory().await.unwrap();
    let app = app(serve().await, store).await;
    assert_eq!(app.controller.state(), SessionState::signed_out());
    assert_eq!(app.describe()[1], "route:  /sign-in");
  }

  #[tokio::test]
  async fn login_logout_round_trip_over_http() {
    let addr = serve().await;
    let store = SqliteSessionStore::open_in_memory().await.unwrap();
    let app = app(addr, store.clone()).await;

    let lines = app
      .run(Action::Login {
        email:    " fish@demo.com ".into(),
        password: "123456".into(),
      })
      .await
      .unwrap();
    assert!(lines.contains(&"route:  /fisherman".to_string()));
    assert!(app.controller.gate().is_armed());

    // A second process over the same store comes up signed in.
    let restarted = self::app(addr, store.clone()).await;
    assert_eq!(restarted.controller.state().role(), Some(Role::Fisherman));

    // The backend logout fails; local state is cleared regardless.
    app.run(Action::Logout).await.unwrap();
    assert_eq!(app.controller.state(), SessionState::signed_out());
    assert!(!app.controller.gate().is_armed());
    let fresh = self::app(addr, store).await;
    assert_eq!(fresh.controller.state(), SessionState::signed_out());
  }

  #[tokio::test]
  async fn unsupported_role_fails_the_command() {
    let store = SqliteSessionStore::open_in_memory().await.unwrap();
    let app = app(serve().await, store).await;

    let err = app
      .run(Action::Login {
        email:    "acc@demo.com".into(),
        password: "pw".into(),
      })
      .await
      .unwrap_err();
    assert!(err.to_string().contains("accountant"));
    assert!(matches!(app.run(Action::Profile).await, Err(_)));
  }
}
