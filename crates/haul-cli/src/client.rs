//! Async HTTP client for the marketplace auth API.

use std::{
  sync::{Arc, RwLock},
  time::Duration,
};

use anyhow::Context as _;
use haul_core::{
  BearerToken,
  gate::{BearerSink, CredentialGate, GateError},
};
use reqwest::{Client, Response};
use serde_json::{Value, json};

/// Connection settings for the auth API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

/// HTTP implementation of [`CredentialGate`] and [`BearerSink`].
///
/// Cheap to clone. The inner [`reqwest::Client`] is `Arc`-based and clones
/// share one bearer slot, so the controller can hold one clone as its gate
/// and another as its transport.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
  bearer: Arc<RwLock<Option<BearerToken>>>,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self {
      client,
      config,
      bearer: Arc::new(RwLock::new(None)),
    })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    let token = self
      .bearer
      .read()
      .ok()
      .and_then(|slot| slot.as_ref().map(|t| t.expose().to_owned()));
    match token {
      Some(token) => req.bearer_auth(token),
      None => req,
    }
  }

  /// Whether requests currently carry a bearer credential.
  pub fn is_armed(&self) -> bool {
    self.bearer.read().map(|slot| slot.is_some()).unwrap_or(false)
  }
}

fn network(err: reqwest::Error) -> GateError {
  GateError::Network(err.to_string())
}

/// Map a non-success response onto a [`GateError`], preferring the server's
/// own `message`/`error` text.
async fn failure(what: &str, resp: Response) -> GateError {
  let status = resp.status();
  let detail = resp
    .json::<Value>()
    .await
    .ok()
    .and_then(|body| {
      ["message", "error"]
        .iter()
        .find_map(|key| body.get(key)?.as_str().map(str::to_owned))
    })
    .unwrap_or_else(|| status.to_string());

  if status.is_client_error() {
    GateError::Rejected(format!("{what} → {status}: {detail}"))
  } else {
    GateError::Network(format!("{what} → {status}: {detail}"))
  }
}

async fn read_json(what: &str, resp: Response) -> Result<Value, GateError> {
  if !resp.status().is_success() {
    return Err(failure(what, resp).await);
  }
  resp
    .json()
    .await
    .map_err(|e| GateError::Malformed(format!("{what}: {e}")))
}

// ─── CredentialGate ──────────────────────────────────────────────────────────

impl CredentialGate for ApiClient {
  /// `POST /api/auth/login`
  async fn login(&self, email: &str, password: &str) -> Result<Value, GateError> {
    let resp = self
      .client
      .post(self.url("/auth/login"))
      .json(&json!({ "email": email, "password": password }))
      .send()
      .await
      .map_err(network)?;
    read_json("POST /auth/login", resp).await
  }

  /// `POST /api/auth/logout`
  async fn logout(&self) -> Result<(), GateError> {
    let resp = self
      .auth(self.client.post(self.url("/auth/logout")))
      .send()
      .await
      .map_err(network)?;
    if resp.status().is_success() {
      Ok(())
    } else {
      Err(failure("POST /auth/logout", resp).await)
    }
  }

  /// `GET /api/auth/me`
  async fn fetch_profile(&self) -> Result<Value, GateError> {
    let resp = self
      .auth(self.client.get(self.url("/auth/me")))
      .send()
      .await
      .map_err(network)?;
    let body = read_json("GET /auth/me", resp).await?;
    // Some deployments wrap the record as `{ "user": {...} }`.
    Ok(match body.get("user") {
      Some(user) if user.is_object() => user.clone(),
      _ => body,
    })
  }
}

// ─── BearerSink ──────────────────────────────────────────────────────────────

impl BearerSink for ApiClient {
  fn set_bearer_token(&self, token: Option<&BearerToken>) {
    match self.bearer.write() {
      Ok(mut slot) => *slot = token.cloned(),
      Err(poisoned) => *poisoned.into_inner() = token.cloned(),
    }
    tracing::debug!(
      token = ?token.map(BearerToken::fingerprint),
      "transport credential updated"
    );
  }
}
