//! Read-only route subscription for the view layer.

use haul_core::{Route, SessionState};
use tokio::sync::watch;

/// Follows a controller's state and reports the route to mount.
///
/// Backed by a `watch` channel: a slow consumer sees the latest state, not
/// every intermediate one.
#[derive(Clone)]
pub struct RouteWatcher {
  rx: watch::Receiver<SessionState>,
}

impl RouteWatcher {
  pub fn new(rx: watch::Receiver<SessionState>) -> Self { Self { rx } }

  /// The route for the most recently published state.
  pub fn current(&self) -> Route { Route::for_state(&self.rx.borrow()) }

  pub fn state(&self) -> SessionState { self.rx.borrow().clone() }

  /// Wait for the next transition. Returns `None` once the controller is
  /// dropped.
  pub async fn changed(&mut self) -> Option<Route> {
    self.rx.changed().await.ok()?;
    Some(Route::for_state(&self.rx.borrow_and_update()))
  }

  /// Wait until the state is neither `Idle` nor pending, i.e. a restore or
  /// login has settled, and return that route.
  ///
  /// Returns immediately if the current state is already settled. Waits
  /// forever on an `Idle` controller that is never driven.
  pub async fn settled(&mut self) -> Option<Route> {
    let state = self
      .rx
      .wait_for(|s| !s.is_pending() && *s != SessionState::Idle)
      .await
      .ok()?;
    Some(Route::for_state(&state))
  }
}
