//! The session state machine for Haul clients.
//!
//! [`SessionController`] owns the single active [`SessionState`], drives it
//! through restore, login and logout, and publishes every transition on a
//! [`tokio::sync::watch`] channel. [`RouteWatcher`] turns that channel into
//! the top-level view the client should mount.
//!
//! [`SessionState`]: haul_core::SessionState

mod controller;
mod watcher;

pub use controller::SessionController;
pub use watcher::RouteWatcher;

#[cfg(test)]
mod tests;
