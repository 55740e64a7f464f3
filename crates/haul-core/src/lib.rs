//! Core types and trait definitions for the Haul session layer.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! defines what a session is, how server role text maps onto application
//! roles, which top-level view a state selects, and the seams (`SessionStore`,
//! `CredentialGate`, `BearerSink`) that the other crates implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod gate;
pub mod payload;
pub mod role;
pub mod route;
pub mod session;
pub mod store;

pub use error::{Error, ErrorKind, Result};
pub use role::Role;
pub use route::Route;
pub use session::{BearerToken, Session, SessionState};
