//! Auth handlers and supporting modules.
//!
//! This module owns the credential → token → session → authorization
//! pipeline:
//!
//! - `login`/`signup`/`two_factor` implement the two-phase authentication
//!   state machine,
//! - `token` mints and verifies the three token kinds,
//! - `principal` is the request-time validator producing a [`principal::Principal`],
//! - `guard` runs the capability checks in a fixed order,
//! - `storage` holds the session store and the sign-out-all coordinator.
//!
//! Heartbeat writes are the only swallowed failures in the pipeline; every
//! other failed check aborts the request with its HTTP status.

pub(crate) mod admin;
pub(crate) mod error;
pub(crate) mod guard;
pub(crate) mod login;
mod password;
pub(crate) mod principal;
mod roles;
pub(crate) mod sessions;
pub(crate) mod signup;
mod state;
mod storage;
mod throttle;
pub(crate) mod token;
mod totp;
pub(crate) mod two_factor;
pub(crate) mod types;
mod utils;

pub use state::{AuthConfig, AuthState};

#[cfg(test)]
mod tests;
