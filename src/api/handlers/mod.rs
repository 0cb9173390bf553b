//! API handlers for Sesamo.
//!
//! `auth` owns the authentication pipeline; `me`, `health`, and `root` are
//! thin endpoints on top of it.

pub mod auth;
pub mod health;
pub mod me;
pub mod root;
