//! Configuration and shared error types for Waypost.
//!
//! This crate carries the pieces every other Waypost crate and the server
//! binary agree on: the environment-driven [`WaypostConfig`] and the
//! startup-level [`WaypostError`].

mod config;
mod error;

pub use config::{DEFAULT_BASE_PATH, WaypostConfig};
pub use error::{WaypostError, WaypostResult};
