//! Accounts for Waypost.
//!
//! - [`store`]: the [`AccountStore`] contract and an in-memory implementation
//! - [`controller`]: the `account` and `auth` entities
//! - [`validate`]: name, email and password checks
//!
//! Logging in hands out a public/secret key pair; clients then sign requests
//! to `Auth` routes with it.

pub mod controller;
pub mod error;
pub mod model;
pub mod store;
pub mod validate;

use std::sync::Arc;

use waypost_http::{RegistrationError, RouterBuilder};

pub use controller::{AccountController, AuthController};
pub use error::AccountStoreError;
pub use model::{Account, AccountPayload, LoginPayload, LoginRequest, NewAccount};
pub use store::{AccountKeyProvider, AccountStore, InMemoryAccountStore};

/// Register the `account` and `auth` entities backed by `store`.
///
/// Returns the number of routes added.
pub fn register_account_routes<S: AccountStore>(
    builder: &mut RouterBuilder,
    store: &Arc<S>,
) -> Result<usize, RegistrationError> {
    let accounts = builder.register_entity("account", Arc::new(AccountController::new(Arc::clone(store))))?;
    let auth = builder.register_entity("auth", Arc::new(AuthController::new(Arc::clone(store))))?;
    Ok(accounts + auth)
}
