//! Secret key provider trait and implementations.
//!
//! The authentication layer never stores secrets itself. It asks a
//! [`SecretKeyProvider`] to resolve the public key a request presents.

use std::collections::HashMap;

use crate::error::AuthError;

/// Trait for looking up secret keys by public key.
///
/// Implementations may back this with a database, an account store, or any
/// other credential source.
pub trait SecretKeyProvider: Send + Sync {
    /// Retrieve the secret key for the given public key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::UnknownPublicKey`] if the public key is not recognized,
    /// or [`AuthError::KeyLookup`] if the backing store failed.
    fn secret_key(&self, public_key: &str) -> Result<String, AuthError>;
}

/// A simple in-memory provider backed by a `HashMap`.
///
/// # Examples
///
/// ```
/// use waypost_auth::credentials::{SecretKeyProvider, StaticSecretKeyProvider};
///
/// let provider = StaticSecretKeyProvider::new(vec![("abc".to_owned(), "cba".to_owned())]);
/// assert_eq!(provider.secret_key("abc").unwrap(), "cba");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSecretKeyProvider {
    keys: HashMap<String, String>,
}

impl StaticSecretKeyProvider {
    /// Create a provider from an iterable of (public_key, secret_key) pairs.
    pub fn new(keys: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

impl SecretKeyProvider for StaticSecretKeyProvider {
    fn secret_key(&self, public_key: &str) -> Result<String, AuthError> {
        self.keys
            .get(public_key)
            .cloned()
            .ok_or_else(|| AuthError::UnknownPublicKey(public_key.to_owned()))
    }
}
