//! Account records and the payloads the controllers exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use waypost_model::payload::TypedPayload;

/// A stored account.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// Primary key.
    pub pkey: i64,
    /// Display name.
    pub name: String,
    /// Email address, unique across accounts.
    pub email: String,
    /// Argon2 password hash in PHC string form.
    pub passhash: String,
    /// Public half of the request-signing key pair.
    pub public_key: String,
    /// Secret half of the request-signing key pair.
    pub secret_key: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Last successful login, if any.
    pub last_login: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("pkey", &self.pkey)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("public_key", &self.public_key)
            .field("secret_key", &"...")
            .field("created", &self.created)
            .field("modified", &self.modified)
            .field("last_login", &self.last_login)
            .finish_non_exhaustive()
    }
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountPayload {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Public key used to sign requests.
    pub public_key: String,
}

impl TypedPayload for AccountPayload {
    const PAYLOAD_TYPE: &'static str = "Account";
}

impl From<&Account> for AccountPayload {
    fn from(account: &Account) -> Self {
        Self {
            id: account.pkey,
            name: account.name.clone(),
            email: account.email.clone(),
            public_key: account.public_key.clone(),
        }
    }
}

/// Body of an account creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NewAccount {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Clear-text password.
    pub password: String,
}

/// Body of a login request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Clear-text password.
    pub password: String,
}

/// The key pair handed out on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginPayload {
    /// Public key, sent in the public key header.
    pub public_key: String,
    /// Secret key, never sent; used to sign requests.
    pub secret_key: String,
}

impl TypedPayload for LoginPayload {
    const PAYLOAD_TYPE: &'static str = "Login";
}
