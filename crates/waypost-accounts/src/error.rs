//! Account store error types.

/// Errors produced by an [`AccountStore`](crate::store::AccountStore).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountStoreError {
    /// Another account already uses the email address.
    #[error("email address {0} is already in use")]
    EmailUnavailable(String),

    /// No account has the given primary key.
    #[error("account {0} not found")]
    NotFound(i64),

    /// The email and password do not identify an account.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The backing store failed.
    #[error("account storage failure: {0}")]
    Storage(String),
}

impl AccountStoreError {
    /// Stable number used when the error is surfaced to a client.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::EmailUnavailable(_) => 300_544_903,
            Self::NotFound(_) => 3_809_025_802,
            Self::InvalidCredentials => 3_770_650_642,
            Self::Storage(_) => 300_544_904,
        }
    }
}
