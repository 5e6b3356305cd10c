//! Account storage contract and the in-memory implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand_core::{OsRng, RngCore};
use tracing::debug;
use waypost_auth::{AuthError, SecretKeyProvider};

use crate::error::AccountStoreError;
use crate::model::Account;

/// Number of random bytes in a secret key.
pub const SECRET_KEY_BYTES: usize = 64;

/// Storage for accounts and their signing keys.
pub trait AccountStore: Send + Sync + 'static {
    /// Create an account with a fresh key pair.
    fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, AccountStoreError>;

    /// Remove an account. `false` means there was nothing to remove.
    fn delete_account(&self, pkey: i64) -> Result<bool, AccountStoreError>;

    /// Every account, ordered by primary key.
    fn all_accounts(&self) -> Result<Vec<Account>, AccountStoreError>;

    /// Look up by primary key.
    fn account_with_id(&self, pkey: i64) -> Result<Option<Account>, AccountStoreError>;

    /// Look up by email address, ignoring case.
    fn account_with_email(&self, email: &str) -> Result<Option<Account>, AccountStoreError>;

    /// Look up by public key.
    fn account_with_public_key(
        &self,
        public_key: &str,
    ) -> Result<Option<Account>, AccountStoreError>;

    /// Whether no account uses `email`.
    fn email_address_available(&self, email: &str) -> Result<bool, AccountStoreError> {
        Ok(self.account_with_email(email)?.is_none())
    }

    /// Move an account to a new email address.
    fn change_email(&self, pkey: i64, new_email: &str) -> Result<(), AccountStoreError>;

    /// Replace an account's password.
    fn change_password(&self, pkey: i64, new_password: &str) -> Result<(), AccountStoreError>;

    /// Stamp the last-login time and return the updated account.
    fn update_last_login(&self, pkey: i64) -> Result<Account, AccountStoreError>;

    /// Check credentials and record the login.
    fn login(&self, email: &str, password: &str) -> Result<Account, AccountStoreError> {
        let account = self
            .account_with_email(email)?
            .ok_or(AccountStoreError::InvalidCredentials)?;
        if !password_matches(&account, password) {
            debug!(pkey = account.pkey, "password mismatch");
            return Err(AccountStoreError::InvalidCredentials);
        }
        self.update_last_login(account.pkey)
    }
}

/// 64 random bytes from the OS generator, URL-safe base64 encoded.
#[must_use]
pub fn generate_secret_key() -> String {
    let mut bytes = [0u8; SECRET_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE.encode(bytes)
}

/// A random public key.
#[must_use]
pub fn generate_public_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Hash `password` with Argon2id and a fresh salt, as a PHC string.
pub fn hash_password(password: &str) -> Result<String, AccountStoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AccountStoreError::Storage(format!("password hashing failed: {e}")))
}

/// Whether `password` matches the account's stored hash.
///
/// An unparseable stored hash never matches.
#[must_use]
pub fn password_matches(account: &Account, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(&account.passhash) else {
        debug!(pkey = account.pkey, "stored password hash is not a PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Accounts held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: DashMap<i64, Account>,
    by_email: DashMap<String, i64>,
    by_public_key: DashMap<String, i64>,
    next_pkey: AtomicI64,
}

impl InMemoryAccountStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn require(&self, pkey: i64) -> Result<Account, AccountStoreError> {
        self.accounts
            .get(&pkey)
            .map(|r| r.value().clone())
            .ok_or(AccountStoreError::NotFound(pkey))
    }

    fn lookup_index(&self, index: &DashMap<String, i64>, key: &str) -> Option<Account> {
        let pkey = *index.get(key)?.value();
        self.accounts.get(&pkey).map(|r| r.value().clone())
    }
}

impl AccountStore for InMemoryAccountStore {
    fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, AccountStoreError> {
        let passhash = hash_password(password)?;
        let pkey = match self.by_email.entry(email_key(email)) {
            Entry::Occupied(_) => {
                return Err(AccountStoreError::EmailUnavailable(email.to_owned()));
            }
            Entry::Vacant(e) => {
                let pkey = self.next_pkey.fetch_add(1, Ordering::SeqCst) + 1;
                e.insert(pkey);
                pkey
            }
        };

        let now = Utc::now();
        let account = Account {
            pkey,
            name: name.to_owned(),
            email: email.trim().to_owned(),
            passhash,
            public_key: generate_public_key(),
            secret_key: generate_secret_key(),
            created: now,
            modified: now,
            last_login: None,
        };
        self.by_public_key.insert(account.public_key.clone(), pkey);
        self.accounts.insert(pkey, account.clone());
        debug!(pkey, "account created");
        Ok(account)
    }

    fn delete_account(&self, pkey: i64) -> Result<bool, AccountStoreError> {
        let Some((_, account)) = self.accounts.remove(&pkey) else {
            return Ok(false);
        };
        self.by_email.remove(&email_key(&account.email));
        self.by_public_key.remove(&account.public_key);
        Ok(true)
    }

    fn all_accounts(&self) -> Result<Vec<Account>, AccountStoreError> {
        let mut accounts: Vec<Account> = self.accounts.iter().map(|r| r.value().clone()).collect();
        accounts.sort_by_key(|a| a.pkey);
        Ok(accounts)
    }

    fn account_with_id(&self, pkey: i64) -> Result<Option<Account>, AccountStoreError> {
        Ok(self.accounts.get(&pkey).map(|r| r.value().clone()))
    }

    fn account_with_email(&self, email: &str) -> Result<Option<Account>, AccountStoreError> {
        Ok(self.lookup_index(&self.by_email, &email_key(email)))
    }

    fn account_with_public_key(
        &self,
        public_key: &str,
    ) -> Result<Option<Account>, AccountStoreError> {
        Ok(self.lookup_index(&self.by_public_key, public_key))
    }

    fn change_email(&self, pkey: i64, new_email: &str) -> Result<(), AccountStoreError> {
        let current = self.require(pkey)?;
        let old_key = email_key(&current.email);
        let new_key = email_key(new_email);
        if old_key != new_key {
            match self.by_email.entry(new_key) {
                Entry::Occupied(_) => {
                    return Err(AccountStoreError::EmailUnavailable(new_email.to_owned()));
                }
                Entry::Vacant(e) => {
                    e.insert(pkey);
                }
            }
            self.by_email.remove(&old_key);
        }
        let mut account = self
            .accounts
            .get_mut(&pkey)
            .ok_or(AccountStoreError::NotFound(pkey))?;
        new_email.trim().clone_into(&mut account.email);
        account.modified = Utc::now();
        Ok(())
    }

    fn change_password(&self, pkey: i64, new_password: &str) -> Result<(), AccountStoreError> {
        let passhash = hash_password(new_password)?;
        let mut account = self
            .accounts
            .get_mut(&pkey)
            .ok_or(AccountStoreError::NotFound(pkey))?;
        account.passhash = passhash;
        account.modified = Utc::now();
        Ok(())
    }

    fn update_last_login(&self, pkey: i64) -> Result<Account, AccountStoreError> {
        let mut account = self
            .accounts
            .get_mut(&pkey)
            .ok_or(AccountStoreError::NotFound(pkey))?;
        account.last_login = Some(Utc::now());
        Ok(account.value().clone())
    }
}

/// Resolves request-signing secrets from an [`AccountStore`].
#[derive(Debug)]
pub struct AccountKeyProvider<S> {
    store: Arc<S>,
}

impl<S> AccountKeyProvider<S> {
    /// Wrap `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: AccountStore> SecretKeyProvider for AccountKeyProvider<S> {
    fn secret_key(&self, public_key: &str) -> Result<String, AuthError> {
        match self.store.account_with_public_key(public_key) {
            Ok(Some(account)) => Ok(account.secret_key),
            Ok(None) => Err(AuthError::UnknownPublicKey(public_key.to_owned())),
            Err(err) => Err(AuthError::KeyLookup {
                code: err.code(),
                message: err.to_string(),
            }),
        }
    }
}
