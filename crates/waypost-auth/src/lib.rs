//! Request signing and verification for Waypost (`S1-HMACSHA512`).
//!
//! A signed request carries four headers:
//!
//! | Header | Content |
//! |--------|---------|
//! | `X-Auth-Date` | request date, `20060102T150405Z` style |
//! | `X-Auth-Pub` | the caller's public key |
//! | `X-Auth-Scheme` | always `S1-HMACSHA512` |
//! | `X-Auth-Sig` | URL-safe base64 of the raw signature |
//!
//! The signature is computed over a canonical string (method, normalized URI,
//! date, public key, scheme) with a key derived from the secret key and the
//! request date:
//!
//! ```text
//! SigningKey = HMAC-SHA512(secret_key, date)
//! Signature  = HMAC-SHA512(SigningKey, canonical_string)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use waypost_auth::credentials::StaticSecretKeyProvider;
//! use waypost_auth::signing::{AuthPolicy, authenticate};
//! use waypost_auth::client::sign_request;
//!
//! let provider = StaticSecretKeyProvider::new(vec![("pub-1".to_owned(), "s3cret".to_owned())]);
//!
//! let mut request = http::Request::get("/api/v1/book/7").body(()).unwrap();
//! sign_request(&mut request, "pub-1", "s3cret").unwrap();
//!
//! let (parts, ()) = request.into_parts();
//! let result = authenticate(&parts, &provider, &AuthPolicy::default()).unwrap();
//! assert_eq!(result.public_key, "pub-1");
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - URI normalization and canonical string construction
//! - [`client`] - Helpers for signing outgoing requests
//! - [`credentials`] - Secret key provider trait and in-memory implementation
//! - [`error`] - Authentication error types
//! - [`signing`] - Key derivation, signing, and verification

pub mod canonical;
pub mod client;
pub mod credentials;
pub mod error;
pub mod signing;

pub use client::sign_request;
pub use credentials::{SecretKeyProvider, StaticSecretKeyProvider};
pub use error::AuthError;
pub use signing::{AuthPolicy, AuthResult, authenticate, sign, verify};
