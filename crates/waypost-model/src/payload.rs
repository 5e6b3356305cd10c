//! The uniform response envelope.
//!
//! Every Waypost response body is a [`PayloadEnvelope`]:
//!
//! ```json
//! {
//!   "Payloads": { "book": [ { "Name": "Rust" } ] },
//!   "ErrorNumber": 0,
//!   "Alert": "maintenance at 02:00 UTC"
//! }
//! ```
//!
//! Payloads are grouped by the type tag each [`TypedPayload`] declares. On the
//! decoding side a [`PayloadRegistry`] names the kinds a client understands;
//! every entry of every kind is checked against its Rust type before the
//! envelope is handed back.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A payload type that can be carried in an envelope.
pub trait TypedPayload: Serialize + DeserializeOwned {
    /// The tag under which values of this type are grouped.
    const PAYLOAD_TYPE: &'static str;
}

/// Errors produced while building or decoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The input was empty.
    #[error("empty payload envelope")]
    Empty,

    /// The input was not a JSON envelope.
    #[error("malformed payload envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The caller registered no payload kinds to decode.
    #[error("no supported payload kinds were registered")]
    NoSupportedKinds,

    /// The envelope carried a kind the caller did not register.
    #[error("unsupported payload kind: {0}")]
    UnsupportedKind(String),

    /// An entry did not match the Rust type registered for its kind.
    #[error("invalid {kind} payload: {source}")]
    InvalidEntry {
        /// The payload kind.
        kind: String,
        /// The underlying decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// A payload could not be serialized.
    #[error("failed to encode {kind} payload: {source}")]
    Encode {
        /// The payload kind.
        kind: &'static str,
        /// The underlying encoding error.
        #[source]
        source: serde_json::Error,
    },
}

/// Typed payloads grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadMap(BTreeMap<String, Vec<serde_json::Value>>);

impl PayloadMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map holding a single payload.
    pub fn single<P: TypedPayload>(payload: &P) -> Result<Self, PayloadError> {
        let mut map = Self::new();
        map.push(payload)?;
        Ok(map)
    }

    /// Append a payload under its kind.
    pub fn push<P: TypedPayload>(&mut self, payload: &P) -> Result<(), PayloadError> {
        let value = serde_json::to_value(payload).map_err(|source| PayloadError::Encode {
            kind: P::PAYLOAD_TYPE,
            source,
        })?;
        self.0
            .entry(P::PAYLOAD_TYPE.to_owned())
            .or_default()
            .push(value);
        Ok(())
    }

    /// Append every payload of an iterator under its kind.
    pub fn extend<'a, P: TypedPayload + 'a>(
        &mut self,
        payloads: impl IntoIterator<Item = &'a P>,
    ) -> Result<(), PayloadError> {
        payloads.into_iter().try_for_each(|p| self.push(p))
    }

    /// Decode every payload of kind `P`. A missing kind decodes as empty.
    pub fn get<P: TypedPayload>(&self) -> Result<Vec<P>, PayloadError> {
        self.0
            .get(P::PAYLOAD_TYPE)
            .map(|values| {
                values
                    .iter()
                    .map(|v| {
                        serde_json::from_value(v.clone()).map_err(|source| {
                            PayloadError::InvalidEntry {
                                kind: P::PAYLOAD_TYPE.to_owned(),
                                source,
                            }
                        })
                    })
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    /// The kinds present, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of entries of the given kind.
    #[must_use]
    pub fn count(&self, kind: &str) -> usize {
        self.0.get(kind).map_or(0, Vec::len)
    }

    /// Whether no payload of any kind is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

type EntryCheck = fn(&serde_json::Value) -> Result<(), serde_json::Error>;

fn check_entry<P: TypedPayload>(value: &serde_json::Value) -> Result<(), serde_json::Error> {
    serde_json::from_value::<P>(value.clone()).map(drop)
}

/// The set of payload kinds a decoder accepts.
#[derive(Debug, Clone, Default)]
pub struct PayloadRegistry {
    checks: BTreeMap<&'static str, EntryCheck>,
}

impl PayloadRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept payloads of type `P`.
    #[must_use]
    pub fn register<P: TypedPayload>(mut self) -> Self {
        self.checks.insert(P::PAYLOAD_TYPE, check_entry::<P>);
        self
    }

    /// Whether `kind` is accepted.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.checks.contains_key(kind)
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// The response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PayloadEnvelope {
    /// Payloads grouped by kind.
    #[serde(default, skip_serializing_if = "PayloadMap::is_empty")]
    pub payloads: PayloadMap,
    /// Zero on success, non-zero otherwise.
    #[serde(default)]
    pub error_number: i64,
    /// End-user appropriate error message.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_message: String,
    /// Developer-facing error number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_number: Option<i64>,
    /// Developer-facing error detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_message: Option<String>,
    /// A notice the client should surface to its user (upgrade required, maintenance, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alert: String,
}

impl PayloadEnvelope {
    /// An envelope that only says "ok".
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    /// An envelope carrying payloads.
    #[must_use]
    pub fn with_payloads(payloads: PayloadMap) -> Self {
        Self {
            payloads,
            ..Self::default()
        }
    }

    /// An error envelope.
    #[must_use]
    pub fn error(error_number: i64, error_message: impl Into<String>) -> Self {
        Self {
            error_number,
            error_message: error_message.into(),
            ..Self::default()
        }
    }

    /// An error envelope that also raises an alert.
    #[must_use]
    pub fn alert(error_number: i64, error_message: impl Into<String>, alert: impl Into<String>) -> Self {
        Self {
            alert: alert.into(),
            ..Self::error(error_number, error_message)
        }
    }

    /// The client-visible part of an [`ApiError`].
    ///
    /// Debug detail of server-class errors stays in the logs.
    #[must_use]
    pub fn from_error(err: &ApiError) -> Self {
        let mut envelope = Self::error(err.err_no, err.message.clone());
        if !err.status_code.is_server_error() {
            envelope.debug_number = err.debug_number;
            envelope.debug_message.clone_from(&err.debug_message);
        }
        envelope
    }

    /// Whether the envelope reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error_number != 0
    }

    /// Decode every payload of kind `P`.
    pub fn payloads<P: TypedPayload>(&self) -> Result<Vec<P>, PayloadError> {
        self.payloads.get::<P>()
    }

    /// Serialize to JSON bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>, PayloadError> {
        serde_json::to_vec(self).map_err(|source| PayloadError::Encode {
            kind: "envelope",
            source,
        })
    }

    /// Decode an envelope, accepting only the kinds in `registry`.
    pub fn decode(bytes: &[u8], registry: &PayloadRegistry) -> Result<Self, PayloadError> {
        if bytes.is_empty() {
            return Err(PayloadError::Empty);
        }
        let envelope: Self = serde_json::from_slice(bytes).map_err(PayloadError::Malformed)?;
        if registry.is_empty() {
            return Err(PayloadError::NoSupportedKinds);
        }

        for (kind, values) in &envelope.payloads.0 {
            let check = registry
                .checks
                .get(kind.as_str())
                .ok_or_else(|| PayloadError::UnsupportedKind(kind.clone()))?;
            for value in values {
                check(value).map_err(|source| PayloadError::InvalidEntry {
                    kind: kind.clone(),
                    source,
                })?;
            }
        }

        Ok(envelope)
    }
}
