//! Wire-level types shared by the Waypost HTTP layer and its clients.
//!
//! - [`error`]: the [`ApiError`] carried to clients and the stable error numbers
//! - [`verb`]: the closed set of HTTP verbs a route may bind to
//! - [`payload`]: the uniform response envelope and typed payload registry

pub mod error;
pub mod payload;
pub mod verb;

pub use error::{ApiError, ApiErrorKind, ErrorClass};
pub use payload::{PayloadEnvelope, PayloadError, PayloadMap, PayloadRegistry, TypedPayload};
pub use verb::HttpVerb;
