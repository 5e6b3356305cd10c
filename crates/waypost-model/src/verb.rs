//! HTTP verbs a route can be registered under.

use std::fmt;

/// The verbs recognised by the route naming convention.
///
/// Ordering follows declaration order and is what the route summary sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpVerb {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
}

impl HttpVerb {
    /// All verbs, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Head,
    ];

    /// Map a request method onto a verb. Methods outside the set yield `None`.
    #[must_use]
    pub fn from_method(method: &http::Method) -> Option<Self> {
        match method.as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            _ => None,
        }
    }

    /// Upper-case method name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
        }
    }

    /// The operation-name prefix that binds a handler to this verb.
    #[must_use]
    pub fn handler_prefix(self) -> &'static str {
        match self {
            Self::Get => "GetHandler",
            Self::Post => "PostHandler",
            Self::Put => "PutHandler",
            Self::Patch => "PatchHandler",
            Self::Delete => "DeleteHandler",
            Self::Head => "HeadHandler",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_every_verb_to_its_method_and_back() {
        for verb in HttpVerb::ALL {
            let method = http::Method::from_bytes(verb.as_str().as_bytes()).unwrap();
            assert_eq!(HttpVerb::from_method(&method), Some(verb));
        }
    }

    #[test]
    fn test_should_derive_handler_prefix_from_verb_name() {
        for verb in HttpVerb::ALL {
            let prefix = verb.handler_prefix();
            assert!(prefix.ends_with("Handler"));
            assert!(prefix.to_uppercase().starts_with(verb.as_str()));
        }
    }

    #[test]
    fn test_should_not_map_options() {
        assert_eq!(HttpVerb::from_method(&http::Method::OPTIONS), None);
    }
}
