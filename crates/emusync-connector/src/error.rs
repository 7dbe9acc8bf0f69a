//! Connector error taxonomy
//!
//! Error definitions with retry classification and the HTTP status mapping
//! used by the REST access layer.

use thiserror::Error;

/// Error that can occur during connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// An attribute value could not be coerced to its declared type, or a
    /// request was rejected by the provider as malformed.
    #[error("invalid value for attribute '{attribute}': {message}")]
    InvalidAttributeValue { attribute: String, message: String },

    /// An external attribute name is not declared in the resource schema.
    #[error("unknown attribute '{attribute}' for object class '{object_class}'")]
    UnknownAttribute {
        attribute: String,
        object_class: String,
    },

    /// The session token was rejected. A subtype of connection failure: the
    /// session wrapper re-authenticates once before surfacing it.
    #[error("authentication failed: {message}")]
    Unauthorized { message: String },

    /// The authenticated principal lacks permission for the operation.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    /// The target object does not exist.
    #[error("object not found: {message}")]
    NotFound { message: String },

    /// Create conflict: an object with the same identifier already exists.
    #[error("object already exists: {message}")]
    AlreadyExists { message: String },

    /// The provider throttled the request. The only retryable kind; backoff
    /// is the caller's concern.
    #[error("rate limited by provider")]
    RateLimited { retry_after_secs: Option<u64> },

    /// A discovered pagination link could not be parsed. Fatal configuration
    /// error, never silently dropped.
    #[error("malformed next page URL '{url}': {message}")]
    InvalidPageUrl { url: String, message: String },

    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// A stateful protocol object was driven outside its contract, e.g.
    /// requesting a cursor's final response before exhaustion.
    #[error("usage error: {message}")]
    CursorMisuse { message: String },

    /// Catch-all transport or serialization failure.
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConnectorError {
    /// Classify an HTTP status into a domain error kind.
    ///
    /// An absent status (pure transport failure, or a response whose status
    /// line could not be read) falls through to [`ConnectorError::Io`].
    pub fn from_status(status: Option<u16>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            Some(400) => ConnectorError::InvalidAttributeValue {
                attribute: String::new(),
                message: detail,
            },
            Some(401) => ConnectorError::Unauthorized { message: detail },
            Some(403) => ConnectorError::PermissionDenied { message: detail },
            Some(404) => ConnectorError::NotFound { message: detail },
            Some(409) => ConnectorError::AlreadyExists { message: detail },
            Some(429) => ConnectorError::RateLimited {
                retry_after_secs: None,
            },
            Some(status) => ConnectorError::Io {
                message: format!("unexpected HTTP status {status}: {detail}"),
                source: None,
            },
            None => ConnectorError::Io {
                message: detail,
                source: None,
            },
        }
    }

    /// Check if the caller may retry the operation after backing off.
    ///
    /// Only rate limiting qualifies; the session wrapper handles its one
    /// re-authentication retry internally and everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConnectorError::RateLimited { .. })
    }

    /// Check if this error reports a failure to talk to the provider at all,
    /// as opposed to the provider rejecting a well-delivered request.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            ConnectorError::Unauthorized { .. } | ConnectorError::Io { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::InvalidAttributeValue { .. } => "INVALID_ATTRIBUTE_VALUE",
            ConnectorError::UnknownAttribute { .. } => "UNKNOWN_ATTRIBUTE",
            ConnectorError::Unauthorized { .. } => "UNAUTHORIZED",
            ConnectorError::PermissionDenied { .. } => "PERMISSION_DENIED",
            ConnectorError::NotFound { .. } => "NOT_FOUND",
            ConnectorError::AlreadyExists { .. } => "ALREADY_EXISTS",
            ConnectorError::RateLimited { .. } => "RATE_LIMITED",
            ConnectorError::InvalidPageUrl { .. } => "INVALID_PAGE_URL",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::CursorMisuse { .. } => "CURSOR_MISUSE",
            ConnectorError::Io { .. } => "IO_ERROR",
        }
    }

    // Convenience constructors

    /// Create a bad-input error scoped to one attribute.
    pub fn invalid_attribute_value(
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConnectorError::InvalidAttributeValue {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-attribute rejection.
    pub fn unknown_attribute(
        attribute: impl Into<String>,
        object_class: impl Into<String>,
    ) -> Self {
        ConnectorError::UnknownAttribute {
            attribute: attribute.into(),
            object_class: object_class.into(),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a usage error.
    pub fn cursor_misuse(message: impl Into<String>) -> Self {
        ConnectorError::CursorMisuse {
            message: message.into(),
        }
    }

    /// Create an I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        ConnectorError::Io {
            message: message.into(),
            source: None,
        }
    }

    /// Create an I/O error wrapping the underlying transport failure.
    pub fn io_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Io {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_exhaustive() {
        assert!(matches!(
            ConnectorError::from_status(Some(400), "bad"),
            ConnectorError::InvalidAttributeValue { .. }
        ));
        assert!(matches!(
            ConnectorError::from_status(Some(401), "no"),
            ConnectorError::Unauthorized { .. }
        ));
        assert!(matches!(
            ConnectorError::from_status(Some(403), "no"),
            ConnectorError::PermissionDenied { .. }
        ));
        assert!(matches!(
            ConnectorError::from_status(Some(404), "gone"),
            ConnectorError::NotFound { .. }
        ));
        assert!(matches!(
            ConnectorError::from_status(Some(409), "dup"),
            ConnectorError::AlreadyExists { .. }
        ));
        assert!(matches!(
            ConnectorError::from_status(Some(429), "slow down"),
            ConnectorError::RateLimited { .. }
        ));
    }

    #[test]
    fn test_unmapped_statuses_fall_through_to_io() {
        for status in [418u16, 500, 502, 503] {
            assert!(
                matches!(
                    ConnectorError::from_status(Some(status), "x"),
                    ConnectorError::Io { .. }
                ),
                "expected status {status} to map to Io"
            );
        }
    }

    #[test]
    fn test_absent_status_falls_through_to_io() {
        let err = ConnectorError::from_status(None, "connection reset");
        assert!(matches!(err, ConnectorError::Io { .. }));
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_only_rate_limited_is_retryable() {
        let retryable = ConnectorError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(retryable.is_retryable());

        let others = vec![
            ConnectorError::invalid_attribute_value("email", "not a string"),
            ConnectorError::from_status(Some(401), "expired"),
            ConnectorError::from_status(Some(403), "no"),
            ConnectorError::from_status(Some(404), "gone"),
            ConnectorError::from_status(Some(409), "dup"),
            ConnectorError::io("boom"),
        ];
        for err in others {
            assert!(!err.is_retryable(), "{} should not retry", err.error_code());
        }
    }

    #[test]
    fn test_unauthorized_is_a_connection_failure() {
        assert!(ConnectorError::from_status(Some(401), "expired").is_connection_failure());
        assert!(ConnectorError::io("refused").is_connection_failure());
        assert!(!ConnectorError::from_status(Some(403), "no").is_connection_failure());
    }

    #[test]
    fn test_error_display() {
        let err = ConnectorError::unknown_attribute("nickname", "User");
        assert_eq!(
            err.to_string(),
            "unknown attribute 'nickname' for object class 'User'"
        );

        let err = ConnectorError::invalid_attribute_value("active", "expected a boolean");
        assert_eq!(
            err.to_string(),
            "invalid value for attribute 'active': expected a boolean"
        );
    }

    #[test]
    fn test_io_error_with_source() {
        let source = std::io::Error::other("underlying");
        let err = ConnectorError::io_with_source("request failed", source);
        if let ConnectorError::Io { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("expected Io variant");
        }
    }
}
