//! Guarded secret values.
//!
//! Secrets travel through the mapping engine and the HTTP layer as opaque
//! guards. The [`std::fmt::Debug`] and [`std::fmt::Display`] impls redact,
//! and there is deliberately no `Serialize` impl: wire assembly must call
//! [`SecretString::expose`] explicitly.

/// An in-memory secret (API token, password) that never prints itself.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Reveal the secret for wire assembly.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
