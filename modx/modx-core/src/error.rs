//! Error types for the modx workspace.

/// Result type alias for modx operations.
pub type Result<T> = std::result::Result<T, ModxError>;

/// Main error type for the modx system.
#[derive(Debug, thiserror::Error)]
pub enum ModxError {
    /// A virtual path that does not follow `/<site>/<type>/<id>/<name>.<ext>`
    #[error("Malformed address '{path}': {reason}")]
    MalformedAddress { path: String, reason: String },

    /// Decoded site name has no configured descriptor
    #[error("Unknown site: {0}")]
    UnknownSite(String),

    /// Filesystem-facing form of a bad address or missing site
    #[error("File not found: {uri} ({reason})")]
    FileNotFound { uri: String, reason: String },

    /// Network error or non-success response from the remote API
    #[error("Remote failure: {0}")]
    RemoteFailure(String),

    /// The remote answered with a redirect while redirects were disabled
    #[error("Unexpected redirect: status {status}, location {}", location.as_deref().unwrap_or("<none>"))]
    Redirect { status: u16, location: Option<String> },

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Wrapped anyhow errors for compatibility
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ModxError {
    /// Create a new malformed address error
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAddress {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new unknown site error
    pub fn unknown_site(name: impl Into<String>) -> Self {
        Self::UnknownSite(name.into())
    }

    /// Create a new file not found error
    pub fn file_not_found(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FileNotFound {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Create a new remote failure
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::RemoteFailure(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Map address and site lookup failures to the filesystem's not-found form.
    ///
    /// Other errors pass through untouched.
    pub fn into_not_found(self, uri: &str) -> Self {
        match self {
            Self::MalformedAddress { reason, .. } => Self::file_not_found(uri, reason),
            Self::UnknownSite(name) => Self::file_not_found(uri, format!("unknown site '{}'", name)),
            other => other,
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. } | Self::UnknownSite(_))
    }

    /// Check if this error came from talking to the remote API
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RemoteFailure(_) | Self::Redirect { .. } | Self::Timeout(_)
        )
    }
}
