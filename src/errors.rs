use std::fmt;

/// Error kinds returned by every client operation.
///
/// Each variant carries a human-readable detail string. Argument and
/// credential problems are reported before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A credential mapping lacked one or more required keys.
    MissingCredential(String),
    /// The remote answered 401, or the client has blank credentials.
    Unauthorized(String),
    /// Caller input failed validation.
    InvalidArgument(String),
    /// Non-2xx status, transport error or malformed remote payload.
    RemoteFailure(String),
    /// The requested record does not exist on the remote side.
    NotFound(String),
}

impl ApiError {
    /// Returns the detail message attached to the error.
    pub fn detail(&self) -> &str {
        match self {
            ApiError::MissingCredential(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::InvalidArgument(msg)
            | ApiError::RemoteFailure(msg)
            | ApiError::NotFound(msg) => msg,
        }
    }

    fn with_detail(self, detail: String) -> Self {
        match self {
            ApiError::MissingCredential(_) => ApiError::MissingCredential(detail),
            ApiError::Unauthorized(_) => ApiError::Unauthorized(detail),
            ApiError::InvalidArgument(_) => ApiError::InvalidArgument(detail),
            ApiError::RemoteFailure(_) => ApiError::RemoteFailure(detail),
            ApiError::NotFound(_) => ApiError::NotFound(detail),
        }
    }
}

impl fmt::Display for ApiError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::MissingCredential(msg) => write!(f, "Missing credential: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            ApiError::RemoteFailure(msg) => write!(f, "Remote failure: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::RemoteFailure(format!("Invalid JSON: {}", err))
    }
}

/// Extension trait for adding context to errors.
///
/// Unlike `anyhow::Context` the error kind is kept; only the detail string
/// is prefixed with the context.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, ApiError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    fn with_context<F>(self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, ApiError> {
    fn context(self, context: impl Into<String>) -> Result<T, ApiError> {
        self.map_err(|e| {
            let detail = format!("{}: {}", context.into(), e.detail());
            e.with_detail(detail)
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let detail = format!("{}: {}", f(), e.detail());
            e.with_detail(detail)
        })
    }
}
