//! Error taxonomy for the context database.
//!
//! One variant per failure kind in the spec's closed error table; the HTTP
//! and CLI transports map each variant to a fixed status/exit code via
//! [`Error::code`].

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of error codes exposed at the HTTP and CLI boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorCode {
    InvalidArgument,
    InvalidUri,
    Unauthenticated,
    PermissionDenied,
    NotFound,
    AlreadyExists,
    Aborted,
    SessionExpired,
    FailedPrecondition,
    ResourceExhausted,
    Internal,
    NotInitialized,
    ProcessingError,
    EmbeddingFailed,
    VlmFailed,
    Unimplemented,
    Unavailable,
    DeadlineExceeded,
    Config,
}

impl ErrorCode {
    /// HTTP status this code maps to (spec §6.1).
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::InvalidArgument | ErrorCode::InvalidUri => 400,
            ErrorCode::Unauthenticated => 401,
            ErrorCode::PermissionDenied => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::AlreadyExists | ErrorCode::Aborted => 409,
            ErrorCode::SessionExpired => 410,
            ErrorCode::FailedPrecondition => 412,
            ErrorCode::ResourceExhausted => 429,
            ErrorCode::Internal
            | ErrorCode::NotInitialized
            | ErrorCode::ProcessingError
            | ErrorCode::EmbeddingFailed
            | ErrorCode::VlmFailed => 500,
            ErrorCode::Unimplemented => 501,
            ErrorCode::Unavailable => 503,
            ErrorCode::DeadlineExceeded => 504,
            ErrorCode::Config => 500,
        }
    }

    /// Stable wire name (used in HTTP error bodies and CLI `ERROR[CODE]`).
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::InvalidUri => "INVALID_URI",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::Aborted => "ABORTED",
            ErrorCode::SessionExpired => "SESSION_EXPIRED",
            ErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ErrorCode::Internal => "INTERNAL",
            ErrorCode::NotInitialized => "NOT_INITIALIZED",
            ErrorCode::ProcessingError => "PROCESSING_ERROR",
            ErrorCode::EmbeddingFailed => "EMBEDDING_FAILED",
            ErrorCode::VlmFailed => "VLM_FAILED",
            ErrorCode::Unimplemented => "UNIMPLEMENTED",
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorCode::Config => "CONFIG",
        }
    }
}

/// Main error type for the context database.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("invalid uri: {uri}")]
    InvalidUri { uri: String },

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("not found: {resource}")]
    NotFound { resource: String },

    #[error("already exists: {resource}")]
    AlreadyExists { resource: String },

    #[error("aborted: {message}")]
    Aborted { message: String },

    #[error("session expired: {session_id}")]
    SessionExpired { session_id: String },

    #[error("failed precondition: {message}")]
    FailedPrecondition { message: String },

    #[error("resource exhausted: {message}")]
    ResourceExhausted { message: String },

    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("not initialized: {component}")]
    NotInitialized { component: String },

    #[error("processing error: {message}")]
    Processing { message: String },

    #[error("embedding failed: {message}")]
    EmbeddingFailed { message: String },

    #[error("vlm failed: {message}")]
    VlmFailed { message: String },

    #[error("unimplemented: {message}")]
    Unimplemented { message: String },

    #[error("unavailable: {message}")]
    Unavailable { message: String },

    #[error("deadline exceeded: {operation}")]
    DeadlineExceeded { operation: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    pub fn invalid_uri(uri: impl Into<String>) -> Self {
        Self::InvalidUri { uri: uri.into() }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied { message: message.into() }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    pub fn already_exists(resource: impl Into<String>) -> Self {
        Self::AlreadyExists { resource: resource.into() }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::Aborted { message: message.into() }
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition { message: message.into() }
    }

    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), cause: None }
    }

    pub fn internal_with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), cause: Some(Box::new(cause)) }
    }

    pub fn not_initialized(component: impl Into<String>) -> Self {
        Self::NotInitialized { component: component.into() }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing { message: message.into() }
    }

    pub fn embedding_failed(message: impl Into<String>) -> Self {
        Self::EmbeddingFailed { message: message.into() }
    }

    pub fn vlm_failed(message: impl Into<String>) -> Self {
        Self::VlmFailed { message: message.into() }
    }

    pub fn deadline_exceeded(operation: impl Into<String>) -> Self {
        Self::DeadlineExceeded { operation: operation.into() }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable { message: message.into() }
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::Unimplemented { message: message.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Map this error to its closed wire code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Error::InvalidUri { .. } => ErrorCode::InvalidUri,
            Error::Unauthenticated => ErrorCode::Unauthenticated,
            Error::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Error::NotFound { .. } => ErrorCode::NotFound,
            Error::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Error::Aborted { .. } => ErrorCode::Aborted,
            Error::SessionExpired { .. } => ErrorCode::SessionExpired,
            Error::FailedPrecondition { .. } => ErrorCode::FailedPrecondition,
            Error::ResourceExhausted { .. } => ErrorCode::ResourceExhausted,
            Error::Internal { .. } => ErrorCode::Internal,
            Error::NotInitialized { .. } => ErrorCode::NotInitialized,
            Error::Processing { .. } => ErrorCode::ProcessingError,
            Error::EmbeddingFailed { .. } => ErrorCode::EmbeddingFailed,
            Error::VlmFailed { .. } => ErrorCode::VlmFailed,
            Error::Unimplemented { .. } => ErrorCode::Unimplemented,
            Error::Unavailable { .. } => ErrorCode::Unavailable,
            Error::DeadlineExceeded { .. } => ErrorCode::DeadlineExceeded,
            Error::Config { .. } => ErrorCode::Config,
            Error::Io(_) => ErrorCode::Internal,
            Error::Json(_) => ErrorCode::Internal,
        }
    }
}
