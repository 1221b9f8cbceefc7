//! Error types for the upload handshake, the waitlist and the health probe.
//!
//! `ApiError` is what the HTTP layer produces. The orchestrator maps it onto
//! the stage-specific `UploadError` variants so the UI can tell a presign
//! failure from a storage failure without parsing strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Low-level failure talking to the backend over HTTP
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// Request never produced a response (DNS, refused connection, timeout)
    #[error("Network error: {message}")]
    Transport { timed_out: bool, message: String },

    /// Server answered with a non-2xx status
    #[error("Server error {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: u16,
        /// `message` (or `error`) field of a JSON error body, when there is one
        message: Option<String>,
        body: String,
    },

    /// 2xx response whose body is not the expected structured data
    #[error("Failed to parse response: {0}")]
    Malformed(String),
}

impl ApiError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Transport { timed_out: true, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport {
            timed_out: e.is_timeout(),
            message: e.to_string(),
        }
    }
}

/// Why a request was refused before any network call was made
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum InvalidInput {
    #[error("No file selected")]
    MissingFile,

    #[error("File type {mime_type:?} is not allowed for {file_name}")]
    DisallowedType { file_name: String, mime_type: String },

    #[error("File is {size_bytes} bytes, the limit is {max_bytes} bytes")]
    TooLarge { size_bytes: u64, max_bytes: u64 },
}

/// Diagnostics pulled out of a failed storage response.
///
/// Providers usually answer with a small XML document
/// (`<Error><Code>..</Code><Message>..</Message></Error>`). Every field is
/// optional because the body may be empty, HTML, or truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    pub code: Option<String>,
    pub message: Option<String>,
    pub request_id: Option<String>,
    pub bucket_region: Option<String>,
    /// First 500 characters of the raw body
    pub raw: String,
}

/// Terminal failure of one `submit_upload` call
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum UploadError {
    #[error("Invalid input: {0}")]
    InvalidInput(InvalidInput),

    #[error("Could not reach presign endpoint: {message}")]
    PresignTransportError { timed_out: bool, message: String },

    #[error("Presign rejected ({status}): {message}")]
    PresignRejected { status: u16, message: String },

    #[error("Malformed presign response: {0}")]
    PresignMalformed(String),

    #[error("Storage transfer failed with status {status}{}", .provider.code.as_deref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    TransferFailed { status: u16, provider: ProviderError },

    #[error("Network error during storage transfer: {message}")]
    TransferTransportError { timed_out: bool, message: String },

    /// Only ever logged; a finished transfer is a successful upload
    #[error("Completion notification failed: {0}")]
    NotifyFailed(String),
}

/// Fieldless discriminant of `UploadError`, for callers that only branch on the kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadErrorKind {
    InvalidInput,
    PresignTransportError,
    PresignRejected,
    PresignMalformed,
    TransferFailed,
    TransferTransportError,
    NotifyFailed,
}

const PRESIGN_REJECTED_FALLBACK: &str = "Could not get upload URL.";

impl UploadError {
    pub fn kind(&self) -> UploadErrorKind {
        match self {
            UploadError::InvalidInput(_) => UploadErrorKind::InvalidInput,
            UploadError::PresignTransportError { .. } => UploadErrorKind::PresignTransportError,
            UploadError::PresignRejected { .. } => UploadErrorKind::PresignRejected,
            UploadError::PresignMalformed(_) => UploadErrorKind::PresignMalformed,
            UploadError::TransferFailed { .. } => UploadErrorKind::TransferFailed,
            UploadError::TransferTransportError { .. } => UploadErrorKind::TransferTransportError,
            UploadError::NotifyFailed(_) => UploadErrorKind::NotifyFailed,
        }
    }

    /// Map a presign-call failure onto the presign error kinds
    pub fn from_presign(err: ApiError) -> Self {
        match err {
            ApiError::Transport { timed_out, message } => {
                UploadError::PresignTransportError { timed_out, message }
            }
            ApiError::Status { status, message, .. } => UploadError::PresignRejected {
                status,
                message: message.unwrap_or_else(|| PRESIGN_REJECTED_FALLBACK.to_string()),
            },
            ApiError::Malformed(detail) => UploadError::PresignMalformed(detail),
        }
    }

    /// Message suitable for showing to the person who picked the file.
    ///
    /// Raw provider bodies stay in the error value for diagnostics and are
    /// never echoed here.
    pub fn user_message(&self) -> String {
        match self {
            UploadError::InvalidInput(InvalidInput::MissingFile) => "Choose a file first.".to_string(),
            UploadError::InvalidInput(InvalidInput::DisallowedType { .. }) => {
                "That file type is not allowed.".to_string()
            }
            UploadError::InvalidInput(InvalidInput::TooLarge { max_bytes, .. }) => {
                format!("Max file size is {}MB.", max_bytes / (1024 * 1024))
            }
            UploadError::PresignTransportError { timed_out: true, .. } => {
                "The upload service took too long to respond. Please try again.".to_string()
            }
            UploadError::PresignTransportError { timed_out: false, .. } => {
                "Network error contacting the upload service.".to_string()
            }
            UploadError::PresignRejected { message, .. } => message.clone(),
            UploadError::PresignMalformed(_) => "Upload URL not returned from server.".to_string(),
            UploadError::TransferFailed { status, .. } => format!("Upload failed ({}).", status),
            UploadError::TransferTransportError { timed_out: true, .. } => {
                "The upload timed out. Please try again.".to_string()
            }
            UploadError::TransferTransportError { timed_out: false, .. } => {
                "Network error during upload.".to_string()
            }
            UploadError::NotifyFailed(_) => {
                "Uploaded, but recording the submission failed.".to_string()
            }
        }
    }
}

impl From<InvalidInput> for UploadError {
    fn from(reason: InvalidInput) -> Self {
        UploadError::InvalidInput(reason)
    }
}

/// Failure joining the waitlist
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WaitlistError {
    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl WaitlistError {
    pub fn user_message(&self) -> String {
        match self {
            WaitlistError::InvalidEmail(email) if email.is_empty() => {
                "Enter your email to join the waitlist.".to_string()
            }
            WaitlistError::InvalidEmail(_) => "Enter a valid email address.".to_string(),
            WaitlistError::Api(ApiError::Status { status, message, .. }) => message
                .clone()
                .unwrap_or_else(|| format!("Join failed ({}).", status)),
            WaitlistError::Api(ApiError::Transport { .. }) => {
                "Network error joining waitlist.".to_string()
            }
            WaitlistError::Api(ApiError::Malformed(_)) => {
                "Unexpected response from the waitlist service.".to_string()
            }
        }
    }
}
