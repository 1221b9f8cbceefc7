//! Core values passed through one upload.
//!
//! None of these outlive the `submit_upload` call that created them.

use crate::errors::{UploadError, UploadErrorKind};
use crate::validation::DocumentKind;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// MIME type used when nothing better is known about a file
pub const GENERIC_MIME_TYPE: &str = "application/octet-stream";

/// A file picked by the user, already read into memory
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub file_name: String,
    /// Size as reported by whoever selected the file
    pub size_bytes: u64,
    /// Reported MIME type; may be empty or generic
    pub mime_type: String,
    pub contents: Vec<u8>,
}

impl SelectedFile {
    /// Build from in-memory contents; size is taken from the contents
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            size_bytes: contents.len() as u64,
            mime_type: mime_type.into(),
            contents,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    ///
    /// Files larger than `read_limit` bytes are not read: the result carries
    /// the on-disk size with empty contents, so validation rejects it as too
    /// large without the bytes ever being buffered.
    pub async fn from_path(path: &Path, read_limit: u64) -> Result<Self, String> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or("Invalid filename")?
            .to_string();

        let mime_type = DocumentKind::from_file_name(&file_name)
            .map(|kind| kind.canonical_mime())
            .unwrap_or(GENERIC_MIME_TYPE);

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| format!("Failed to read file: {}", e))?;

        if metadata.len() > read_limit {
            tracing::debug!(size = metadata.len(), read_limit, "Skipping read of oversize file");
            return Ok(Self {
                file_name,
                size_bytes: metadata.len(),
                mime_type: mime_type.to_string(),
                contents: Vec::new(),
            });
        }

        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| format!("Failed to read file: {}", e))?;

        Ok(Self::new(file_name, mime_type, contents))
    }
}

/// Input to `UploadOrchestrator::submit_upload`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadRequest {
    /// `None` when the user triggered the upload without choosing a file
    pub file: Option<SelectedFile>,
    pub email: Option<String>,
}

impl UploadRequest {
    pub fn new(file: SelectedFile) -> Self {
        Self {
            file: Some(file),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Trimmed email, `None` when absent or blank
    pub fn contact_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(String::from)
    }
}

/// Single-URL grant: raw bytes go up with an HTTP PUT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutGrant {
    pub transfer_url: String,
    /// Extra headers the signature was computed over, in server order
    pub required_headers: Vec<(String, String)>,
    pub object_key: Option<String>,
}

/// URL plus form fields: multipart HTTP POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostGrant {
    pub transfer_url: String,
    /// Form fields in the order the server sent them
    pub form_fields: Vec<(String, String)>,
    pub object_key: Option<String>,
}

/// Permission to write one object, decided by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresignGrant {
    Put(PutGrant),
    Post(PostGrant),
}

impl PresignGrant {
    pub fn transfer_url(&self) -> &str {
        match self {
            PresignGrant::Put(g) => &g.transfer_url,
            PresignGrant::Post(g) => &g.transfer_url,
        }
    }

    pub fn object_key(&self) -> Option<&str> {
        match self {
            PresignGrant::Put(g) => g.object_key.as_deref(),
            PresignGrant::Post(g) => g.object_key.as_deref(),
        }
    }

    /// HTTP method the transfer will use
    pub fn method(&self) -> &'static str {
        match self {
            PresignGrant::Put(_) => "PUT",
            PresignGrant::Post(_) => "POST",
        }
    }
}

/// Result handed back to the caller at the end of the handshake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub object_key: Option<String>,
    pub error: Option<UploadError>,
    /// Storage requests issued, including the header-stripped retry
    pub transfer_attempts: u32,
}

impl UploadOutcome {
    pub fn succeeded(object_key: Option<String>, transfer_attempts: u32) -> Self {
        Self {
            success: true,
            object_key,
            error: None,
            transfer_attempts,
        }
    }

    pub fn failed(error: UploadError, transfer_attempts: u32) -> Self {
        Self {
            success: false,
            object_key: None,
            error: Some(error),
            transfer_attempts,
        }
    }

    pub fn error_kind(&self) -> Option<UploadErrorKind> {
        self.error.as_ref().map(UploadError::kind)
    }

    /// Retries after the first storage request (0 or 1)
    pub fn transfer_retries(&self) -> u32 {
        self.transfer_attempts.saturating_sub(1)
    }
}

/// Progress of one upload, reported through the status callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadStatus {
    Validating,
    Presigning { filename: String },
    Transferring { filename: String, method: String, attempt: u32 },
    Notifying { filename: String },
    Done { outcome: UploadOutcome },
}

impl UploadStatus {
    /// Short label for log lines and status text
    pub fn label(&self) -> &'static str {
        match self {
            UploadStatus::Validating => "validating",
            UploadStatus::Presigning { .. } => "presigning",
            UploadStatus::Transferring { .. } => "transferring",
            UploadStatus::Notifying { .. } => "notifying",
            UploadStatus::Done { .. } => "done",
        }
    }
}
