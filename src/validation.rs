//! Local checks run before any network call: file type, file size, email shape.

use crate::errors::InvalidInput;
use crate::types::SelectedFile;
use serde::{Deserialize, Serialize};

/// 10 MiB, the ceiling the backend enforces
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Reported types that say nothing about the content
const GENERIC_MIME_TYPES: &[&str] = &["", "application/octet-stream", "binary/octet-stream"];

/// Document formats a résumé may arrive in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Doc,
    Docx,
    Txt,
    Rtf,
    Odt,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 6] = [
        DocumentKind::Pdf,
        DocumentKind::Doc,
        DocumentKind::Docx,
        DocumentKind::Txt,
        DocumentKind::Rtf,
        DocumentKind::Odt,
    ];

    /// Accepted MIME types, canonical one first
    pub fn mime_types(self) -> &'static [&'static str] {
        match self {
            DocumentKind::Pdf => &["application/pdf", "application/x-pdf"],
            DocumentKind::Doc => &["application/msword"],
            DocumentKind::Docx => {
                &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"]
            }
            DocumentKind::Txt => &["text/plain"],
            DocumentKind::Rtf => &["application/rtf", "text/rtf"],
            DocumentKind::Odt => &["application/vnd.oasis.opendocument.text"],
        }
    }

    pub fn canonical_mime(self) -> &'static str {
        self.mime_types()[0]
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Doc => "doc",
            DocumentKind::Docx => "docx",
            DocumentKind::Txt => "txt",
            DocumentKind::Rtf => "rtf",
            DocumentKind::Odt => "odt",
        }
    }

    /// Kind implied by a file name's extension (case-insensitive)
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.extension() == ext)
    }

    pub fn from_mime(mime_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.mime_types().contains(&mime_type))
    }
}

/// Strip parameters and normalize case: `"Application/PDF; x=1"` -> `"application/pdf"`
fn essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Which files may be uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePolicy {
    pub max_size_bytes: u64,
    pub allowed: Vec<DocumentKind>,
}

impl Default for FilePolicy {
    fn default() -> Self {
        Self::pdf_only()
    }
}

impl FilePolicy {
    pub fn pdf_only() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_FILE_SIZE,
            allowed: vec![DocumentKind::Pdf],
        }
    }

    /// PDF plus the common word-processor formats
    pub fn permissive() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_FILE_SIZE,
            allowed: DocumentKind::ALL.to_vec(),
        }
    }

    pub fn with_max_size(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    /// Validate a file and return the content type to upload it with.
    ///
    /// The reported MIME type decides. Only when it is empty or generic does
    /// the file extension stand in for it.
    pub fn check(&self, file: &SelectedFile) -> Result<String, InvalidInput> {
        let reported = essence(&file.mime_type);

        let kind = if GENERIC_MIME_TYPES.contains(&reported.as_str()) {
            DocumentKind::from_file_name(&file.file_name)
        } else {
            DocumentKind::from_mime(&reported)
        };

        let content_type = match kind {
            Some(kind) if self.allowed.contains(&kind) => {
                if GENERIC_MIME_TYPES.contains(&reported.as_str()) {
                    kind.canonical_mime().to_string()
                } else {
                    reported
                }
            }
            _ => {
                return Err(InvalidInput::DisallowedType {
                    file_name: file.file_name.clone(),
                    mime_type: file.mime_type.clone(),
                })
            }
        };

        if file.size_bytes > self.max_size_bytes {
            return Err(InvalidInput::TooLarge {
                size_bytes: file.size_bytes,
                max_bytes: self.max_size_bytes,
            });
        }

        Ok(content_type)
    }
}

/// Loose email shape check: something before `@`, and a `.` inside the domain
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(host, tld)| !host.is_empty() && !tld.is_empty())
                    .unwrap_or(false)
        }
        None => false,
    }
}
