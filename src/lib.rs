//! Direct-to-storage résumé uploads for Jobstronaut.
//!
//! A file is validated locally, the backend hands out a presigned grant
//! (`/s3/presign`), the bytes go straight to object storage and the backend
//! is told about it afterwards (`/apply-complete`). The waitlist form and the
//! health probe share the same client.

pub mod api_client;
pub mod api_contracts;
pub mod commands;
pub mod config_utils;
pub mod debug_logger;
pub mod errors;
pub mod state;
pub mod storage_transfer;
pub mod trigger_control;
pub mod types;
pub mod upload_orchestrator;
pub mod validation;
pub mod waitlist;

#[cfg(test)]
mod test_harness;

pub use config_utils::UploaderConfig;
pub use errors::{ApiError, InvalidInput, UploadError, UploadErrorKind, WaitlistError};
pub use state::AppStateManager;
pub use trigger_control::{TriggerControl, TriggerGuard};
pub use types::{PresignGrant, SelectedFile, UploadOutcome, UploadRequest, UploadStatus};
pub use upload_orchestrator::UploadOrchestrator;
pub use validation::FilePolicy;
pub use waitlist::WaitlistSubmitter;
