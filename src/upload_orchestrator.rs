//! Upload orchestration service
//!
//! Drives one résumé through the three-step handshake:
//!
//! ```text
//! Validating -> Presigning -> Transferring -> Notifying (best effort) -> Done
//!      \             \              \
//!       +-------------+--------------+--> Done(failure)
//! ```
//!
//! A failed transfer is terminal; the only recovery is the single
//! header-stripping retry inside `StorageTransfer`.

use crate::api_client::ApiClient;
use crate::api_contracts::{public_object_url, CompletionNotice, PresignRequest};
use crate::config_utils::UploaderConfig;
use crate::debug_logger::{self, DebugLogger};
use crate::errors::{InvalidInput, UploadError};
use crate::storage_transfer::StorageTransfer;
use crate::types::{PresignGrant, UploadOutcome, UploadRequest, UploadStatus};
use crate::validation::FilePolicy;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Receives every state transition of an upload
pub type StatusCallback = Arc<dyn Fn(&UploadStatus) + Send + Sync>;

/// Service for submitting one upload end to end
pub struct UploadOrchestrator {
    api: ApiClient,
    storage: StorageTransfer,
    policy: FilePolicy,
    logger: Option<Arc<DebugLogger>>,
    on_status: Option<StatusCallback>,
}

impl UploadOrchestrator {
    pub fn new(config: &UploaderConfig) -> Self {
        let api = ApiClient::new(config);
        let storage = StorageTransfer::new(api.http().clone(), config.transfer_timeout());
        Self {
            api,
            storage,
            policy: config.file_policy(),
            logger: None,
            on_status: None,
        }
    }

    pub fn with_logger(mut self, logger: Arc<DebugLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn on_status<F>(mut self, callback: F) -> Self
    where
        F: Fn(&UploadStatus) + Send + Sync + 'static,
    {
        self.on_status = Some(Arc::new(callback));
        self
    }

    pub fn policy(&self) -> &FilePolicy {
        &self.policy
    }

    fn emit(&self, status: UploadStatus) {
        tracing::debug!(status = status.label(), "Upload status");
        if let Some(ref callback) = self.on_status {
            callback(&status);
        }
    }

    fn log(&self, level: &str, message: String, context: Option<serde_json::Value>) {
        debug_logger::record(self.logger.as_deref(), level, message, context);
    }

    /// Run the handshake for one file.
    ///
    /// Returns once the transfer has settled. The completion notice is sent
    /// in the background and never affects the outcome.
    pub async fn submit_upload(&self, request: UploadRequest) -> UploadOutcome {
        let (outcome, _beacon) = self.submit_upload_tracked(request).await;
        outcome
    }

    /// Same as `submit_upload`, but also hands back the background notify task
    /// so callers that must not exit early (the CLI, tests) can wait for it.
    pub async fn submit_upload_tracked(
        &self,
        request: UploadRequest,
    ) -> (UploadOutcome, Option<JoinHandle<()>>) {
        let (outcome, beacon) = match self.run(request).await {
            Ok((object_key, attempts, beacon)) => {
                (UploadOutcome::succeeded(object_key, attempts), Some(beacon))
            }
            Err((error, attempts)) => {
                let level = if matches!(error, UploadError::InvalidInput(_)) { "WARN" } else { "ERROR" };
                self.log(level, format!("Upload failed: {}", error), None);
                (UploadOutcome::failed(error, attempts), None)
            }
        };

        self.emit(UploadStatus::Done {
            outcome: outcome.clone(),
        });
        (outcome, beacon)
    }

    async fn run(
        &self,
        request: UploadRequest,
    ) -> Result<(Option<String>, u32, JoinHandle<()>), (UploadError, u32)> {
        // Validating: nothing below this block runs for bad input
        self.emit(UploadStatus::Validating);
        let email = request.contact_email();
        let file = request
            .file
            .ok_or((UploadError::from(InvalidInput::MissingFile), 0))?;
        let content_type = self
            .policy
            .check(&file)
            .map_err(|reason| (UploadError::from(reason), 0))?;

        // Presigning
        self.emit(UploadStatus::Presigning {
            filename: file.file_name.clone(),
        });
        let presign_request = PresignRequest {
            filename: file.file_name.clone(),
            content_type: content_type.clone(),
            size: Some(file.size_bytes),
            email,
        };
        let response = self
            .api
            .presign(&presign_request)
            .await
            .map_err(|e| (UploadError::from_presign(e), 0))?;
        let public_url = response.public_url.clone();
        let grant = response
            .into_grant()
            .map_err(|detail| (UploadError::PresignMalformed(detail), 0))?;

        self.log(
            "INFO",
            format!("Presign granted {} transfer for {}", grant.method(), file.file_name),
            Some(json!({ "key": grant.object_key() })),
        );

        // Transferring
        let filename = file.file_name.clone();
        let method = grant.method().to_string();
        let report = self
            .storage
            .send(&grant, &file, &content_type, &|attempt| {
                self.emit(UploadStatus::Transferring {
                    filename: filename.clone(),
                    method: method.clone(),
                    attempt,
                })
            })
            .await;

        if let Err(error) = report.result {
            self.log_transfer_failure(&grant, &error);
            return Err((error, report.attempts));
        }

        self.log(
            "INFO",
            format!(
                "Transferred {} ({} bytes) in {} attempt(s)",
                file.file_name, file.size_bytes, report.attempts
            ),
            None,
        );

        // Notifying: fire and forget
        self.emit(UploadStatus::Notifying {
            filename: file.file_name.clone(),
        });
        let notice = CompletionNotice {
            filename: file.file_name.clone(),
            size: file.size_bytes,
            content_type,
            key: grant.object_key().map(String::from),
            url: public_object_url(public_url.as_deref(), grant.transfer_url()),
        };
        let beacon = self.spawn_notify(notice);

        Ok((grant.object_key().map(String::from), report.attempts, beacon))
    }

    fn spawn_notify(&self, notice: CompletionNotice) -> JoinHandle<()> {
        let api = self.api.clone();
        let logger = self.logger.clone();

        tokio::spawn(async move {
            if let Err(e) = api.notify_complete(&notice).await {
                let error = UploadError::NotifyFailed(e.to_string());
                debug_logger::record(
                    logger.as_deref(),
                    "WARN",
                    format!("{} (upload already stored)", error),
                    Some(json!({ "key": notice.key, "filename": notice.filename })),
                );
            }
        })
    }

    fn log_transfer_failure(&self, grant: &PresignGrant, error: &UploadError) {
        let context = match error {
            UploadError::TransferFailed { status, provider } => json!({
                "method": grant.method(),
                "status": status,
                "code": provider.code,
                "message": provider.message,
                "request_id": provider.request_id,
                "bucket_region": provider.bucket_region,
                "hint": provider.hint(),
                "raw": provider.raw,
            }),
            other => json!({ "method": grant.method(), "error": other.to_string() }),
        };
        self.log("ERROR", "Storage transfer failed".to_string(), Some(context));
    }
}
