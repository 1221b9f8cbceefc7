//! Résumé upload command.

use std::path::Path;
use std::sync::Arc;
use crate::state::AppStateManager;
use crate::types::{SelectedFile, UploadOutcome, UploadRequest, UploadStatus};
use crate::upload_orchestrator::UploadOrchestrator;

pub const UPLOAD_BUSY_MESSAGE: &str = "An upload is already in progress.";

/// Upload the file at `path` and wait for the completion notice to settle.
///
/// `Err` only covers failures before an upload could start (busy trigger,
/// unreadable file); every handshake failure is reported in the outcome.
pub async fn upload_resume<F>(
    state_manager: &AppStateManager,
    path: &Path,
    email: Option<String>,
    on_status: F,
) -> Result<UploadOutcome, String>
where
    F: Fn(&UploadStatus) + Send + Sync + 'static,
{
    let _guard = state_manager.upload_trigger.try_acquire().ok_or_else(|| {
        state_manager.debug_logger.warn("Upload already in progress, ignoring trigger".to_string());
        UPLOAD_BUSY_MESSAGE.to_string()
    })?;

    let read_limit = state_manager.config.max_file_size_bytes;
    let file = SelectedFile::from_path(path, read_limit).await.map_err(|e| {
        state_manager.debug_logger.error(e.clone());
        e
    })?;
    state_manager.debug_logger.info(format!(
        "Uploading {} ({} bytes, {})",
        file.file_name, file.size_bytes, file.mime_type
    ));

    let mut request = UploadRequest::new(file);
    request.email = email;

    let orchestrator = UploadOrchestrator::new(&state_manager.config)
        .with_logger(Arc::clone(&state_manager.debug_logger))
        .on_status(on_status);

    let (outcome, beacon) = orchestrator.submit_upload_tracked(request).await;
    if let Some(beacon) = beacon {
        if let Err(e) = beacon.await {
            state_manager.debug_logger.warn(format!("Completion notice task ended abnormally: {}", e));
        }
    }

    Ok(outcome)
}
