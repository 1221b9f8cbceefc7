//! Debug and diagnostic commands.

use std::path::Path;
use crate::state::AppStateManager;

/// Export debug log to the app's logs directory
pub fn export_debug_log(state_manager: &AppStateManager) -> Result<String, String> {
    let log_path = state_manager
        .debug_logger
        .save_report_to_file(Some(state_manager.config.base_url.clone()))?;
    Ok(log_path.to_string_lossy().to_string())
}

/// Export debug log under `dir`
pub fn export_debug_log_to(state_manager: &AppStateManager, dir: &Path) -> Result<String, String> {
    let log_path = state_manager
        .debug_logger
        .save_report_in(dir, Some(state_manager.config.base_url.clone()))?;
    Ok(log_path.to_string_lossy().to_string())
}

/// Get debug log statistics
pub fn get_debug_stats(state_manager: &AppStateManager) -> serde_json::Value {
    serde_json::json!({
        "error_count": state_manager.debug_logger.get_error_count(),
        "entries": state_manager.debug_logger.entries().len(),
    })
}
