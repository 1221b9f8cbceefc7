//! Backend health probe command.

use crate::api_client::ApiClient;
use crate::api_contracts::HealthReport;
use crate::state::AppStateManager;

pub async fn check_health(state_manager: &AppStateManager) -> Result<HealthReport, String> {
    state_manager.debug_logger.debug(format!("Checking health of {}", state_manager.config.base_url));

    let client = ApiClient::new(&state_manager.config);
    let report = client.check_health().await.map_err(|e| {
        let error_msg = format!("Health check failed: {}", e);
        state_manager.debug_logger.error(error_msg.clone());
        error_msg
    })?;

    state_manager.debug_logger.info(format!("Health check returned {} (ok: {})", report.status, report.ok));
    Ok(report)
}
