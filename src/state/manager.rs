//! Application state manager shared by every command.

use std::sync::Arc;
use crate::config_utils::UploaderConfig;
use crate::debug_logger::DebugLogger;
use crate::trigger_control::TriggerControl;

/// Manages the shared resources the commands work against
pub struct AppStateManager {
    /// Resolved configuration (base URL, timeouts, file policy)
    pub config: UploaderConfig,
    /// Debug logger for capturing application events
    pub debug_logger: Arc<DebugLogger>,
    /// Busy flag for the upload trigger
    pub upload_trigger: TriggerControl,
    /// Busy flag for the waitlist trigger
    pub waitlist_trigger: TriggerControl,
}

impl AppStateManager {
    pub fn new(config: UploaderConfig) -> Self {
        Self {
            config,
            debug_logger: Arc::new(DebugLogger::new()),
            upload_trigger: TriggerControl::new(),
            waitlist_trigger: TriggerControl::new(),
        }
    }
}

impl Default for AppStateManager {
    fn default() -> Self {
        Self::new(UploaderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triggers_start_idle_and_independent() {
        let manager = AppStateManager::default();
        assert!(!manager.upload_trigger.is_busy());

        let _guard = manager.upload_trigger.try_acquire().unwrap();
        assert!(manager.upload_trigger.is_busy());
        assert!(!manager.waitlist_trigger.is_busy());
    }

    #[test]
    fn test_config_is_kept() {
        let manager = AppStateManager::new(UploaderConfig::default().with_base_url("http://localhost:10000/"));
        assert_eq!(manager.config.base_url, "http://localhost:10000");
        assert_eq!(manager.debug_logger.get_error_count(), 0);
    }
}
