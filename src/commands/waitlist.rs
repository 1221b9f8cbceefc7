//! Waitlist command.

use crate::state::AppStateManager;
use crate::waitlist::WaitlistSubmitter;

pub const WAITLIST_BUSY_MESSAGE: &str = "Already submitting, please wait.";

/// Join the waitlist, returning the user-facing error message on failure
pub async fn join_waitlist(state_manager: &AppStateManager, email: &str) -> Result<(), String> {
    let _guard = state_manager
        .waitlist_trigger
        .try_acquire()
        .ok_or_else(|| WAITLIST_BUSY_MESSAGE.to_string())?;

    let submitter = WaitlistSubmitter::new(&state_manager.config);
    match submitter.join(email).await {
        Ok(()) => {
            state_manager.debug_logger.info("Joined waitlist".to_string());
            Ok(())
        }
        Err(e) => {
            state_manager.debug_logger.warn(format!("Waitlist join failed: {}", e));
            Err(e.user_message())
        }
    }
}
