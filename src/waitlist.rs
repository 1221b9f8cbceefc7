use crate::api_client::ApiClient;
use crate::config_utils::UploaderConfig;
use crate::errors::WaitlistError;
use crate::validation::is_valid_email;

/// Submits emails to the waitlist.
///
/// The address is trimmed and checked locally first, so an empty or
/// malformed email never reaches the backend.
pub struct WaitlistSubmitter {
    api: ApiClient,
}

impl WaitlistSubmitter {
    pub fn new(config: &UploaderConfig) -> Self {
        Self {
            api: ApiClient::new(config),
        }
    }

    pub fn from_client(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn join(&self, email: &str) -> Result<(), WaitlistError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(WaitlistError::InvalidEmail(email.to_string()));
        }

        tracing::info!("Joining waitlist");
        self.api.join_waitlist(email).await.map_err(|e| {
            tracing::warn!("Waitlist join failed: {}", e);
            WaitlistError::from(e)
        })
    }
}
