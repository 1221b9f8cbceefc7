use crate::api_contracts::{
    ApiMessage, CompletionNotice, HealthReport, PresignRequest, PresignResponse, WaitlistRequest,
};
use crate::config_utils::UploaderConfig;
use crate::errors::ApiError;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

const PRESIGN_PATH: &str = "/s3/presign";
const COMPLETE_PATH: &str = "/apply-complete";
const WAITLIST_PATH: &str = "/waitlist";
const WAITLIST_FALLBACK_PATH: &str = "/waitlist/join";
const HEALTH_PATH: &str = "/healthz";
const HEALTH_FALLBACK_PATH: &str = "/health";

/// Client for the Jobstronaut backend
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
    presign_timeout: Duration,
    notify_timeout: Duration,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &UploaderConfig) -> Self {
        // Include version in User-Agent header for tracking
        let user_agent = format!("JobstronautUploader/{}", env!("CARGO_PKG_VERSION"));

        let client = reqwest::Client::builder()
            .user_agent(&user_agent)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            presign_timeout: config.presign_timeout(),
            notify_timeout: config.notify_timeout(),
            request_timeout: config.request_timeout(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying HTTP client, shared with the storage transfer
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .timeout(timeout)
            .send()
            .await?;
        Ok(response)
    }

    /// Turn a non-2xx response into `ApiError::Status`
    async fn reject(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ApiError::Status {
            status,
            message: ApiMessage::extract(&body),
            body,
        }
    }

    /// Ask the backend for permission to write one object
    pub async fn presign(&self, request: &PresignRequest) -> Result<PresignResponse, ApiError> {
        tracing::debug!(url = %self.endpoint(PRESIGN_PATH), filename = %request.filename, "Requesting presigned grant");

        let response = self
            .post_json(PRESIGN_PATH, request, self.presign_timeout)
            .await?;

        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    /// Tell the backend a direct transfer finished. The response body is ignored.
    pub async fn notify_complete(&self, notice: &CompletionNotice) -> Result<(), ApiError> {
        let response = self
            .post_json(COMPLETE_PATH, notice, self.notify_timeout)
            .await?;

        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }
        Ok(())
    }

    /// Add an email to the waitlist.
    ///
    /// Older deployments only expose `/waitlist/join`, so a 404 on the first
    /// path is retried once against the second.
    pub async fn join_waitlist(&self, email: &str) -> Result<(), ApiError> {
        let request = WaitlistRequest {
            email: email.to_string(),
        };

        let mut response = self
            .post_json(WAITLIST_PATH, &request, self.request_timeout)
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Waitlist endpoint not found, trying {}", WAITLIST_FALLBACK_PATH);
            response = self
                .post_json(WAITLIST_FALLBACK_PATH, &request, self.request_timeout)
                .await?;
        }

        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }
        Ok(())
    }

    /// Probe backend liveness. Non-2xx is reported as `ok: false`, not as an error.
    pub async fn check_health(&self) -> Result<HealthReport, ApiError> {
        let mut response = self.get(HEALTH_PATH).await?;

        if response.status() == StatusCode::NOT_FOUND {
            response = self.get(HEALTH_FALLBACK_PATH).await?;
        }

        Self::health_report(response).await
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .timeout(self.request_timeout)
            .send()
            .await?;
        Ok(response)
    }

    async fn health_report(response: reqwest::Response) -> Result<HealthReport, ApiError> {
        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);

        let text = response.text().await?;
        let body = if is_json {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
        } else {
            serde_json::Value::String(text)
        };

        Ok(HealthReport {
            ok: status.is_success(),
            status: status.as_u16(),
            body,
        })
    }
}
