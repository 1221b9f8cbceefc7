//! Integration test harness for mock API servers
//!
//! One mockito server plays both the Jobstronaut backend and the storage
//! provider, so the full presign -> transfer -> notify handshake runs without
//! real infrastructure.

use crate::storage_transfer::ENCRYPTION_HEADER;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};

/// Path the mock storage provider accepts PUT transfers on
pub const STORAGE_PATH: &str = "/store/obj";

pub const SIGNATURE_MISMATCH_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>SignatureDoesNotMatch</Code><Message>The request signature we calculated does not match the signature you provided.</Message><RequestId>4442587FB7D0A2F9</RequestId></Error>"#;

/// A test harness that sets up mock API servers for integration testing
pub struct TestHarness {
    pub server: ServerGuard,
}

impl TestHarness {
    /// Create a new test harness with a mock server
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        Self { server }
    }

    /// Get the mock server URL
    pub fn url(&self) -> String {
        self.server.url()
    }

    /// Signed PUT URL on the mock storage provider
    pub fn storage_url(&self) -> String {
        format!("{}{}?sig=1", self.server.url(), STORAGE_PATH)
    }

    /// Mock /s3/presign returning a PUT-style grant pointing at the mock storage
    pub async fn mock_presign_put(&mut self, key: &str) -> Mock {
        let body = json!({ "url": self.storage_url(), "key": key });
        self.mock_presign_json(body).await
    }

    /// Mock /s3/presign returning a POST-style grant for `/bucket`
    pub async fn mock_presign_post(&mut self, fields: Value) -> Mock {
        let body = json!({ "url": format!("{}/bucket", self.server.url()), "fields": fields });
        self.mock_presign_json(body).await
    }

    pub async fn mock_presign_json(&mut self, body: Value) -> Mock {
        self.server
            .mock("POST", "/s3/presign")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    /// Mock /s3/presign with an arbitrary status and body
    pub async fn mock_presign_raw(&mut self, status: usize, body: &str) -> Mock {
        self.server
            .mock("POST", "/s3/presign")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await
    }

    /// Mock a PUT on the storage path.
    ///
    /// `encrypted`: `Some(true)` only matches requests carrying the encryption
    /// header, `Some(false)` only requests without it, `None` matches both.
    pub async fn mock_storage_put(&mut self, encrypted: Option<bool>, status: usize, body: &str) -> Mock {
        let mut mock = self
            .server
            .mock("PUT", STORAGE_PATH)
            .match_query(Matcher::UrlEncoded("sig".into(), "1".into()));

        mock = match encrypted {
            Some(true) => mock.match_header(ENCRYPTION_HEADER, "AES256"),
            Some(false) => mock.match_header(ENCRYPTION_HEADER, Matcher::Missing),
            None => mock,
        };

        mock.with_status(status)
            .with_header("content-type", "application/xml")
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }

    /// Mock the multipart POST target of a POST-style grant
    pub async fn mock_storage_post(&mut self, status: usize) -> Mock {
        self.server
            .mock("POST", "/bucket")
            .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
            .with_status(status)
            .expect(1)
            .create_async()
            .await
    }

    /// Mock the /apply-complete beacon
    pub async fn mock_complete(&mut self, status: usize) -> Mock {
        self.server
            .mock("POST", "/apply-complete")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(json!({ "ok": status < 400 }).to_string())
            .expect(1)
            .create_async()
            .await
    }

    pub async fn mock_waitlist(&mut self, path: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock("POST", path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn mock_health(&mut self, path: &str, status: usize, body: &str, content_type: &str) -> Mock {
        self.server
            .mock("GET", path)
            .with_status(status)
            .with_header("content-type", content_type)
            .with_body(body)
            .create_async()
            .await
    }
}

/// URL of a port nothing listens on (connection refused)
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// URL of a server that accepts connections and never answers
pub async fn silent_server_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_storage_url_points_at_mock_server() {
        let harness = TestHarness::new().await;
        assert!(harness.storage_url().starts_with(&harness.url()));
        assert!(harness.storage_url().ends_with("/store/obj?sig=1"));
    }

    #[tokio::test]
    async fn test_presign_put_mock_serves_grant() {
        let mut harness = TestHarness::new().await;
        let _mock = harness.mock_presign_put("uploads/abc_resume.pdf").await;

        let response: Value = reqwest::Client::new()
            .post(format!("{}/s3/presign", harness.url()))
            .json(&json!({"filename": "resume.pdf"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["key"], "uploads/abc_resume.pdf");
        assert_eq!(response["url"], harness.storage_url());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let url = silent_server_url().await;
        let err = reqwest::Client::new()
            .get(&url)
            .timeout(std::time::Duration::from_millis(100))
            .send()
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
