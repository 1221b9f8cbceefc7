//! Direct-to-storage transfer
//!
//! Sends the file bytes to the URL from a presign grant, never through the
//! backend. A PUT grant gets exactly one retry without the encryption
//! header, because some presign signatures were generated without it and the
//! provider rejects any unsigned header.

use crate::errors::{ProviderError, UploadError};
use crate::types::{PostGrant, PresignGrant, PutGrant, SelectedFile};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Encryption-at-rest header sent with PUT transfers
pub const ENCRYPTION_HEADER: &str = "x-amz-server-side-encryption";
pub const ENCRYPTION_VALUE: &str = "AES256";

/// Multipart field name the provider expects the file under
pub const FILE_FIELD: &str = "file";

const RAW_BODY_LIMIT: usize = 500;

/// What happened on the storage side of one upload
#[derive(Debug)]
pub struct TransferReport {
    /// Requests issued: 1, or 2 when the PUT fallback ran
    pub attempts: u32,
    pub result: Result<(), UploadError>,
}

/// Client for the direct transfer
pub struct StorageTransfer {
    client: reqwest::Client,
    timeout: Duration,
}

impl StorageTransfer {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Transfer `file` using whichever grant shape the backend issued.
    ///
    /// `on_attempt` is called with the 1-based attempt number before each request.
    pub async fn send(
        &self,
        grant: &PresignGrant,
        file: &SelectedFile,
        content_type: &str,
        on_attempt: &(dyn Fn(u32) + Send + Sync),
    ) -> TransferReport {
        match grant {
            PresignGrant::Post(grant) => {
                on_attempt(1);
                TransferReport {
                    attempts: 1,
                    result: self.post_form(grant, file, content_type).await,
                }
            }
            PresignGrant::Put(grant) => {
                on_attempt(1);
                let first = self.put_bytes(grant, file, content_type, true).await;
                let first_error = match first {
                    Ok(()) => return TransferReport { attempts: 1, result: Ok(()) },
                    Err(e) => e,
                };

                tracing::warn!(
                    error = %first_error,
                    "PUT with {} failed, retrying once without it",
                    ENCRYPTION_HEADER
                );

                on_attempt(2);
                TransferReport {
                    attempts: 2,
                    result: self.put_bytes(grant, file, content_type, false).await,
                }
            }
        }
    }

    async fn put_bytes(
        &self,
        grant: &PutGrant,
        file: &SelectedFile,
        content_type: &str,
        with_encryption: bool,
    ) -> Result<(), UploadError> {
        let mut request = self
            .client
            .put(&grant.transfer_url)
            .timeout(self.timeout);

        for (name, value) in &grant.required_headers {
            // Content type and encryption are set below, exactly once
            if name.eq_ignore_ascii_case(CONTENT_TYPE.as_str())
                || name.eq_ignore_ascii_case(ENCRYPTION_HEADER)
            {
                continue;
            }
            request = request.header(name.as_str(), value.as_str());
        }

        request = request.header(CONTENT_TYPE, content_type);
        if with_encryption {
            request = request.header(ENCRYPTION_HEADER, ENCRYPTION_VALUE);
        }

        let response = request
            .body(file.contents.clone())
            .send()
            .await
            .map_err(transport_error)?;

        check_response(response).await
    }

    async fn post_form(
        &self,
        grant: &PostGrant,
        file: &SelectedFile,
        content_type: &str,
    ) -> Result<(), UploadError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &grant.form_fields {
            form = form.text(name.clone(), value.clone());
        }

        let part = reqwest::multipart::Part::bytes(file.contents.clone())
            .file_name(file.file_name.clone());
        let part = match part.mime_str(content_type) {
            Ok(part) => part,
            Err(e) => {
                tracing::debug!("Unusable content type {:?} for file part: {}", content_type, e);
                reqwest::multipart::Part::bytes(file.contents.clone())
                    .file_name(file.file_name.clone())
            }
        };
        // Providers ignore any field after the file part
        form = form.part(FILE_FIELD, part);

        let response = self
            .client
            .post(&grant.transfer_url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        check_response(response).await
    }
}

fn transport_error(e: reqwest::Error) -> UploadError {
    UploadError::TransferTransportError {
        timed_out: e.is_timeout(),
        message: e.to_string(),
    }
}

async fn check_response(response: reqwest::Response) -> Result<(), UploadError> {
    if response.status().is_success() {
        return Ok(());
    }

    let status = response.status().as_u16();
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };
    let request_id = header("x-amz-request-id");
    let bucket_region = header("x-amz-bucket-region");
    let body = response.text().await.unwrap_or_default();

    let mut provider = parse_provider_error(&body);
    provider.request_id = provider.request_id.or(request_id);
    provider.bucket_region = bucket_region;

    Err(UploadError::TransferFailed { status, provider })
}

/// Text inside the first `<tag>...</tag>`, if any
fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    let value = xml[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Pull `<Code>`, `<Message>` and `<RequestId>` out of a provider error body.
///
/// Anything unparseable just leaves the fields empty.
pub fn parse_provider_error(body: &str) -> ProviderError {
    ProviderError {
        code: extract_tag(body, "Code"),
        message: extract_tag(body, "Message"),
        request_id: extract_tag(body, "RequestId"),
        bucket_region: None,
        raw: body.chars().take(RAW_BODY_LIMIT).collect(),
    }
}

impl ProviderError {
    /// Likely cause for well-known provider error codes
    pub fn hint(&self) -> Option<&'static str> {
        match self.code.as_deref()? {
            "AuthorizationHeaderMalformed" => {
                Some("Region mismatch: the backend signs for a different region than the bucket's")
            }
            "SignatureDoesNotMatch" => {
                Some("Signature mismatch: headers sent differ from those signed, or clock skew")
            }
            "AccessDenied" | "InvalidAccessKeyId" => {
                Some("Check the access key and the bucket policy")
            }
            "NoSuchBucket" => Some("Bucket name or region typo, or wrong account"),
            "RequestTimeTooSkewed" => Some("Clock skew between the signer and the provider"),
            "EntityTooLarge" => Some("File exceeds the size the grant allows"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_harness::{TestHarness, SIGNATURE_MISMATCH_XML};
    use mockito::Matcher;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn pdf() -> SelectedFile {
        SelectedFile::new("resume.pdf", "application/pdf", b"%PDF-1.4 test body".to_vec())
    }

    fn transfer() -> StorageTransfer {
        StorageTransfer::new(reqwest::Client::new(), Duration::from_secs(5))
    }

    fn put_grant(url: String, required_headers: Vec<(String, String)>) -> PresignGrant {
        PresignGrant::Put(PutGrant {
            transfer_url: url,
            required_headers,
            object_key: Some("uploads/abc_resume.pdf".into()),
        })
    }

    #[test]
    fn test_parse_s3_error_xml() {
        let provider = parse_provider_error(SIGNATURE_MISMATCH_XML);
        assert_eq!(provider.code.as_deref(), Some("SignatureDoesNotMatch"));
        assert_eq!(
            provider.message.as_deref(),
            Some("The request signature we calculated does not match the signature you provided.")
        );
        assert_eq!(provider.request_id.as_deref(), Some("4442587FB7D0A2F9"));
        assert!(provider.hint().unwrap().contains("Signature mismatch"));
    }

    #[test]
    fn test_parse_garbage_degrades_to_empty() {
        for body in ["", "<html><body>502</body></html>", "<Code>unterminated", "<Code></Code>"] {
            let provider = parse_provider_error(body);
            assert_eq!(provider.code, None, "body: {:?}", body);
            assert_eq!(provider.message, None);
            assert_eq!(provider.hint(), None);
        }
    }

    #[test]
    fn test_raw_body_is_truncated_on_char_boundary() {
        let body = "é".repeat(800);
        let provider = parse_provider_error(&body);
        assert_eq!(provider.raw.chars().count(), RAW_BODY_LIMIT);
    }

    #[tokio::test]
    async fn test_put_sends_content_type_and_encryption_header() {
        let mut harness = TestHarness::new().await;
        let mock = harness.mock_storage_put(Some(true), 200, "").await;

        let attempts = AtomicU32::new(0);
        let report = transfer()
            .send(&put_grant(harness.storage_url(), vec![]), &pdf(), "application/pdf", &|n| {
                attempts.store(n, Ordering::SeqCst)
            })
            .await;

        assert!(report.result.is_ok());
        assert_eq!(report.attempts, 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_forwards_signed_headers_without_duplicates() {
        let mut harness = TestHarness::new().await;
        let mock = harness
            .server
            .mock("PUT", "/store/obj")
            .match_query(Matcher::Any)
            .match_header("x-amz-meta-source", "jobstronaut")
            .match_header(ENCRYPTION_HEADER, ENCRYPTION_VALUE)
            .match_header("content-type", "application/pdf")
            .with_status(200)
            .create_async()
            .await;

        let grant = put_grant(
            harness.storage_url(),
            vec![
                ("x-amz-meta-source".into(), "jobstronaut".into()),
                (ENCRYPTION_HEADER.into(), ENCRYPTION_VALUE.into()),
                ("Content-Type".into(), "text/plain".into()),
            ],
        );
        let report = transfer().send(&grant, &pdf(), "application/pdf", &|_| {}).await;

        assert!(report.result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_retries_once_without_encryption_header() {
        let mut harness = TestHarness::new().await;
        let with_header = harness.mock_storage_put(Some(true), 403, SIGNATURE_MISMATCH_XML).await;
        let without_header = harness.mock_storage_put(Some(false), 200, "").await;

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let report = transfer()
            .send(&put_grant(harness.storage_url(), vec![]), &pdf(), "application/pdf", &move |n| {
                seen_cb.lock().unwrap().push(n)
            })
            .await;

        assert!(report.result.is_ok());
        assert_eq!(report.attempts, 2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        with_header.assert_async().await;
        without_header.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_gives_up_after_single_retry() {
        let mut harness = TestHarness::new().await;
        let with_header = harness.mock_storage_put(Some(true), 403, SIGNATURE_MISMATCH_XML).await;
        let without_header = harness
            .server
            .mock("PUT", "/store/obj")
            .match_query(Matcher::Any)
            .match_header(ENCRYPTION_HEADER, Matcher::Missing)
            .with_status(403)
            .with_header("x-amz-request-id", "REQ123")
            .with_header("x-amz-bucket-region", "us-west-2")
            .with_body("<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>")
            .expect(1)
            .create_async()
            .await;

        let report = transfer()
            .send(&put_grant(harness.storage_url(), vec![]), &pdf(), "application/pdf", &|_| {})
            .await;

        assert_eq!(report.attempts, 2);
        match report.result {
            Err(UploadError::TransferFailed { status, provider }) => {
                assert_eq!(status, 403);
                assert_eq!(provider.code.as_deref(), Some("AccessDenied"));
                assert_eq!(provider.request_id.as_deref(), Some("REQ123"));
                assert_eq!(provider.bucket_region.as_deref(), Some("us-west-2"));
            }
            other => panic!("expected TransferFailed, got {:?}", other),
        }
        with_header.assert_async().await;
        without_header.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_sends_every_field_and_file_part() {
        let mut harness = TestHarness::new().await;
        let mock = harness
            .server
            .mock("POST", "/bucket")
            .match_header("content-type", Matcher::Regex("^multipart/form-data; boundary=".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="key"\r\n\r\nuploads/abc_resume.pdf\r\n"#.into()),
                Matcher::Regex(r#"name="policy"\r\n\r\neyJleHAiOiIyMDI1In0=\r\n"#.into()),
                Matcher::Regex(r#"name="x-amz-signature"\r\n\r\ndeadbeef\r\n"#.into()),
                Matcher::Regex(r#"name="file"; filename="resume.pdf""#.into()),
                Matcher::Regex("%PDF-1.4 test body".into()),
            ]))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let grant = PresignGrant::Post(PostGrant {
            transfer_url: format!("{}/bucket", harness.url()),
            form_fields: vec![
                ("key".into(), "uploads/abc_resume.pdf".into()),
                ("policy".into(), "eyJleHAiOiIyMDI1In0=".into()),
                ("x-amz-signature".into(), "deadbeef".into()),
            ],
            object_key: Some("uploads/abc_resume.pdf".into()),
        });
        let report = transfer().send(&grant, &pdf(), "application/pdf", &|_| {}).await;

        assert!(report.result.is_ok());
        assert_eq!(report.attempts, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_failure_is_not_retried() {
        let mut harness = TestHarness::new().await;
        let mock = harness
            .server
            .mock("POST", "/bucket")
            .with_status(400)
            .with_body("<Error><Code>EntityTooLarge</Code></Error>")
            .expect(1)
            .create_async()
            .await;

        let grant = PresignGrant::Post(PostGrant {
            transfer_url: format!("{}/bucket", harness.url()),
            form_fields: vec![],
            object_key: None,
        });
        let report = transfer().send(&grant, &pdf(), "application/pdf", &|_| {}).await;

        assert_eq!(report.attempts, 1);
        assert!(matches!(report.result, Err(UploadError::TransferFailed { status: 400, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_put_timeout_retries_once_then_reports_transport_error() {
        let url = format!("{}/store/obj?sig=1", crate::test_harness::silent_server_url().await);
        let transfer = StorageTransfer::new(reqwest::Client::new(), Duration::from_millis(200));

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_cb = Arc::clone(&seen);
        let report = transfer
            .send(&put_grant(url, vec![]), &pdf(), "application/pdf", &move |n| {
                seen_cb.lock().unwrap().push(n)
            })
            .await;

        assert_eq!(report.attempts, 2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert!(matches!(
            report.result,
            Err(UploadError::TransferTransportError { timed_out: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_put_refused_connection_retries_once() {
        let url = format!("{}/store/obj?sig=1", crate::test_harness::closed_port_url().await);

        let report = transfer()
            .send(&put_grant(url, vec![]), &pdf(), "application/pdf", &|_| {})
            .await;

        assert_eq!(report.attempts, 2);
        assert!(matches!(
            report.result,
            Err(UploadError::TransferTransportError { timed_out: false, .. })
        ));
    }

    #[tokio::test]
    async fn test_transfer_timeout() {
        let url = crate::test_harness::silent_server_url().await;
        let transfer = StorageTransfer::new(reqwest::Client::new(), Duration::from_millis(200));
        let grant = PresignGrant::Post(PostGrant {
            transfer_url: format!("{}/bucket", url),
            form_fields: vec![],
            object_key: None,
        });

        let report = transfer.send(&grant, &pdf(), "application/pdf", &|_| {}).await;
        assert!(matches!(
            report.result,
            Err(UploadError::TransferTransportError { timed_out: true, .. })
        ));
    }
}
