/**
 * API Contract Types for the Jobstronaut uploader
 *
 * These types define the exact JSON exchanged with the Jobstronaut backend.
 * The backend has shipped several response shapes over time (`url` vs
 * `uploadUrl`, `key` vs `objectKey`, with or without `fields`), so the
 * response types accept all of them and collapse them into a single
 * `PresignGrant` right after parsing.
 *
 * Principles:
 * - Use explicit Option<T> for everything the backend may omit
 * - Use serde attributes to match the JSON (camelCase) exactly
 * - Decide PUT vs POST once, in `PresignResponse::into_grant`
 */

use crate::types::{PostGrant, PresignGrant, PutGrant};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Presign Endpoint (POST /s3/presign)
// =============================================================================

/// Request for permission to write one object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub filename: String,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Raw presign response, every historical field name included
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub upload_url: Option<String>,
    /// Present only for POST-style grants
    #[serde(default)]
    pub fields: Option<Map<String, Value>>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub object_key: Option<String>,
    /// Extra headers the PUT signature covers
    #[serde(default)]
    pub headers: Option<Map<String, Value>>,
    #[serde(default)]
    pub public_url: Option<String>,
}

/// Render a JSON value as a form field / header value
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn map_to_pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), value_to_string(v)))
        .collect()
}

impl PresignResponse {
    /// Transfer URL under whichever name the backend used; a blank `url`
    /// counts as missing
    pub fn transfer_url(&self) -> Option<&str> {
        [self.url.as_deref(), self.upload_url.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|u| !u.is_empty())
    }

    /// Turn the response into a grant. `fields` present means POST, absent means PUT.
    pub fn into_grant(self) -> Result<PresignGrant, String> {
        let transfer_url = self
            .transfer_url()
            .ok_or("Presign response has no transfer url")?
            .to_string();

        let top_level_key = self.key.clone().or_else(|| self.object_key.clone());

        match &self.fields {
            Some(fields) => {
                let form_fields = map_to_pairs(fields);
                let object_key = top_level_key.or_else(|| {
                    form_fields
                        .iter()
                        .find(|(name, _)| name == "key")
                        .map(|(_, value)| value.clone())
                });
                Ok(PresignGrant::Post(PostGrant {
                    transfer_url,
                    form_fields,
                    object_key,
                }))
            }
            None => Ok(PresignGrant::Put(PutGrant {
                transfer_url,
                required_headers: self.headers.as_ref().map(map_to_pairs).unwrap_or_default(),
                object_key: top_level_key,
            })),
        }
    }
}

// =============================================================================
// Completion Endpoint (POST /apply-complete)
// =============================================================================

/// Best-effort notice that a direct transfer finished
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionNotice {
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub key: Option<String>,
    /// Public location of the object (transfer URL without its signature)
    pub url: Option<String>,
}

/// `publicUrl` when the backend supplied one, else the transfer URL minus its query
pub fn public_object_url(public_url: Option<&str>, transfer_url: &str) -> Option<String> {
    if let Some(url) = public_url.filter(|u| !u.is_empty()) {
        return Some(url.to_string());
    }
    let base = transfer_url.split('?').next().unwrap_or_default();
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

// =============================================================================
// Waitlist Endpoint (POST /waitlist)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaitlistRequest {
    pub email: String,
}

// =============================================================================
// Error bodies
// =============================================================================

/// Shape of a JSON error body; either field may carry the text
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiMessage {
    /// Human-readable message from an error body, if it is JSON and has one
    pub fn extract(body: &str) -> Option<String> {
        let parsed: ApiMessage = serde_json::from_str(body).ok()?;
        parsed
            .message
            .or(parsed.error)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
    }
}

// =============================================================================
// Health Endpoint (GET /healthz)
// =============================================================================

/// Result of a liveness probe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub ok: bool,
    pub status: u16,
    /// JSON body, or the text body as a JSON string
    pub body: Value,
}

// =============================================================================
// Tests
// =============================================================================
