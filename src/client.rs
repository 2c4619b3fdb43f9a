//! Gemini REST 传输层 — generateContent 调用与文件服务（上传/轮询/删除）。
//!
//! Gemini REST transport. Key points of the wire format:
//! - Generation: POST `/v1beta/models/{model}:generateContent` with
//!   `contents` / `generationConfig` (`maxOutputTokens`, `temperature`) /
//!   `safetySettings`. Candidate text lives at
//!   `candidates[0].content.parts[0].text`; blocked prompts surface
//!   diagnostics under `promptFeedback`.
//! - Media: images and WAV audio travel as base64 `inline_data` parts;
//!   uploaded resources as `file_data` references from the Files API.
//! - Auth: API key in the `x-goog-api-key` header. Read from the process
//!   environment at construction; absence is not validated here — the first
//!   call fails with the service's own authentication error.

use crate::config::GenParams;
use crate::media::{FileHandle, FileState, Part};
use crate::{Error, Result};
use base64::Engine;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "v1beta";

/// Harm categories sent with every generation call, all set to BLOCK_NONE so
/// the harness, not the service, decides what counts as a usable answer.
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_DANGEROUS_CONTENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
];

/// Result of a successful generation call.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// Extracted candidate text.
    pub text: String,
    /// Raw provider response for debugging.
    pub raw: Value,
}

/// HTTP client for the Gemini generateContent and Files APIs.
#[derive(Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    poll_delay: Duration,
}

impl GeminiClient {
    /// Build a client against `base_url` with the given per-call timeout.
    /// The API key is taken from `GEMINI_API_KEY`, falling back to
    /// `GOOGLE_API_KEY`.
    pub fn new(base_url: impl Into<String>, timeout: Duration, poll_delay: Duration) -> Result<Self> {
        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("GOOGLE_API_KEY"))
            .ok();
        let base_url: String = base_url.into();
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            poll_delay,
        })
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            req = req.header("x-goog-api-key", key);
        }
        req
    }

    /// Issue one generation call and extract the candidate text.
    pub async fn generate_content(
        &self,
        model: &str,
        parts: &[Part],
        params: &GenParams,
    ) -> Result<GenerateResponse> {
        let url = format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, API_VERSION, model
        );
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": parts.iter().map(part_to_json).collect::<Vec<_>>(),
            }],
            "generationConfig": {
                "maxOutputTokens": params.max_new_tokens,
                "temperature": params.temperature,
            },
            "safetySettings": SAFETY_CATEGORIES
                .iter()
                .map(|c| json!({"category": c, "threshold": "BLOCK_NONE"}))
                .collect::<Vec<_>>(),
        });

        let resp = self
            .request(reqwest::Method::POST, url)
            .json(&body)
            .send()
            .await?;
        let raw: Value = check_status(resp).await?.json().await?;

        match raw
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
        {
            Some(text) => Ok(GenerateResponse {
                text: text.to_string(),
                raw,
            }),
            None => {
                let feedback = raw
                    .get("promptFeedback")
                    .map(|fb| fb.to_string());
                Err(Error::InvalidResponse { feedback })
            }
        }
    }

    /// Upload raw bytes to the file service, yielding an opaque handle.
    pub async fn upload_file(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<FileHandle> {
        let url = format!(
            "{}/upload/{}/files?uploadType=multipart",
            self.base_url, API_VERSION
        );
        let metadata = json!({"file": {"display_name": display_name}}).to_string();
        let form = reqwest::multipart::Form::new()
            .part(
                "metadata",
                reqwest::multipart::Part::text(metadata).mime_str("application/json")?,
            )
            .part(
                "file",
                reqwest::multipart::Part::bytes(data).mime_str(mime_type)?,
            );

        let resp = self
            .request(reqwest::Method::POST, url)
            .multipart(form)
            .send()
            .await?;
        let raw: Value = check_status(resp).await?.json().await?;

        // The service wraps the resource as {"file": {...}}.
        let file = raw.get("file").unwrap_or(&raw);
        let handle: FileHandle = serde_json::from_value(file.clone())?;
        debug!(name = %handle.name, state = ?handle.state, "uploaded file");
        Ok(handle)
    }

    /// Fetch the current state of an uploaded file.
    pub async fn get_file(&self, name: &str) -> Result<FileHandle> {
        let resp = self
            .request(reqwest::Method::GET, self.file_url(name))
            .send()
            .await?;
        let raw: Value = check_status(resp).await?.json().await?;
        Ok(serde_json::from_value(raw)?)
    }

    /// Delete an uploaded file.
    pub async fn delete_file(&self, name: &str) -> Result<()> {
        let resp = self
            .request(reqwest::Method::DELETE, self.file_url(name))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    /// Poll with a fixed delay until the file leaves the PROCESSING state.
    /// A handle that is already usable is returned as-is without a poll.
    /// A FAILED state is an upload failure.
    pub async fn wait_until_active(&self, mut handle: FileHandle) -> Result<FileHandle> {
        while handle.state == FileState::Processing {
            debug!(name = %handle.name, "waiting for file processing");
            tokio::time::sleep(self.poll_delay).await;
            handle = self.get_file(&handle.name).await?;
        }
        if handle.state == FileState::Failed {
            return Err(Error::UploadFailed { name: handle.name });
        }
        Ok(handle)
    }

    fn file_url(&self, name: &str) -> String {
        // Resource names arrive fully qualified ("files/abc123").
        if name.contains('/') {
            format!("{}/{}/{}", self.base_url, API_VERSION, name)
        } else {
            format!("{}/{}/files/{}", self.base_url, API_VERSION, name)
        }
    }
}

/// Map non-2xx responses to [`Error::Remote`], extracting the service's own
/// error message when the body carries one.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or(body);
    Err(Error::Remote {
        status: status.as_u16(),
        message,
    })
}

/// Serialize one payload part into the wire representation.
fn part_to_json(part: &Part) -> Value {
    match part {
        Part::Text(s) => json!({"text": s}),
        Part::Inline { mime_type, data } => json!({
            "inline_data": {
                "mime_type": mime_type,
                "data": base64::engine::general_purpose::STANDARD.encode(data),
            }
        }),
        Part::File(handle) => json!({
            "file_data": {
                "file_uri": handle.uri,
                "mime_type": handle.mime_type,
            }
        }),
    }
}
