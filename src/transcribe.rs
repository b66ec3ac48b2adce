use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, ScenescribeError};

/// Stored in the ledger when the model produces no usable text. The row is
/// kept; only this one step is allowed to soft-fail.
pub const NO_TRANSCRIPTION: &str = "NO TRANSCRIPTION FOUND";

/// OpenAI transcription endpoint.
const WHISPER_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Maximum file size accepted by the Whisper API (25 MB).
const MAX_FILE_SIZE: u64 = 25 * 1024 * 1024;

/// Maximum retries for API calls.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 1000;

/// Map raw model output to the stored transcription, substituting the
/// sentinel for empty or whitespace-only results.
pub fn text_or_sentinel(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        NO_TRANSCRIPTION.to_string()
    } else {
        trimmed.to_string()
    }
}

/// The speech-to-text collaborator. One call per scene audio file.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Best-effort transcription of one audio file. Implementations return
    /// the sentinel for empty recognition results and an error only for
    /// transport or API failures.
    async fn transcribe(&self, audio: &Path) -> Result<String>;

    fn name(&self) -> &'static str;
}

/// OpenAI Whisper API client.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: Option<String>,
}

impl WhisperClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: "whisper-1".to_string(),
            language: None,
        }
    }

    /// Set the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    /// Build the multipart form for the API request.
    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("mp3") => "audio/mpeg",
            Some("wav") => "audio/wav",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("ogg") => "audio/ogg",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        Ok(form)
    }

    /// Make the API request (form is consumed, so no retries at this level).
    async fn call_api(&self, form: Form) -> Result<WhisperResponse> {
        let response = self
            .client
            .post(WHISPER_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        if status.is_success() {
            let body = response.text().await?;
            let parsed: WhisperResponse = serde_json::from_str(&body)?;
            return Ok(parsed);
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
            return Err(ScenescribeError::Api {
                status: status.as_u16(),
                message: format!("{} ({})", api_error.error.message, api_error.error.r#type),
            });
        }

        Err(ScenescribeError::Api {
            status: status.as_u16(),
            message: error_body,
        })
    }

    /// Transcribe with retry logic, rebuilding the form on each attempt.
    async fn transcribe_with_retry(&self, audio_path: &Path) -> Result<WhisperResponse> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_DELAY_MS * 2u64.pow(attempt - 1);
                debug!("Retry attempt {} after {}ms delay", attempt, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let form = self.build_form(audio_path).await?;

            match self.call_api(form).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !should_retry(&e) {
                        return Err(e);
                    }
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ScenescribeError::Transcription("request failed with no error detail".to_string())
        }))
    }
}

/// Client errors (4xx) will fail the same way every time; only transport
/// failures and server errors are worth another attempt.
fn should_retry(error: &ScenescribeError) -> bool {
    !matches!(error, ScenescribeError::Api { status, .. } if (400..500).contains(status))
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        debug!("Transcribing {} with Whisper", audio.display());

        let metadata = tokio::fs::metadata(audio).await?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(ScenescribeError::Transcription(format!(
                "File too large for Whisper API: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        let response = self.transcribe_with_retry(audio).await?;
        Ok(text_or_sentinel(&response.text))
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    r#type: String,
}
