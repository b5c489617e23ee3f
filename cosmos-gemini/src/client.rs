//! Google Gemini API client
//!
//! Implements the core [`GenerativeModel`] port over the Generative Language
//! REST API: `generateContent` for one-shot and JSON calls,
//! `streamGenerateContent` (server-sent events) for streams, and `predict`
//! for Imagen image generation.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use cosmos_core::config::{ModelConfig, DEFAULT_BASE_URL};
use cosmos_core::model::{
    CompletionRequest, GeneratedImage, GenerativeModel, ImageRequest, TextStream,
};
use futures::StreamExt;
use reqwest::header::HeaderValue;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{GeminiError, Result};

const API_KEY_HEADER: &str = "x-goog-api-key";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Google Gemini API client
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client for the public endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(GeminiError::MissingApiKey);
        }

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: reqwest::Client::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Create a client from model configuration
    pub fn from_config(config: &ModelConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::new(api_key)?
            .with_base_url(&config.base_url)?
            .with_timeout(config.request_timeout))
    }

    /// Point the client at another endpoint
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| GeminiError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GeminiError::InvalidBaseUrl(format!(
                "{}: scheme must be http or https",
                base_url
            )));
        }

        self.base_url = parsed.as_str().trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Set the request timeout
    ///
    /// One-shot calls must finish within it; streams must start within it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    async fn post(&self, url: &str, body: &Value, bounded: bool) -> Result<reqwest::Response> {
        let mut request = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body);
        if bounded {
            request = request.timeout(self.timeout);
        }

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(sent) => sent?,
            Err(_) => {
                return Err(GeminiError::Transport {
                    message: format!("no response within {:?}", self.timeout),
                    retryable: true,
                })
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            let err = map_http_error(status, body_text, retry_after);
            warn!(status = status.as_u16(), error = %err, "Gemini request failed");
            return Err(err);
        }

        Ok(response)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: &CompletionRequest) -> cosmos_core::Result<String> {
        let url = self.endpoint(&request.model, "generateContent");
        let response = self.post(&url, &completion_body(request), true).await?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::Parse(e.to_string()))?;
        let text = chunk_text(parsed)?
            .ok_or_else(|| GeminiError::Empty("Gemini returned no text".to_string()))?;

        debug!(model = %request.model, chars = text.len(), "Generated content");
        Ok(text)
    }

    async fn generate_stream(&self, request: &CompletionRequest) -> cosmos_core::Result<TextStream> {
        let url = format!("{}?alt=sse", self.endpoint(&request.model, "streamGenerateContent"));
        let response = self.post(&url, &completion_body(request), false).await?;
        debug!(model = %request.model, "Opened content stream");

        let mut bytes = response.bytes_stream();
        let stream = async_stream::try_stream! {
            let mut decoder = SseDecoder::default();

            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(GeminiError::from)?;
                for fragment in decoder.push(&chunk) {
                    yield fragment?;
                }
            }

            for fragment in decoder.finish() {
                yield fragment?;
            }
        };

        Ok(Box::pin(stream.map(|item: Result<String>| item.map_err(cosmos_core::Error::from))))
    }

    async fn generate_images(&self, request: &ImageRequest) -> cosmos_core::Result<Vec<GeneratedImage>> {
        let url = self.endpoint(&request.model, "predict");
        let response = self.post(&url, &image_body(request), true).await?;

        let parsed: PredictResponse = response
            .json()
            .await
            .map_err(|e| GeminiError::Parse(e.to_string()))?;
        let images = decode_images(parsed, &request.config.mime_type)?;

        debug!(model = %request.model, count = images.len(), "Generated images");
        Ok(images)
    }
}

/// Request body for `generateContent` and `streamGenerateContent`
pub fn completion_body(request: &CompletionRequest) -> Value {
    let mut body = json!({
        "contents": [{
            "role": "user",
            "parts": [{"text": request.prompt}]
        }]
    });

    if let Some(system) = &request.system_instruction {
        body["systemInstruction"] = json!({"parts": [{"text": system}]});
    }

    if let Some(schema) = &request.response_schema {
        body["generationConfig"] = json!({
            "responseMimeType": "application/json",
            "responseSchema": schema
        });
    }

    body
}

/// Request body for Imagen `predict`
pub fn image_body(request: &ImageRequest) -> Value {
    json!({
        "instances": [{"prompt": request.prompt}],
        "parameters": {
            "sampleCount": request.config.count,
            "outputMimeType": request.config.mime_type,
            "aspectRatio": request.config.aspect_ratio
        }
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ErrorInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorInfo {
    message: Option<String>,
}

/// Text of the first candidate, or `None` when the response carries none
pub fn chunk_text(response: GenerateContentResponse) -> Result<Option<String>> {
    if let Some(error) = response.error {
        return Err(GeminiError::Api(error.message.unwrap_or_default()));
    }

    let text: String = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.is_empty() {
        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GeminiError::Api(format!("Prompt blocked: {}", reason)));
        }
        return Ok(None);
    }
    Ok(Some(text))
}

/// Parse one streamed JSON object
pub fn parse_stream_line(line: &str) -> Option<GenerateContentResponse> {
    serde_json::from_str(line).ok()
}

/// Incremental decoder for `alt=sse` response bodies
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters split across network chunks decode intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed a network chunk, returning the text fragments it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String>> {
        self.buffer.extend_from_slice(chunk);

        let mut fragments = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(fragment) = decode_line(&String::from_utf8_lossy(&line)) {
                fragments.push(fragment);
            }
        }
        fragments
    }

    /// Flush a final line that was not newline-terminated
    pub fn finish(&mut self) -> Vec<Result<String>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&rest))
            .into_iter()
            .collect()
    }
}

fn decode_line(line: &str) -> Option<Result<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let data = line
        .strip_prefix("data:")
        .map(str::trim_start)
        .unwrap_or(line);
    if data == "[DONE]" {
        return None;
    }

    let Some(response) = parse_stream_line(data) else {
        trace!(line = %data, "Skipping unparsable stream line");
        return None;
    };
    chunk_text(response).transpose()
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    predictions: Option<Vec<Prediction>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

/// Decode Imagen predictions; an empty result is an error
pub fn decode_images(response: PredictResponse, default_mime: &str) -> Result<Vec<GeneratedImage>> {
    let images = response
        .predictions
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.bytes_base64_encoded.map(|data| (data, p.mime_type)))
        .map(|(data, mime_type)| {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(data.as_bytes())
                .map_err(|e| GeminiError::Parse(format!("invalid image data: {}", e)))?;
            Ok(GeneratedImage {
                mime_type: mime_type.unwrap_or_else(|| default_mime.to_string()),
                bytes,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if images.is_empty() {
        return Err(GeminiError::Empty(
            "Image generation failed, no images returned".to_string(),
        ));
    }
    Ok(images)
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

/// Map a non-success response to an error, classifying 429 and 5xx as retryable
pub fn map_http_error(status: StatusCode, body: String, retry_after: Option<Duration>) -> GeminiError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();

    GeminiError::Http {
        status: status.as_u16(),
        message,
        retryable,
        retry_after,
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
