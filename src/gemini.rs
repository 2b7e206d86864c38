use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::{Client, Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::model::{AspectRatio, GeneratedImage, JobHandle, JobStatus};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// The four logical operations of the remote generative API.
#[async_trait]
pub trait GeminiService: Send + Sync {
    /// Structured text generation; returns the raw JSON text of the reply.
    async fn generate_text(&self, model: &str, prompt: &str, schema: &Value)
        -> Result<String, ApiError>;

    /// Single-image generation. `None` means the reply carried no image.
    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Option<GeneratedImage>, ApiError>;

    async fn submit_video_job(&self, prompt: &str) -> Result<JobHandle, ApiError>;

    async fn poll_video_job(&self, handle: &JobHandle) -> Result<JobStatus, ApiError>;

    /// Download a finished result; the API key is appended to the locator.
    async fn fetch_result(&self, locator: &str) -> Result<Vec<u8>, ApiError>;
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    image_model: String,
    video_model: String,
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("image_model", &self.image_model)
            .field("video_model", &self.video_model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn from_config(cfg: &Config) -> Result<Self, ApiError> {
        let base_url = Url::parse(&cfg.gemini.base_url)
            .map_err(|e| ApiError::Endpoint(format!("{}: {}", cfg.gemini.base_url, e)))?;
        let http = Client::builder()
            .user_agent("newzly/0.1")
            .timeout(cfg.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: cfg.gemini.api_key.clone(),
            image_model: cfg.gemini.image_model.clone(),
            video_model: cfg.gemini.video_model.clone(),
        })
    }

    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Request, ApiError> {
        let endpoint = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::Endpoint(format!("{}: {}", path, e)))?;
        let mut builder = self
            .http
            .request(method, endpoint)
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.build()?)
    }

    async fn execute_json(&self, request: reqwest::Request) -> Result<Value, ApiError> {
        debug!(method=%request.method(), url=%request.url(), "sending gemini request");
        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "gemini error response");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = res.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl GeminiService for GeminiClient {
    async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        schema: &Value,
    ) -> Result<String, ApiError> {
        let body = build_generate_content_request(prompt, schema);
        let request = self.build_request(
            Method::POST,
            &format!("v1beta/models/{}:generateContent", model),
            Some(&body),
        )?;
        let payload = self.execute_json(request).await?;
        let parsed: GenerateContentResponse =
            serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(parsed.text())
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Option<GeneratedImage>, ApiError> {
        let body = build_image_request(prompt, aspect_ratio);
        let request = self.build_request(
            Method::POST,
            &format!("v1beta/models/{}:predict", self.image_model),
            Some(&body),
        )?;
        let payload = self.execute_json(request).await?;
        parse_image_response(payload)
    }

    async fn submit_video_job(&self, prompt: &str) -> Result<JobHandle, ApiError> {
        let body = build_video_request(prompt);
        let request = self.build_request(
            Method::POST,
            &format!("v1beta/models/{}:predictLongRunning", self.video_model),
            Some(&body),
        )?;
        let payload = self.execute_json(request).await?;
        let op: OperationResponse =
            serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
        if op.name.trim().is_empty() {
            return Err(ApiError::Decode("operation without a name".into()));
        }
        Ok(JobHandle(op.name))
    }

    async fn poll_video_job(&self, handle: &JobHandle) -> Result<JobStatus, ApiError> {
        let request =
            self.build_request(Method::GET, &format!("v1beta/{}", handle.as_str()), None)?;
        let payload = self.execute_json(request).await?;
        let op: OperationResponse =
            serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(op.into_status())
    }

    async fn fetch_result(&self, locator: &str) -> Result<Vec<u8>, ApiError> {
        debug!(locator, "downloading generated result");
        let url = with_api_key(locator, &self.api_key)?;
        let res = self.http.get(url).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res.bytes().await?.to_vec())
    }
}

pub fn build_generate_content_request(prompt: &str, schema: &Value) -> Value {
    json!({
        "contents": [
            { "role": "user", "parts": [ { "text": prompt } ] }
        ],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": schema,
        }
    })
}

pub fn build_image_request(prompt: &str, aspect_ratio: AspectRatio) -> Value {
    json!({
        "instances": [ { "prompt": prompt } ],
        "parameters": {
            "sampleCount": 1,
            "aspectRatio": aspect_ratio.as_str(),
            "outputOptions": { "mimeType": "image/jpeg" },
        }
    })
}

pub fn build_video_request(prompt: &str) -> Value {
    json!({
        "instances": [ { "prompt": prompt } ],
        "parameters": { "sampleCount": 1 }
    })
}

/// Append `key=<api key>` to a download locator.
pub fn with_api_key(locator: &str, api_key: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(locator)
        .map_err(|e| ApiError::Endpoint(format!("{}: {}", locator, e)))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

fn parse_image_response(payload: Value) -> Result<Option<GeneratedImage>, ApiError> {
    let parsed: PredictResponse =
        serde_json::from_value(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
    let Some(prediction) = parsed
        .predictions
        .into_iter()
        .find(|p| p.bytes_base64_encoded.as_deref().is_some_and(|b| !b.is_empty()))
    else {
        return Ok(None);
    };
    let encoded = prediction.bytes_base64_encoded.unwrap_or_default();
    let bytes = BASE64
        .decode(encoded.as_bytes())
        .map_err(|e| ApiError::Decode(format!("image bytes: {}", e)))?;
    Ok(Some(GeneratedImage {
        mime_type: prediction
            .mime_type
            .unwrap_or_else(|| "image/jpeg".to_string()),
        bytes,
    }))
}

/// Locate the first generated video URI in an operation's `response`.
fn find_video_uri(response: &Value) -> Option<String> {
    [
        "/generateVideoResponse/generatedSamples/0/video/uri",
        "/generatedVideos/0/video/uri",
    ]
    .iter()
    .find_map(|ptr| response.pointer(ptr).and_then(Value::as_str))
    .filter(|uri| !uri.is_empty())
    .map(str::to_string)
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Deserialize)]
struct OperationResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    response: Option<Value>,
    error: Option<OperationError>,
}

#[derive(Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

impl OperationResponse {
    fn into_status(self) -> JobStatus {
        JobStatus {
            done: self.done,
            result_locator: self.response.as_ref().and_then(find_video_uri),
            error: self.error.map(|e| e.message),
        }
    }
}
