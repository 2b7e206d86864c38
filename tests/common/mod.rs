#![allow(dead_code)]

use async_trait::async_trait;
use newzly::error::ApiError;
use newzly::gemini::GeminiService;
use newzly::model::{AspectRatio, GeneratedImage, JobHandle, JobStatus};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Text { model: String, prompt: String },
    Image { prompt: String, aspect_ratio: AspectRatio },
    Submit { prompt: String },
    Poll { handle: String },
    Fetch { locator: String },
}

type Queue<T> = Arc<Mutex<VecDeque<Result<T, ApiError>>>>;

/// Scripted stand-in for the remote API that records every call.
#[derive(Clone, Default)]
pub struct RecordingGemini {
    text: Queue<String>,
    images: Queue<Option<GeneratedImage>>,
    submits: Queue<JobHandle>,
    polls: Queue<JobStatus>,
    fetches: Queue<Vec<u8>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

async fn pop<T>(queue: &Queue<T>, what: &str) -> Result<T, ApiError> {
    queue
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| Err(ApiError::Decode(format!("no scripted {} response", what))))
}

impl RecordingGemini {
    pub async fn push_text(&self, response: Result<String, ApiError>) {
        self.text.lock().await.push_back(response);
    }

    pub async fn push_image(&self, response: Result<Option<GeneratedImage>, ApiError>) {
        self.images.lock().await.push_back(response);
    }

    pub async fn push_submit(&self, response: Result<JobHandle, ApiError>) {
        self.submits.lock().await.push_back(response);
    }

    pub async fn push_poll(&self, response: Result<JobStatus, ApiError>) {
        self.polls.lock().await.push_back(response);
    }

    pub async fn push_fetch(&self, response: Result<Vec<u8>, ApiError>) {
        self.fetches.lock().await.push_back(response);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().await.iter().filter(|c| pred(c)).count()
    }
}

#[async_trait]
impl GeminiService for RecordingGemini {
    async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        _schema: &Value,
    ) -> Result<String, ApiError> {
        self.calls.lock().await.push(Call::Text {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });
        pop(&self.text, "text").await
    }

    async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<Option<GeneratedImage>, ApiError> {
        self.calls.lock().await.push(Call::Image {
            prompt: prompt.to_string(),
            aspect_ratio,
        });
        pop(&self.images, "image").await
    }

    async fn submit_video_job(&self, prompt: &str) -> Result<JobHandle, ApiError> {
        self.calls.lock().await.push(Call::Submit {
            prompt: prompt.to_string(),
        });
        pop(&self.submits, "submit").await
    }

    async fn poll_video_job(&self, handle: &JobHandle) -> Result<JobStatus, ApiError> {
        self.calls.lock().await.push(Call::Poll {
            handle: handle.as_str().to_string(),
        });
        pop(&self.polls, "poll").await
    }

    async fn fetch_result(&self, locator: &str) -> Result<Vec<u8>, ApiError> {
        self.calls.lock().await.push(Call::Fetch {
            locator: locator.to_string(),
        });
        pop(&self.fetches, "fetch").await
    }
}

pub const ARTICLE_JSON: &str =
    r#"{"title":"T","imagePrompt":"P","videoPrompt":"V","articleContent":"C"}"#;

pub fn quota_error() -> ApiError {
    ApiError::Status {
        status: 429,
        body: r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#
            .into(),
    }
}

pub fn pending() -> JobStatus {
    JobStatus::default()
}

pub fn finished(locator: Option<&str>) -> JobStatus {
    JobStatus {
        done: true,
        result_locator: locator.map(str::to_string),
        error: None,
    }
}
