//! Submit-then-poll driver for long-running video generation jobs.
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{ApiError, GenerationError};
use crate::gemini::GeminiService;
use crate::model::{GeneratedVideo, JobHandle, JobStatus};

/// Delay between two status fetches.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

pub const MSG_INITIALIZING: &str = "Initializing video render...";
pub const MSG_RENDERING: &str = "Rendering video... (this may take a few minutes)";
pub const MSG_FINALIZING: &str = "Finalizing video...";
pub const MSG_FETCHING: &str = "Fetching video data...";
pub const MSG_COMPLETE: &str = "Video generation complete!";

const SERVICE: &str = "Video generation";
const NO_DOWNLOAD_LINK: &str = "Video generation succeeded but no download link was returned.";

/// Receives human-readable progress messages.
pub trait ProgressSink {
    fn report(&mut self, message: &str);
}

impl<F> ProgressSink for F
where
    F: FnMut(&str),
{
    fn report(&mut self, message: &str) {
        self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Submitted,
    Polling,
    Completed,
    Failed,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobPhase::Completed | JobPhase::Failed)
    }
}

/// One remote long-running operation and the phases it went through.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    handle: JobHandle,
    done: bool,
    result_locator: Option<String>,
    remote_error: Option<String>,
    phase: JobPhase,
    transitions: Vec<JobPhase>,
    polls: u32,
}

impl GenerationJob {
    pub fn submitted(handle: JobHandle) -> Self {
        Self {
            handle,
            done: false,
            result_locator: None,
            remote_error: None,
            phase: JobPhase::Submitted,
            transitions: vec![JobPhase::Submitted],
            polls: 0,
        }
    }

    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn result_locator(&self) -> Option<&str> {
        self.result_locator.as_deref()
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn transitions(&self) -> &[JobPhase] {
        &self.transitions
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Record a fetched status. Terminal jobs and finished jobs keep what
    /// they already recorded.
    pub fn apply_status(&mut self, status: &JobStatus) {
        if self.phase.is_terminal() || self.done {
            return;
        }
        if status.done {
            self.done = true;
            self.result_locator = status.result_locator.clone();
            self.remote_error = status.error.clone();
        }
    }

    fn enter(&mut self, next: JobPhase) {
        if self.phase.is_terminal() || self.phase == next {
            return;
        }
        if next == JobPhase::Completed && self.phase != JobPhase::Polling {
            return;
        }
        self.phase = next;
        self.transitions.push(next);
    }

    fn start_polling(&mut self) {
        self.enter(JobPhase::Polling);
    }

    fn complete(&mut self) {
        self.enter(JobPhase::Completed);
    }

    fn fail(&mut self) {
        self.enter(JobPhase::Failed);
    }
}

pub struct VideoPoller<'a> {
    service: &'a dyn GeminiService,
    interval: Duration,
}

impl<'a> VideoPoller<'a> {
    pub fn new(service: &'a dyn GeminiService) -> Self {
        Self {
            service,
            interval: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Submit a job for `prompt` and drive it until the video is downloaded.
    #[instrument(skip_all)]
    pub async fn generate_video(
        &self,
        prompt: &str,
        sink: &mut dyn ProgressSink,
    ) -> Result<GeneratedVideo, GenerationError> {
        sink.report(MSG_INITIALIZING);
        let mut job = self.submit(prompt).await?;
        sink.report(MSG_RENDERING);
        self.drive(&mut job, sink).await
    }

    pub async fn submit(&self, prompt: &str) -> Result<GenerationJob, GenerationError> {
        debug!(prompt_len = prompt.len(), "submitting video job");
        let handle = self
            .service
            .submit_video_job(prompt)
            .await
            .map_err(|e| GenerationError::from_api(SERVICE, e))?;
        info!(job = %handle.as_str(), "video job submitted");
        Ok(GenerationJob::submitted(handle))
    }

    /// Poll `job` at the fixed interval until it finishes, then download.
    #[instrument(skip_all, fields(job = %job.handle().as_str()))]
    pub async fn drive(
        &self,
        job: &mut GenerationJob,
        sink: &mut dyn ProgressSink,
    ) -> Result<GeneratedVideo, GenerationError> {
        job.start_polling();
        while !job.is_done() {
            tokio::time::sleep(self.interval).await;
            job.polls += 1;
            let status = match self.service.poll_video_job(job.handle()).await {
                Ok(status) => status,
                Err(err) => {
                    job.fail();
                    warn!(polls = job.polls, error = %err, "video poll failed");
                    return Err(GenerationError::from_api(SERVICE, err));
                }
            };
            debug!(polls = job.polls, done = status.done, "video job status");
            job.apply_status(&status);
        }

        sink.report(MSG_FINALIZING);

        let Some(locator) = job.result_locator().map(str::to_string) else {
            job.fail();
            return Err(match job.remote_error.clone() {
                Some(message) if !message.is_empty() => GenerationError::Api {
                    service: SERVICE,
                    message,
                },
                _ => GenerationError::JobFailed(NO_DOWNLOAD_LINK.to_string()),
            });
        };

        sink.report(MSG_FETCHING);
        let bytes = match self.service.fetch_result(&locator).await {
            Ok(bytes) => bytes,
            Err(ApiError::Status { status, .. }) => {
                job.fail();
                return Err(GenerationError::JobFailed(format!(
                    "Failed to download video file. Status: {}",
                    status
                )));
            }
            Err(err) => {
                job.fail();
                return Err(GenerationError::from_api(SERVICE, err));
            }
        };

        job.complete();
        info!(polls = job.polls, bytes = bytes.len(), "video job completed");
        sink.report(MSG_COMPLETE);
        Ok(GeneratedVideo {
            mime_type: "video/mp4".into(),
            bytes,
        })
    }
}

/// Message shown to the user when video generation fails.
pub fn failure_message(err: &GenerationError) -> String {
    format!("Failed to generate video. {}", err)
}
