use super::error::JobServiceError;
use super::model::{Job, JobConfig, JobStatus};
use super::runner::PipelineRunner;
use crate::domain::pipeline::text::clean_text;
use crate::domain::tts::LanguageCode;
use crate::infrastructure::repositories::JobRepository;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Request body for POST /api/v1/jobs
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub text: String,
    #[serde(default)]
    pub config: JobConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SubmitJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// A finished audiobook ready to download
#[derive(Debug)]
pub struct ArtifactDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct JobService {
    job_repo: Arc<JobRepository>,
    runner: Arc<PipelineRunner>,
    max_input_bytes: usize,
}

impl JobService {
    pub fn new(
        job_repo: Arc<JobRepository>,
        runner: Arc<PipelineRunner>,
        max_input_bytes: usize,
    ) -> Self {
        Self {
            job_repo,
            runner,
            max_input_bytes,
        }
    }

    fn validate(&self, request: &SubmitJobRequest) -> Result<(), JobServiceError> {
        if request.text.trim().is_empty() {
            return Err(JobServiceError::Invalid("text must not be empty".to_string()));
        }
        if request.text.len() > self.max_input_bytes {
            return Err(JobServiceError::PayloadTooLarge(format!(
                "text is {} bytes, the limit is {}",
                request.text.len(),
                self.max_input_bytes
            )));
        }
        if clean_text(&request.text).is_empty() {
            return Err(JobServiceError::Invalid(
                "text has no readable content".to_string(),
            ));
        }

        let language = request.config.language.trim();
        if !language.eq_ignore_ascii_case("auto") && language.parse::<LanguageCode>().is_err() {
            return Err(JobServiceError::Invalid(format!(
                "unsupported language '{}'",
                language
            )));
        }

        if request.config.segment_count == Some(0) {
            return Err(JobServiceError::Invalid(
                "segment_count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    fn find(&self, job_id: Uuid) -> Result<Job, JobServiceError> {
        self.job_repo
            .find_by_id(job_id)
            .ok_or_else(|| JobServiceError::NotFound(job_id.to_string()))
    }
}

#[async_trait]
pub trait JobServiceApi: Send + Sync {
    /// Validate and queue a job; the pipeline runs in the background
    async fn submit(&self, request: SubmitJobRequest)
        -> Result<SubmitJobResponse, JobServiceError>;

    async fn get_status(&self, job_id: Uuid) -> Result<Job, JobServiceError>;

    async fn get_artifact(&self, job_id: Uuid) -> Result<ArtifactDownload, JobServiceError>;
}

#[async_trait]
impl JobServiceApi for JobService {
    async fn submit(
        &self,
        request: SubmitJobRequest,
    ) -> Result<SubmitJobResponse, JobServiceError> {
        self.validate(&request)?;

        let job = Job::new(request.text, request.config);
        let job_id = job.id;
        let status = job.status;

        tracing::info!(
            job_id = %job_id,
            input_length = job.input_text.len(),
            language = %job.config.language,
            "Job queued"
        );
        self.job_repo.insert(job);

        let runner = self.runner.clone();
        tokio::spawn(async move {
            runner.run(job_id).await;
        });

        Ok(SubmitJobResponse { job_id, status })
    }

    async fn get_status(&self, job_id: Uuid) -> Result<Job, JobServiceError> {
        self.find(job_id)
    }

    async fn get_artifact(&self, job_id: Uuid) -> Result<ArtifactDownload, JobServiceError> {
        let job = self.find(job_id)?;

        let result = match (job.status, job.result) {
            (JobStatus::Completed, Some(result)) => result,
            (status, _) => {
                return Err(JobServiceError::NotReady(format!(
                    "job {} is {:?}",
                    job_id, status
                )))
            }
        };

        let path = Path::new(&result.artifact_path);
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            tracing::error!(
                job_id = %job_id,
                path = %path.display(),
                error = %e,
                "Delivered artifact unreadable"
            );
            anyhow::anyhow!("artifact for job {} is unreadable: {}", job_id, e)
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.mp3", job_id));

        Ok(ArtifactDownload { file_name, bytes })
    }
}
