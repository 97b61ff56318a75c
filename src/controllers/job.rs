use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::job::{
        category_options, mode_options, CategoryOption, Job, JobServiceApi, ModeOption,
        SubmitJobRequest, SubmitJobResponse,
    },
    error::{AppError, AppResult},
};

pub struct JobController {
    job_service: Arc<dyn JobServiceApi>,
}

impl JobController {
    pub fn new(job_service: Arc<dyn JobServiceApi>) -> Self {
        Self { job_service }
    }

    /// POST /api/v1/jobs - Queue a new audiobook job
    pub async fn submit(
        State(controller): State<Arc<JobController>>,
        Json(request): Json<SubmitJobRequest>,
    ) -> AppResult<(StatusCode, Json<SubmitJobResponse>)> {
        let response = controller.job_service.submit(request).await?;
        Ok((StatusCode::ACCEPTED, Json(response)))
    }

    /// GET /api/v1/jobs/{job_id} - Job status and progress
    pub async fn get_status(
        State(controller): State<Arc<JobController>>,
        Path(job_id): Path<Uuid>,
    ) -> AppResult<Json<Job>> {
        let job = controller.job_service.get_status(job_id).await?;
        Ok(Json(job))
    }

    /// GET /api/v1/jobs/{job_id}/artifact - Download the finished audiobook
    pub async fn get_artifact(
        State(controller): State<Arc<JobController>>,
        Path(job_id): Path<Uuid>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let artifact = controller.job_service.get_artifact(job_id).await?;

        let disposition = content_disposition(&artifact.file_name);
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&disposition)
                .map_err(|e| AppError::Internal(format!("invalid artifact name: {}", e)))?,
        );

        Ok((StatusCode::OK, headers, Body::from(artifact.bytes)))
    }

    /// GET /api/v1/modes - Available narrative modes
    pub async fn list_modes() -> Json<Vec<ModeOption>> {
        Json(mode_options())
    }

    /// GET /api/v1/categories - Available content categories
    pub async fn list_categories() -> Json<Vec<CategoryOption>> {
        Json(category_options())
    }
}

/// `attachment` header value with an ASCII `filename` fallback and the exact
/// UTF-8 name as `filename*` (RFC 6266)
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == file_name {
        return format!("attachment; filename=\"{}\"", file_name);
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}
