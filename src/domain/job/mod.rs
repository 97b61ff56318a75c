pub mod error;
pub mod model;
pub mod options;
pub mod runner;
pub mod service;

pub use error::JobServiceError;
pub use model::{Job, JobConfig, JobError, JobResult, JobStatus};
pub use options::{
    category_options, mode_options, CategoryOption, ContentCategory, ModeOption, NarrativeMode,
};
pub use runner::PipelineRunner;
pub use service::{
    ArtifactDownload, JobService, JobServiceApi, SubmitJobRequest, SubmitJobResponse,
};
