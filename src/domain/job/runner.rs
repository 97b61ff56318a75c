use super::model::{Job, JobError, JobResult, PLANNING_DONE, SYNTHESIS_DONE, WRITING_DONE};
use super::options::NarrativeMode;
use crate::domain::pipeline::{
    assembler::artifact_stem,
    chunker,
    text::clean_text,
    workspace::{ARTIFACT_FILE, CHUNKS_FILE, PLAN_FILE, SCRIPTS_FILE},
    Assembler, AudiobookMetadata, JobWorkspace, MergedScript, PipelineError, PipelineSettings,
    PipelineStep, ProgressCallback, SegmentPlanner, SegmentWriterPool, StyleConfig,
    SynthesisDispatcher,
};
use crate::domain::tts::{detect_language, LanguageCode};
use crate::infrastructure::repositories::{JobRepository, PlanningRequest};
use chrono::{Datelike, Utc};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Drives one job through planning, writing, synthesis and assembly
pub struct PipelineRunner {
    job_repo: Arc<JobRepository>,
    planner: SegmentPlanner,
    writer_pool: SegmentWriterPool,
    dispatcher: SynthesisDispatcher,
    assembler: Assembler,
    settings: PipelineSettings,
}

impl PipelineRunner {
    pub fn new(
        job_repo: Arc<JobRepository>,
        planner: SegmentPlanner,
        writer_pool: SegmentWriterPool,
        dispatcher: SynthesisDispatcher,
        assembler: Assembler,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            job_repo,
            planner,
            writer_pool,
            dispatcher,
            assembler,
            settings,
        }
    }

    /// Run a queued job to a terminal state. The job workspace is removed either way.
    pub async fn run(&self, job_id: Uuid) {
        let started = Instant::now();
        let mut claimed = false;
        let Some(job) = self.job_repo.update(job_id, |job| claimed = job.start()) else {
            tracing::warn!(job_id = %job_id, "Job disappeared before it started");
            return;
        };
        if !claimed {
            tracing::warn!(job_id = %job_id, status = ?job.status, "Job is not queued, skipping");
            return;
        }

        tracing::info!(
            job_id = %job_id,
            input_length = job.input_text.len(),
            category = job.config.category.as_str(),
            narrative_mode = job.config.narrative_mode.as_str(),
            "Job started"
        );

        let outcome = match JobWorkspace::create(&self.settings.work_dir, job_id).await {
            Ok(workspace) => {
                let outcome = self.execute(&job, &workspace).await;
                workspace.cleanup().await;
                outcome
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => {
                tracing::info!(
                    job_id = %job_id,
                    title = %result.title,
                    destinations = result.destinations.len(),
                    failed_destinations = result.failed_destinations.len(),
                    elapsed_secs = started.elapsed().as_secs(),
                    "Job completed"
                );
                self.job_repo.update(job_id, |job| job.complete(result));
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    stage = %e.stage(),
                    error = %e,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Job failed"
                );
                let error = JobError::from(&e);
                self.job_repo.update(job_id, |job| job.fail(error));
            }
        }
    }

    async fn execute(
        &self,
        job: &Job,
        workspace: &JobWorkspace,
    ) -> Result<JobResult, PipelineError> {
        let job_id = job.id;

        // Planning
        let source = clean_text(&job.input_text);
        let language = resolve_language(&job.config.language, &source);
        let request = PlanningRequest {
            text: source.clone(),
            segment_count: job
                .config
                .segment_count
                .unwrap_or(self.settings.default_segment_count)
                .max(1),
            language,
            category: job.config.category,
        };
        let plan = self.planner.plan(&request).await?;
        workspace
            .write(
                PipelineStep::Planning,
                PLAN_FILE,
                to_json(&plan, PipelineStep::Planning)?,
            )
            .await?;
        self.job_repo.update(job_id, |job| {
            job.segments_total = plan.segments.len();
            job.advance(PipelineStep::Writing, PLANNING_DONE);
        });

        // Writing
        let style = StyleConfig {
            language,
            category: job.config.category,
            narrative_mode: job.config.narrative_mode,
            listener_name: job.config.listener_name.clone(),
            fast_model: job.config.fast_model,
        };
        let scripts = self
            .writer_pool
            .write_all(
                &plan.segments,
                &source,
                &style,
                Some(self.progress(job_id, |job, done, total| job.record_segments(done, total))),
            )
            .await?;
        let merged = MergedScript::from_scripts(&scripts);
        workspace
            .write(PipelineStep::Writing, SCRIPTS_FILE, &merged.text)
            .await?;

        // Synthesis
        let ceiling = self.dispatcher.chunk_ceiling();
        let chunks = match job.config.narrative_mode {
            NarrativeMode::RadioShow => chunker::split_dialogue(&merged.text, ceiling),
            _ => chunker::split(&merged.text, ceiling),
        };
        let chunk_listing = chunks
            .iter()
            .map(|c| format!("[{}] @{} speaker={} {}", c.index, c.offset, c.speaker, c.text))
            .collect::<Vec<_>>()
            .join("\n");
        workspace
            .write(PipelineStep::Synthesis, CHUNKS_FILE, chunk_listing)
            .await?;
        self.job_repo.update(job_id, |job| {
            job.chunks_total = chunks.len();
            job.advance(PipelineStep::Synthesis, WRITING_DONE);
        });

        let buffers = self
            .dispatcher
            .synthesize(
                &chunks,
                &job.config.voices,
                language,
                Some(self.progress(job_id, |job, done, total| job.record_chunks(done, total))),
            )
            .await?;

        // Assembly
        self.job_repo.update(job_id, |job| {
            job.advance(PipelineStep::Assembly, SYNTHESIS_DONE);
        });

        let metadata = AudiobookMetadata {
            title: plan.title.clone(),
            author: job
                .config
                .author
                .clone()
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| self.settings.assembly.default_author.clone()),
            year: Some(Utc::now().year()),
            segment_titles: plan.segments.iter().map(|s| s.title.clone()).collect(),
        };
        let assembled = self
            .assembler
            .assemble(buffers, &chunks, &merged, &metadata)
            .await?;
        let artifact = workspace
            .write(PipelineStep::Assembly, ARTIFACT_FILE, &assembled.bytes)
            .await?;

        let stem = artifact_stem(&plan.title, &job_id.to_string());
        let report = self
            .assembler
            .deliver(&artifact, &stem, &merged.text)
            .await?;

        let destinations: Vec<String> = report
            .delivered
            .iter()
            .map(|p| p.display().to_string())
            .collect();

        Ok(JobResult {
            title: plan.title,
            language: language.to_string(),
            artifact_path: destinations.first().cloned().unwrap_or_default(),
            download_url: format!("/api/v1/jobs/{}/artifact", job_id),
            destinations,
            failed_destinations: report.failures,
            duration_secs: assembled.duration.as_secs_f64(),
            size_bytes: assembled.bytes.len() as u64,
            segment_count: scripts.len(),
            chunk_count: chunks.len(),
            chapters: assembled.chapters,
        })
    }

    /// Progress callback that applies `record` to the stored job
    fn progress<F>(&self, job_id: Uuid, record: F) -> ProgressCallback
    where
        F: Fn(&mut Job, usize, usize) + Send + Sync + 'static,
    {
        let job_repo = self.job_repo.clone();
        Arc::new(move |done, total| {
            job_repo.update(job_id, |job| record(job, done, total));
        })
    }
}

/// `auto` (or anything unparseable) is resolved by detecting the language of the text
fn resolve_language(requested: &str, text: &str) -> LanguageCode {
    if requested.trim().eq_ignore_ascii_case("auto") || requested.trim().is_empty() {
        return detect_language(text);
    }
    requested.parse().unwrap_or_else(|_| detect_language(text))
}

fn to_json<T: serde::Serialize>(value: &T, stage: PipelineStep) -> Result<Vec<u8>, PipelineError> {
    serde_json::to_vec_pretty(value).map_err(|e| PipelineError::Workspace {
        stage,
        message: format!("cannot serialize stage output: {}", e),
    })
}
