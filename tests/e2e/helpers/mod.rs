use anyhow::Result;
use audiobook_backend::{
    controllers::job::JobController,
    domain::{
        job::{JobService, PipelineRunner},
        pipeline::{
            Assembler, AssemblySettings, BackoffSettings, PipelineSettings, PlannerSettings,
            RateLimitSettings, RateLimiter, SegmentPlanner, SegmentWriterPool,
            SynthesisDispatcher, SynthesisSettings, WriterSettings,
        },
    },
    infrastructure::{http::create_router, repositories::JobRepository},
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tokio::net::TcpListener;

pub mod api_client;
pub mod mocks;

use api_client::TestClient;
use mocks::{MockPlanner, MockTts, MockWriter};

/// Submissions larger than this are rejected with 413
pub const MAX_INPUT_BYTES: usize = 2_000;
pub const PLANNER_MAX_ATTEMPTS: u32 = 3;

pub struct TestContext {
    pub client: TestClient,
    pub planner: Arc<MockPlanner>,
    pub tts: Arc<MockTts>,
    pub output_dir: TempDir,
    pub work_dir: TempDir,
}

impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            let work_dir = TempDir::new().expect("Failed to create work dir");
            let output_dir = TempDir::new().expect("Failed to create output dir");
            let planner = Arc::new(MockPlanner::default());
            let tts = Arc::new(MockTts::default());

            let app = create_app_with_mocks(
                planner.clone(),
                tts.clone(),
                work_dir.path(),
                output_dir.path(),
            )
            .expect("Failed to create app");

            // Start server
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind listener");
            let addr = listener.local_addr().expect("Failed to get local addr");
            let base_url = format!("http://{}", addr);

            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            // Wait for server to be ready
            tokio::time::sleep(Duration::from_millis(50)).await;

            Self {
                client: TestClient::new(&base_url),
                planner,
                tts,
                output_dir,
                work_dir,
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {
            // Temp directories are removed on drop
        }
    }
}

fn test_settings(work_dir: &Path, output_dir: &Path) -> PipelineSettings {
    let timeout = Duration::from_secs(5);
    let backoff = BackoffSettings {
        base: Duration::from_millis(10),
        max: Duration::from_millis(50),
        jitter: Duration::ZERO,
    };
    PipelineSettings {
        default_segment_count: 1,
        work_dir: work_dir.to_path_buf(),
        rate_limit: RateLimitSettings {
            burst: 20,
            steady_rate: 20,
            window: Duration::from_secs(1),
        },
        planner: PlannerSettings {
            max_attempts: PLANNER_MAX_ATTEMPTS,
            timeout,
            backoff,
        },
        writer: WriterSettings {
            concurrency: 4,
            max_attempts: 2,
            timeout,
            backoff,
        },
        synthesis: SynthesisSettings {
            workers: 4,
            max_attempts: 2,
            timeout,
            max_chunk_bytes: 64,
            backoff,
        },
        assembly: AssemblySettings {
            output_dirs: vec![output_dir.to_path_buf()],
            cover_image_path: None,
            default_author: "Test Author".to_string(),
        },
    }
}

fn create_app_with_mocks(
    planner: Arc<MockPlanner>,
    tts: Arc<MockTts>,
    work_dir: &Path,
    output_dir: &Path,
) -> Result<axum::Router> {
    let settings = test_settings(work_dir, output_dir);
    let rate_limiter = Arc::new(RateLimiter::new(settings.rate_limit));

    let job_repo = Arc::new(JobRepository::new(Duration::from_secs(300)));
    let runner = Arc::new(PipelineRunner::new(
        job_repo.clone(),
        SegmentPlanner::new(planner, settings.planner.clone()),
        SegmentWriterPool::new(Arc::new(MockWriter), settings.writer.clone()),
        SynthesisDispatcher::new(tts.clone(), rate_limiter, settings.synthesis.clone()),
        Assembler::new(settings.assembly.clone()),
        settings,
    ));
    let job_service = Arc::new(JobService::new(job_repo, runner, MAX_INPUT_BYTES));
    let job_controller = Arc::new(JobController::new(job_service));

    Ok(create_router(job_controller, tts))
}

/// Poll the status endpoint until the job completes or fails
pub async fn wait_for_terminal(client: &TestClient, job_id: &str) -> Result<Value> {
    for _ in 0..300 {
        let response = client.get(&format!("/api/v1/jobs/{}", job_id)).await?;
        if let Some(body) = response.body {
            let status = body.get("status").and_then(|s| s.as_str()).unwrap_or("");
            if status == "completed" || status == "failed" {
                return Ok(body);
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    anyhow::bail!("job {} did not reach a terminal state", job_id)
}
