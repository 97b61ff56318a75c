use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use audiobook_backend::controllers::job::JobController;
use audiobook_backend::domain::job::{JobService, PipelineRunner};
use audiobook_backend::domain::pipeline::{
    Assembler, RateLimiter, SegmentPlanner, SegmentWriterPool, SynthesisDispatcher,
};
use audiobook_backend::infrastructure::config::{Config, LogFormat, TtsProvider};
use audiobook_backend::infrastructure::http::start_http_server;
use audiobook_backend::infrastructure::repositories::{
    JobRepository, OpenAiLlmRepository, OpenAiTtsRepository, PollyTtsRepository, TtsRepository,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        environment = ?config.environment,
        "Starting Audiobook Backend on {}:{}",
        config.host,
        config.port
    );

    let settings = config.pipeline_settings();
    tokio::fs::create_dir_all(&settings.work_dir).await?;
    tracing::info!(work_dir = %settings.work_dir.display(), "Job work directory ready");

    // OpenAI client reads OPENAI_API_KEY from the environment
    let openai_client = Arc::new(async_openai::Client::new());

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate repositories
    tracing::info!("Instantiating repositories...");
    let job_repo = Arc::new(JobRepository::new(Duration::from_secs(
        config.job_retention_secs,
    )));
    let llm_repo = Arc::new(OpenAiLlmRepository::new(
        openai_client.clone(),
        config.llm_planner_model.clone(),
        config.llm_writer_model.clone(),
        config.llm_fast_writer_model.clone(),
    ));
    let tts_repo: Arc<dyn TtsRepository> = match config.tts_provider {
        TtsProvider::OpenAi => Arc::new(OpenAiTtsRepository::new(
            openai_client.clone(),
            config.tts_model.clone(),
            config.tts_default_voice.clone(),
        )),
        TtsProvider::Polly => {
            tracing::info!("Initializing AWS Polly client with region: {}", config.aws_region);
            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.aws_region.clone()))
                .load()
                .await;
            let polly_client = Arc::new(aws_sdk_polly::Client::new(&aws_config));
            Arc::new(PollyTtsRepository::new(polly_client))
        }
    };
    tracing::info!(
        provider = tts_repo.name(),
        max_payload_bytes = tts_repo.max_payload_bytes(),
        "TTS provider selected"
    );

    // 2. Shared synthesis quota, one per process
    let rate_limiter = Arc::new(RateLimiter::new(settings.rate_limit));

    // 3. Instantiate pipeline and services
    tracing::info!("Instantiating services...");
    let runner = Arc::new(PipelineRunner::new(
        job_repo.clone(),
        SegmentPlanner::new(llm_repo.clone(), settings.planner.clone()),
        SegmentWriterPool::new(llm_repo, settings.writer.clone()),
        SynthesisDispatcher::new(tts_repo.clone(), rate_limiter, settings.synthesis.clone()),
        Assembler::new(settings.assembly.clone()),
        settings,
    ));
    let job_service = Arc::new(JobService::new(job_repo, runner, config.max_input_bytes));

    // 4. Instantiate controllers
    tracing::info!("Instantiating controllers...");
    let job_controller = Arc::new(JobController::new(job_service));

    // Start HTTP server with all routes
    start_http_server(Arc::new(config), job_controller, tts_repo).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "audiobook_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "audiobook_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
