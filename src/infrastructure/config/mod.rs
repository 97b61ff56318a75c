use crate::domain::pipeline::{
    AssemblySettings, BackoffSettings, PipelineSettings, PlannerSettings, RateLimitSettings,
    SynthesisSettings, WriterSettings,
};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // LLM collaborators
    pub llm_planner_model: String,
    pub llm_writer_model: String,
    pub llm_fast_writer_model: String,
    // Speech synthesis
    pub tts_provider: TtsProvider,
    pub tts_model: String,
    pub tts_default_voice: String,
    pub aws_region: String,
    pub tts_burst: u32,
    pub tts_steady_rate: u32,
    pub tts_window_secs: u64,
    pub tts_max_chunk_bytes: usize,
    pub synthesis_workers: usize,
    pub synthesis_max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub backoff_jitter_ms: u64,
    // Planning and writing
    pub writer_concurrency: usize,
    pub writer_max_attempts: u32,
    pub planner_max_attempts: u32,
    pub default_segment_count: usize,
    pub collaborator_timeout_secs: u64,
    // Output
    pub output_dirs: Vec<PathBuf>,
    pub work_dir: PathBuf,
    pub cover_image_path: Option<PathBuf>,
    pub default_author: String,
    // Jobs
    pub job_retention_secs: u64,
    pub max_input_bytes: usize,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum TtsProvider {
    OpenAi,
    Polly,
}

impl FromStr for TtsProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(TtsProvider::OpenAi),
            "polly" => Ok(TtsProvider::Polly),
            other => Err(format!(
                "TTS_PROVIDER must be 'openai' or 'polly', got '{}'",
                other
            )),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            host: var("HOST", "0.0.0.0"),
            port: var("PORT", "8080").parse()?,
            environment: match var("ENVIRONMENT", "development").as_str() {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match var("LOG_FORMAT", "pretty").as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            llm_planner_model: var("LLM_PLANNER_MODEL", "gpt-4o"),
            llm_writer_model: var("LLM_WRITER_MODEL", "gpt-4o"),
            llm_fast_writer_model: var("LLM_FAST_WRITER_MODEL", "gpt-4o-mini"),
            tts_provider: var("TTS_PROVIDER", "openai").parse()?,
            tts_model: var("TTS_MODEL", "tts-1"),
            tts_default_voice: var("TTS_DEFAULT_VOICE", ""),
            aws_region: var("AWS_REGION", "eu-west-1"),
            tts_burst: var("TTS_BURST", "9").parse()?,
            tts_steady_rate: var("TTS_STEADY_RATE", "1").parse()?,
            tts_window_secs: var("TTS_WINDOW_SECS", "10").parse()?,
            tts_max_chunk_bytes: var("TTS_MAX_CHUNK_BYTES", "4096").parse()?,
            synthesis_workers: var("SYNTHESIS_WORKERS", "4").parse()?,
            synthesis_max_attempts: var("SYNTHESIS_MAX_ATTEMPTS", "5").parse()?,
            backoff_base_ms: var("BACKOFF_BASE_MS", "1000").parse()?,
            backoff_max_ms: var("BACKOFF_MAX_MS", "30000").parse()?,
            backoff_jitter_ms: var("BACKOFF_JITTER_MS", "500").parse()?,
            writer_concurrency: var("WRITER_CONCURRENCY", "5").parse()?,
            writer_max_attempts: var("WRITER_MAX_ATTEMPTS", "3").parse()?,
            planner_max_attempts: var("PLANNER_MAX_ATTEMPTS", "3").parse()?,
            default_segment_count: var("DEFAULT_SEGMENT_COUNT", "15").parse()?,
            collaborator_timeout_secs: var("COLLABORATOR_TIMEOUT_SECS", "120").parse()?,
            output_dirs: var("OUTPUT_DIRS", "./output")
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect(),
            work_dir: PathBuf::from(var("WORK_DIR", "./work")),
            cover_image_path: lookup("COVER_IMAGE_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            default_author: var("DEFAULT_AUTHOR", "Audiobook Backend"),
            job_retention_secs: var("JOB_RETENTION_SECS", "86400").parse()?,
            max_input_bytes: var("MAX_INPUT_BYTES", "50000").parse()?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        let positive = [
            ("TTS_BURST", self.tts_burst as u64),
            ("TTS_STEADY_RATE", self.tts_steady_rate as u64),
            ("TTS_WINDOW_SECS", self.tts_window_secs),
            ("TTS_MAX_CHUNK_BYTES", self.tts_max_chunk_bytes as u64),
            ("SYNTHESIS_WORKERS", self.synthesis_workers as u64),
            ("SYNTHESIS_MAX_ATTEMPTS", self.synthesis_max_attempts as u64),
            ("WRITER_CONCURRENCY", self.writer_concurrency as u64),
            ("WRITER_MAX_ATTEMPTS", self.writer_max_attempts as u64),
            ("PLANNER_MAX_ATTEMPTS", self.planner_max_attempts as u64),
            ("DEFAULT_SEGMENT_COUNT", self.default_segment_count as u64),
            ("COLLABORATOR_TIMEOUT_SECS", self.collaborator_timeout_secs),
            ("MAX_INPUT_BYTES", self.max_input_bytes as u64),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(format!("{} must be greater than zero", name));
        }
        if self.output_dirs.is_empty() {
            return Err("OUTPUT_DIRS must name at least one directory".to_string());
        }
        Ok(())
    }

    /// Settings consumed by the pipeline stages
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let timeout = Duration::from_secs(self.collaborator_timeout_secs);
        let backoff = BackoffSettings {
            base: Duration::from_millis(self.backoff_base_ms),
            max: Duration::from_millis(self.backoff_max_ms),
            jitter: Duration::from_millis(self.backoff_jitter_ms),
        };
        PipelineSettings {
            default_segment_count: self.default_segment_count,
            work_dir: self.work_dir.clone(),
            rate_limit: RateLimitSettings {
                burst: self.tts_burst,
                steady_rate: self.tts_steady_rate,
                window: Duration::from_secs(self.tts_window_secs),
            },
            planner: PlannerSettings {
                max_attempts: self.planner_max_attempts,
                timeout,
                backoff,
            },
            writer: WriterSettings {
                concurrency: self.writer_concurrency,
                max_attempts: self.writer_max_attempts,
                timeout,
                backoff,
            },
            synthesis: SynthesisSettings {
                workers: self.synthesis_workers,
                max_attempts: self.synthesis_max_attempts,
                timeout,
                max_chunk_bytes: self.tts_max_chunk_bytes,
                backoff,
            },
            assembly: AssemblySettings {
                output_dirs: self.output_dirs.clone(),
                cover_image_path: self.cover_image_path.clone(),
                default_author: self.default_author.clone(),
            },
        }
    }
}
