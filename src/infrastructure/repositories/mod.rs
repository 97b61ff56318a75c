pub mod job_repository;
pub mod openai_llm_repository;
pub mod openai_tts_repository;
pub mod planning_repository;
pub mod polly_tts_repository;
pub mod tts_repository;
pub mod writing_repository;

pub use job_repository::JobRepository;
pub use openai_llm_repository::OpenAiLlmRepository;
pub use openai_tts_repository::OpenAiTtsRepository;
pub use planning_repository::{PlanningRepository, PlanningRequest};
pub use polly_tts_repository::PollyTtsRepository;
pub use tts_repository::{SynthesisError, TtsRepository};
pub use writing_repository::{WritingRepository, WritingRequest};
