pub mod job;
pub mod pipeline;
pub mod tts;
