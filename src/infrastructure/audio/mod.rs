pub mod tagging;

pub use tagging::{cover_mime_type, tag_audiobook, AudiobookTags};

use lofty::prelude::*;
use lofty::probe::Probe;
use std::io::Cursor;
use std::time::Duration;

/// Bitrate assumed when the encoded audio cannot be parsed
const FALLBACK_BITRATE_BPS: u64 = 128_000;

/// Duration of one encoded audio buffer.
///
/// Falls back to an estimate from the byte length at 128 kbit/s when the
/// buffer cannot be parsed or reports no duration.
pub fn probe_duration(bytes: &[u8]) -> Duration {
    match read_duration(bytes) {
        Ok(duration) if !duration.is_zero() => duration,
        Ok(_) => estimate_duration(bytes.len()),
        Err(e) => {
            tracing::debug!(
                bytes = bytes.len(),
                error = %e,
                "Could not probe audio duration, estimating from size"
            );
            estimate_duration(bytes.len())
        }
    }
}

fn read_duration(bytes: &[u8]) -> lofty::error::Result<Duration> {
    let tagged_file = Probe::new(Cursor::new(bytes)).guess_file_type()?.read()?;
    Ok(tagged_file.properties().duration())
}

pub fn estimate_duration(len: usize) -> Duration {
    Duration::from_millis(len as u64 * 8 * 1000 / FALLBACK_BITRATE_BPS)
}
