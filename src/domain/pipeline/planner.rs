use super::error::PipelineError;
use super::model::Plan;
use super::settings::PlannerSettings;
use crate::infrastructure::repositories::{PlanningRepository, PlanningRequest};
use std::sync::Arc;
use std::time::Instant;

/// Asks the planning collaborator for segment descriptors and validates them
pub struct SegmentPlanner {
    planning_repo: Arc<dyn PlanningRepository>,
    settings: PlannerSettings,
}

impl SegmentPlanner {
    pub fn new(planning_repo: Arc<dyn PlanningRepository>, settings: PlannerSettings) -> Self {
        Self {
            planning_repo,
            settings,
        }
    }

    /// Plan `request.text` into exactly `request.segment_count` segments.
    ///
    /// Collaborator errors, timeouts and malformed plans each consume one
    /// attempt; the same request is resent after a backoff until attempts run out.
    pub async fn plan(&self, request: &PlanningRequest) -> Result<Plan, PipelineError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            let outcome =
                tokio::time::timeout(self.settings.timeout, self.planning_repo.plan(request)).await;

            let result = match outcome {
                Ok(Ok(plan)) => validate_plan(plan, &request.text, request.segment_count)
                    .map_err(|e| format!("malformed plan: {}", e)),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(format!("timed out after {:?}", self.settings.timeout)),
            };

            match result {
                Ok(plan) => {
                    tracing::info!(
                        attempt = attempt,
                        segments = plan.segments.len(),
                        title = %plan.title,
                        latency_ms = started.elapsed().as_millis() as u64,
                        "Plan accepted"
                    );
                    return Ok(plan);
                }
                Err(e) => {
                    last_error = e;
                }
            }

            if attempt == max_attempts {
                break;
            }

            let delay = self.settings.backoff.jittered_delay(attempt);
            tracing::warn!(
                attempt = attempt,
                max_attempts = max_attempts,
                retry_in_ms = delay.as_millis() as u64,
                error = %last_error,
                "Planning attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }

        tracing::warn!(
            attempts = max_attempts,
            error = %last_error,
            "Planning attempts exhausted"
        );

        Err(PipelineError::Planning {
            attempts: max_attempts,
            message: last_error,
        })
    }
}

/// Check collaborator output against the source text.
///
/// Segments are sorted by index, then must cover indices `0..expected` with
/// non-empty titles and monotonic, non-overlapping spans on char boundaries.
pub fn validate_plan(mut plan: Plan, source: &str, expected: usize) -> Result<Plan, String> {
    if plan.segments.len() != expected {
        return Err(format!(
            "expected {} segments, got {}",
            expected,
            plan.segments.len()
        ));
    }

    plan.segments.sort_by_key(|s| s.index);

    let mut previous_end = 0;
    for (position, segment) in plan.segments.iter().enumerate() {
        if segment.index != position {
            return Err(format!(
                "segment indices must be 0..{}, found {} at position {}",
                expected, segment.index, position
            ));
        }
        if segment.title.trim().is_empty() {
            return Err(format!("segment {} has no title", segment.index));
        }
        if segment.start >= segment.end {
            return Err(format!(
                "segment {} has an empty or inverted span {}..{}",
                segment.index, segment.start, segment.end
            ));
        }
        if segment.end > source.len() {
            return Err(format!(
                "segment {} ends at {} past the source length {}",
                segment.index,
                segment.end,
                source.len()
            ));
        }
        if !source.is_char_boundary(segment.start) || !source.is_char_boundary(segment.end) {
            return Err(format!(
                "segment {} span {}..{} splits a character",
                segment.index, segment.start, segment.end
            ));
        }
        if segment.start < previous_end {
            return Err(format!(
                "segment {} starts at {} and overlaps the previous segment ending at {}",
                segment.index, segment.start, previous_end
            ));
        }
        previous_end = segment.end;
    }

    if plan.title.trim().is_empty() {
        if let Some(first) = plan.segments.first() {
            plan.title = first.title.clone();
        }
    }

    Ok(plan)
}
