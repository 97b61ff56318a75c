use super::error::{PipelineError, PipelineStep};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const PLAN_FILE: &str = "plan.json";
pub const SCRIPTS_FILE: &str = "scripts.txt";
pub const CHUNKS_FILE: &str = "chunks.txt";
pub const ARTIFACT_FILE: &str = "audiobook.mp3";

/// Scratch directory for one job, `<work_dir>/<job_id>/`
#[derive(Debug, Clone)]
pub struct JobWorkspace {
    root: PathBuf,
}

impl JobWorkspace {
    pub async fn create(work_dir: &Path, job_id: Uuid) -> Result<Self, PipelineError> {
        let root = work_dir.join(job_id.to_string());
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| PipelineError::Workspace {
                stage: PipelineStep::Planning,
                message: format!("cannot create {}: {}", root.display(), e),
            })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Store an intermediate artifact produced by `stage`
    pub async fn write(
        &self,
        stage: PipelineStep,
        name: &str,
        contents: impl AsRef<[u8]>,
    ) -> Result<PathBuf, PipelineError> {
        let path = self.path(name);
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| PipelineError::Workspace {
                stage,
                message: format!("cannot write {}: {}", path.display(), e),
            })?;
        Ok(path)
    }

    /// Remove the workspace. Failures are logged, never surfaced.
    pub async fn cleanup(self) {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => tracing::debug!(path = %self.root.display(), "Job workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.root.display(),
                error = %e,
                "Failed to remove job workspace"
            ),
        }
    }
}
