use crate::domain::job::Job;
use chrono::Utc;
use moka::sync::Cache;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// In-memory job store.
///
/// Entries expire `retention` after their last write, which reaps finished
/// jobs. Writes go through one lock so read-modify-write updates never
/// interleave.
pub struct JobRepository {
    jobs: Cache<Uuid, Job>,
    write_lock: Mutex<()>,
}

impl JobRepository {
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(retention)
                .build(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn insert(&self, job: Job) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.jobs.insert(job.id, job);
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id)
    }

    /// Apply `change` to a stored job and return the new state.
    ///
    /// `updated_at` only moves when the change actually modified the job.
    pub fn update<F>(&self, id: Uuid, change: F) -> Option<Job>
    where
        F: FnOnce(&mut Job),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut job = self.jobs.get(&id)?;
        let before = job.clone();

        change(&mut job);

        if job != before {
            job.updated_at = Utc::now();
            self.jobs.insert(id, job.clone());
        }
        Some(job)
    }
}
