//! Background job registry

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::domain::job::{ExitOutcome, JobSnapshot, JobState, JobSummary};
use crate::error::{Error, Result};
use crate::infra::output_buffer::OutputBuffer;

/// Default number of finished jobs kept around
pub const DEFAULT_MAX_FINISHED: usize = 256;

/// A background job as tracked by the registry
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub command: String,
    pub cwd: PathBuf,
    pub pid: Option<u32>,
    pub timeout_secs: u64,
    pub state: JobState,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    pub stdout: OutputBuffer,
    pub stderr: OutputBuffer,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A freshly launched, running job
    pub fn running(
        id: String,
        command: String,
        cwd: PathBuf,
        pid: Option<u32>,
        timeout_secs: u64,
        stdout: OutputBuffer,
        stderr: OutputBuffer,
    ) -> Self {
        Self {
            id,
            command,
            cwd,
            pid,
            timeout_secs,
            state: JobState::Running,
            exit_code: None,
            error: None,
            stdout,
            stderr,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    async fn snapshot(&self) -> JobSnapshot {
        let (stdout, stdout_truncated) = self.stdout.text().await;
        let (stderr, stderr_truncated) = self.stderr.text().await;

        JobSnapshot {
            id: self.id.clone(),
            command: self.command.clone(),
            cwd: self.cwd.to_string_lossy().to_string(),
            pid: self.pid,
            timeout_secs: self.timeout_secs,
            state: self.state,
            exit_code: self.exit_code,
            error: self.error.clone(),
            stdout,
            stderr,
            truncated: stdout_truncated || stderr_truncated,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }

    fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            command: self.command.clone(),
            state: self.state,
            exit_code: self.exit_code,
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Process-wide table of background jobs.
///
/// Running jobs are never evicted. Finished jobs stay until reaped, but only
/// the newest `max_finished` of them are kept; older ones are dropped as new
/// jobs finish.
pub struct JobRegistry {
    /// Map of job_id -> job
    jobs: DashMap<String, Job>,
    max_finished: usize,
}

impl JobRegistry {
    /// Create a new job registry
    #[cfg(test)]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_FINISHED)
    }

    /// Create a registry keeping at most `max_finished` finished jobs
    pub fn with_capacity(max_finished: usize) -> Self {
        Self {
            jobs: DashMap::new(),
            max_finished,
        }
    }

    /// Register a launched job
    pub fn insert(&self, job: Job) {
        info!("Job registered: {} ({})", job.id, job.command);
        self.jobs.insert(job.id.clone(), job);
    }

    /// Snapshot a job, including output captured so far
    pub async fn get(&self, id: &str) -> Result<JobSnapshot> {
        // Clone out so no map guard is held across the await
        let job = self
            .jobs
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::JobNotFound(id.to_string()))?;
        Ok(job.snapshot().await)
    }

    /// All jobs, oldest first
    pub fn list(&self) -> Vec<JobSummary> {
        let mut jobs: Vec<JobSummary> = self.jobs.iter().map(|entry| entry.summary()).collect();
        jobs.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Move a running job into its terminal state.
    ///
    /// Returns false if the job is unknown or already terminal; a job only
    /// ever transitions once.
    pub fn finish(&self, id: &str, outcome: &ExitOutcome) -> bool {
        {
            let Some(mut job) = self.jobs.get_mut(id) else {
                warn!("Finish for unknown job {}", id);
                return false;
            };
            if job.state.is_terminal() {
                warn!(
                    "Job {} already {}, ignoring {:?}",
                    id,
                    job.state.as_str(),
                    outcome
                );
                return false;
            }

            let (state, exit_code, error) = match outcome {
                ExitOutcome::Exited(code) => (JobState::Completed, Some(*code), None),
                ExitOutcome::TimedOut => (
                    JobState::TimedOut,
                    None,
                    Some(Error::Timeout(job.timeout_secs).to_string()),
                ),
                ExitOutcome::Failed(message) => (JobState::Failed, None, Some(message.clone())),
            };
            job.state = state;
            job.exit_code = exit_code;
            job.error = error;
            job.finished_at = Some(Utc::now());
            info!("Job {} finished: {}", id, state.as_str());
        }

        self.evict_finished();
        true
    }

    /// Remove a finished job and return its final snapshot
    pub async fn reap(&self, id: &str) -> Result<JobSnapshot> {
        match self.jobs.remove_if(id, |_, job| job.state.is_terminal()) {
            Some((_, job)) => {
                info!("Job reaped: {}", id);
                Ok(job.snapshot().await)
            }
            None if self.jobs.contains_key(id) => Err(Error::InvalidArgument(format!(
                "job {} is still running",
                id
            ))),
            None => Err(Error::JobNotFound(id.to_string())),
        }
    }

    /// Number of tracked jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Number of jobs still running
    pub fn running(&self) -> usize {
        self.jobs
            .iter()
            .filter(|entry| !entry.state.is_terminal())
            .count()
    }

    fn evict_finished(&self) {
        let mut finished: Vec<(DateTime<Utc>, String)> = self
            .jobs
            .iter()
            .filter_map(|entry| entry.finished_at.map(|at| (at, entry.id.clone())))
            .collect();

        if finished.len() <= self.max_finished {
            return;
        }

        finished.sort();
        let excess = finished.len() - self.max_finished;
        for (_, id) in finished.into_iter().take(excess) {
            if self.jobs.remove_if(&id, |_, job| job.state.is_terminal()).is_some() {
                debug!("Evicted finished job {}", id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn job(id: &str) -> Job {
        Job::running(
            id.to_string(),
            format!("echo {}", id),
            PathBuf::from("/tmp"),
            None,
            60,
            OutputBuffer::new(1024),
            OutputBuffer::new(1024),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let registry = JobRegistry::new();
        let job = job("a");
        job.stdout.append(b"partial").await;
        registry.insert(job);

        let snapshot = registry.get("a").await.unwrap();
        assert_eq!(snapshot.state, JobState::Running);
        assert_eq!(snapshot.stdout, "partial");
        assert!(snapshot.exit_code.is_none());

        assert!(matches!(
            registry.get("missing").await,
            Err(Error::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_finish_transitions_once() {
        let registry = JobRegistry::new();
        registry.insert(job("a"));

        assert!(registry.finish("a", &ExitOutcome::Exited(3)));
        assert!(!registry.finish("a", &ExitOutcome::TimedOut));
        assert!(!registry.finish("unknown", &ExitOutcome::Exited(0)));

        let snapshot = registry.get("a").await.unwrap();
        assert_eq!(snapshot.state, JobState::Completed);
        assert_eq!(snapshot.exit_code, Some(3));
        assert!(snapshot.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_timed_out_job_records_reason() {
        let registry = JobRegistry::new();
        registry.insert(job("slow"));
        registry.finish("slow", &ExitOutcome::TimedOut);

        let snapshot = registry.get("slow").await.unwrap();
        assert_eq!(snapshot.state, JobState::TimedOut);
        assert!(snapshot.exit_code.is_none());
        assert!(snapshot.error.unwrap().contains("60s"));
    }

    #[tokio::test]
    async fn test_reap() {
        let registry = JobRegistry::new();
        registry.insert(job("a"));

        assert!(matches!(
            registry.reap("a").await,
            Err(Error::InvalidArgument(_))
        ));

        registry.finish("a", &ExitOutcome::Exited(0));
        let reaped = registry.reap("a").await.unwrap();
        assert_eq!(reaped.state, JobState::Completed);
        assert_eq!(registry.len(), 0);

        assert!(matches!(registry.reap("a").await, Err(Error::JobNotFound(_))));
    }

    #[tokio::test]
    async fn test_eviction_keeps_running_and_newest_finished() {
        let registry = JobRegistry::with_capacity(2);
        for id in ["a", "b", "c", "d"] {
            registry.insert(job(id));
        }
        registry.insert(job("live"));

        for id in ["a", "b", "c", "d"] {
            registry.finish(id, &ExitOutcome::Exited(0));
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let ids: Vec<String> = registry.list().into_iter().map(|j| j.id).collect();
        assert_eq!(registry.len(), 3);
        assert!(ids.contains(&"live".to_string()));
        assert!(ids.contains(&"c".to_string()));
        assert!(ids.contains(&"d".to_string()));
        assert_eq!(registry.running(), 1);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_start() {
        let registry = JobRegistry::new();
        for id in ["first", "second", "third"] {
            registry.insert(job(id));
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        let ids: Vec<String> = registry.list().into_iter().map(|j| j.id).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_and_finishes() {
        let registry = Arc::new(JobRegistry::new());

        let handles: Vec<_> = (0..100)
            .map(|i| {
                let registry = registry.clone();
                tokio::spawn(async move {
                    let id = format!("job-{}", i);
                    registry.insert(job(&id));
                    registry.finish(&id, &ExitOutcome::Exited(i));
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.len(), 100);
        assert_eq!(registry.running(), 0);
        let snapshot = registry.get("job-42").await.unwrap();
        assert_eq!(snapshot.exit_code, Some(42));
    }
}
