use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// pending -> processing -> completed | failed, never backwards.
    pub fn can_move_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, _) => true,
            (JobStatus::Processing, JobStatus::Pending) => false,
            (JobStatus::Processing, _) => true,
            (terminal, next) => *terminal == next,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundJob {
    pub job_id: String,
    pub status: JobStatus,
    pub total: u64,
    pub processed: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl BackgroundJob {
    pub fn pending(job_id: impl Into<String>, total: u64) -> Self {
        BackgroundJob {
            job_id: job_id.into(),
            status: JobStatus::Pending,
            total,
            processed: 0,
            success_count: 0,
            error_count: 0,
            start_time: Utc::now(),
            end_time: None,
            error: None,
        }
    }

    pub fn progress(&self) -> f32 {
        match self.total {
            0 => 0.0,
            total => (self.processed.min(total) as f32) / (total as f32),
        }
    }
}

/// Local view of a remote job, fed with poll snapshots.
///
/// The server is the only writer, each snapshot replaces the previous one.
/// Two rules are enforced on top: the status never moves backwards and
/// `processed` never decreases.
#[derive(Debug, Clone)]
pub struct JobTracker {
    current: BackgroundJob,
}

impl JobTracker {
    pub fn new(initial: BackgroundJob) -> Self {
        JobTracker { current: initial }
    }

    pub fn current(&self) -> &BackgroundJob {
        &self.current
    }

    pub fn is_finished(&self) -> bool {
        self.current.status.is_terminal()
    }

    /// Returns false when the snapshot was ignored.
    pub fn observe(&mut self, mut snapshot: BackgroundJob) -> bool {
        if !self.current.status.can_move_to(snapshot.status) {
            log::warn!(
                "Ignoring job {} snapshot moving from {:?} to {:?}",
                self.current.job_id,
                self.current.status,
                snapshot.status
            );
            return false;
        }

        if snapshot.processed < self.current.processed {
            log::warn!(
                "Job {} reported processed going back from {} to {}",
                self.current.job_id,
                self.current.processed,
                snapshot.processed
            );
            snapshot.processed = self.current.processed;
        }

        self.current = snapshot;
        true
    }

    /// Marks the job failed locally, e.g. when the safety ceiling is hit.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if self.is_finished() {
            return;
        }
        self.current.status = JobStatus::Failed;
        self.current.end_time = Some(Utc::now());
        self.current.error = Some(reason.into());
    }
}

#[cfg(test)]
mod tests {
    use super::{BackgroundJob, JobStatus, JobTracker};

    fn snapshot(status: JobStatus, processed: u64) -> BackgroundJob {
        BackgroundJob {
            status,
            processed,
            ..BackgroundJob::pending("job-1", 10)
        }
    }

    #[test]
    fn status_never_moves_backwards() {
        assert!(JobStatus::Pending.can_move_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_move_to(JobStatus::Completed));
        assert!(!JobStatus::Processing.can_move_to(JobStatus::Pending));
        assert!(!JobStatus::Completed.can_move_to(JobStatus::Processing));
        assert!(!JobStatus::Failed.can_move_to(JobStatus::Completed));
    }

    #[test]
    fn processed_count_is_monotonic() {
        let mut tracker = JobTracker::new(BackgroundJob::pending("job-1", 10));
        assert!(tracker.observe(snapshot(JobStatus::Processing, 6)));
        assert!(tracker.observe(snapshot(JobStatus::Processing, 4)));

        assert_eq!(tracker.current().processed, 6);
    }

    #[test]
    fn terminal_snapshot_freezes_tracker() {
        let mut tracker = JobTracker::new(BackgroundJob::pending("job-1", 10));
        assert!(tracker.observe(snapshot(JobStatus::Completed, 10)));
        assert!(!tracker.observe(snapshot(JobStatus::Processing, 10)));

        assert!(tracker.is_finished());
        assert_eq!(tracker.current().status, JobStatus::Completed);
    }

    #[test]
    fn local_failure_does_not_override_completion() {
        let mut tracker = JobTracker::new(BackgroundJob::pending("job-1", 10));
        tracker.observe(snapshot(JobStatus::Completed, 10));
        tracker.fail("gave up");

        assert_eq!(tracker.current().status, JobStatus::Completed);
        assert!(tracker.current().error.is_none());
    }

    #[test]
    fn progress_is_a_ratio() {
        let job = snapshot(JobStatus::Processing, 5);
        assert!((job.progress() - 0.5).abs() < f32::EPSILON);
    }
}
