use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::domain::{BackgroundJob, JobTracker};

use super::JobApi;

/// `tokio::time::interval` rejects a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Follows a remote job until it completes, fails, hits the safety ceiling
/// or is cancelled.
#[derive(Clone)]
pub struct JobPoller {
    api: Arc<dyn JobApi>,
    interval: Duration,
    ceiling: Duration,
}

/// A running poller. Snapshots arrive on `updates`, last write wins.
pub struct JobWatch {
    pub updates: watch::Receiver<BackgroundJob>,
    pub cancel: CancellationToken,
    pub task: JoinHandle<BackgroundJob>,
}

impl JobWatch {
    pub fn latest(&self) -> BackgroundJob {
        self.updates.borrow().clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl JobPoller {
    pub fn new(api: Arc<dyn JobApi>, interval: Duration, ceiling: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            log::warn!(
                "Poll interval {:?} is too short, using {:?}",
                interval,
                MIN_POLL_INTERVAL
            );
        }
        JobPoller {
            api,
            interval: interval.max(MIN_POLL_INTERVAL),
            ceiling,
        }
    }

    pub fn watch(&self, initial: BackgroundJob, cancel: CancellationToken) -> JobWatch {
        let (sender, updates) = watch::channel(initial.clone());
        let poller = self.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move { poller.run(initial, sender, task_cancel).await });

        JobWatch {
            updates,
            cancel,
            task,
        }
    }

    pub async fn run(
        &self,
        initial: BackgroundJob,
        updates: watch::Sender<BackgroundJob>,
        cancel: CancellationToken,
    ) -> BackgroundJob {
        let job_id = initial.job_id.clone();
        let mut tracker = JobTracker::new(initial);
        let deadline = Instant::now() + self.ceiling;
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!("Started polling job {}", job_id);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("Stopped polling job {}: cancelled", job_id);
                    break;
                }
                _ = time::sleep_until(deadline) => {
                    log::error!("Stopped polling job {} after {:?}", job_id, self.ceiling);
                    tracker.fail(format!("no result after {} seconds", self.ceiling.as_secs()));
                    updates.send_replace(tracker.current().clone());
                    break;
                }
                _ = interval.tick() => {}
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    log::info!("Stopped polling job {}: cancelled", job_id);
                    break;
                }
                polled = self.api.poll(&job_id) => polled,
            };

            match polled {
                Ok(snapshot) => {
                    if tracker.observe(snapshot) {
                        let current = tracker.current();
                        log::info!(
                            "Job {} is {:?}: {}/{} processed",
                            job_id,
                            current.status,
                            current.processed,
                            current.total
                        );
                        updates.send_replace(current.clone());
                    }
                }
                Err(e) => log::warn!("Polling job {} failed, will retry: {}", job_id, e),
            }

            if tracker.is_finished() {
                log::info!("Job {} finished as {:?}", job_id, tracker.current().status);
                break;
            }
        }

        tracker.current().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::JobPoller;
    use crate::{
        domain::{BackgroundJob, JobStatus},
        error::{Result, ScoutError},
        services::{JobApi, JobStartRequest},
    };

    /// Plays back scripted poll replies, repeating the last one.
    struct ScriptedJobs {
        replies: Mutex<VecDeque<std::result::Result<(JobStatus, u64), String>>>,
        last: Mutex<Option<std::result::Result<(JobStatus, u64), String>>>,
        polls: AtomicUsize,
    }

    impl ScriptedJobs {
        fn new(replies: Vec<std::result::Result<(JobStatus, u64), String>>) -> Arc<Self> {
            Arc::new(ScriptedJobs {
                replies: Mutex::new(replies.into()),
                last: Mutex::new(None),
                polls: AtomicUsize::new(0),
            })
        }

        fn polls(&self) -> usize {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobApi for ScriptedJobs {
        async fn start(&self, _request: &JobStartRequest) -> Result<()> {
            Ok(())
        }

        async fn poll(&self, job_id: &str) -> Result<BackgroundJob> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let next = self.replies.lock().unwrap().pop_front();
            let reply = match next {
                Some(reply) => {
                    *self.last.lock().unwrap() = Some(reply.clone());
                    reply
                }
                None => self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .unwrap_or(Ok((JobStatus::Pending, 0))),
            };

            match reply {
                Ok((status, processed)) => Ok(BackgroundJob {
                    status,
                    processed,
                    ..BackgroundJob::pending(job_id, 10)
                }),
                Err(e) => Err(ScoutError::Transport(e)),
            }
        }

        async fn notifications(&self, _job_id: &str) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn poller(api: Arc<ScriptedJobs>) -> JobPoller {
        JobPoller::new(api, Duration::from_secs(2), Duration::from_secs(3600))
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_completed() {
        let api = ScriptedJobs::new(vec![
            Ok((JobStatus::Processing, 3)),
            Ok((JobStatus::Processing, 7)),
            Ok((JobStatus::Completed, 10)),
        ]);
        let watch = poller(api.clone()).watch(
            BackgroundJob::pending("job-1", 10),
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(api.polls(), 3);
        assert!(watch.task.is_finished());
        let latest = watch.latest();
        assert_eq!(latest.status, JobStatus::Completed);
        assert_eq!(latest.processed, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_failed() {
        let api = ScriptedJobs::new(vec![
            Ok((JobStatus::Processing, 1)),
            Ok((JobStatus::Failed, 1)),
        ]);
        let watch = poller(api.clone()).watch(
            BackgroundJob::pending("job-1", 10),
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(api.polls(), 2);
        let finished = watch.task.await.unwrap();
        assert_eq!(finished.status, JobStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_polling_through_transient_errors() {
        let api = ScriptedJobs::new(vec![
            Err("connection refused".to_string()),
            Err("connection refused".to_string()),
            Ok((JobStatus::Completed, 10)),
        ]);
        let watch = poller(api.clone()).watch(
            BackgroundJob::pending("job-1", 10),
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(api.polls(), 3);
        assert_eq!(watch.latest().status, JobStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_the_ceiling() {
        let api = ScriptedJobs::new(vec![Ok((JobStatus::Processing, 1))]);
        let poller = JobPoller::new(api.clone(), Duration::from_secs(2), Duration::from_secs(9));
        let watch = poller.watch(BackgroundJob::pending("job-1", 10), CancellationToken::new());

        let finished = watch.task.await.unwrap();

        assert_eq!(finished.status, JobStatus::Failed);
        assert!(finished.error.unwrap().contains("9 seconds"));
        // ticks at 0, 2, 4, 6 and 8 seconds
        assert_eq!(api.polls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_polling() {
        let api = ScriptedJobs::new(vec![Ok((JobStatus::Processing, 1))]);
        let watch = poller(api.clone()).watch(
            BackgroundJob::pending("job-1", 10),
            CancellationToken::new(),
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        watch.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(api.polls(), 2);
        assert!(watch.task.is_finished());
        assert_eq!(watch.latest().status, JobStatus::Processing);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_still_polls_to_completion() {
        let api = ScriptedJobs::new(vec![
            Ok((JobStatus::Processing, 5)),
            Ok((JobStatus::Completed, 10)),
        ]);
        let poller = JobPoller::new(api.clone(), Duration::ZERO, Duration::from_secs(3600));
        let watch = poller.watch(BackgroundJob::pending("job-1", 10), CancellationToken::new());

        let finished = watch.task.await.unwrap();

        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(api.polls(), 2);
    }
}
