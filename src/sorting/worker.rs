use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::dataset::{HierarchyProvider, PropertyProvider};

use super::job::{JobOutcome, PropertyJob, run_job};

type Release = Box<dyn Fn(JobOutcome) + Send>;

/// Single background thread that runs property jobs strictly in submission
/// order and hands plain results back over a channel.
pub struct PropertyWorker {
    jobs: Option<Sender<PropertyJob>>,
    outcomes: Receiver<JobOutcome>,
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    /// Drops the provider locks of an outcome nobody will apply.
    release: Release,
}

impl PropertyWorker {
    pub fn spawn<D>(data: Arc<D>) -> Self
    where
        D: HierarchyProvider + PropertyProvider + Send + Sync + ?Sized + 'static,
    {
        let (job_tx, job_rx) = mpsc::channel::<PropertyJob>();
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let shutdown = Arc::new(AtomicBool::new(false));

        let release_data = Arc::clone(&data);
        let release: Release = Box::new(move |outcome: JobOutcome| {
            if let Ok(loaded) = outcome.result {
                release_data.unlock_and_unload(&loaded.keys, &loaded.targets);
            }
        });

        let stop = Arc::clone(&shutdown);
        let handle = thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                let ticket = job.ticket;
                if stop.load(Ordering::Acquire) {
                    debug!(ticket, "worker shutting down, skipping queued job");
                    continue;
                }
                let outcome = run_job(&*data, job);
                debug!(ticket, ok = outcome.result.is_ok(), "property job finished");
                if outcome_tx.send(outcome).is_err() {
                    break;
                }
            }
        });

        Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            handle: Some(handle),
            shutdown,
            release,
        }
    }

    pub fn submit(&self, job: PropertyJob) -> bool {
        let Some(jobs) = &self.jobs else {
            return false;
        };
        if jobs.send(job).is_err() {
            warn!("property worker is gone, dropping job");
            return false;
        }
        true
    }

    pub fn try_next(&self) -> Option<JobOutcome> {
        match self.outcomes.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    #[cfg(test)]
    pub fn wait_next(&self, timeout: std::time::Duration) -> Option<JobOutcome> {
        self.outcomes.recv_timeout(timeout).ok()
    }
}

impl Drop for PropertyWorker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.jobs.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("property worker panicked");
        }
        let mut released = 0_usize;
        while let Ok(outcome) = self.outcomes.try_recv() {
            (self.release)(outcome);
            released += 1;
        }
        if released > 0 {
            debug!(released, "released locks of unapplied property jobs");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dataset::test_support::DatasetBuilder;
    use crate::dataset::{PropertyKey, PropertyKind, PropertyLevel, ScaffoldId};
    use crate::sorting::job::JobKind;
    use crate::sorting::{Accumulation, PropertyRequest, SortDirection, SortRequest};

    fn job(ticket: u64, key: &str) -> PropertyJob {
        PropertyJob {
            ticket,
            root: ScaffoldId(1),
            kind: JobKind::Sort(SortRequest {
                property: PropertyRequest {
                    key: PropertyKey::new(key),
                    accumulation: Accumulation::Average,
                    cumulative: false,
                },
                direction: SortDirection::Descending,
                color_segments: false,
                captions: false,
            }),
        }
    }

    #[test]
    fn outcomes_arrive_in_submission_order() {
        let data = Arc::new(
            DatasetBuilder::new()
                .scaffold(1, None)
                .scaffold(2, Some(1))
                .property("a", PropertyLevel::Scaffold, PropertyKind::Numeric)
                .property("b", PropertyLevel::Scaffold, PropertyKind::Numeric)
                .scaffold_value("a", 2, 1.0)
                .scaffold_value("b", 2, 2.0)
                .build(),
        );
        let worker = PropertyWorker::spawn(Arc::clone(&data));
        for ticket in 0..6 {
            let key = if ticket % 2 == 0 { "a" } else { "b" };
            assert!(worker.submit(job(ticket, key)));
        }

        let tickets = (0..6)
            .filter_map(|_| worker.wait_next(Duration::from_secs(5)))
            .map(|outcome| outcome.ticket)
            .collect::<Vec<_>>();
        assert_eq!(tickets, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn dropping_the_worker_releases_unapplied_loads() {
        let data = Arc::new(
            DatasetBuilder::new()
                .scaffold(1, None)
                .scaffold(2, Some(1))
                .property("a", PropertyLevel::Scaffold, PropertyKind::Numeric)
                .scaffold_value("a", 2, 1.0)
                .build(),
        );
        let worker = PropertyWorker::spawn(Arc::clone(&data));
        for ticket in 0..4 {
            assert!(worker.submit(job(ticket, "a")));
        }
        let first = worker.wait_next(Duration::from_secs(5)).expect("first outcome");
        assert!(data.properties().loaded_count() > 0);

        drop(worker);
        let loaded = first.result.expect("loaded");
        data.unlock_and_unload(&loaded.keys, &loaded.targets);
        assert_eq!(data.properties().loaded_count(), 0);
    }
}
