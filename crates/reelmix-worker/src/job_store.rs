//! Job status records.
//!
//! Each job has exactly one writer, the task that runs it. Readers always get
//! a cloned snapshot.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use reelmix_models::{BatchJob, JobId, JobKind};

use crate::logging::JobLogger;
use crate::progress::ProgressSink;

/// Storage for job records.
pub trait JobStore: Send + Sync {
    fn get(&self, id: &JobId) -> Option<BatchJob>;

    fn insert(&self, job: BatchJob);

    /// Apply `f` to the record in place. Returns false for unknown ids.
    fn update(&self, id: &JobId, f: &mut dyn FnMut(&mut BatchJob)) -> bool;

    fn remove(&self, id: &JobId) -> Option<BatchJob>;

    /// Drop terminal records not updated within `older_than`.
    fn prune_terminal(&self, older_than: Duration) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local job store.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, BatchJob>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, BatchJob>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, BatchJob>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JobStore for InMemoryJobStore {
    fn get(&self, id: &JobId) -> Option<BatchJob> {
        self.read().get(id).cloned()
    }

    fn insert(&self, job: BatchJob) {
        self.write().insert(job.id.clone(), job);
    }

    fn update(&self, id: &JobId, f: &mut dyn FnMut(&mut BatchJob)) -> bool {
        match self.write().get_mut(id) {
            Some(job) => {
                f(job);
                true
            }
            None => false,
        }
    }

    fn remove(&self, id: &JobId) -> Option<BatchJob> {
        self.write().remove(id)
    }

    fn prune_terminal(&self, older_than: Duration) -> usize {
        let max_idle = i64::try_from(older_than.as_secs()).unwrap_or(i64::MAX);
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, job| !(job.is_terminal() && job.idle_secs() >= max_idle));
        before - jobs.len()
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}

/// Job lifecycle operations over a [`JobStore`].
#[derive(Clone)]
pub struct JobTracker {
    store: Arc<dyn JobStore>,
}

impl JobTracker {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Register a new `processing` job.
    pub fn create(&self, kind: JobKind, output_folder: impl Into<PathBuf>) -> BatchJob {
        let job = BatchJob::new(JobId::new(), kind, output_folder);
        self.store.insert(job.clone());
        job
    }

    pub fn get(&self, id: &JobId) -> Option<BatchJob> {
        self.store.get(id)
    }

    pub fn set_progress(&self, id: &JobId, percent: f64, message: Option<String>) {
        let mut message = message;
        self.store
            .update(id, &mut |job| job.set_progress(percent, message.take()));
    }

    pub fn push_output(&self, id: &JobId, filename: &str) {
        self.store.update(id, &mut |job| job.push_output(filename));
    }

    pub fn complete(&self, id: &JobId, outputs: Vec<String>) {
        let mut outputs = Some(outputs);
        self.store.update(id, &mut |job| {
            job.complete(outputs.take().unwrap_or_default())
        });
    }

    pub fn fail(&self, id: &JobId, error: &str) {
        self.store.update(id, &mut |job| job.fail(error));
    }

    /// Progress sink writing into this job's record.
    pub fn sink(&self, id: &JobId, logger: JobLogger) -> JobProgress {
        JobProgress {
            tracker: self.clone(),
            id: id.clone(),
            logger,
        }
    }
}

/// Progress sink bound to one job.
pub struct JobProgress {
    tracker: JobTracker,
    id: JobId,
    logger: JobLogger,
}

impl ProgressSink for JobProgress {
    fn progress(&self, percent: f64, message: Option<String>) {
        if let Some(msg) = &message {
            self.logger.log_progress(percent, msg);
        }
        self.tracker.set_progress(&self.id, percent, message);
    }

    fn output_ready(&self, filename: &str) {
        self.tracker.push_output(&self.id, filename);
    }
}
