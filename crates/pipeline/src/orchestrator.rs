//! Job orchestration.
//!
//! Every call to [`JobOrchestrator::submit`] registers a `processing` job and
//! spawns exactly one background task that runs
//! generate -> save artifact -> append to catalog, then moves the job to its
//! terminal state. Request paths only ever take short read or write locks on
//! the job table and never wait for a background task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use assetter_core::error::CoreError;
use assetter_core::job::{Job, JobStatus};
use assetter_core::naming::artifact_path;
use assetter_core::types::JobId;
use assetter_events::{EventBus, PipelineEvent, PipelineEventKind};
use assetter_stability::ModelGenerator;
use assetter_storage::{BlobStore, CatalogError, ModelCatalog, ModelRecord, StorageError};
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;

/// Error recorded on a job whose artifact could not be stored. The storage
/// error itself is only logged.
pub const SAVE_FAILED_MESSAGE: &str = "failed to save model";

/// Error recorded on a job whose background task panicked.
pub const GENERATION_PANIC_MESSAGE: &str = "generation task panicked";

/// Job counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStats {
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct JobOrchestrator {
    jobs: RwLock<HashMap<JobId, Job>>,
    generator: Arc<dyn ModelGenerator>,
    blobs: Arc<dyn BlobStore>,
    catalog: Arc<ModelCatalog>,
    events: Arc<EventBus>,
    tasks: TaskTracker,
}

impl JobOrchestrator {
    pub fn new(
        generator: Arc<dyn ModelGenerator>,
        blobs: Arc<dyn BlobStore>,
        catalog: Arc<ModelCatalog>,
        events: Arc<EventBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            jobs: RwLock::new(HashMap::new()),
            generator,
            blobs,
            catalog,
            events,
            tasks: TaskTracker::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Public contract
    // -----------------------------------------------------------------------

    /// Register a new job and start generating in the background.
    ///
    /// Returns as soon as the job is in the table. Fails only once
    /// [`shutdown`](Self::shutdown) has begun.
    pub async fn submit(self: &Arc<Self>, image: Vec<u8>) -> Result<JobId, CoreError> {
        if self.tasks.is_closed() {
            return Err(CoreError::Unavailable(
                "Server is shutting down, not accepting new jobs".into(),
            ));
        }

        let id = JobId::generate();
        let image_bytes = image.len();
        self.jobs
            .write()
            .await
            .insert(id.clone(), Job::new(id.clone()));

        self.events
            .publish(PipelineEvent::new(id.clone(), PipelineEventKind::Submitted));

        let this = Arc::clone(self);
        let task_id = id.clone();
        self.tasks.spawn(async move {
            // The pipeline runs in its own task so a panic anywhere in it
            // fails this job instead of leaving it in `processing`.
            let worker = tokio::spawn(Arc::clone(&this).execute(task_id.clone(), image));
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(job_id = %task_id, error = %e, "Generation task aborted");
                    Err(GENERATION_PANIC_MESSAGE.to_string())
                }
            };
            this.finish(&task_id, outcome).await;
        });

        tracing::debug!(job_id = %id, image_bytes, "Generation task spawned");
        Ok(id)
    }

    /// Snapshot of a job's current fields.
    pub async fn status(&self, id: &JobId) -> Result<Job, CoreError> {
        self.jobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| job_not_found(id))
    }

    /// Artifact bytes of a completed job.
    ///
    /// `processing` and `failed` jobs yield [`CoreError::NotReady`].
    pub async fn fetch(&self, id: &JobId) -> Result<Vec<u8>, CoreError> {
        let result_ref = {
            let jobs = self.jobs.read().await;
            let job = jobs.get(id).ok_or_else(|| job_not_found(id))?;
            match job.status {
                JobStatus::Completed => job.result_ref.clone().ok_or_else(|| {
                    CoreError::Internal(format!("Completed job {id} has no result reference"))
                })?,
                JobStatus::Processing | JobStatus::Failed => {
                    return Err(CoreError::NotReady(format!(
                        "Model not ready: job {id} is {}",
                        job.status
                    )));
                }
            }
        };

        self.blobs.read(&result_ref).await.map_err(|e| match e {
            StorageError::NotFound(_) => CoreError::NotFound {
                entity: "Artifact",
                id: id.to_string(),
            },
            other => {
                tracing::error!(job_id = %id, error = %other, "Failed to read artifact");
                CoreError::Internal(other.to_string())
            }
        })
    }

    /// Catalogued models, newest first.
    pub async fn list_completed_models(&self) -> Vec<ModelRecord> {
        self.catalog.list_all().await
    }

    pub async fn get_model(&self, id: &str) -> Result<ModelRecord, CoreError> {
        self.catalog.get_by_id(id).await.map_err(catalog_error)
    }

    /// Drop a model from the catalog. The artifact itself stays in the blob
    /// store, so a job that produced it can still be downloaded.
    pub async fn remove_model(&self, id: &str) -> Result<ModelRecord, CoreError> {
        let removed = self.catalog.remove(id).await.map_err(catalog_error)?;
        tracing::info!(model_id = %id, "Model removed from catalog");
        Ok(removed)
    }

    pub async fn catalog_size(&self) -> usize {
        self.catalog.len().await
    }

    pub async fn stats(&self) -> JobStats {
        let jobs = self.jobs.read().await;
        let mut stats = JobStats::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Number of background tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Stop accepting jobs and wait up to `timeout` for running ones.
    ///
    /// Returns `true` if every task finished in time. Tasks still running
    /// afterwards are abandoned with the process.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tasks.close();
        let in_flight = self.tasks.len();
        tracing::info!(in_flight, "Draining generation tasks");

        match tokio::time::timeout(timeout, self.tasks.wait()).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    in_flight = self.tasks.len(),
                    "Generation tasks still running at shutdown deadline"
                );
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Background task
    // -----------------------------------------------------------------------

    /// Generate and persist the artifact. `Ok` carries the blob path, `Err`
    /// the message to record on the job.
    async fn execute(self: Arc<Self>, id: JobId, image: Vec<u8>) -> Result<String, String> {
        let model = match self.generator.generate(image).await {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Generation failed");
                return Err(e.to_string());
            }
        };

        let path = artifact_path(&id);
        if let Err(e) = self.blobs.save(&path, &model).await {
            tracing::error!(job_id = %id, path = %path, error = %e, "Failed to save model");
            return Err(SAVE_FAILED_MESSAGE.to_string());
        }

        // Best effort: the artifact is already downloadable, so a catalog
        // failure is reported but does not fail the job.
        if let Err(e) = self.catalog.append(id.as_str(), "").await {
            tracing::warn!(job_id = %id, error = %e, "Failed to save model metadata");
            self.events.publish(PipelineEvent::new(
                id.clone(),
                PipelineEventKind::CatalogAppendFailed {
                    error: e.to_string(),
                },
            ));
        }

        Ok(path)
    }

    /// Apply the terminal transition. Only this job's task calls it.
    async fn finish(&self, id: &JobId, outcome: Result<String, String>) {
        let (transition, kind) = {
            let mut jobs = self.jobs.write().await;
            let Some(job) = jobs.get_mut(id) else {
                tracing::error!(job_id = %id, "Job disappeared from the table before finishing");
                return;
            };
            match outcome {
                Ok(result_ref) => (
                    job.complete(result_ref.clone()),
                    PipelineEventKind::Completed { result_ref },
                ),
                Err(error) => (job.fail(error.clone()), PipelineEventKind::Failed { error }),
            }
        };

        match transition {
            Ok(()) => self.events.publish(PipelineEvent::new(id.clone(), kind)),
            Err(e) => tracing::error!(job_id = %id, error = %e, "Rejected job transition"),
        }
    }
}

fn job_not_found(id: &JobId) -> CoreError {
    CoreError::NotFound {
        entity: "Job",
        id: id.to_string(),
    }
}

fn catalog_error(err: CatalogError) -> CoreError {
    match err {
        CatalogError::NotFound(id) => CoreError::NotFound { entity: "Model", id },
        CatalogError::Duplicate(id) => CoreError::Conflict(format!("Model {id} already exists")),
        other => {
            tracing::error!(error = %other, "Catalog error");
            CoreError::Internal(other.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use assetter_stability::GenerationError;
    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use super::*;

    const MODEL: &[u8] = b"glTF\x02\x00\x00\x00mock-model";

    // -- test doubles --------------------------------------------------------

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    /// Generator whose calls block until the test releases a permit.
    struct MockGenerator {
        behaviour: Behaviour,
        gate: Option<Arc<Semaphore>>,
        calls: AtomicUsize,
    }

    impl MockGenerator {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                gate: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn gated(gate: Arc<Semaphore>) -> Arc<Self> {
            Arc::new(Self {
                behaviour: Behaviour::Succeed,
                gate: Some(gate),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelGenerator for MockGenerator {
        async fn generate(&self, _image: Vec<u8>) -> Result<Vec<u8>, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            match self.behaviour {
                Behaviour::Succeed => Ok(MODEL.to_vec()),
                Behaviour::Fail => Err(GenerationError::Api {
                    status: 500,
                    body: "provider down".into(),
                }),
                Behaviour::Panic => panic!("generator exploded"),
            }
        }
    }

    struct BrokenBlobStore;

    #[async_trait]
    impl BlobStore for BrokenBlobStore {
        async fn save(&self, _path: &str, _data: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("/var/secret/disk is full")))
        }

        async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(path.to_string()))
        }
    }

    struct PanickingBlobStore;

    #[async_trait]
    impl BlobStore for PanickingBlobStore {
        async fn save(&self, _path: &str, _data: &[u8]) -> Result<(), StorageError> {
            panic!("blob store exploded");
        }

        async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(path.to_string()))
        }
    }

    struct Harness {
        dir: tempfile::TempDir,
        orchestrator: Arc<JobOrchestrator>,
        catalog: Arc<ModelCatalog>,
        events: Arc<EventBus>,
    }

    async fn harness_with(
        generator: Arc<dyn ModelGenerator>,
        blobs: Option<Arc<dyn BlobStore>>,
    ) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let blobs = match blobs {
            Some(blobs) => blobs,
            None => Arc::new(
                assetter_storage::LocalBlobStore::new(dir.path().join("uploads"))
                    .await
                    .unwrap(),
            ),
        };
        let catalog = Arc::new(ModelCatalog::open(dir.path().join("data")).await.unwrap());
        let events = Arc::new(EventBus::default());
        let orchestrator =
            JobOrchestrator::new(generator, blobs, Arc::clone(&catalog), Arc::clone(&events));
        Harness {
            dir,
            orchestrator,
            catalog,
            events,
        }
    }

    async fn harness(generator: Arc<dyn ModelGenerator>) -> Harness {
        harness_with(generator, None).await
    }

    async fn wait_terminal(orchestrator: &JobOrchestrator, id: &JobId) -> Job {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let job = orchestrator.status(id).await.unwrap();
                if job.status.is_terminal() {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job did not reach a terminal state in time")
    }

    // -- tests ---------------------------------------------------------------

    #[tokio::test]
    async fn submit_returns_before_generation_finishes() {
        let gate = Arc::new(Semaphore::new(0));
        let h = harness(MockGenerator::gated(Arc::clone(&gate))).await;

        let id = h.orchestrator.submit(b"image".to_vec()).await.unwrap();

        let job = h.orchestrator.status(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_matches!(h.orchestrator.fetch(&id).await, Err(CoreError::NotReady(_)));

        gate.add_permits(1);
        let job = wait_terminal(&h.orchestrator, &id).await;
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn successful_job_round_trips_artifact_and_catalogs_it() {
        let h = harness(MockGenerator::new(Behaviour::Succeed)).await;

        let id = h.orchestrator.submit(b"image".to_vec()).await.unwrap();
        let job = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result_ref, Some(format!("{id}.glb")));
        assert!(job.error.is_none());
        assert_eq!(h.orchestrator.fetch(&id).await.unwrap(), MODEL);
        assert!(h.dir.path().join("uploads").join(format!("{id}.glb")).is_file());

        let models = h.orchestrator.list_completed_models().await;
        assert!(models.iter().any(|m| m.id == id.as_str()));
        assert_eq!(h.orchestrator.get_model(id.as_str()).await.unwrap().id, id.as_str());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let h = harness(MockGenerator::new(Behaviour::Succeed)).await;
        let ghost = JobId::parse("job_never_submitted").unwrap();

        assert_matches!(
            h.orchestrator.status(&ghost).await,
            Err(CoreError::NotFound { entity: "Job", .. })
        );
        assert_matches!(
            h.orchestrator.fetch(&ghost).await,
            Err(CoreError::NotFound { entity: "Job", .. })
        );
    }

    #[tokio::test]
    async fn generation_error_fails_job_with_message() {
        let h = harness(MockGenerator::new(Behaviour::Fail)).await;

        let id = h.orchestrator.submit(b"image".to_vec()).await.unwrap();
        let job = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.as_deref().unwrap().contains("provider down"));
        assert!(job.result_ref.is_none());
        assert_matches!(h.orchestrator.fetch(&id).await, Err(CoreError::NotReady(_)));
        assert!(h.catalog.is_empty().await);
    }

    #[tokio::test]
    async fn save_failure_records_generic_message() {
        let h = harness_with(
            MockGenerator::new(Behaviour::Succeed),
            Some(Arc::new(BrokenBlobStore)),
        )
        .await;

        let id = h.orchestrator.submit(b"image".to_vec()).await.unwrap();
        let job = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some(SAVE_FAILED_MESSAGE));
        assert!(h.catalog.is_empty().await);
    }

    #[tokio::test]
    async fn catalog_failure_still_completes_job() {
        let h = harness(MockGenerator::new(Behaviour::Succeed)).await;
        let mut rx = h.events.subscribe();

        // Without its directory the catalog cannot write models.json.
        std::fs::remove_dir_all(h.dir.path().join("data")).unwrap();

        let id = h.orchestrator.submit(b"image".to_vec()).await.unwrap();
        let job = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(h.orchestrator.fetch(&id).await.unwrap(), MODEL);
        assert!(h.orchestrator.list_completed_models().await.is_empty());

        let mut kinds = Vec::new();
        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("event not published in time")
                .unwrap();
            kinds.push(event.event_type());
        }
        assert_eq!(
            kinds,
            vec!["job.submitted", "catalog.append_failed", "job.completed"]
        );
    }

    #[tokio::test]
    async fn panicking_generator_fails_job() {
        let h = harness(MockGenerator::new(Behaviour::Panic)).await;

        let id = h.orchestrator.submit(b"image".to_vec()).await.unwrap();
        let job = wait_terminal(&h.orchestrator, &id).await;

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some(GENERATION_PANIC_MESSAGE));
    }

    #[tokio::test]
    async fn panicking_blob_store_fails_job() {
        let h = harness_with(
            MockGenerator::new(Behaviour::Succeed),
            Some(Arc::new(PanickingBlobStore)),
        )
        .await;

        let id = h.orchestrator.submit(b"image".to_vec()).await.unwrap();
        assert!(h.orchestrator.shutdown(Duration::from_secs(5)).await);

        let job = h.orchestrator.status(&id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some(GENERATION_PANIC_MESSAGE));
        assert_eq!(
            h.orchestrator.stats().await,
            JobStats {
                processing: 0,
                completed: 0,
                failed: 1
            }
        );
        assert!(h.catalog.is_empty().await);
    }

    #[tokio::test]
    async fn terminal_status_is_stable() {
        let h = harness(MockGenerator::new(Behaviour::Succeed)).await;

        let id = h.orchestrator.submit(b"image".to_vec()).await.unwrap();
        let first = wait_terminal(&h.orchestrator, &id).await;

        for _ in 0..5 {
            let again = h.orchestrator.status(&id).await.unwrap();
            assert_eq!(again, first);
        }
    }

    #[tokio::test]
    async fn concurrent_submissions_are_independent() {
        let generator = MockGenerator::new(Behaviour::Succeed);
        let h = harness(generator.clone()).await;

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let orchestrator = Arc::clone(&h.orchestrator);
                tokio::spawn(async move { orchestrator.submit(vec![i as u8; 64]).await })
            })
            .collect();

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap());
        }
        let unique: HashSet<&JobId> = ids.iter().collect();
        assert_eq!(unique.len(), 10);

        for id in &ids {
            let job = wait_terminal(&h.orchestrator, id).await;
            assert_eq!(job.status, JobStatus::Completed);
            assert_eq!(job.result_ref, Some(format!("{id}.glb")));
        }

        assert_eq!(generator.calls.load(Ordering::SeqCst), 10);
        assert_eq!(
            h.orchestrator.stats().await,
            JobStats {
                processing: 0,
                completed: 10,
                failed: 0
            }
        );
        assert_eq!(h.orchestrator.catalog_size().await, 10);
    }

    #[tokio::test]
    async fn stats_count_in_flight_jobs() {
        let gate = Arc::new(Semaphore::new(0));
        let h = harness(MockGenerator::gated(Arc::clone(&gate))).await;

        h.orchestrator.submit(b"a".to_vec()).await.unwrap();
        h.orchestrator.submit(b"b".to_vec()).await.unwrap();

        assert_eq!(h.orchestrator.stats().await.processing, 2);
        assert_eq!(h.orchestrator.in_flight(), 2);

        gate.add_permits(2);
        assert!(h.orchestrator.shutdown(Duration::from_secs(5)).await);
        assert_eq!(h.orchestrator.stats().await.completed, 2);
    }

    #[tokio::test]
    async fn shutdown_refuses_new_jobs() {
        let h = harness(MockGenerator::new(Behaviour::Succeed)).await;

        assert!(h.orchestrator.shutdown(Duration::from_secs(1)).await);
        assert_matches!(
            h.orchestrator.submit(b"late".to_vec()).await,
            Err(CoreError::Unavailable(_))
        );
    }

    #[tokio::test]
    async fn shutdown_reports_stragglers() {
        let gate = Arc::new(Semaphore::new(0));
        let h = harness(MockGenerator::gated(gate)).await;

        h.orchestrator.submit(b"stuck".to_vec()).await.unwrap();
        assert!(!h.orchestrator.shutdown(Duration::from_millis(50)).await);
    }

    #[tokio::test]
    async fn remove_model_keeps_artifact_downloadable() {
        let h = harness(MockGenerator::new(Behaviour::Succeed)).await;

        let id = h.orchestrator.submit(b"image".to_vec()).await.unwrap();
        wait_terminal(&h.orchestrator, &id).await;

        h.orchestrator.remove_model(id.as_str()).await.unwrap();
        assert_matches!(
            h.orchestrator.get_model(id.as_str()).await,
            Err(CoreError::NotFound { entity: "Model", .. })
        );
        assert_eq!(h.orchestrator.fetch(&id).await.unwrap(), MODEL);
        assert_matches!(
            h.orchestrator.remove_model(id.as_str()).await,
            Err(CoreError::NotFound { .. })
        );
    }
}
