use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    batch::{unique_inputs, BatchExport, BatchJob, BatchProgress, BatchRequest, BatchStatus},
    search::SourceKind,
};

use super::{
    batch_export::BatchExporter,
    lead_source::{LeadSource, SourceRegistry},
};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BatchError {
    #[error("A batch needs at least one service and one location")]
    EmptyInput,
    #[error("maxResults must be greater than zero")]
    ZeroMaxResults,
    #[error("No lead source configured for '{0}'")]
    SourceUnavailable(SourceKind),
    #[error("Batch {0} not found")]
    NotFound(Uuid),
    #[error("Batch {0} is still running")]
    NotFinished(Uuid),
}

/// Uniform random delay between consecutive searches of a batch.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    min_ms: u64,
    max_ms: u64,
}

impl Pacing {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Pacing {
            min_ms: min_ms.min(max_ms),
            max_ms: min_ms.max(max_ms),
        }
    }

    pub fn none() -> Self {
        Pacing::new(0, 0)
    }

    pub fn next_delay(&self) -> Duration {
        let ms = rand::thread_rng().gen_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::new(1_000, 5_000)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusReport {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub progress: BatchProgress,
    pub total_businesses: usize,
    pub total_contacts: usize,
}

pub const DEFAULT_RETAINED_BATCHES: usize = 100;

#[derive(Clone)]
pub struct BatchOrchestrator {
    sources: SourceRegistry,
    jobs: Arc<RwLock<HashMap<Uuid, BatchJob>>>,
    exporter: Arc<BatchExporter>,
    pacing: Pacing,
    retained_batches: usize,
}

impl BatchOrchestrator {
    pub fn new(sources: SourceRegistry, exporter: BatchExporter, pacing: Pacing) -> Self {
        BatchOrchestrator {
            sources,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            exporter: Arc::new(exporter),
            pacing,
            retained_batches: DEFAULT_RETAINED_BATCHES,
        }
    }

    /// Caps how many finished batches stay in memory. Older ones are evicted once a newer
    /// batch finishes; their exports remain on disk.
    pub fn with_retention(mut self, retained_batches: usize) -> Self {
        self.retained_batches = retained_batches.max(1);
        self
    }

    /// Registers the job and runs it in the background. The returned job is in `started`
    /// status.
    pub async fn run_batch(&self, request: BatchRequest) -> Result<BatchJob, BatchError> {
        let services = unique_inputs(request.services);
        let locations = unique_inputs(request.locations);
        if services.is_empty() || locations.is_empty() {
            return Err(BatchError::EmptyInput);
        }
        if request.max_results == Some(0) {
            return Err(BatchError::ZeroMaxResults);
        }

        let source = self
            .sources
            .get(request.options.source)
            .ok_or(BatchError::SourceUnavailable(request.options.source))?;

        let job = BatchJob::new(
            services,
            locations,
            request.max_results,
            request.options,
            |batch_id| self.exporter.output_ref(batch_id),
        );
        let batch_id = job.batch_id;
        self.jobs.write().await.insert(batch_id, job.clone());

        log::info!(
            "Batch {} accepted: {} searches via {}",
            batch_id,
            job.total_searches,
            request.options.source
        );

        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.process(batch_id, source).await });

        Ok(job)
    }

    async fn process(self, batch_id: Uuid, source: Arc<dyn LeadSource>) {
        let pairs = {
            let mut jobs = self.jobs.write().await;
            let Some(job) = jobs.get_mut(&batch_id) else {
                log::error!("Batch {} vanished before processing", batch_id);
                return;
            };
            job.status = BatchStatus::Processing;
            job.search_params()
        };
        let total = pairs.len();

        for (i, params) in pairs.into_iter().enumerate() {
            let pair = format!("'{}' in '{}'", params.query, params.location);
            log::info!("Batch {} search {}/{}: {}", batch_id, i + 1, total, pair);

            // Own task so a panicking search is contained
            let source = source.clone();
            let outcome = tokio::spawn(async move { source.search(params).await }).await;

            {
                let mut jobs = self.jobs.write().await;
                if let Some(job) = jobs.get_mut(&batch_id) {
                    match outcome {
                        Ok(Ok(result)) => {
                            if result.has_errors() {
                                log::warn!(
                                    "Batch {} search {} failed: {}",
                                    batch_id,
                                    pair,
                                    result.errors().join("; ")
                                );
                            }
                            job.record_result(result);
                        }
                        Ok(Err(e)) => {
                            log::error!("Batch {} search {} errored: {}", batch_id, pair, e);
                            job.record_failure();
                        }
                        Err(e) => {
                            log::error!("Batch {} search {} panicked: {:?}", batch_id, pair, e);
                            job.record_failure();
                        }
                    }
                }
            }

            if i + 1 < total {
                let delay = self.pacing.next_delay();
                log::debug!("Batch {} pacing for {:?}", batch_id, delay);
                tokio::time::sleep(delay).await;
            }
        }

        let Some(mut finished) = self.jobs.read().await.get(&batch_id).cloned() else {
            return;
        };
        finished.finish();

        if let Err(e) = self.exporter.write(&finished.export()).await {
            log::error!("Batch {} export failed: {:?}", batch_id, e);
        }

        log::info!(
            "Batch {} {:?}: {} businesses, {} contacts, {}/{} searches failed",
            batch_id,
            finished.status,
            finished.total_businesses,
            finished.total_contacts,
            finished.failed_searches,
            finished.total_searches
        );
        let mut jobs = self.jobs.write().await;
        jobs.insert(batch_id, finished);
        evict_finished(&mut jobs, self.retained_batches);
    }

    pub async fn batch_status(&self, batch_id: Uuid) -> Result<BatchStatusReport, BatchError> {
        let jobs = self.jobs.read().await;
        let job = jobs.get(&batch_id).ok_or(BatchError::NotFound(batch_id))?;

        Ok(BatchStatusReport {
            batch_id,
            status: job.status,
            progress: job.progress(),
            total_businesses: job.total_businesses,
            total_contacts: job.total_contacts,
        })
    }

    pub async fn get_job(&self, batch_id: Uuid) -> Option<BatchJob> {
        self.jobs.read().await.get(&batch_id).cloned()
    }

    pub async fn export(&self, batch_id: Uuid) -> Result<BatchExport, BatchError> {
        let jobs = self.jobs.read().await;
        let job = jobs.get(&batch_id).ok_or(BatchError::NotFound(batch_id))?;

        match job.status.is_terminal() {
            true => Ok(job.export()),
            false => Err(BatchError::NotFinished(batch_id)),
        }
    }
}

// Oldest finished jobs go first. Running jobs are never evicted.
fn evict_finished(jobs: &mut HashMap<Uuid, BatchJob>, retained: usize) {
    let mut finished: Vec<(DateTime<Utc>, Uuid)> = jobs
        .values()
        .filter_map(|job| job.finished_at.map(|at| (at, job.batch_id)))
        .collect();
    if finished.len() <= retained {
        return;
    }

    finished.sort();
    for (_, batch_id) in &finished[..finished.len() - retained] {
        jobs.remove(batch_id);
        log::debug!("Evicted finished batch {} from memory", batch_id);
    }
}
