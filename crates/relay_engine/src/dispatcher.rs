//! Turns decoded jobs into page submissions and tracker tasks.

use std::sync::Arc;

use engine_logging::{engine_error, engine_info};
use relay_core::{PromptJob, RequestId, Status};
use tokio::sync::mpsc;

use crate::emitter::StatusSink;
use crate::tracker::TrackerContext;

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("input element unavailable: {0}")]
    InputUnavailable(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Places a job's text into the page's input and submits it.
#[async_trait::async_trait]
pub trait SubmissionDriver: Send + Sync {
    async fn submit(&self, id: &RequestId, text: &str) -> Result<(), SubmitError>;
}

pub struct JobDispatcher {
    driver: Arc<dyn SubmissionDriver>,
    sink: Arc<dyn StatusSink>,
    trackers: TrackerContext,
}

impl JobDispatcher {
    pub fn new(
        driver: Arc<dyn SubmissionDriver>,
        sink: Arc<dyn StatusSink>,
        trackers: TrackerContext,
    ) -> Self {
        Self {
            driver,
            sink,
            trackers,
        }
    }

    /// Handles jobs in arrival order until the sending side closes.
    pub async fn run(self, mut jobs: mpsc::UnboundedReceiver<PromptJob>) {
        while let Some(job) = jobs.recv().await {
            self.handle(job).await;
        }
        engine_info!("Job channel closed; dispatcher stopping");
    }

    pub async fn handle(&self, mut job: PromptJob) {
        let id = job.id().clone();
        self.sink.emit(&id, Status::PromptReceived);

        if let Err(err) = self.driver.submit(&id, job.text()).await {
            engine_error!("[{}] submission failed: {}; dropping job", id, err);
            return;
        }

        job.mark_input_complete();
        self.sink.emit(&id, Status::InputComplete);
        self.trackers.track(job);
    }
}
