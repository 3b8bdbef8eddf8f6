use crate::application::events::{AppEvent, EventBus};
use crate::infrastructure::backend_client::{ContentApi, GenerationRequest, JobStatus};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::local_store::{LocalStore, keys};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Cancellation signal owned by the caller; dropping it also stops the poll,
/// so component teardown ends the loop deterministically.
#[derive(Debug)]
pub struct PollHandle {
    cancel_tx: watch::Sender<bool>,
}

#[derive(Debug, Clone)]
pub struct PollToken {
    cancel_rx: watch::Receiver<bool>,
}

impl PollHandle {
    pub fn new() -> (Self, PollToken) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        (Self { cancel_tx }, PollToken { cancel_rx })
    }

    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }
}

/// Submits AI-generation jobs and polls their status on a fixed interval
/// until a terminal state. Cooperative polling, no retries, no backoff.
pub struct GenerationService<C, S>
where
    C: ContentApi,
    S: LocalStore,
{
    content_api: Arc<C>,
    store: Arc<S>,
    events: EventBus,
    poll_interval: Duration,
}

impl<C, S> GenerationService<C, S>
where
    C: ContentApi,
    S: LocalStore,
{
    pub fn new(content_api: Arc<C>, store: Arc<S>, events: EventBus) -> Self {
        Self {
            content_api,
            store,
            events,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Submits the job and records its id so the dashboard can list past
    /// generations across restarts.
    pub async fn submit(
        &self,
        access_token: &str,
        request: &GenerationRequest,
    ) -> Result<String, InfraError> {
        let job_id = self.content_api.submit_generation(access_token, request).await?;
        self.record_job(&job_id)?;
        Ok(job_id)
    }

    pub fn recorded_jobs(&self) -> Result<Vec<String>, InfraError> {
        let Some(payload) = self.store.get(keys::AI_JOBS)? else {
            return Ok(Vec::new());
        };
        let jobs = serde_json::from_str::<Vec<String>>(&payload)?;
        Ok(jobs)
    }

    /// Re-queries status until `completed`/`failed`. Returns `None` when the
    /// poll was cancelled before reaching a terminal state.
    pub async fn poll_until_terminal(
        &self,
        access_token: &str,
        job_id: &str,
        token: &mut PollToken,
    ) -> Result<Option<JobStatus>, InfraError> {
        loop {
            let status = self.content_api.job_status(access_token, job_id).await?;
            if status.state.is_terminal() {
                self.events.publish(AppEvent::JobFinished {
                    job_id: job_id.to_string(),
                });
                return Ok(Some(status));
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = token.cancel_rx.changed() => {
                    match changed {
                        Ok(()) if *token.cancel_rx.borrow() => return Ok(None),
                        Ok(()) => {}
                        // Handle dropped: the owning component is gone.
                        Err(_) => return Ok(None),
                    }
                }
            }
        }
    }

    fn record_job(&self, job_id: &str) -> Result<(), InfraError> {
        let mut jobs = self.recorded_jobs().unwrap_or_default();
        if !jobs.iter().any(|candidate| candidate == job_id) {
            jobs.push(job_id.to_string());
        }
        let payload = serde_json::to_string(&jobs)?;
        self.store.put(keys::AI_JOBS, &payload)
    }
}
