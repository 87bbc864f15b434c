use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::domain::{ApplicantId, ContextId};
use super::tracker::EngagementTracker;
use crate::workflows::store::{ContextQuery, OutcomeStore, StoreError};

/// Input of an asynchronous status refresh. Replaying a task is harmless:
/// the worker recomputes from the store and writes only on change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshStatusesTask {
    pub applicant_ids: Vec<ApplicantId>,
    pub context_ids: Vec<ContextId>,
}

impl RefreshStatusesTask {
    pub fn for_contexts(context_ids: Vec<ContextId>) -> Self {
        Self {
            applicant_ids: Vec::new(),
            context_ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.applicant_ids.is_empty() && self.context_ids.is_empty()
    }
}

/// Outbound hook enqueuing refresh work after appointment or invitation writes.
pub trait RefreshQueue: Send + Sync {
    fn enqueue(&self, task: RefreshStatusesTask) -> Result<(), QueueError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("status refresh queue is closed")]
    Closed,
}

/// Queue backed by an unbounded tokio channel drained by [`StatusRefreshWorker`].
#[derive(Debug, Clone)]
pub struct ChannelRefreshQueue {
    sender: mpsc::UnboundedSender<RefreshStatusesTask>,
}

impl ChannelRefreshQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RefreshStatusesTask>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl RefreshQueue for ChannelRefreshQueue {
    fn enqueue(&self, task: RefreshStatusesTask) -> Result<(), QueueError> {
        self.sender.send(task).map_err(|_| QueueError::Closed)
    }
}

/// Summary of one processed task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: usize,
}

pub struct StatusRefreshWorker<S> {
    store: Arc<S>,
    tracker: EngagementTracker<S>,
}

impl<S> StatusRefreshWorker<S>
where
    S: OutcomeStore,
{
    pub fn new(store: Arc<S>) -> Self {
        let tracker = EngagementTracker::new(store.clone());
        Self { store, tracker }
    }

    /// Refresh every context named by the task, directly or through its applicant.
    pub fn process(
        &self,
        task: &RefreshStatusesTask,
        now: DateTime<Utc>,
    ) -> Result<RefreshSummary, StoreError> {
        let mut context_ids: BTreeSet<ContextId> = task.context_ids.iter().cloned().collect();
        for applicant_id in &task.applicant_ids {
            let query = ContextQuery {
                applicant_id: Some(applicant_id.clone()),
                ..ContextQuery::default()
            };
            context_ids.extend(self.store.contexts(&query)?.into_iter().map(|ctx| ctx.id));
        }

        let mut summary = RefreshSummary::default();
        for context_id in &context_ids {
            match self.tracker.refresh(context_id, now) {
                Ok(_) => summary.refreshed += 1,
                Err(err) => {
                    warn!(%context_id, error = %err, "status refresh failed");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Drain the queue until every sender is dropped.
    pub async fn run(self, mut receiver: mpsc::UnboundedReceiver<RefreshStatusesTask>) {
        while let Some(task) = receiver.recv().await {
            match self.process(&task, Utc::now()) {
                Ok(summary) => info!(
                    refreshed = summary.refreshed,
                    failed = summary.failed,
                    "status refresh task processed"
                ),
                Err(err) => warn!(error = %err, "status refresh task aborted"),
            }
        }
    }
}
