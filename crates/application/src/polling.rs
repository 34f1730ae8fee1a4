//! Background refresh of results that are still processing.
//!
//! A poll fetches immediately, then again every interval for as long as the
//! latest payload has something in progress. Each envelope replaces the
//! previous one in a `watch` channel owned by the returned `PollHandle`.

use std::future::Future;
use std::time::Duration;

use shelfscan_domain::{ApiEnvelope, ImageResult, Page, PageRequest, ResultWindow};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::ShelfApi;
use crate::error::{ApplicationError, ApplicationResult};

/// Refresh interval for a task's result list.
pub const RESULT_LIST_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Refresh interval for a single result.
pub const SINGLE_RESULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Payloads that may still change on the server.
pub trait Pending {
    /// Returns true while something in the payload is still processing.
    fn is_pending(&self) -> bool;
}

impl Pending for ImageResult {
    fn is_pending(&self) -> bool {
        self.is_in_progress()
    }
}

impl<T: Pending> Pending for Page<T> {
    fn is_pending(&self) -> bool {
        self.items.iter().any(Pending::is_pending)
    }
}

/// Why a poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// Nothing is in progress any more.
    Settled,
    /// A fetch failed.
    Failed,
    /// Every receiver was dropped.
    Detached,
}

/// Owner of one running poll.
///
/// Dropping the handle stops the poll.
#[derive(Debug)]
pub struct PollHandle<T> {
    updates: watch::Receiver<Option<ApiEnvelope<T>>>,
    task: JoinHandle<PollExit>,
}

impl<T: Clone> PollHandle<T> {
    /// The latest envelope, or `None` before the first fetch completes.
    pub fn latest(&self) -> Option<ApiEnvelope<T>> {
        self.updates.borrow().clone()
    }

    /// Waits for the next envelope. Returns `None` once the poll has ended
    /// and every envelope was seen.
    pub async fn changed(&mut self) -> Option<ApiEnvelope<T>> {
        self.updates.changed().await.ok()?;
        self.updates.borrow_and_update().clone()
    }

    /// Another receiver of the same updates.
    pub fn subscribe(&self) -> watch::Receiver<Option<ApiEnvelope<T>>> {
        self.updates.clone()
    }
}

impl<T> PollHandle<T> {
    /// Returns true once the poll has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the poll. A fetch in progress is abandoned.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Waits for the poll to end. Call at most once.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::Cancelled` if the poll was cancelled and
    /// `ApplicationError::Internal` if it panicked.
    pub async fn finished(&mut self) -> ApplicationResult<PollExit> {
        match (&mut self.task).await {
            Ok(exit) => Ok(exit),
            Err(e) if e.is_cancelled() => Err(ApplicationError::Cancelled),
            Err(e) => Err(ApplicationError::Internal(e.to_string())),
        }
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Polls `fetch` every `interval` until its payload is no longer pending
/// or a fetch fails.
///
/// The first fetch is issued immediately. Must be called inside a Tokio
/// runtime.
pub fn spawn_poll<T, F, Fut>(interval: Duration, fetch: F) -> PollHandle<T>
where
    T: Pending + Send + Sync + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ApiEnvelope<T>> + Send + 'static,
{
    let (sender, updates) = watch::channel(None);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut polls: u32 = 0;
        loop {
            ticker.tick().await;
            let envelope = fetch().await;
            polls += 1;

            let exit = match envelope.data() {
                Some(data) if data.is_pending() => None,
                Some(_) => Some(PollExit::Settled),
                None => Some(PollExit::Failed),
            };
            if sender.send(Some(envelope)).is_err() {
                debug!(polls, "no receivers left, polling stopped");
                return PollExit::Detached;
            }
            if let Some(exit) = exit {
                info!(polls, ?exit, "polling stopped");
                return exit;
            }
            debug!(polls, "results still in progress");
        }
    });
    PollHandle { updates, task }
}

/// Starts polls for task results.
#[derive(Debug, Clone)]
pub struct ResultPoller {
    api: ShelfApi,
    list_interval: Duration,
    single_interval: Duration,
}

impl ResultPoller {
    /// Poller with the default intervals.
    #[must_use]
    pub const fn new(api: ShelfApi) -> Self {
        Self {
            api,
            list_interval: RESULT_LIST_POLL_INTERVAL,
            single_interval: SINGLE_RESULT_POLL_INTERVAL,
        }
    }

    /// Overrides both intervals.
    #[must_use]
    pub fn with_intervals(mut self, list: Duration, single: Duration) -> Self {
        self.list_interval = list;
        self.single_interval = single;
        self
    }

    /// Polls one page of a task's results while any of them is in progress.
    pub fn watch_results(
        &self,
        task: Uuid,
        page: PageRequest,
        window: ResultWindow,
    ) -> PollHandle<Page<ImageResult>> {
        info!(%task, interval_ms = self.list_interval.as_millis(), "polling results");
        let api = self.api.clone();
        spawn_poll(self.list_interval, move || {
            let api = api.clone();
            async move { api.fetch_task_results(task, page, window).await }
        })
    }

    /// Polls a single result while it is in progress.
    pub fn watch_result(&self, task: Uuid, result: Uuid) -> PollHandle<ImageResult> {
        info!(%task, %result, interval_ms = self.single_interval.as_millis(), "polling result");
        let api = self.api.clone();
        spawn_poll(self.single_interval, move || {
            let api = api.clone();
            async move { api.fetch_single_result(task, result).await }
        })
    }
}
