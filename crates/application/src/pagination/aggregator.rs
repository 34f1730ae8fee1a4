//! Accumulates the pages of one collection behind a "load more" control.
//!
//! An aggregate is keyed by its collection and page size. Pages are
//! appended in offset order, at most one fetch is outstanding at a time,
//! and a page size change starts a new generation whose state shares
//! nothing with the old one.

use std::sync::{Mutex, MutexGuard, PoisonError};

use shelfscan_domain::{
    ApiErrorDetail, CollectionKind, DomainResult, ImageResult, Page, PageRequest,
    ResultStatusCounts,
};
use tracing::{debug, info, warn};

use super::source::PageSource;

/// What a call to `load_more` did.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// A page was fetched and appended.
    Loaded {
        /// Number of items on the appended page.
        items: usize,
    },
    /// A fetch was already outstanding; nothing was requested.
    InFlight,
    /// Every item is loaded; nothing was requested.
    Exhausted,
    /// The page arrived after the aggregate was reset and was discarded.
    Stale,
    /// The fetch failed; loaded pages are unchanged.
    Failed(ApiErrorDetail),
}

impl LoadOutcome {
    /// Returns true if a page was appended.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

/// Point-in-time view of an aggregate, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSnapshot<T> {
    /// Collection being aggregated.
    pub kind: CollectionKind,
    /// Page size of the current generation.
    pub page_size: u32,
    /// All loaded items, in server order.
    pub items: Vec<T>,
    /// Collection size reported by the latest page.
    pub total: u64,
    /// Whether another page can be loaded.
    pub has_more: bool,
    /// Whether a fetch is outstanding.
    pub loading: bool,
    /// Number of pages loaded.
    pub pages: usize,
    /// Error of the latest failed fetch, cleared by the next success.
    pub last_error: Option<ApiErrorDetail>,
}

struct AggregateState<T> {
    first: PageRequest,
    pages: Vec<Page<T>>,
    generation: u64,
    in_flight: bool,
    last_error: Option<ApiErrorDetail>,
}

impl<T> AggregateState<T> {
    const fn new(first: PageRequest) -> Self {
        Self {
            first,
            pages: Vec::new(),
            generation: 0,
            in_flight: false,
            last_error: None,
        }
    }

    fn total(&self) -> u64 {
        self.pages.last().map_or(0, |page| page.total)
    }

    fn has_more(&self) -> bool {
        self.pages.len() as u64 * u64::from(self.first.limit()) < self.total()
    }

    fn reset(&mut self, first: PageRequest) {
        self.first = first;
        self.pages.clear();
        self.generation += 1;
        self.in_flight = false;
        self.last_error = None;
    }
}

/// Clears the in-flight flag if a fetch is abandoned before it completes.
struct InFlightGuard<'a, T> {
    state: &'a Mutex<AggregateState<T>>,
    generation: u64,
    armed: bool,
}

impl<T> InFlightGuard<'_, T> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.generation == self.generation {
            state.in_flight = false;
        }
    }
}

/// Paged collection with "load more" semantics.
///
/// `items()` is always the ordered concatenation of the pages fetched in
/// the current generation. `total()` is the `total` of the latest page and
/// `has_more()` is derived from it on every call.
pub struct PageAggregator<T, S> {
    kind: CollectionKind,
    source: S,
    state: Mutex<AggregateState<T>>,
}

impl<T, S> PageAggregator<T, S>
where
    T: Clone + Send,
    S: PageSource<T>,
{
    /// Creates an empty aggregate. Nothing is fetched until `load_more`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPageSize` for a size outside `1..=100`.
    pub fn new(kind: CollectionKind, page_size: u32, source: S) -> DomainResult<Self> {
        let first = PageRequest::first(page_size)?;
        Ok(Self {
            kind,
            source,
            state: Mutex::new(AggregateState::new(first)),
        })
    }

    /// Collection being aggregated.
    pub const fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Identity of the current aggregate.
    pub fn key(&self) -> (CollectionKind, u32) {
        (self.kind, self.page_size())
    }

    /// Page size of the current generation.
    pub fn page_size(&self) -> u32 {
        self.lock().first.limit()
    }

    /// All loaded items, in server order.
    pub fn items(&self) -> Vec<T> {
        self.lock()
            .pages
            .iter()
            .flat_map(|page| page.items.iter().cloned())
            .collect()
    }

    /// Collection size reported by the latest page; 0 before the first.
    pub fn total(&self) -> u64 {
        self.lock().total()
    }

    /// Whether another page can be loaded.
    pub fn has_more(&self) -> bool {
        self.lock().has_more()
    }

    /// Whether a fetch is outstanding.
    pub fn is_loading(&self) -> bool {
        self.lock().in_flight
    }

    /// Number of pages loaded.
    pub fn page_count(&self) -> usize {
        self.lock().pages.len()
    }

    /// Error of the latest failed fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<ApiErrorDetail> {
        self.lock().last_error.clone()
    }

    /// Consistent view of the whole aggregate.
    pub fn snapshot(&self) -> AggregateSnapshot<T> {
        let state = self.lock();
        AggregateSnapshot {
            kind: self.kind,
            page_size: state.first.limit(),
            items: state
                .pages
                .iter()
                .flat_map(|page| page.items.iter().cloned())
                .collect(),
            total: state.total(),
            has_more: state.has_more(),
            loading: state.in_flight,
            pages: state.pages.len(),
            last_error: state.last_error.clone(),
        }
    }

    /// Fetches and appends the next page.
    ///
    /// Does nothing while another fetch is outstanding, or once a page is
    /// loaded and `has_more()` is false. A failed fetch leaves the loaded
    /// pages untouched.
    pub async fn load_more(&self) -> LoadOutcome {
        let (request, generation) = {
            let mut state = self.lock();
            if state.in_flight {
                return LoadOutcome::InFlight;
            }
            if !state.pages.is_empty() && !state.has_more() {
                return LoadOutcome::Exhausted;
            }
            state.in_flight = true;
            (state.first.at_page(state.pages.len() as u64), state.generation)
        };
        let guard = InFlightGuard {
            state: &self.state,
            generation,
            armed: true,
        };

        debug!(
            kind = %self.kind,
            offset = request.offset(),
            limit = request.limit(),
            "fetching page"
        );
        let envelope = self.source.fetch_page(request).await;
        guard.disarm();

        let mut state = self.lock();
        if state.generation != generation {
            debug!(kind = %self.kind, offset = request.offset(), "discarding stale page");
            return LoadOutcome::Stale;
        }
        state.in_flight = false;

        match envelope.into_result() {
            Ok(page) => {
                let items = page.items.len();
                state.pages.push(page);
                state.last_error = None;
                info!(
                    kind = %self.kind,
                    offset = request.offset(),
                    items,
                    total = state.total(),
                    "page loaded"
                );
                LoadOutcome::Loaded { items }
            }
            Err(error) => {
                warn!(kind = %self.kind, offset = request.offset(), "page load failed: {error}");
                state.last_error = Some(error.clone());
                LoadOutcome::Failed(error)
            }
        }
    }

    /// Switches to a new page size and loads its first page.
    ///
    /// Pages of the old size are dropped, and a fetch still outstanding for
    /// them is discarded when it completes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPageSize` for a size outside `1..=100`;
    /// the aggregate is left unchanged.
    pub async fn set_page_size(&self, page_size: u32) -> DomainResult<LoadOutcome> {
        let first = PageRequest::first(page_size)?;
        self.lock().reset(first);
        info!(kind = %self.kind, page_size, "page size changed");
        Ok(self.load_more().await)
    }

    /// Drops every loaded page and reloads the first one.
    pub async fn refresh(&self) -> LoadOutcome {
        {
            let mut state = self.lock();
            let first = state.first;
            state.reset(first);
        }
        debug!(kind = %self.kind, "refreshing");
        self.load_more().await
    }

    fn lock(&self) -> MutexGuard<'_, AggregateState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> PageAggregator<ImageResult, S>
where
    S: PageSource<ImageResult>,
{
    /// Status counts over the loaded results.
    pub fn status_counts(&self) -> ResultStatusCounts {
        let state = self.lock();
        ResultStatusCounts::of(state.pages.iter().flat_map(|page| page.items.iter()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::significant_drop_tightening
)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use shelfscan_domain::{ApiEnvelope, IrTask, ResultWindow};
    use tokio::sync::Semaphore;

    use crate::api::ShelfApi;
    use crate::pagination::{catalog_pages, result_pages, task_pages};
    use crate::ports::HttpTransport;
    use crate::test_support::{MockTransport, TASK_ID, page_json, result_json, task_json};

    fn slice_page(data: &[u32], request: PageRequest) -> Page<u32> {
        let start = usize::try_from(request.offset()).unwrap().min(data.len());
        let end = (start + request.limit() as usize).min(data.len());
        Page::new(
            data[start..end].to_vec(),
            data.len() as u64,
            request.limit(),
            request.offset(),
        )
    }

    /// Serves `0..len` and counts calls.
    fn counting_source(len: u32, calls: Arc<AtomicUsize>) -> impl PageSource<u32> {
        let data: Arc<Vec<u32>> = Arc::new((0..len).collect());
        move |request: PageRequest| {
            let data = Arc::clone(&data);
            calls.fetch_add(1, Ordering::SeqCst);
            async move { ApiEnvelope::ok(slice_page(&data, request)) }
        }
    }

    /// Like `counting_source`, but the first call waits for a permit on `gate`.
    fn gated_source(len: u32, calls: Arc<AtomicUsize>, gate: Arc<Semaphore>) -> impl PageSource<u32> {
        let data: Arc<Vec<u32>> = Arc::new((0..len).collect());
        move |request: PageRequest| {
            let data = Arc::clone(&data);
            let gate = Arc::clone(&gate);
            let call = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    gate.acquire().await.unwrap().forget();
                }
                ApiEnvelope::ok(slice_page(&data, request))
            }
        }
    }

    async fn wait_for_calls(calls: &AtomicUsize, n: usize) {
        while calls.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_items_are_pages_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let aggregate =
            PageAggregator::new(CollectionKind::IrTasks, 3, counting_source(7, Arc::clone(&calls)))
                .unwrap();

        assert_eq!(aggregate.load_more().await, LoadOutcome::Loaded { items: 3 });
        assert_eq!(aggregate.load_more().await, LoadOutcome::Loaded { items: 3 });
        assert_eq!(aggregate.load_more().await, LoadOutcome::Loaded { items: 1 });

        assert_eq!(aggregate.items(), (0..7).collect::<Vec<_>>());
        assert_eq!(aggregate.total(), 7);
        assert_eq!(aggregate.page_count(), 3);
        assert!(!aggregate.has_more());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_makes_no_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let aggregate =
            PageAggregator::new(CollectionKind::IrTasks, 3, counting_source(6, Arc::clone(&calls)))
                .unwrap();

        aggregate.load_more().await;
        assert!(aggregate.has_more());
        aggregate.load_more().await;
        assert!(!aggregate.has_more());

        assert_eq!(aggregate.load_more().await, LoadOutcome::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(aggregate.items().len(), 6);
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let aggregate =
            PageAggregator::new(CollectionKind::IrTasks, 10, counting_source(0, Arc::clone(&calls)))
                .unwrap();

        assert_eq!(aggregate.total(), 0);
        assert!(!aggregate.has_more());
        assert_eq!(aggregate.load_more().await, LoadOutcome::Loaded { items: 0 });
        assert_eq!(aggregate.load_more().await, LoadOutcome::Exhausted);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_more_while_in_flight_is_a_no_op() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));
        let aggregate = Arc::new(
            PageAggregator::new(
                CollectionKind::CatalogItems,
                3,
                gated_source(9, Arc::clone(&calls), Arc::clone(&gate)),
            )
            .unwrap(),
        );

        let first = {
            let aggregate = Arc::clone(&aggregate);
            tokio::spawn(async move { aggregate.load_more().await })
        };
        wait_for_calls(&calls, 1).await;
        assert!(aggregate.is_loading());

        assert_eq!(aggregate.load_more().await, LoadOutcome::InFlight);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(aggregate.items().is_empty());

        gate.add_permits(1);
        assert_eq!(first.await.unwrap(), LoadOutcome::Loaded { items: 3 });
        assert!(!aggregate.is_loading());
        assert_eq!(aggregate.items(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_failure_keeps_pages_and_is_remembered() {
        let calls = Arc::new(AtomicUsize::new(0));
        let data: Arc<Vec<u32>> = Arc::new((0..10).collect());
        let source = {
            let calls = Arc::clone(&calls);
            move |request: PageRequest| {
                let data = Arc::clone(&data);
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 1 {
                        ApiEnvelope::failure(ApiErrorDetail::network("connection reset"))
                    } else {
                        ApiEnvelope::ok(slice_page(&data, request))
                    }
                }
            }
        };
        let aggregate = PageAggregator::new(CollectionKind::IrTasks, 4, source).unwrap();

        aggregate.load_more().await;
        let outcome = aggregate.load_more().await;
        assert!(matches!(&outcome, LoadOutcome::Failed(error) if error.is_network()));
        assert_eq!(aggregate.items(), vec![0, 1, 2, 3]);
        assert_eq!(aggregate.last_error().unwrap().message, "connection reset");
        assert!(!aggregate.is_loading());

        assert_eq!(aggregate.load_more().await, LoadOutcome::Loaded { items: 4 });
        assert_eq!(aggregate.items(), (0..8).collect::<Vec<_>>());
        assert!(aggregate.last_error().is_none());
    }

    #[tokio::test]
    async fn test_page_size_change_discards_stale_page() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Semaphore::new(0));
        let aggregate = Arc::new(
            PageAggregator::new(
                CollectionKind::IrTasks,
                3,
                gated_source(9, Arc::clone(&calls), Arc::clone(&gate)),
            )
            .unwrap(),
        );

        let old = {
            let aggregate = Arc::clone(&aggregate);
            tokio::spawn(async move { aggregate.load_more().await })
        };
        wait_for_calls(&calls, 1).await;

        let outcome = aggregate.set_page_size(2).await.unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { items: 2 });
        assert_eq!(aggregate.key(), (CollectionKind::IrTasks, 2));

        gate.add_permits(1);
        assert_eq!(old.await.unwrap(), LoadOutcome::Stale);
        assert_eq!(aggregate.items(), vec![0, 1]);
        assert_eq!(aggregate.page_count(), 1);
        assert!(aggregate.has_more());
    }

    #[tokio::test]
    async fn test_invalid_page_size_leaves_aggregate_alone() {
        let calls = Arc::new(AtomicUsize::new(0));
        let aggregate =
            PageAggregator::new(CollectionKind::IrTasks, 3, counting_source(5, Arc::clone(&calls)))
                .unwrap();
        aggregate.load_more().await;

        assert!(aggregate.set_page_size(0).await.is_err());
        assert!(aggregate.set_page_size(101).await.is_err());
        assert_eq!(aggregate.page_size(), 3);
        assert_eq!(aggregate.items(), vec![0, 1, 2]);
        assert!(PageAggregator::new(CollectionKind::IrTasks, 0, counting_source(1, calls)).is_err());
    }

    #[tokio::test]
    async fn test_refresh_reloads_first_page() {
        let calls = Arc::new(AtomicUsize::new(0));
        let aggregate =
            PageAggregator::new(CollectionKind::IrTasks, 2, counting_source(5, Arc::clone(&calls)))
                .unwrap();
        aggregate.load_more().await;
        aggregate.load_more().await;
        assert_eq!(aggregate.items().len(), 4);

        assert_eq!(aggregate.refresh().await, LoadOutcome::Loaded { items: 2 });
        assert_eq!(aggregate.items(), vec![0, 1]);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_snapshot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let aggregate =
            PageAggregator::new(CollectionKind::IrTasks, 2, counting_source(3, calls)).unwrap();
        aggregate.load_more().await;

        assert_eq!(
            aggregate.snapshot(),
            AggregateSnapshot {
                kind: CollectionKind::IrTasks,
                page_size: 2,
                items: vec![0, 1],
                total: 3,
                has_more: true,
                loading: false,
                pages: 1,
                last_error: None,
            }
        );
    }

    #[tokio::test]
    async fn test_catalog_aggregate_requests_next_offsets() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(200, "OK", page_json(Vec::new(), 120, 50, 0));
        let api = ShelfApi::new(Arc::clone(&transport) as Arc<dyn HttpTransport>);
        let aggregate = PageAggregator::new(CollectionKind::CatalogItems, 50, catalog_pages(api)).unwrap();

        aggregate.load_more().await;
        assert_eq!(transport.last_request().unwrap().query_value("offset"), Some("0"));
        aggregate.load_more().await;
        assert_eq!(transport.last_request().unwrap().query_value("offset"), Some("50"));
        assert_eq!(transport.last_request().unwrap().query_value("limit"), Some("50"));
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_result_status_counts() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(
            200,
            "OK",
            page_json(
                vec![
                    result_json("IN_PROGRESS"),
                    result_json("COMPLETED"),
                    result_json("COMPLETED"),
                    result_json("FAILED"),
                ],
                4,
                50,
                0,
            ),
        );
        let api = ShelfApi::new(Arc::clone(&transport) as Arc<dyn HttpTransport>);
        let aggregate = PageAggregator::new(
            CollectionKind::TaskResults(TASK_ID),
            50,
            result_pages(api, TASK_ID, ResultWindow::unbounded()),
        )
        .unwrap();

        aggregate.load_more().await;
        let counts = aggregate.status_counts();
        assert_eq!(counts.to_string(), "1 processing • 2 completed • 1 failed");
        assert!(counts.has_pending());
    }

    fn task_names<S: PageSource<IrTask>>(
        aggregate: &PageAggregator<IrTask, S>,
    ) -> Vec<String> {
        aggregate.items().into_iter().map(|task| task.name).collect()
    }

    #[tokio::test]
    async fn test_tasks_load_two_pages_then_a_short_last_page() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(200, "OK", page_json(vec![task_json("A"), task_json("B")], 5, 2, 0));
        transport.respond(200, "OK", page_json(vec![task_json("C"), task_json("D")], 5, 2, 2));
        transport.respond(200, "OK", page_json(vec![task_json("E")], 5, 2, 4));
        let api = ShelfApi::new(Arc::clone(&transport) as Arc<dyn HttpTransport>);
        let aggregate = PageAggregator::new(CollectionKind::IrTasks, 2, task_pages(api)).unwrap();

        aggregate.load_more().await;
        aggregate.load_more().await;
        assert_eq!(task_names(&aggregate), vec!["A", "B", "C", "D"]);
        assert!(aggregate.has_more());

        assert_eq!(aggregate.load_more().await, LoadOutcome::Loaded { items: 1 });
        assert_eq!(task_names(&aggregate), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(aggregate.total(), 5);
        assert!(!aggregate.has_more());

        assert_eq!(aggregate.load_more().await, LoadOutcome::Exhausted);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_invalid_page_leaves_aggregate_unchanged() {
        let transport = Arc::new(MockTransport::new());
        transport.respond(200, "OK", page_json(vec![task_json("A"), task_json("B")], 5, 2, 0));
        transport.respond(200, "OK", serde_json::json!({}));
        let api = ShelfApi::new(Arc::clone(&transport) as Arc<dyn HttpTransport>);
        let aggregate = PageAggregator::new(CollectionKind::IrTasks, 2, task_pages(api)).unwrap();

        aggregate.load_more().await;
        let outcome = aggregate.load_more().await;

        assert!(matches!(&outcome, LoadOutcome::Failed(error) if error.is_validation()));
        assert_eq!(task_names(&aggregate), vec!["A", "B"]);
        assert_eq!(aggregate.total(), 5);
        assert_eq!(aggregate.page_count(), 1);
        assert!(aggregate.last_error().unwrap().is_validation());
        assert!(!aggregate.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_fetch_clears_in_flight() {
        let calls = Arc::new(AtomicUsize::new(0));
        let data: Arc<Vec<u32>> = Arc::new((0..4).collect());
        let source = {
            let calls = Arc::clone(&calls);
            move |request: PageRequest| {
                let data = Arc::clone(&data);
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        std::future::pending::<()>().await;
                    }
                    ApiEnvelope::ok(slice_page(&data, request))
                }
            }
        };
        let aggregate = PageAggregator::new(CollectionKind::IrTasks, 2, source).unwrap();

        let abandoned =
            tokio::time::timeout(std::time::Duration::from_millis(50), aggregate.load_more()).await;
        assert!(abandoned.is_err());
        assert!(!aggregate.is_loading());
        assert!(aggregate.items().is_empty());

        assert_eq!(aggregate.load_more().await, LoadOutcome::Loaded { items: 2 });
        assert_eq!(aggregate.items(), vec![0, 1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
