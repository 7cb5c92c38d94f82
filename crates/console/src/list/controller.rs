//! Fetch coordination for one mounted resource list.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::debounce::Debouncer;
use super::query::{ListQuery, ListRequest};
use super::range::ShowingRange;
use crate::api::{ApiError, ConsoleApi, ListPage};
use crate::components::DataTableConfig;
use crate::config::ConsoleConfig;
use crate::error::ConsoleError;
use crate::family::Family;
use crate::mutation::InvalidationBus;

/// Rows and total count of the last applied response, with the page they
/// were fetched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResult<R> {
    pub items: Vec<R>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

/// Observable state of a list page.
///
/// `result` survives refetches and fetch errors, so a page or filter change
/// never flashes the table to empty.
#[derive(Debug, Clone)]
pub struct ListState<R> {
    /// Active query. Only responses to the latest fetch of it are applied.
    pub query: ListQuery,
    /// Last successfully fetched page.
    pub result: Option<ListResult<R>>,
    /// A fetch is in flight.
    pub fetching: bool,
    /// Message of the last failed fetch, cleared by the next success.
    pub error: Option<String>,
    latest_seq: u64,
}

impl<R> ListState<R> {
    fn new(query: ListQuery) -> Self {
        Self {
            query,
            result: None,
            fetching: false,
            error: None,
            latest_seq: 0,
        }
    }

    /// Range label for the rows in `result`, once a page has loaded.
    ///
    /// Follows the page the rows came from, not the active query, so it
    /// stays true while a newer page is loading or after it failed.
    #[must_use]
    pub fn showing_range(&self) -> Option<ShowingRange> {
        self.result
            .as_ref()
            .map(|result| ShowingRange::new(result.page, result.per_page, result.total))
    }
}

/// Drives the fetches of one resource list page.
///
/// Created by [`mount`](Self::mount) and torn down by
/// [`unmount`](Self::unmount) or by dropping the last clone. Every query
/// change replaces the whole [`ListQuery`] and issues a fetch tagged with a
/// sequence number; a response is applied only if no newer fetch was issued
/// in the meantime.
pub struct ListController<F: Family, A: ConsoleApi> {
    inner: Arc<Inner<F, A>>,
}

impl<F: Family, A: ConsoleApi> Clone for ListController<F, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<F: Family, A: ConsoleApi> {
    api: Arc<A>,
    table: DataTableConfig,
    state: watch::Sender<ListState<F::Record>>,
    debouncer: Debouncer,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl<F: Family, A: ConsoleApi> ListController<F, A> {
    /// Mount the list: fetch the first page and start listening for
    /// invalidations of the family.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn mount(api: Arc<A>, bus: &InvalidationBus, config: &ConsoleConfig) -> Self {
        let query = ListQuery::new(config.per_page);
        let inner = Arc::new(Inner {
            api,
            table: F::table(),
            state: watch::Sender::new(ListState::new(query)),
            debouncer: Debouncer::new(config.search_debounce),
            listener: Mutex::new(None),
        });

        let listener = spawn_invalidation_listener(Arc::downgrade(&inner), bus);
        *inner.lock_listener() = Some(listener);

        info!(family = %F::FAMILY, per_page = config.per_page, "List mounted");
        Inner::issue(&inner, ListQuery::clone, true);
        Self { inner }
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> ListState<F::Record> {
        self.inner.state.borrow().clone()
    }

    /// Active query.
    #[must_use]
    pub fn query(&self) -> ListQuery {
        self.inner.state.borrow().query.clone()
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ListState<F::Record>> {
        self.inner.state.subscribe()
    }

    /// Table definition of the family.
    #[must_use]
    pub fn table(&self) -> &DataTableConfig {
        &self.inner.table
    }

    /// Wait until no fetch is in flight and return the state.
    pub async fn settled(&self) -> ListState<F::Record> {
        let mut changes = self.inner.state.subscribe();
        match changes.wait_for(|state| !state.fetching).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Explicit page change. Keeps search and filters.
    pub fn set_page(&self, page: u32) {
        Inner::issue(&self.inner, |query| query.with_page(page), false);
    }

    /// Apply or clear a discrete filter immediately; resets to page 1.
    ///
    /// # Errors
    ///
    /// Returns `UnknownFilter` when the family declares no such filter and
    /// `InvalidFilterValue` when `value` is not one of its options. An empty
    /// value clears the filter.
    pub fn set_filter(&self, name: &str, value: Option<&str>) -> Result<(), ConsoleError> {
        let filter =
            self.inner
                .table
                .find_filter(name)
                .ok_or_else(|| ConsoleError::UnknownFilter {
                    family: F::FAMILY,
                    name: name.to_string(),
                })?;

        let value = value.filter(|v| !v.is_empty());
        if let Some(value) = value
            && !filter.accepts(value)
        {
            return Err(ConsoleError::InvalidFilterValue {
                name: name.to_string(),
                value: value.to_string(),
            });
        }

        let value = value.map(str::to_string);
        Inner::issue(
            &self.inner,
            |query| query.with_filter(name, value),
            false,
        );
        Ok(())
    }

    /// Feed one keystroke's worth of search text.
    ///
    /// The search term is applied, and page reset to 1, only once the input
    /// has been quiet for the debounce delay.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn search_input(&self, text: impl Into<String>) {
        let text = text.into();
        let weak = Arc::downgrade(&self.inner);
        self.inner.debouncer.schedule(async move {
            if let Some(inner) = weak.upgrade() {
                Inner::apply_search(&inner, text);
            }
        });
    }

    /// Apply a search term at once, bypassing the debounce. Any pending
    /// debounced input is dropped.
    pub fn apply_search(&self, text: impl Into<String>) {
        self.inner.debouncer.cancel();
        Inner::apply_search(&self.inner, text.into());
    }

    /// Refetch with the active query.
    pub fn refetch(&self) {
        Inner::issue(&self.inner, ListQuery::clone, true);
    }

    /// Tear down: drop any pending search update and stop listening for
    /// invalidations. In-flight fetches finish but change nothing visible to
    /// a caller that no longer renders the list.
    pub fn unmount(&self) {
        self.inner.debouncer.cancel();
        if let Some(listener) = self.inner.lock_listener().take() {
            listener.abort();
        }
        debug!(family = %F::FAMILY, "List unmounted");
    }
}

impl<F: Family, A: ConsoleApi> Inner<F, A> {
    /// Replace the query with `change(query)` and fetch it.
    ///
    /// Without `force`, a change that serializes to the same request as the
    /// active query is ignored.
    fn issue(inner: &Arc<Self>, change: impl FnOnce(&ListQuery) -> ListQuery, force: bool) {
        let mut issued = None;
        inner.state.send_if_modified(|state| {
            let next = change(&state.query);
            if !force && next.to_request() == state.query.to_request() {
                return false;
            }
            state.latest_seq += 1;
            state.query = next;
            state.fetching = true;
            issued = Some((state.latest_seq, state.query.to_request()));
            true
        });

        let Some((seq, request)) = issued else {
            return;
        };
        debug!(family = %F::FAMILY, seq, query = %request, "Fetching list");

        let api = Arc::clone(&inner.api);
        let weak = Arc::downgrade(inner);
        tokio::spawn(async move {
            let outcome = F::list(api.as_ref(), &request).await;
            if let Some(inner) = weak.upgrade() {
                inner.complete(seq, &request, outcome);
            }
        });
    }

    fn apply_search(inner: &Arc<Self>, text: String) {
        let term = Some(text).filter(|t| !t.is_empty());
        Self::issue(inner, |query| query.with_search(term), false);
    }

    fn complete(
        &self,
        seq: u64,
        request: &ListRequest,
        outcome: Result<ListPage<F::Record>, ApiError>,
    ) {
        self.state.send_if_modified(|state| {
            if seq != state.latest_seq {
                debug!(
                    family = %F::FAMILY,
                    seq,
                    latest = state.latest_seq,
                    query = %request,
                    "Dropped stale list response"
                );
                return false;
            }

            state.fetching = false;
            match outcome {
                Ok(page) => {
                    debug!(family = %F::FAMILY, rows = page.data.len(), total = page.total, "List fetched");
                    state.result = Some(ListResult {
                        items: page.data,
                        total: page.total,
                        page: request.page(),
                        per_page: request.per_page(),
                    });
                    state.error = None;
                }
                Err(err) => {
                    warn!(family = %F::FAMILY, query = %request, error = %err, "List fetch failed");
                    state.error = Some(err.to_string());
                }
            }
            true
        });
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<F: Family, A: ConsoleApi> Drop for Inner<F, A> {
    fn drop(&mut self) {
        if let Some(listener) = self.lock_listener().take() {
            listener.abort();
        }
    }
}

fn spawn_invalidation_listener<F: Family, A: ConsoleApi>(
    inner: Weak<Inner<F, A>>,
    bus: &InvalidationBus,
) -> JoinHandle<()> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(family) if family == F::FAMILY => {}
                Ok(_) => continue,
                // Missed events may include ours.
                Err(RecvError::Lagged(skipped)) => {
                    debug!(family = %F::FAMILY, skipped, "Invalidation listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
            let Some(inner) = inner.upgrade() else {
                break;
            };
            debug!(family = %F::FAMILY, "List invalidated, refetching");
            Inner::issue(&inner, ListQuery::clone, true);
        }
    })
}
