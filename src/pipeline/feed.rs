//! Infinite-scroll pagination over [`ListingService::search`].
//!
//! The feed accumulates pages under a fixed filter set. Changing the
//! filters resets the feed and invalidates any fetch still in flight, so
//! a slow response for the old filters can never splice into the new
//! result list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::error::Result;
use crate::pipeline::filter::FilterSpec;
use crate::pipeline::service::ListingService;
use crate::models::Property;

const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
struct FeedState {
    filters: FilterSpec,
    /// Bumped on every filter change; a fetch started under an older
    /// generation discards its result.
    generation: u64,
    offset: usize,
    items: Vec<Property>,
    has_more: bool,
    total_count: i64,
}

/// Accumulating view over paged search results.
pub struct ListingFeed {
    service: Arc<ListingService>,
    page_size: usize,
    state: Mutex<FeedState>,
    in_flight: AtomicBool,
}

impl ListingFeed {
    pub fn new(service: Arc<ListingService>) -> Self {
        Self::with_page_size(service, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(service: Arc<ListingService>, page_size: usize) -> Self {
        Self {
            service,
            page_size,
            state: Mutex::new(FeedState {
                filters: FilterSpec::default(),
                generation: 0,
                offset: 0,
                items: Vec::new(),
                has_more: true,
                total_count: 0,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Replace the active filters and reset the feed. Always resets, even
    /// when the new filters equal the old ones.
    pub fn set_filters(&self, filters: FilterSpec) {
        let mut state = self.state.lock().unwrap();
        state.filters = filters;
        state.generation += 1;
        state.offset = 0;
        state.items.clear();
        state.has_more = true;
        state.total_count = 0;
    }

    /// Fetch and append the next page. A call while another fetch is in
    /// flight is a no-op, and a fetch that completes after the filters
    /// changed discards its page. A fetch error marks the feed exhausted
    /// but keeps everything already loaded.
    pub async fn load_more(&self) -> Result<()> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let (filters, offset, generation) = {
            let state = self.state.lock().unwrap();
            if !state.has_more {
                self.in_flight.store(false, Ordering::SeqCst);
                return Ok(());
            }
            (state.filters.clone(), state.offset, state.generation)
        };

        let outcome = self
            .service
            .search(&filters, self.page_size, offset)
            .await;

        let mut state = self.state.lock().unwrap();
        self.in_flight.store(false, Ordering::SeqCst);

        if state.generation != generation {
            debug!("Discarding page fetched under superseded filters");
            return Ok(());
        }

        match outcome {
            Ok(page) => {
                state.items.extend(page.properties);
                state.offset = offset + self.page_size;
                state.has_more = page.has_more;
                state.total_count = page.total_count;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "Page fetch failed, stopping pagination");
                state.has_more = false;
                Ok(())
            }
        }
    }

    /// Everything loaded so far.
    pub fn items(&self) -> Vec<Property> {
        self.state.lock().unwrap().items.clone()
    }

    pub fn has_more(&self) -> bool {
        self.state.lock().unwrap().has_more
    }

    /// Server-side count for the active filters.
    pub fn total_count(&self) -> i64 {
        self.state.lock().unwrap().total_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::gateway::GraphQlTransport;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn edge(id: &str) -> Value {
        json!({
            "node": {
                "id": id,
                "title": format!("Listing {id}"),
                "propertyType": "housesAndApartments",
                "purpose": "rent",
            }
        })
    }

    fn connection(edges: Vec<Value>, has_next: bool, count: usize) -> Value {
        json!({
            "propertyListingsConnection": {
                "pageInfo": { "hasNextPage": has_next },
                "aggregate": { "count": count },
                "edges": edges,
            }
        })
    }

    /// Serves one canned page per call, in order.
    struct PagedTransport {
        pages: Vec<Value>,
        cursor: AtomicUsize,
    }

    #[async_trait]
    impl GraphQlTransport for PagedTransport {
        async fn send(&self, _query: &str, _variables: Value) -> Result<Value> {
            let index = self.cursor.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(index) {
                Some(page) => Ok(page.clone()),
                None => Err(Error::Transport {
                    status: 500,
                    body: "no more canned pages".to_string(),
                }),
            }
        }
    }

    fn feed_over(pages: Vec<Value>) -> ListingFeed {
        let service = Arc::new(ListingService::new(Arc::new(PagedTransport {
            pages,
            cursor: AtomicUsize::new(0),
        })));
        ListingFeed::with_page_size(service, 2)
    }

    #[tokio::test]
    async fn pages_accumulate_until_exhausted() {
        let feed = feed_over(vec![
            connection(vec![edge("p1"), edge("p2")], true, 3),
            connection(vec![edge("p3")], false, 3),
        ]);

        feed.load_more().await.unwrap();
        assert_eq!(feed.items().len(), 2);
        assert!(feed.has_more());
        assert_eq!(feed.total_count(), 3);

        feed.load_more().await.unwrap();
        assert_eq!(feed.items().len(), 3);
        assert!(!feed.has_more());

        // Exhausted feed ignores further calls.
        feed.load_more().await.unwrap();
        assert_eq!(feed.items().len(), 3);
    }

    #[tokio::test]
    async fn fetch_error_keeps_loaded_items_and_stops() {
        let feed = feed_over(vec![connection(vec![edge("p1"), edge("p2")], true, 5)]);

        feed.load_more().await.unwrap();
        assert_eq!(feed.items().len(), 2);

        // Second page errors; already-loaded items survive.
        feed.load_more().await.unwrap();
        assert_eq!(feed.items().len(), 2);
        assert!(!feed.has_more());
    }

    #[tokio::test]
    async fn set_filters_resets_even_with_identical_filters() {
        let feed = feed_over(vec![
            connection(vec![edge("p1"), edge("p2")], true, 4),
            connection(vec![edge("p1"), edge("p2")], true, 4),
        ]);

        feed.load_more().await.unwrap();
        assert_eq!(feed.items().len(), 2);

        feed.set_filters(FilterSpec::default());
        assert!(feed.items().is_empty());
        assert!(feed.has_more());

        // Restart fetches from offset zero.
        feed.load_more().await.unwrap();
        assert_eq!(feed.items().len(), 2);
    }

    /// Responses held open until released, so a fetch can be made to
    /// complete after the filters changed underneath it.
    struct GatedTransport {
        release: Notify,
        page: Value,
    }

    #[async_trait]
    impl GraphQlTransport for GatedTransport {
        async fn send(&self, _query: &str, _variables: Value) -> Result<Value> {
            self.release.notified().await;
            Ok(self.page.clone())
        }
    }

    #[tokio::test]
    async fn stale_response_is_discarded_after_filter_change() {
        let transport = Arc::new(GatedTransport {
            release: Notify::new(),
            page: connection(vec![edge("stale")], true, 1),
        });
        let service = Arc::new(ListingService::new(transport.clone()));
        let feed = Arc::new(ListingFeed::with_page_size(service, 2));

        let pending = tokio::spawn({
            let feed = feed.clone();
            async move { feed.load_more().await }
        });
        tokio::task::yield_now().await;

        // Filters change while the fetch is blocked on the transport.
        feed.set_filters(FilterSpec {
            purpose: Some("rent".to_string()),
            ..FilterSpec::default()
        });

        transport.release.notify_one();
        pending.await.unwrap().unwrap();

        // The stale page never lands in the reset feed.
        assert!(feed.items().is_empty());
        assert!(feed.has_more());
    }

    #[tokio::test]
    async fn concurrent_load_more_calls_coalesce() {
        let transport = Arc::new(GatedTransport {
            release: Notify::new(),
            page: connection(vec![edge("p1")], false, 1),
        });
        let service = Arc::new(ListingService::new(transport.clone()));
        let feed = Arc::new(ListingFeed::with_page_size(service, 2));

        let first = tokio::spawn({
            let feed = feed.clone();
            async move { feed.load_more().await }
        });
        tokio::task::yield_now().await;

        // Overlapping call returns immediately without a second fetch.
        feed.load_more().await.unwrap();
        assert!(feed.items().is_empty());

        transport.release.notify_one();
        first.await.unwrap().unwrap();
        assert_eq!(feed.items().len(), 1);
    }
}
