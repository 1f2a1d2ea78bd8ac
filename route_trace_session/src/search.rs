use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::time::{sleep, timeout};

use crate::{
    adapters::{Place, PlaceSearcher, SearchKind},
    config::SessionConfig,
    error::AdapterError,
};

/// A POI search with fewer hits than this is topped up with a general search.
const MIN_POI_RESULTS: usize = 2;

/// Debounced forward geocoding for the address box.
///
/// Each call to [`AddressSearch::search`] supersedes every call still pending, which
/// then resolves as [`AdapterError::Aborted`] instead of returning stale places.
#[derive(Clone)]
pub struct AddressSearch {
    inner: Arc<SearchInner>,
}

struct SearchInner {
    searcher: Arc<dyn PlaceSearcher>,
    generation: AtomicU64,
    debounce: Duration,
    deadline: Duration,
    min_query_length: usize,
    limit: usize,
}

impl AddressSearch {
    pub fn new(searcher: Arc<dyn PlaceSearcher>, config: &SessionConfig) -> Self {
        Self {
            inner: Arc::new(SearchInner {
                searcher,
                generation: AtomicU64::new(0),
                debounce: config.search_debounce,
                deadline: config.geocode_timeout,
                min_query_length: config.search_min_query_length,
                limit: config.search_limit,
            }),
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Place>, AdapterError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let query = query.trim();
        if query.chars().count() < self.inner.min_query_length {
            return Ok(Vec::new());
        }

        sleep(self.inner.debounce).await;
        self.ensure_current(generation)?;

        let places = timeout(self.inner.deadline, self.lookup(query))
            .await
            .map_err(|_| AdapterError::Timeout(self.inner.deadline))??;

        self.ensure_current(generation)?;
        Ok(places)
    }

    /// Drops whatever search is pending.
    pub fn cancel(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn ensure_current(&self, generation: u64) -> Result<(), AdapterError> {
        if self.inner.generation.load(Ordering::SeqCst) == generation {
            Ok(())
        } else {
            tracing::debug!("Search {} superseded", generation);
            Err(AdapterError::Aborted)
        }
    }

    async fn lookup(&self, query: &str) -> Result<Vec<Place>, AdapterError> {
        let mut places = match self.inner.searcher.search_places(query, SearchKind::Poi).await {
            Ok(places) => places,
            Err(err) => {
                tracing::warn!("POI search for {:?} failed: {err}", query);
                Vec::new()
            }
        };

        if places.len() < MIN_POI_RESULTS {
            match self.inner.searcher.search_places(query, SearchKind::General).await {
                Ok(more) => places.extend(more),
                Err(err) if places.is_empty() => return Err(err),
                Err(err) => tracing::warn!("General search for {:?} failed: {err}", query),
            }
        }

        Ok(dedup_places(places, self.inner.limit))
    }
}

/// Keeps the first place per text and rounded center, at most `limit` of them.
pub fn dedup_places(places: Vec<Place>, limit: usize) -> Vec<Place> {
    let mut seen = HashSet::new();
    places.into_iter()
        .filter(|place| seen.insert(place.dedup_key()))
        .take(limit)
        .collect()
}
