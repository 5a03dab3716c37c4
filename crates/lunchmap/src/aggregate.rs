//! Fan-out keyword search with a join barrier and first-seen deduplication.
//!
//! One logical search issues a query per keyword. The queries run
//! concurrently and complete in any order; the aggregator waits for every one
//! of them, then merges the results in keyword issue order so the outcome
//! does not depend on which query happened to finish first.

use std::time::Duration;

use ahash::AHashSet as HashSet;
pub use error::AggregateError;
use error::Result;
use futures::future::join_all;
use lunchmap_provider::{
    Coordinate, DEFAULT_PAGE_SIZE, KeywordSearch, PlaceRecord, PlacesProvider, ProviderStatus,
    RESTAURANT_CATEGORY, SortBy,
};
use tracing::{debug, instrument, warn};

use crate::distance::distance;

/// Default per-query deadline.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// A keyword query that did not succeed.
#[derive(Debug, Clone)]
pub struct QueryFailure {
    pub keyword: String,
    pub status: ProviderStatus,
}

/// Deduplicated places from one fan-out, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct AggregatedResultSet {
    records: Vec<PlaceRecord>,
    failures: Vec<QueryFailure>,
    queries: usize,
    duplicates: usize,
}

impl AggregatedResultSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PlaceRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&PlaceRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Queries that failed while others succeeded.
    pub fn failures(&self) -> &[QueryFailure] {
        &self.failures
    }

    /// Number of keyword queries issued.
    pub fn queries(&self) -> usize {
        self.queries
    }

    /// Records dropped because an earlier keyword already produced them.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Consume the set, annotating every record with its distance to `origin`.
    pub fn into_distanced(self, origin: Coordinate) -> Vec<PlaceRecord> {
        self.records
            .into_iter()
            .map(|record| {
                let meters = distance(origin, record.coordinate);
                record.with_distance(meters)
            })
            .collect()
    }
}

/// Issues keyword queries against a [`PlacesProvider`] and merges the results.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    query_timeout: Duration,
    page_size: u32,
    sort_by: SortBy,
    category: Option<String>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: SortBy::Distance,
            category: Some(RESTAURANT_CATEGORY.to_string()),
        }
    }
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A query still pending after `timeout` counts as failed.
    #[must_use]
    pub const fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    #[must_use]
    pub const fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// Restrict queries to a category group; `None` searches every category.
    #[must_use]
    pub fn category(mut self, code: Option<impl Into<String>>) -> Self {
        self.category = code.map(Into::into);
        self
    }

    fn request(&self, keyword: &str, origin: Coordinate, radius_meters: u32) -> KeywordSearch {
        KeywordSearch::new(keyword, origin, radius_meters)
            .size(self.page_size)
            .sort_by(self.sort_by)
            .category(self.category.as_deref())
    }

    async fn run_query<P: PlacesProvider + ?Sized>(
        &self,
        provider: &P,
        request: KeywordSearch,
    ) -> ProviderStatus {
        if request.keyword.trim().is_empty() {
            return ProviderStatus::InvalidParams("empty keyword".to_string());
        }
        match tokio::time::timeout(self.query_timeout, provider.keyword_search(request)).await {
            Ok(status) => status,
            Err(_) => ProviderStatus::Unknown(format!(
                "no response within {}ms",
                self.query_timeout.as_millis()
            )),
        }
    }

    /// Run one query per keyword and merge the results.
    ///
    /// Waits for every query before merging. A place returned by several
    /// keywords is kept once, as returned by the earliest keyword in
    /// `keywords`. Fails with [`AggregateError::AllQueriesFailed`] only when
    /// no query succeeded; `ZERO_RESULT` counts as success.
    #[instrument(
        name = "Aggregate keyword search",
        level = "debug",
        skip_all,
        fields(keywords = keywords.len(), radius_meters = radius_meters)
    )]
    pub async fn aggregate<P, K>(
        &self,
        provider: &P,
        origin: Coordinate,
        keywords: &[K],
        radius_meters: u32,
    ) -> Result<AggregatedResultSet>
    where
        P: PlacesProvider + ?Sized,
        K: AsRef<str>,
    {
        if keywords.is_empty() {
            return Err(AggregateError::NoKeywords);
        }

        let statuses = join_all(keywords.iter().map(|keyword| {
            self.run_query(provider, self.request(keyword.as_ref(), origin, radius_meters))
        }))
        .await;

        let mut merged = AggregatedResultSet {
            queries: keywords.len(),
            ..AggregatedResultSet::default()
        };
        let mut seen: HashSet<String> = HashSet::new();
        let mut succeeded = 0usize;

        for (keyword, status) in keywords.iter().map(AsRef::as_ref).zip(statuses) {
            match status {
                ProviderStatus::Ok(places) => {
                    succeeded += 1;
                    for raw in places {
                        let record = match raw.normalize() {
                            Ok(record) => record,
                            Err(e) => {
                                warn!(keyword, error = %e, "Skipping malformed place");
                                continue;
                            }
                        };
                        if seen.insert(record.id.clone()) {
                            merged.records.push(record);
                        } else {
                            merged.duplicates += 1;
                        }
                    }
                }
                ProviderStatus::ZeroResult => succeeded += 1,
                failed => {
                    warn!(keyword, status = %failed, "Keyword query failed");
                    merged.failures.push(QueryFailure {
                        keyword: keyword.to_string(),
                        status: failed,
                    });
                }
            }
        }

        if succeeded == 0 {
            return Err(AggregateError::AllQueriesFailed {
                failures: merged.failures,
            });
        }

        debug!(
            places = merged.records.len(),
            duplicates = merged.duplicates,
            failed = merged.failures.len(),
            "Merged keyword results"
        );
        Ok(merged)
    }
}

mod error {
    use thiserror::Error;

    use super::QueryFailure;

    #[derive(Error, Debug, Clone)]
    pub enum AggregateError {
        #[error("No keywords to search for")]
        NoKeywords,
        #[error("All {} keyword queries failed", failures.len())]
        AllQueriesFailed { failures: Vec<QueryFailure> },
    }

    pub type Result<T> = std::result::Result<T, AggregateError>;
}
