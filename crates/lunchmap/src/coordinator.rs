//! Orchestration of one geo search from menu name to markers on the map.
//!
//! A search walks `Searching → Aggregating → Filtering → Rendering → Done`.
//! `Error` is reached only when every keyword query failed. Each search is
//! tagged with a generation number; starting a new search or closing the
//! current one bumps the generation, and any search whose generation is no
//! longer current is dropped before it can touch the snapshot or the markers.
//!
//! Observers follow progress through a [`tokio::sync::watch`] channel of
//! [`SearchSnapshot`] values.

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, Weak,
    atomic::{AtomicU64, Ordering},
};

pub use error::SearchError;
use error::Result;
use lunchmap_provider::{
    Coordinate, Geolocator, MapSurface, MarkerId, MarkerOptions, PlaceRecord, PlacesProvider,
    ReadinessGate,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    aggregate::{AggregateError, ResultAggregator},
    config::GeoSearchConfig,
    geolocation::resolve_origin,
    keywords::base_menu,
    marker::{MarkerPool, PoolStats},
    radius::{self, RadiusSelection},
};

/// Invoked with the place behind a clicked marker.
pub type SelectionCallback = Arc<dyn Fn(&PlaceRecord) + Send + Sync>;

const MARKER_KEY_PREFIX: &str = "place-";

/// Pool key of the marker drawn at the search origin.
const ORIGIN_MARKER_KEY: &str = "origin";

fn marker_key(place_id: &str) -> String {
    format!("{MARKER_KEY_PREFIX}{place_id}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SearchState {
    #[default]
    Idle,
    Searching,
    Aggregating,
    Filtering,
    Rendering,
    Done,
    Error,
}

/// Non-error conditions worth showing to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SearchNotice {
    /// The search succeeded but nothing was found, even at the widest radius.
    NoResultsInRange,
}

/// Why the latest search produced no results.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SearchFailure {
    ProviderUnavailable,
    AllQueriesFailed { queries: usize },
}

/// What observers see of the current search.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SearchSnapshot {
    pub generation: u64,
    pub state: SearchState,
    pub origin: Option<Coordinate>,
    pub menu: Option<String>,
    /// Closest first
    pub selected: Vec<PlaceRecord>,
    pub effective_radius_meters: f64,
    pub highlighted: Option<PlaceRecord>,
    pub notice: Option<SearchNotice>,
    pub failure: Option<SearchFailure>,
}

/// Result of a search that reached `Done`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub generation: u64,
    pub selected: Vec<PlaceRecord>,
    pub effective_radius_meters: f64,
    /// `None` when the radius ladder was exhausted
    pub matched_rung: Option<u32>,
    pub notice: Option<SearchNotice>,
    /// Keyword queries that failed while others succeeded
    pub failed_queries: usize,
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    origin: Coordinate,
    base_menu: String,
}

struct Inner<S: MapSurface> {
    provider: Arc<dyn PlacesProvider>,
    gate: ReadinessGate,
    aggregator: ResultAggregator,
    config: GeoSearchConfig,
    pool: Mutex<MarkerPool<S>>,
    generation: AtomicU64,
    in_flight: Mutex<Option<InFlight>>,
    snapshot: watch::Sender<SearchSnapshot>,
    on_select: Mutex<Option<SelectionCallback>>,
}

/// Runs geo searches against a places provider and mirrors the result onto a
/// map surface.
///
/// Cheap to clone; clones share one search state, one marker pool and one
/// generation counter.
pub struct GeoSearchCoordinator<S: MapSurface> {
    inner: Arc<Inner<S>>,
}

impl<S: MapSurface> Clone for GeoSearchCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> GeoSearchCoordinator<S>
where
    S: MapSurface + Send + 'static,
    S::Marker: Send,
{
    pub fn new<P: PlacesProvider>(provider: P, surface: S, config: GeoSearchConfig) -> Self {
        let aggregator = ResultAggregator::new()
            .query_timeout(config.query_timeout)
            .page_size(config.page_size)
            .sort_by(config.sort_by)
            .category(config.category.clone());
        let gate = ReadinessGate::new(config.ready_timeout, config.ready_poll_interval);
        let pool = MarkerPool::with_surface(surface, config.pool_initial_size);
        let (snapshot, _) = watch::channel(SearchSnapshot::default());

        Self {
            inner: Arc::new(Inner {
                provider: Arc::new(provider),
                gate,
                aggregator,
                config,
                pool: Mutex::new(pool),
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                snapshot,
                on_select: Mutex::new(None),
            }),
        }
    }

    /// Set the callback run when the user clicks a place's marker.
    pub fn on_select<F>(&self, callback: F)
    where
        F: Fn(&PlaceRecord) + Send + Sync + 'static,
    {
        *lock(&self.inner.on_select) = Some(Arc::new(callback));
    }

    pub fn config(&self) -> &GeoSearchConfig {
        &self.inner.config
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn current_generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Run one search to completion.
    ///
    /// Supersedes any search in progress. Returns
    /// [`SearchError::StaleSearchDiscarded`] if this search is itself
    /// superseded before it renders.
    pub async fn search(&self, origin: Coordinate, menu: &str) -> Result<SearchOutcome> {
        let keywords = self.inner.prepare(origin, menu)?;
        let generation = self.inner.begin();
        self.inner.run(generation, origin, menu, keywords).await
    }

    /// Start a search in the background on the current tokio runtime.
    ///
    /// Returns `None` without starting anything when the origin is not a
    /// valid coordinate, when the menu has no searchable name, or when a search for the same origin and menu is
    /// already in flight.
    pub fn start_search(
        &self,
        origin: Coordinate,
        menu: &str,
    ) -> Option<JoinHandle<Result<SearchOutcome>>> {
        let keywords = match self.inner.prepare(origin, menu) {
            Ok(keywords) => keywords,
            Err(e) => {
                warn!(menu, error = %e, "Not starting search");
                return None;
            }
        };

        let base_menu = base_menu(menu);
        let generation = {
            let mut in_flight = lock(&self.inner.in_flight);
            if let Some(current) = in_flight.as_ref()
                && current.generation == self.current_generation()
                && current.origin == origin
                && current.base_menu == base_menu
            {
                debug!(
                    generation = current.generation,
                    menu, "Identical search already in flight, ignoring"
                );
                return None;
            }
            let generation = self.inner.begin();
            *in_flight = Some(InFlight {
                generation,
                origin,
                base_menu,
            });
            generation
        };

        let inner = Arc::clone(&self.inner);
        let menu = menu.to_string();
        Some(tokio::spawn(async move {
            let outcome = inner.run(generation, origin, &menu, keywords).await;
            let mut in_flight = lock(&inner.in_flight);
            if in_flight.as_ref().is_some_and(|f| f.generation == generation) {
                *in_flight = None;
            }
            outcome
        }))
    }

    /// Search around the device position, falling back to the configured
    /// origin when it cannot be determined.
    pub async fn search_near_me<G: Geolocator + ?Sized>(
        &self,
        geolocator: &G,
        menu: &str,
    ) -> Result<SearchOutcome> {
        let config = &self.inner.config;
        let origin =
            resolve_origin(geolocator, config.geolocation_timeout, config.fallback_origin).await;
        self.search(origin, menu).await
    }

    /// Highlight a place from the current result list and centre the map on it.
    ///
    /// Returns `false` when `place_id` is not among the current results.
    pub fn select_place(&self, place_id: &str) -> bool {
        self.inner.select_place(place_id).is_some()
    }

    /// Forward a click on `marker` from the map integration.
    pub fn handle_marker_click(&self, marker: MarkerId) -> bool {
        // The handler re-enters the coordinator, so it must run unlocked.
        let target = self.inner.lock_pool().click_target(marker);
        match target {
            Some((key, handler)) => {
                handler(&key);
                true
            }
            None => false,
        }
    }

    /// Discard any search in progress, hide every marker and return to `Idle`.
    pub fn close_search(&self) {
        let generation = self.inner.begin();
        {
            let mut pool = self.inner.lock_pool();
            pool.release_all();
            pool.optimize(self.inner.config.pool_max_available);
        }
        *lock(&self.inner.in_flight) = None;
        self.inner.snapshot.send_replace(SearchSnapshot {
            generation,
            ..SearchSnapshot::default()
        });
        info!(generation, "Search closed");
    }

    /// Marker currently showing `place_id`.
    pub fn marker_for(&self, place_id: &str) -> Option<MarkerId> {
        self.inner.lock_pool().marker_id(&marker_key(place_id))
    }

    /// Marker showing the origin of the current search.
    pub fn origin_marker(&self) -> Option<MarkerId> {
        self.inner.lock_pool().marker_id(ORIGIN_MARKER_KEY)
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.inner.lock_pool().stats()
    }

    /// Move the markers to a new surface, returning the old one.
    ///
    /// Markers bound on the old surface are released; the next search renders
    /// on the new one.
    pub fn set_surface(&self, surface: S) -> Option<S> {
        self.inner.lock_pool().set_surface(surface)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S> Inner<S>
where
    S: MapSurface + Send + 'static,
    S::Marker: Send,
{
    fn lock_pool(&self) -> MutexGuard<'_, MarkerPool<S>> {
        lock(&self.pool)
    }

    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn prepare(&self, origin: Coordinate, menu: &str) -> Result<Vec<String>> {
        if !origin.is_valid() {
            return Err(SearchError::InvalidOrigin {
                latitude: origin.latitude,
                longitude: origin.longitude,
            });
        }
        let keywords = self.config.keyword_policy.keywords_for(menu);
        if keywords.is_empty() {
            return Err(SearchError::EmptyMenu);
        }
        Ok(keywords)
    }

    fn ensure_current(&self, generation: u64) -> Result<()> {
        let current = self.generation.load(Ordering::SeqCst);
        if current == generation {
            Ok(())
        } else {
            debug!(generation, current, "Discarding superseded search");
            Err(SearchError::StaleSearchDiscarded {
                generation,
                current,
            })
        }
    }

    /// Apply `update` to the snapshot if `generation` is still current.
    fn publish(&self, generation: u64, update: impl FnOnce(&mut SearchSnapshot)) -> bool {
        self.snapshot.send_if_modified(|snapshot| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            snapshot.generation = generation;
            update(snapshot);
            true
        })
    }

    fn transition(&self, generation: u64, state: SearchState) -> Result<()> {
        if self.publish(generation, |snapshot| snapshot.state = state) {
            debug!(generation, ?state, "Search state changed");
            Ok(())
        } else {
            self.ensure_current(generation)
        }
    }

    #[instrument(
        name = "Geo search",
        level = "info",
        skip_all,
        fields(generation = generation, menu = %menu)
    )]
    async fn run(
        self: &Arc<Self>,
        generation: u64,
        origin: Coordinate,
        menu: &str,
        keywords: Vec<String>,
    ) -> Result<SearchOutcome> {
        // Previous results stay visible until this search renders.
        self.publish(generation, |snapshot| {
            snapshot.state = SearchState::Searching;
            snapshot.origin = Some(origin);
            snapshot.menu = Some(menu.to_string());
            snapshot.notice = None;
            snapshot.failure = None;
        });
        self.ensure_current(generation)?;

        if let Err(e) = self.gate.wait(self.provider.as_ref()).await {
            self.ensure_current(generation)?;
            error!(error = %e, "Places provider unavailable");
            self.clear_results(generation, SearchState::Idle, SearchFailure::ProviderUnavailable)?;
            return Err(SearchError::ProviderUnavailable(e));
        }
        self.ensure_current(generation)?;

        let aggregated = self
            .aggregator
            .aggregate(
                self.provider.as_ref(),
                origin,
                &keywords,
                self.config.ladder.largest(),
            )
            .await;
        self.ensure_current(generation)?;

        let aggregated = match aggregated {
            Ok(aggregated) => aggregated,
            Err(AggregateError::AllQueriesFailed { failures }) => {
                error!(queries = failures.len(), "Every keyword query failed");
                self.clear_results(
                    generation,
                    SearchState::Error,
                    SearchFailure::AllQueriesFailed {
                        queries: failures.len(),
                    },
                )?;
                return Err(SearchError::AllQueriesFailed { failures });
            }
            Err(e) => return Err(e.into()),
        };

        self.transition(generation, SearchState::Aggregating)?;
        let failed_queries = aggregated.failures().len();
        let records = aggregated.into_distanced(origin);

        self.transition(generation, SearchState::Filtering)?;
        let selection = radius::select(records, &self.config.ladder, self.config.min_count)?;

        self.transition(generation, SearchState::Rendering)?;
        self.render(generation, origin, &selection)?;

        let notice = selection
            .is_empty()
            .then_some(SearchNotice::NoResultsInRange);
        let published = self.publish(generation, |snapshot| {
            snapshot.state = SearchState::Done;
            snapshot.selected = selection.selected.clone();
            snapshot.effective_radius_meters = selection.effective_radius_meters;
            snapshot.highlighted = selection.selected.first().cloned();
            snapshot.notice = notice;
        });
        if !published {
            self.ensure_current(generation)?;
        }

        info!(
            places = selection.selected.len(),
            effective_radius_meters = selection.effective_radius_meters,
            failed_queries,
            "Search complete"
        );
        Ok(SearchOutcome {
            generation,
            selected: selection.selected,
            effective_radius_meters: selection.effective_radius_meters,
            matched_rung: selection.matched_rung,
            notice,
            failed_queries,
        })
    }

    /// Replace the markers with `selection`, unless `generation` went stale.
    fn render(
        self: &Arc<Self>,
        generation: u64,
        origin: Coordinate,
        selection: &RadiusSelection,
    ) -> Result<()> {
        let mut pool = self.lock_pool();
        // Checked under the pool lock so a newer search cannot interleave.
        self.ensure_current(generation)?;

        pool.release_all();
        if self.config.show_origin {
            pool.acquire(ORIGIN_MARKER_KEY, origin, &MarkerOptions::titled("Current location"))?;
        }
        for record in &selection.selected {
            let key = marker_key(&record.id);
            pool.acquire(&key, record.coordinate, &MarkerOptions::titled(&record.name))?;
            let inner: Weak<Self> = Arc::downgrade(self);
            pool.on_click(&key, move |key| {
                if let Some(inner) = inner.upgrade() {
                    inner.marker_clicked(key);
                }
            });
        }

        let center = selection
            .selected
            .first()
            .map_or(origin, |closest| closest.coordinate);
        pool.center_on(center, None);
        pool.optimize(self.config.pool_max_available);
        Ok(())
    }

    /// Drop every marker and result, ending in `state` with `failure`.
    fn clear_results(
        &self,
        generation: u64,
        state: SearchState,
        failure: SearchFailure,
    ) -> Result<()> {
        {
            let mut pool = self.lock_pool();
            self.ensure_current(generation)?;
            pool.release_all();
        }
        self.publish(generation, |snapshot| {
            snapshot.state = state;
            snapshot.selected.clear();
            snapshot.effective_radius_meters = 0.0;
            snapshot.highlighted = None;
            snapshot.failure = Some(failure);
        });
        Ok(())
    }

    fn select_place(&self, place_id: &str) -> Option<PlaceRecord> {
        let record = self
            .snapshot
            .borrow()
            .selected
            .iter()
            .find(|record| record.id == place_id)
            .cloned()?;

        self.lock_pool()
            .center_on(record.coordinate, Some(self.config.focus_zoom));
        let highlighted = record.clone();
        self.snapshot.send_if_modified(|snapshot| {
            let changed = snapshot.highlighted.as_ref() != Some(&highlighted);
            snapshot.highlighted = Some(highlighted);
            changed
        });
        debug!(place_id, "Place highlighted");
        Some(record)
    }

    fn marker_clicked(&self, key: &str) {
        let Some(place_id) = key.strip_prefix(MARKER_KEY_PREFIX) else {
            warn!(key, "Click on a marker with an unexpected key");
            return;
        };
        let Some(record) = self.select_place(place_id) else {
            return;
        };
        let callback = lock(&self.on_select).clone();
        if let Some(callback) = callback {
            callback(&record);
        }
    }
}

mod error {
    use lunchmap_provider::ProviderError;
    use thiserror::Error;

    use crate::{
        aggregate::{AggregateError, QueryFailure},
        marker::MarkerPoolError,
        radius::RadiusError,
    };

    #[derive(Error, Debug)]
    pub enum SearchError {
        #[error("Search unavailable: {0}")]
        ProviderUnavailable(#[source] ProviderError),
        #[error("All {} keyword queries failed", failures.len())]
        AllQueriesFailed { failures: Vec<QueryFailure> },
        #[error("Search {generation} was superseded by search {current}")]
        StaleSearchDiscarded { generation: u64, current: u64 },
        #[error("Menu has no searchable name")]
        EmptyMenu,
        #[error("Invalid search origin: latitude {latitude}, longitude {longitude}")]
        InvalidOrigin { latitude: f64, longitude: f64 },
        #[error("Radius selection error: {0}")]
        Radius(#[from] RadiusError),
        #[error("Marker pool error: {0}")]
        Pool(#[from] MarkerPoolError),
    }

    impl From<AggregateError> for SearchError {
        fn from(e: AggregateError) -> Self {
            match e {
                AggregateError::NoKeywords => Self::EmptyMenu,
                AggregateError::AllQueriesFailed { failures } => {
                    Self::AllQueriesFailed { failures }
                }
            }
        }
    }

    pub type Result<T> = std::result::Result<T, SearchError>;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lunchmap_provider::{
        GeolocationError, ProviderStatus,
        test_data::{
            FixedGeolocator, RecordingSurface, ScriptedProvider, raw_place_at_distance,
            seoul_sample,
        },
    };

    use super::*;
    use crate::{config::GeoSearchConfigBuilder, keywords::KeywordPolicy};

    const ORIGIN: Coordinate = Coordinate::SEOUL_CITY_HALL;

    struct Harness {
        coordinator: GeoSearchCoordinator<RecordingSurface>,
        surface: RecordingSurface,
        provider: Arc<ScriptedProvider>,
    }

    fn harness(provider: ScriptedProvider, config: GeoSearchConfig) -> Harness {
        let provider = Arc::new(provider);
        let surface = RecordingSurface::new();
        let coordinator =
            GeoSearchCoordinator::new(Arc::clone(&provider), surface.clone(), config);
        Harness {
            coordinator,
            surface,
            provider,
        }
    }

    fn single_keyword_config() -> GeoSearchConfig {
        GeoSearchConfigBuilder::new()
            .keyword_policy(KeywordPolicy::menu_only())
            .marker_pool(0, 20)
            .build()
    }

    fn ids(records: &[PlaceRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_search_renders_closest_places() {
        let h = harness(
            ScriptedProvider::new().places("김치찌개", seoul_sample(12)),
            single_keyword_config(),
        );

        let outcome = h.coordinator.search(ORIGIN, "김치찌개").await.unwrap();

        // Four places within 3 km, six within 5 km.
        assert_eq!(outcome.effective_radius_meters, 5_000.0);
        assert_eq!(
            ids(&outcome.selected),
            vec!["seoul-0", "seoul-1", "seoul-2", "seoul-3", "seoul-4"]
        );
        assert_eq!(h.surface.visible_count(), 6, "Five places plus the origin");

        let snapshot = h.coordinator.snapshot();
        assert_eq!(snapshot.state, SearchState::Done);
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.selected, outcome.selected);
        assert_eq!(
            snapshot.highlighted.as_ref().map(|r| r.id.as_str()),
            Some("seoul-0")
        );
        assert_eq!(
            h.surface.last_center().map(|(at, _)| at),
            Some(outcome.selected[0].coordinate),
            "Map should centre on the closest place"
        );
        assert_eq!(h.provider.calls()[0].radius_meters, 30_000);
    }

    #[tokio::test]
    async fn test_all_queries_failed_escalates_to_error() {
        let provider = ScriptedProvider::new()
            .respond("국밥", ProviderStatus::ErrorResponse("500".into()))
            .respond("국밥 맛집", ProviderStatus::ErrorResponse("500".into()))
            .respond("국밥 음식점", ProviderStatus::ErrorResponse("500".into()));
        let h = harness(provider, GeoSearchConfig::default());

        let err = h.coordinator.search(ORIGIN, "국밥").await.unwrap_err();

        assert!(matches!(err, SearchError::AllQueriesFailed { ref failures } if failures.len() == 3));
        let snapshot = h.coordinator.snapshot();
        assert_eq!(snapshot.state, SearchState::Error);
        assert_eq!(
            snapshot.failure,
            Some(SearchFailure::AllQueriesFailed { queries: 3 })
        );
        assert!(snapshot.selected.is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_proceeds() {
        let provider = ScriptedProvider::new()
            .respond("국밥", ProviderStatus::ErrorResponse("500".into()))
            .places("국밥 맛집", vec![raw_place_at_distance("1", "할매국밥", ORIGIN, 700.0)])
            .respond("국밥 음식점", ProviderStatus::InvalidParams("radius".into()));
        let h = harness(provider, GeoSearchConfig::default());

        let outcome = h.coordinator.search(ORIGIN, "국밥").await.unwrap();

        assert_eq!(ids(&outcome.selected), vec!["1"]);
        assert_eq!(outcome.failed_queries, 2);
        assert_eq!(h.coordinator.snapshot().state, SearchState::Done);
        assert_eq!(h.coordinator.snapshot().failure, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_search_is_discarded() {
        let provider = ScriptedProvider::new()
            .respond_after(
                "짜장면",
                Duration::from_millis(500),
                ProviderStatus::Ok(vec![raw_place_at_distance("slow", "늦은 반점", ORIGIN, 100.0)]),
            )
            .respond_after(
                "짬뽕",
                Duration::from_millis(10),
                ProviderStatus::Ok(vec![raw_place_at_distance("fast", "빠른 반점", ORIGIN, 200.0)]),
            );
        let h = harness(provider, single_keyword_config());

        let first = h.coordinator.start_search(ORIGIN, "짜장면").unwrap();
        // Let the first search get its query in flight.
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(h.provider.call_count(), 1);
        let second = h.coordinator.start_search(ORIGIN, "짬뽕").unwrap();

        let second = second.await.unwrap().unwrap();
        assert_eq!(second.generation, 2);

        let first = first.await.unwrap();
        assert!(matches!(
            first,
            Err(SearchError::StaleSearchDiscarded {
                generation: 1,
                current: 2
            })
        ));

        let snapshot = h.coordinator.snapshot();
        assert_eq!(snapshot.generation, 2);
        assert_eq!(ids(&snapshot.selected), vec!["fast"]);
        assert!(h.coordinator.marker_for("slow").is_none());
        assert!(h.coordinator.marker_for("fast").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_start_is_ignored_while_in_flight() {
        let provider = ScriptedProvider::new().respond_after(
            "라멘",
            Duration::from_millis(100),
            ProviderStatus::ZeroResult,
        );
        let h = harness(provider, single_keyword_config());

        let first = h.coordinator.start_search(ORIGIN, "라멘").unwrap();
        assert!(h.coordinator.start_search(ORIGIN, " 라멘 ").is_none());
        assert!(
            h.coordinator
                .start_search(Coordinate::new(37.5, 127.0), "라멘")
                .is_some(),
            "A different origin supersedes"
        );

        assert!(first.await.unwrap().is_err());
        assert_eq!(h.coordinator.current_generation(), 2);
    }

    #[tokio::test]
    async fn test_no_results_is_a_notice() {
        let h = harness(ScriptedProvider::new(), single_keyword_config());

        let outcome = h.coordinator.search(ORIGIN, "마라탕").await.unwrap();

        assert!(outcome.selected.is_empty());
        assert_eq!(outcome.notice, Some(SearchNotice::NoResultsInRange));
        let snapshot = h.coordinator.snapshot();
        assert_eq!(snapshot.state, SearchState::Done);
        assert_eq!(snapshot.notice, Some(SearchNotice::NoResultsInRange));
        assert_eq!(snapshot.failure, None);
    }

    #[tokio::test]
    async fn test_empty_menu_is_rejected_without_a_generation() {
        let h = harness(ScriptedProvider::new(), single_keyword_config());
        let err = h.coordinator.search(ORIGIN, "   ").await.unwrap_err();
        assert!(matches!(err, SearchError::EmptyMenu));
        assert_eq!(h.coordinator.current_generation(), 0);
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_unavailable() {
        let provider = ScriptedProvider::new();
        provider.set_ready(false);
        let config = GeoSearchConfigBuilder::new()
            .readiness(Duration::from_secs(1), Duration::from_millis(100))
            .build();
        let h = harness(provider, config);

        let err = h.coordinator.search(ORIGIN, "냉면").await.unwrap_err();

        assert!(matches!(err, SearchError::ProviderUnavailable(_)));
        assert_eq!(h.provider.call_count(), 0, "No query before the gate opens");
        let snapshot = h.coordinator.snapshot();
        assert_eq!(snapshot.state, SearchState::Idle);
        assert_eq!(snapshot.failure, Some(SearchFailure::ProviderUnavailable));
    }

    #[tokio::test]
    async fn test_select_place_highlights_and_centres() {
        let h = harness(
            ScriptedProvider::new().places("김치찌개", seoul_sample(6)),
            single_keyword_config(),
        );
        let outcome = h.coordinator.search(ORIGIN, "김치찌개").await.unwrap();
        let target = &outcome.selected[2];

        assert!(h.coordinator.select_place(&target.id));
        assert_eq!(
            h.coordinator.snapshot().highlighted.as_ref(),
            Some(target)
        );
        assert_eq!(h.surface.last_center(), Some((target.coordinate, Some(3))));

        assert!(!h.coordinator.select_place("does-not-exist"));
    }

    #[tokio::test]
    async fn test_marker_click_runs_selection_callback() {
        let h = harness(
            ScriptedProvider::new().places("김치찌개", seoul_sample(6)),
            single_keyword_config(),
        );
        let clicked = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&clicked);
        h.coordinator
            .on_select(move |record| log.lock().unwrap().push(record.id.clone()));

        h.coordinator.search(ORIGIN, "김치찌개").await.unwrap();
        let marker = h.coordinator.marker_for("seoul-3").unwrap();

        assert!(h.coordinator.handle_marker_click(marker));
        assert_eq!(*clicked.lock().unwrap(), vec!["seoul-3"]);
        assert_eq!(
            h.coordinator.snapshot().highlighted.map(|r| r.id),
            Some("seoul-3".to_string())
        );
    }

    #[tokio::test]
    async fn test_close_search_resets_and_releases() {
        let h = harness(
            ScriptedProvider::new().places("김치찌개", seoul_sample(6)),
            single_keyword_config(),
        );
        h.coordinator.search(ORIGIN, "김치찌개").await.unwrap();
        let marker = h.coordinator.marker_for("seoul-0").unwrap();

        h.coordinator.close_search();

        assert_eq!(h.surface.visible_count(), 0);
        let snapshot = h.coordinator.snapshot();
        assert_eq!(snapshot.state, SearchState::Idle);
        assert!(snapshot.selected.is_empty());
        assert!(
            !h.coordinator.handle_marker_click(marker),
            "Released markers must not fire"
        );
    }

    #[tokio::test]
    async fn test_repeated_searches_reuse_markers() {
        let h = harness(
            ScriptedProvider::new().places("김치찌개", seoul_sample(12)),
            single_keyword_config(),
        );
        for _ in 0..10 {
            h.coordinator.search(ORIGIN, "김치찌개").await.unwrap();
        }
        assert_eq!(h.surface.created(), 6);
        assert_eq!(h.coordinator.pool_stats().bound, 6);
    }

    #[tokio::test]
    async fn test_origin_marker_is_drawn_and_not_clickable() {
        let h = harness(ScriptedProvider::new(), single_keyword_config());

        h.coordinator.search(ORIGIN, "마라탕").await.unwrap();

        let origin = h.coordinator.origin_marker().expect("Origin should be marked");
        assert!(h.surface.is_visible(origin));
        assert_eq!(h.surface.title_of(origin).as_deref(), Some("Current location"));
        assert!(!h.coordinator.handle_marker_click(origin));

        h.coordinator.close_search();
        assert!(h.coordinator.origin_marker().is_none());
        assert!(!h.surface.is_visible(origin));
    }

    #[tokio::test]
    async fn test_origin_marker_can_be_disabled() {
        let config = GeoSearchConfigBuilder::new()
            .keyword_policy(KeywordPolicy::menu_only())
            .origin_marker(false)
            .build();
        let h = harness(
            ScriptedProvider::new().places("김치찌개", seoul_sample(12)),
            config,
        );

        h.coordinator.search(ORIGIN, "김치찌개").await.unwrap();

        assert!(h.coordinator.origin_marker().is_none());
        assert_eq!(h.surface.visible_count(), 5);
    }

    #[tokio::test]
    async fn test_invalid_origin_is_rejected() {
        let h = harness(
            ScriptedProvider::new().places("김치찌개", seoul_sample(12)),
            single_keyword_config(),
        );

        for origin in [Coordinate::new(f64::NAN, 126.9780), Coordinate::new(37.5, 200.0)] {
            let err = h.coordinator.search(origin, "김치찌개").await.unwrap_err();
            assert!(matches!(err, SearchError::InvalidOrigin { .. }));
            assert!(h.coordinator.start_search(origin, "김치찌개").is_none());
        }
        assert_eq!(h.coordinator.current_generation(), 0);
        assert_eq!(h.provider.call_count(), 0);
        assert_eq!(h.coordinator.snapshot().state, SearchState::Idle);
    }

    #[tokio::test]
    async fn test_search_near_me_uses_fallback_on_denial() {
        let h = harness(
            ScriptedProvider::new().places("김치찌개", seoul_sample(3)),
            single_keyword_config(),
        );

        h.coordinator
            .search_near_me(
                &FixedGeolocator::failing(GeolocationError::PermissionDenied),
                "김치찌개",
            )
            .await
            .unwrap();

        assert_eq!(h.provider.calls()[0].origin, Coordinate::SEOUL_CITY_HALL);
        assert_eq!(h.coordinator.snapshot().origin, Some(Coordinate::SEOUL_CITY_HALL));
    }
}
