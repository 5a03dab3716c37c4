use std::time::Duration;

use lunchmap_provider::{
    Coordinate, DEFAULT_PAGE_SIZE, RESTAURANT_CATEGORY, SortBy,
    readiness::{DEFAULT_POLL_INTERVAL, DEFAULT_READY_TIMEOUT},
};

use crate::{
    aggregate::DEFAULT_QUERY_TIMEOUT,
    error::LunchmapError,
    geolocation::DEFAULT_GEOLOCATION_TIMEOUT,
    keywords::KeywordPolicy,
    marker::DEFAULT_MAX_AVAILABLE,
    radius::{DEFAULT_MIN_COUNT, RadiusLadder},
};

/// Markers pre-allocated when the map surface is bound.
pub const DEFAULT_POOL_INITIAL_SIZE: usize = 10;

/// Zoom level applied when a place is highlighted.
pub const DEFAULT_FOCUS_ZOOM: u8 = 3;

/// Everything a [`crate::GeoSearchCoordinator`] needs to know about how to search.
#[derive(Debug, Clone)]
pub struct GeoSearchConfig {
    pub ladder: RadiusLadder,
    /// Places to surface before the ladder stops widening
    pub min_count: usize,
    pub keyword_policy: KeywordPolicy,
    /// Results requested per keyword query
    pub page_size: u32,
    /// Provider category filter, `None` for all categories
    pub category: Option<String>,
    pub sort_by: SortBy,
    pub query_timeout: Duration,
    pub ready_timeout: Duration,
    pub ready_poll_interval: Duration,
    pub geolocation_timeout: Duration,
    /// Origin used when the device position is unavailable
    pub fallback_origin: Coordinate,
    pub pool_initial_size: usize,
    /// Idle markers kept after each render
    pub pool_max_available: usize,
    pub focus_zoom: u8,
    /// Draw a marker at the search origin alongside the results
    pub show_origin: bool,
}

impl Default for GeoSearchConfig {
    fn default() -> Self {
        Self {
            ladder: RadiusLadder::default(),
            min_count: DEFAULT_MIN_COUNT,
            keyword_policy: KeywordPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
            category: Some(RESTAURANT_CATEGORY.to_string()),
            sort_by: SortBy::Distance,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            ready_poll_interval: DEFAULT_POLL_INTERVAL,
            geolocation_timeout: DEFAULT_GEOLOCATION_TIMEOUT,
            fallback_origin: Coordinate::SEOUL_CITY_HALL,
            pool_initial_size: DEFAULT_POOL_INITIAL_SIZE,
            pool_max_available: DEFAULT_MAX_AVAILABLE,
            focus_zoom: DEFAULT_FOCUS_ZOOM,
            show_origin: true,
        }
    }
}

/// Builder for creating search configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct GeoSearchConfigBuilder {
    config: GeoSearchConfig,
}

impl GeoSearchConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: GeoSearchConfig::default(),
        }
    }

    /// Search a single fixed radius and never widen
    pub fn fixed_radius(radius_meters: u32) -> Self {
        let mut builder = Self::new();
        builder.config.ladder = RadiusLadder::fixed(radius_meters);
        builder
    }

    /// Create a builder for rural areas: start wide, settle for fewer places
    pub fn sparse_area() -> Self {
        let mut builder = Self::new();
        builder.config.ladder = RadiusLadder(vec![5_000, 10_000, 20_000, 30_000]);
        builder.config.min_count = 3;
        builder.config.keyword_policy = KeywordPolicy::broad();
        builder
    }

    /// Create a builder for city centres: tight rungs, more places
    pub fn dense_area() -> Self {
        let mut builder = Self::new();
        builder.config.ladder = RadiusLadder(vec![500, 1_000, 2_000, 3_000, 5_000]);
        builder.config.min_count = 10;
        builder
    }

    /// Set the radius ladder in meters (must be non-empty and strictly increasing)
    pub fn radius_ladder(mut self, rungs: impl Into<Vec<u32>>) -> Result<Self, LunchmapError> {
        self.config.ladder =
            RadiusLadder::new(rungs).map_err(|e| LunchmapError::ConfigError(e.to_string()))?;
        Ok(self)
    }

    /// Set the minimum number of places to surface (must be positive)
    pub fn min_count(mut self, min_count: usize) -> Result<Self, LunchmapError> {
        if min_count == 0 {
            return Err(LunchmapError::ConfigError(
                "Minimum result count must be positive".to_string(),
            ));
        }
        self.config.min_count = min_count;
        Ok(self)
    }

    pub fn keyword_policy(mut self, policy: KeywordPolicy) -> Self {
        self.config.keyword_policy = policy;
        self
    }

    /// Set results per keyword query (clamped to the provider's 1..=15)
    pub fn page_size(mut self, size: u32) -> Self {
        self.config.page_size = size.clamp(1, DEFAULT_PAGE_SIZE);
        self
    }

    /// Restrict searches to a category group, or `None` for everything
    pub fn category(mut self, code: Option<&str>) -> Self {
        self.config.category = code.map(str::to_string);
        self
    }

    pub fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.config.sort_by = sort_by;
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.config.query_timeout = timeout;
        self
    }

    /// Configure how long to wait for the provider to initialise
    pub fn readiness(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.config.ready_timeout = timeout;
        self.config.ready_poll_interval = poll_interval;
        self
    }

    /// Configure the position fix deadline and the origin used when it fails
    pub fn geolocation(mut self, timeout: Duration, fallback_origin: Coordinate) -> Self {
        self.config.geolocation_timeout = timeout;
        self.config.fallback_origin = fallback_origin;
        self
    }

    /// Configure marker pre-allocation and the idle marker cap
    pub fn marker_pool(mut self, initial_size: usize, max_available: usize) -> Self {
        self.config.pool_initial_size = initial_size;
        self.config.pool_max_available = max_available;
        self
    }

    pub fn focus_zoom(mut self, level: u8) -> Self {
        self.config.focus_zoom = level;
        self
    }

    pub fn origin_marker(mut self, show: bool) -> Self {
        self.config.show_origin = show;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> GeoSearchConfig {
        self.config
    }
}
