//! Lunchmap - nearby restaurant search for a lunch-menu picker
//!
//! Given a menu name and a location, lunchmap finds places serving it nearby
//! and keeps a map in sync with the result. One logical search fans out into
//! several keyword queries against a places provider, merges the answers,
//! measures every place locally, widens the radius step by step until enough
//! places are found and finally mirrors the selection onto a pool of reusable
//! map markers.
//!
//! # Quick Start
//!
//! ```rust
//! use lunchmap::{Coordinate, GeoSearchConfigBuilder, GeoSearchCoordinator};
//! use lunchmap_provider::test_data::{RecordingSurface, ScriptedProvider, seoul_sample};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), lunchmap::error::LunchmapError> {
//! // Any `PlacesProvider` works here, e.g. `lunchmap::provider::kakao::KakaoPlaces`.
//! let provider = ScriptedProvider::new().places("김치찌개", seoul_sample(12));
//! let surface = RecordingSurface::new();
//!
//! let config = GeoSearchConfigBuilder::new().min_count(5)?.build();
//! let coordinator = GeoSearchCoordinator::new(provider, surface, config);
//!
//! let outcome = coordinator.search(Coordinate::SEOUL_CITY_HALL, "김치찌개").await?;
//! for place in &outcome.selected {
//!     println!("{} ({:.0} m)", place.name, place.distance_meters.unwrap_or_default());
//! }
//! println!("Searched within {} m", outcome.effective_radius_meters);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Concurrent keyword fan-out**: every keyword runs at once, results are
//!   merged only after all of them answered
//! - **Deterministic dedup**: a place found by several keywords is kept as the
//!   earliest keyword returned it
//! - **Radius ladder**: widen 3 → 5 → 10 → 15 → 20 → 30 km until enough places
//!   show up, or settle for the closest available
//! - **Marker pooling**: repeated searches reuse marker objects instead of
//!   allocating new ones
//! - **Stale search protection**: only the latest search ever reaches the map
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub mod aggregate;
mod config;
pub mod coordinator;
mod distance;
pub mod error;
pub mod geolocation;
pub mod keywords;
pub mod marker;
pub mod radius;

pub use aggregate::{AggregatedResultSet, ResultAggregator};
pub use config::{GeoSearchConfig, GeoSearchConfigBuilder};
pub use coordinator::{
    GeoSearchCoordinator, SearchError, SearchNotice, SearchOutcome, SearchSnapshot, SearchState,
};
pub use distance::{EARTH_RADIUS_M, distance};
pub use keywords::KeywordPolicy;
pub use lunchmap_provider as provider;
pub use lunchmap_provider::{
    Coordinate, MapSurface, MarkerId, MarkerOptions, PlaceRecord, PlacesProvider,
};
pub use marker::{MarkerPool, PoolStats};
pub use radius::{RadiusLadder, RadiusSelection};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for lunchmap.
///
/// Installs a global `tracing` subscriber honouring `RUST_LOG`, falling back
/// to `level`. Span close events are emitted, so every search generation logs
/// its duration. Safe to call more than once.
///
/// ```rust
/// use lunchmap::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), lunchmap::error::LunchmapError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::LunchmapError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("reqwest=warn".parse()?)
            .add_directive("hyper_util=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}
