//! Contracts for the collaborators the lunchmap search core talks to.
//!
//! The search core never touches a mapping SDK directly. It consumes three
//! narrow seams defined here:
//!
//! - [`PlacesProvider`]: asynchronous keyword search returning a closed
//!   [`ProviderStatus`], plus a readiness check wrapped by [`ReadinessGate`].
//! - [`MapSurface`]: the drawing surface markers are created on, moved, hidden
//!   and centred.
//! - [`Geolocator`]: a single "where am I" call that may fail or time out.
//!
//! The `kakao` feature (enabled by default) ships a Kakao Local REST client
//! implementing [`PlacesProvider`]. The `test_data` feature exposes scripted
//! doubles for all three seams.
pub mod coordinate;
pub mod geolocation;
#[cfg(feature = "kakao")]
pub mod kakao;
pub mod place;
pub mod provider;
pub mod readiness;
pub mod surface;
#[cfg(any(test, feature = "test_data"))]
pub mod test_data;

pub use coordinate::Coordinate;
pub use geolocation::{GeolocationError, Geolocator};
pub use place::{PlaceRecord, RawPlace};
pub use provider::{
    DEFAULT_PAGE_SIZE, KeywordSearch, PlacesProvider, ProviderStatus, RESTAURANT_CATEGORY,
    SortBy,
};
pub use readiness::ReadinessGate;
pub use surface::{MapSurface, MarkerId, MarkerOptions};

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum ProviderError {
        #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
        InvalidCoordinate { latitude: f64, longitude: f64 },
        #[error("Invalid coordinate component '{value}' in place {id}")]
        UnparsableCoordinate { id: String, value: String },
        #[error("Places provider did not become ready within {waited_ms}ms")]
        NotReady { waited_ms: u128 },
        #[error("Missing API key: set {0}")]
        MissingApiKey(&'static str),
        #[cfg(feature = "kakao")]
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
    }

    pub type Result<T> = std::result::Result<T, ProviderError>;
}

pub use error::{ProviderError, Result};
