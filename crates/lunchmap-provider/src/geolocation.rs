use futures::future::BoxFuture;
use thiserror::Error;

use crate::Coordinate;

/// Why the device position could not be determined.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location unavailable")]
    PositionUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Geolocation is not supported on this platform")]
    Unsupported,
}

/// Source of the device's current position.
pub trait Geolocator: Send + Sync {
    fn current_position(&self) -> BoxFuture<'_, Result<Coordinate, GeolocationError>>;
}
