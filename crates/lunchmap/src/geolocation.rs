//! Resolving the search origin from the device position.

use std::time::Duration;

use lunchmap_provider::{Coordinate, GeolocationError, Geolocator};
use tracing::{info, warn};

/// Default deadline for a position fix.
pub const DEFAULT_GEOLOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the user is, or `fallback` when that cannot be determined in time.
///
/// Never fails: denied permission, an unavailable position, an unsupported
/// device, a timeout and an out-of-range fix all resolve to `fallback`.
pub async fn resolve_origin<G: Geolocator + ?Sized>(
    geolocator: &G,
    timeout: Duration,
    fallback: Coordinate,
) -> Coordinate {
    let position = match tokio::time::timeout(timeout, geolocator.current_position()).await {
        Ok(position) => position,
        Err(_) => Err(GeolocationError::Timeout),
    };

    match position {
        Ok(at) if at.is_valid() => {
            info!(%at, "Resolved current position");
            at
        }
        Ok(at) => {
            warn!(%at, %fallback, "Geolocation returned an invalid position, using fallback");
            fallback
        }
        Err(e) => {
            warn!(error = %e, %fallback, "Geolocation failed, using fallback");
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use lunchmap_provider::test_data::FixedGeolocator;

    use super::*;

    const HERE: Coordinate = Coordinate::new(37.4979, 127.0276);

    #[tokio::test]
    async fn test_successful_fix() {
        let origin = resolve_origin(
            &FixedGeolocator::at(HERE),
            DEFAULT_GEOLOCATION_TIMEOUT,
            Coordinate::SEOUL_CITY_HALL,
        )
        .await;
        assert_eq!(origin, HERE);
    }

    #[tokio::test]
    async fn test_permission_denied_falls_back() {
        let origin = resolve_origin(
            &FixedGeolocator::failing(GeolocationError::PermissionDenied),
            DEFAULT_GEOLOCATION_TIMEOUT,
            Coordinate::SEOUL_CITY_HALL,
        )
        .await;
        assert_eq!(origin, Coordinate::SEOUL_CITY_HALL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        let origin = resolve_origin(
            &FixedGeolocator::hanging(),
            Duration::from_secs(3),
            Coordinate::SEOUL_CITY_HALL,
        )
        .await;
        assert_eq!(origin, Coordinate::SEOUL_CITY_HALL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fix_within_deadline() {
        let origin = resolve_origin(
            &FixedGeolocator::at(HERE).after(Duration::from_secs(2)),
            Duration::from_secs(3),
            Coordinate::SEOUL_CITY_HALL,
        )
        .await;
        assert_eq!(origin, HERE);
    }

    #[tokio::test]
    async fn test_invalid_fix_falls_back() {
        let origin = resolve_origin(
            &FixedGeolocator::at(Coordinate::new(120.0, 0.0)),
            DEFAULT_GEOLOCATION_TIMEOUT,
            Coordinate::SEOUL_CITY_HALL,
        )
        .await;
        assert_eq!(origin, Coordinate::SEOUL_CITY_HALL);
    }
}
