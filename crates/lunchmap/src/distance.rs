//! Great-circle distance between two coordinates.

use lunchmap_provider::Coordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between `a` and `b`.
///
/// Total and symmetric; `distance(a, a) == 0.0`. Assumes a spherical Earth,
/// so do not rely on sub-meter accuracy.
///
/// ```rust
/// use lunchmap::{Coordinate, distance};
///
/// let city_hall = Coordinate::new(37.5665, 126.9780);
/// let north = Coordinate::new(37.5755, 126.9780);
/// let meters = distance(city_hall, north);
/// assert!((meters - 1000.0).abs() < 10.0);
/// ```
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1] for near-antipodal input.
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}
