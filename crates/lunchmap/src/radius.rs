//! Progressive radius expansion over distance-annotated results.
//!
//! Dense areas should not flood the map with far-away places, and sparse
//! areas should still show something. [`select`] walks an ascending
//! [`RadiusLadder`] and stops at the first rung holding at least
//! `min_count` places; if none does, it falls back to the closest places
//! available.

pub use error::RadiusError;
use error::Result;
use lunchmap_provider::PlaceRecord;
use tracing::debug;

/// Default rungs in meters.
pub const DEFAULT_LADDER: [u32; 6] = [3_000, 5_000, 10_000, 15_000, 20_000, 30_000];

/// Default minimum number of places to surface.
pub const DEFAULT_MIN_COUNT: usize = 5;

/// A non-empty, strictly increasing sequence of search radii in meters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadiusLadder(pub(crate) Vec<u32>);

impl Default for RadiusLadder {
    fn default() -> Self {
        Self(DEFAULT_LADDER.to_vec())
    }
}

impl RadiusLadder {
    pub fn new(rungs: impl Into<Vec<u32>>) -> Result<Self> {
        let rungs = rungs.into();
        if rungs.is_empty() {
            return Err(RadiusError::EmptyLadder);
        }
        if let Some(pair) = rungs.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(RadiusError::NotIncreasing {
                previous: pair[0],
                next: pair[1],
            });
        }
        Ok(Self(rungs))
    }

    /// A single-rung ladder: search one fixed radius.
    pub fn fixed(radius_meters: u32) -> Self {
        Self(vec![radius_meters])
    }

    pub fn rungs(&self) -> &[u32] {
        &self.0
    }

    /// The widest rung, used as the provider query radius.
    pub fn largest(&self) -> u32 {
        // Never empty by construction.
        self.0.last().copied().unwrap_or_default()
    }
}

/// Outcome of [`select`].
#[derive(Debug, Clone, PartialEq)]
pub struct RadiusSelection {
    /// Closest places first
    pub selected: Vec<PlaceRecord>,
    /// The rung that satisfied the minimum, or the farthest selected distance
    pub effective_radius_meters: f64,
    /// The satisfying rung, `None` when the ladder was exhausted
    pub matched_rung: Option<u32>,
}

impl RadiusSelection {
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }
}

fn distance_of(record: &PlaceRecord) -> f64 {
    record.distance_meters.unwrap_or(f64::INFINITY)
}

/// Pick the smallest rung holding at least `min_count` places.
///
/// Every record must already carry `distance_meters`. Records are sorted
/// with a stable sort, so ties keep their discovery order and the output is
/// deterministic for a given input.
///
/// ```rust
/// use lunchmap::{Coordinate, PlaceRecord};
/// use lunchmap::radius::{RadiusLadder, select};
///
/// let records: Vec<PlaceRecord> = [400.0, 4_000.0, 150.0]
///     .iter()
///     .enumerate()
///     .map(|(i, d)| {
///         PlaceRecord::new(i.to_string(), "place", Coordinate::new(37.5, 127.0), "addr")
///             .with_distance(*d)
///     })
///     .collect();
///
/// let ladder = RadiusLadder::new(vec![500, 5_000]).unwrap();
/// let selection = select(records, &ladder, 2).unwrap();
/// assert_eq!(selection.effective_radius_meters, 500.0);
/// assert_eq!(selection.selected[0].id, "2");
/// ```
pub fn select(
    mut records: Vec<PlaceRecord>,
    ladder: &RadiusLadder,
    min_count: usize,
) -> Result<RadiusSelection> {
    if min_count == 0 {
        return Err(RadiusError::InvalidMinCount);
    }
    if let Some(missing) = records.iter().find(|r| r.distance_meters.is_none()) {
        return Err(RadiusError::MissingDistance {
            id: missing.id.clone(),
        });
    }

    records.sort_by(|a, b| distance_of(a).total_cmp(&distance_of(b)));

    for &rung in ladder.rungs() {
        let within = records.partition_point(|r| distance_of(r) <= f64::from(rung));
        if within >= min_count {
            records.truncate(min_count);
            debug!(
                rung,
                selected = records.len(),
                "Radius rung satisfied minimum"
            );
            return Ok(RadiusSelection {
                selected: records,
                effective_radius_meters: f64::from(rung),
                matched_rung: Some(rung),
            });
        }
    }

    records.truncate(min_count);
    let effective_radius_meters = records.last().map_or(0.0, distance_of);
    debug!(
        selected = records.len(),
        effective_radius_meters, "Radius ladder exhausted, using closest available"
    );
    Ok(RadiusSelection {
        selected: records,
        effective_radius_meters,
        matched_rung: None,
    })
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum RadiusError {
        #[error("Minimum result count must be positive")]
        InvalidMinCount,
        #[error("Place {id} has no distance annotation")]
        MissingDistance { id: String },
        #[error("Radius ladder must have at least one rung")]
        EmptyLadder,
        #[error("Radius ladder must be strictly increasing ({previous} then {next})")]
        NotIncreasing { previous: u32, next: u32 },
    }

    pub type Result<T> = std::result::Result<T, RadiusError>;
}
