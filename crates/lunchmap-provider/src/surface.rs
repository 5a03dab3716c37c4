//! The map-drawing surface markers live on.

use std::fmt;

use crate::Coordinate;

/// Stable identity of one pooled marker object.
///
/// Assigned by the marker pool when the surface creates the marker, and used
/// by map integrations to report clicks back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// Presentation options applied when a marker is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerOptions {
    /// Hover title, usually the place name
    pub title: Option<String>,
    /// Stacking order; higher draws on top
    pub z_index: Option<i32>,
}

impl MarkerOptions {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            z_index: None,
        }
    }
}

/// A map view able to draw markers.
///
/// Marker objects are created by the surface but owned by the caller (the
/// marker pool), which decides when they are shown, moved and hidden. A
/// hidden marker must stay cheap to show again.
pub trait MapSurface {
    type Marker;

    /// Allocate a new, hidden marker object.
    fn create_marker(&mut self, id: MarkerId) -> Self::Marker;

    /// Move `marker` to `at`, apply `options` and make it visible.
    fn show_marker(&mut self, marker: &mut Self::Marker, at: Coordinate, options: &MarkerOptions);

    /// Detach `marker` from the map without destroying it.
    fn hide_marker(&mut self, marker: &mut Self::Marker);

    /// Re-centre the view, optionally changing the zoom level.
    fn set_center(&mut self, at: Coordinate, zoom_level: Option<u8>);
}
