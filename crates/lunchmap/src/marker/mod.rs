//! A bounded pool of reusable map markers.
//!
//! Provider marker objects are expensive to create and destroy. A search that
//! returns twenty places and is re-run ten times should still only ever
//! allocate about twenty markers. The pool keeps released markers hidden on
//! the surface and hands them out again on the next acquisition.
//!
//! Each bound marker belongs to exactly one external key at a time. Click
//! handlers are tracked per key and dropped on release, so a recycled marker
//! never fires a listener registered for the place it used to show.
//!
//! # Examples
//!
//! ```rust
//! use lunchmap::{Coordinate, MarkerOptions, marker::MarkerPool};
//! use lunchmap_provider::test_data::RecordingSurface;
//!
//! let surface = RecordingSurface::new();
//! let mut pool = MarkerPool::new(0);
//! pool.set_surface(surface.clone());
//!
//! pool.acquire("place-1", Coordinate::SEOUL_CITY_HALL, &MarkerOptions::titled("시청"))?;
//! pool.release("place-1");
//! pool.acquire("place-2", Coordinate::SEOUL_CITY_HALL, &MarkerOptions::default())?;
//!
//! assert_eq!(surface.created(), 1);
//! # Ok::<(), lunchmap::marker::MarkerPoolError>(())
//! ```

use std::{fmt, sync::Arc};

use ahash::AHashMap as HashMap;
pub use error::MarkerPoolError;
use error::Result;
use lunchmap_provider::{Coordinate, MapSurface, MarkerId, MarkerOptions};
use tracing::{debug, warn};

/// Default cap on idle markers kept by [`MarkerPool::optimize`].
pub const DEFAULT_MAX_AVAILABLE: usize = 20;

/// Called with the bound key when its marker is clicked.
pub type ClickHandler = Arc<dyn Fn(&str) + Send + Sync>;

struct PooledMarker<M> {
    id: MarkerId,
    marker: M,
}

/// Occupancy counters for a [`MarkerPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Markers currently alive (bound + available)
    pub total: usize,
    pub bound: usize,
    pub available: usize,
    /// Markers ever allocated by this pool
    pub created: u64,
}

pub struct MarkerPool<S: MapSurface> {
    surface: Option<S>,
    available: Vec<PooledMarker<S::Marker>>,
    bound: HashMap<String, PooledMarker<S::Marker>>,
    key_by_marker: HashMap<MarkerId, String>,
    listeners: HashMap<String, ClickHandler>,
    initial_size: usize,
    created: u64,
}

impl<S: MapSurface> fmt::Debug for MarkerPool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerPool")
            .field("has_surface", &self.surface.is_some())
            .field("stats", &self.stats())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<S: MapSurface> MarkerPool<S> {
    /// Create an unbound pool that pre-allocates `initial_size` markers once a
    /// surface is set.
    pub fn new(initial_size: usize) -> Self {
        Self {
            surface: None,
            available: Vec::with_capacity(initial_size),
            bound: HashMap::new(),
            key_by_marker: HashMap::new(),
            listeners: HashMap::new(),
            initial_size,
            created: 0,
        }
    }

    pub fn with_surface(surface: S, initial_size: usize) -> Self {
        let mut pool = Self::new(initial_size);
        pool.set_surface(surface);
        pool
    }

    /// Bind the pool to a drawing surface.
    ///
    /// If a surface was already set, every bound marker is released on it
    /// first and the old surface is returned.
    pub fn set_surface(&mut self, surface: S) -> Option<S> {
        if self.surface.is_some() {
            self.release_all();
        }
        let previous = self.surface.replace(surface);

        let alive = self.available.len() + self.bound.len();
        if let Some(surface) = self.surface.as_mut() {
            for _ in alive..self.initial_size {
                self.available
                    .push(Self::allocate(surface, &mut self.created));
            }
        }
        debug!(
            initial_size = self.initial_size,
            available = self.available.len(),
            "Marker pool bound to surface"
        );
        previous
    }

    /// Centre the surface, if one is set.
    pub fn center_on(&mut self, at: Coordinate, zoom_level: Option<u8>) -> bool {
        self.surface
            .as_mut()
            .map(|surface| surface.set_center(at, zoom_level))
            .is_some()
    }

    fn allocate(surface: &mut S, created: &mut u64) -> PooledMarker<S::Marker> {
        let id = MarkerId(*created);
        *created += 1;
        PooledMarker {
            id,
            marker: surface.create_marker(id),
        }
    }

    /// Show a marker for `key` at `at`, reusing an idle marker when possible.
    ///
    /// The caller must release `key` before acquiring it again. Re-acquiring a
    /// bound key trips a debug assertion; release builds rebind it.
    pub fn acquire(
        &mut self,
        key: &str,
        at: Coordinate,
        options: &MarkerOptions,
    ) -> Result<MarkerId> {
        debug_assert!(
            !self.bound.contains_key(key),
            "marker key {key} is already bound"
        );
        if self.bound.contains_key(key) {
            warn!(key, "Re-acquiring a bound marker key, releasing it first");
            self.release(key);
        }

        let Some(surface) = self.surface.as_mut() else {
            return Err(MarkerPoolError::NoSurface);
        };
        let mut pooled = if let Some(pooled) = self.available.pop() {
            debug!(key, available = self.available.len(), "Reusing pooled marker");
            pooled
        } else {
            debug!(key, "Allocating new marker");
            Self::allocate(surface, &mut self.created)
        };
        surface.show_marker(&mut pooled.marker, at, options);
        let id = pooled.id;
        self.key_by_marker.insert(id, key.to_string());
        self.bound.insert(key.to_string(), pooled);
        Ok(id)
    }

    /// Hide the marker bound to `key` and return it to the pool.
    ///
    /// Returns `false` when `key` was not bound.
    pub fn release(&mut self, key: &str) -> bool {
        let Some(mut pooled) = self.bound.remove(key) else {
            return false;
        };
        if let Some(surface) = self.surface.as_mut() {
            surface.hide_marker(&mut pooled.marker);
        }
        self.listeners.remove(key);
        self.key_by_marker.remove(&pooled.id);
        self.available.push(pooled);
        true
    }

    /// Release every bound key. Returns how many were released.
    pub fn release_all(&mut self) -> usize {
        let keys: Vec<String> = self.bound.keys().cloned().collect();
        let released = keys.iter().filter(|key| self.release(key)).count();
        if released > 0 {
            debug!(released, available = self.available.len(), "Released all markers");
        }
        released
    }

    /// Register the click handler for the marker bound to `key`, replacing any
    /// previous handler. Returns `false` when `key` is not bound.
    pub fn on_click<F>(&mut self, key: &str, callback: F) -> bool
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        if !self.bound.contains_key(key) {
            return false;
        }
        self.listeners.insert(key.to_string(), Arc::new(callback));
        true
    }

    /// The key and handler currently attached to `marker`, if any.
    ///
    /// Lets callers that keep the pool behind a lock run the handler after
    /// releasing it.
    pub fn click_target(&self, marker: MarkerId) -> Option<(String, ClickHandler)> {
        let key = self.key_by_marker.get(&marker)?;
        let handler = self.listeners.get(key)?;
        Some((key.clone(), Arc::clone(handler)))
    }

    /// Dispatch a click on `marker` to the handler of its bound key.
    pub fn click(&self, marker: MarkerId) -> bool {
        match self.click_target(marker) {
            Some((key, handler)) => {
                handler(&key);
                true
            }
            None => false,
        }
    }

    /// Drop idle markers beyond `max_available`. Returns how many were dropped.
    pub fn optimize(&mut self, max_available: usize) -> usize {
        let dropped = self.available.len().saturating_sub(max_available);
        self.available.truncate(max_available);
        if dropped > 0 {
            debug!(dropped, kept = self.available.len(), "Trimmed marker pool");
        }
        dropped
    }

    pub fn is_bound(&self, key: &str) -> bool {
        self.bound.contains_key(key)
    }

    pub fn marker_id(&self, key: &str) -> Option<MarkerId> {
        self.bound.get(key).map(|pooled| pooled.id)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total: self.bound.len() + self.available.len(),
            bound: self.bound.len(),
            available: self.available.len(),
            created: self.created,
        }
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum MarkerPoolError {
        #[error("Marker pool has no map surface; call set_surface first")]
        NoSurface,
    }

    pub type Result<T> = std::result::Result<T, MarkerPoolError>;
}
