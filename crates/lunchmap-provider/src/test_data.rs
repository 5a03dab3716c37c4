//! Scripted doubles for the provider, map surface and geolocation seams.
//!
//! Used by unit tests, the core crate's integration tests and the examples.
//! All delays go through `tokio::time`, so tests running with a paused clock
//! see them resolve deterministically.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use tracing::debug;

use crate::{
    Coordinate, GeolocationError, Geolocator, KeywordSearch, MapSurface, MarkerId, MarkerOptions,
    PlacesProvider, ProviderStatus, RawPlace,
};

/// Mean Earth radius used to place fixtures at exact distances.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Builds a raw provider document at the given position.
pub fn raw_place(id: &str, name: &str, at: Coordinate) -> RawPlace {
    RawPlace {
        id: id.to_string(),
        place_name: name.to_string(),
        category_name: "음식점 > 한식".to_string(),
        category_group_code: "FD6".to_string(),
        address_name: format!("서울 중구 테스트로 {id}"),
        x: at.longitude.to_string(),
        y: at.latitude.to_string(),
        place_url: format!("http://place.map.kakao.com/{id}"),
        // Deliberately wrong so tests catch any code trusting it.
        distance: "1".to_string(),
        ..RawPlace::default()
    }
}

/// A point `meters` due north of `origin`.
///
/// Along a meridian the great-circle distance is exactly `R * Δφ`, so the
/// haversine distance back to `origin` equals `meters` up to float rounding.
pub fn north_of(origin: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(
        origin.latitude + (meters / EARTH_RADIUS_M).to_degrees(),
        origin.longitude,
    )
}

/// A raw document placed `meters` due north of `origin`.
pub fn raw_place_at_distance(id: &str, name: &str, origin: Coordinate, meters: f64) -> RawPlace {
    raw_place(id, name, north_of(origin, meters))
}

/// Restaurants around Seoul City Hall at known distances, closest first.
pub fn seoul_sample(count: usize) -> Vec<RawPlace> {
    const DISTANCES: [f64; 12] = [
        250.0, 600.0, 1_200.0, 2_400.0, 3_500.0, 4_200.0, 6_000.0, 8_500.0, 12_000.0, 16_000.0,
        22_000.0, 28_000.0,
    ];
    DISTANCES
        .iter()
        .cycle()
        .take(count)
        .enumerate()
        .map(|(i, meters)| {
            raw_place_at_distance(
                &format!("seoul-{i}"),
                &format!("시청 맛집 {i}"),
                Coordinate::SEOUL_CITY_HALL,
                meters + i as f64,
            )
        })
        .collect()
}

/// A scripted reply for one keyword.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub status: ProviderStatus,
    pub delay: Duration,
}

/// A places provider answering from a per-keyword script.
///
/// Each keyword holds a queue of responses; the last response in a queue is
/// sticky and repeats for every further call. Unscripted keywords answer
/// `ZERO_RESULT` immediately.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    scripts: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
    calls: Mutex<Vec<KeywordSearch>>,
    not_ready: AtomicBool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `keyword`.
    #[must_use]
    pub fn respond(self, keyword: &str, status: ProviderStatus) -> Self {
        self.respond_after(keyword, Duration::ZERO, status)
    }

    /// Queue a response for `keyword` that resolves after `delay`.
    #[must_use]
    pub fn respond_after(self, keyword: &str, delay: Duration, status: ProviderStatus) -> Self {
        self.push(keyword, ScriptedResponse { status, delay });
        self
    }

    /// Queue an `OK` response carrying `places`.
    #[must_use]
    pub fn places(self, keyword: &str, places: Vec<RawPlace>) -> Self {
        self.respond(keyword, ProviderStatus::Ok(places))
    }

    pub fn push(&self, keyword: &str, response: ScriptedResponse) {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(keyword.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn set_ready(&self, ready: bool) {
        self.not_ready.store(!ready, Ordering::SeqCst);
    }

    /// Every request received so far, in call order.
    pub fn calls(&self) -> Vec<KeywordSearch> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_response(&self, keyword: &str) -> ScriptedResponse {
        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        let scripted = match scripts.get_mut(keyword) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        scripted.unwrap_or(ScriptedResponse {
            status: ProviderStatus::ZeroResult,
            delay: Duration::ZERO,
        })
    }
}

impl PlacesProvider for ScriptedProvider {
    fn keyword_search(&self, request: KeywordSearch) -> BoxFuture<'_, ProviderStatus> {
        let response = self.next_response(&request.keyword);
        debug!(keyword = %request.keyword, status = response.status.code(), "Scripted search");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        Box::pin(async move {
            if !response.delay.is_zero() {
                tokio::time::sleep(response.delay).await;
            }
            response.status
        })
    }

    fn is_ready(&self) -> bool {
        !self.not_ready.load(Ordering::SeqCst)
    }
}

/// Something the recording surface was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Created(MarkerId),
    Shown(MarkerId, Coordinate),
    Hidden(MarkerId),
    Centered(Coordinate, Option<u8>),
}

/// Marker object handed out by [`RecordingSurface`].
#[derive(Debug)]
pub struct RecordedMarker {
    pub id: MarkerId,
}

#[derive(Debug, Default)]
struct SurfaceLog {
    events: Vec<SurfaceEvent>,
    visible: HashSet<MarkerId>,
    titles: HashMap<MarkerId, String>,
    created: usize,
}

/// A map surface that records every call.
///
/// Clones share one log, so a test can keep a clone after handing the surface
/// to a marker pool.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    log: Arc<Mutex<SurfaceLog>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_log<T>(&self, f: impl FnOnce(&mut SurfaceLog) -> T) -> T {
        f(&mut self.log.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.with_log(|log| log.events.clone())
    }

    /// Number of marker objects ever created on this surface.
    pub fn created(&self) -> usize {
        self.with_log(|log| log.created)
    }

    pub fn visible_count(&self) -> usize {
        self.with_log(|log| log.visible.len())
    }

    pub fn is_visible(&self, id: MarkerId) -> bool {
        self.with_log(|log| log.visible.contains(&id))
    }

    pub fn title_of(&self, id: MarkerId) -> Option<String> {
        self.with_log(|log| log.titles.get(&id).cloned())
    }

    pub fn last_center(&self) -> Option<(Coordinate, Option<u8>)> {
        self.with_log(|log| {
            log.events.iter().rev().find_map(|event| match event {
                SurfaceEvent::Centered(at, zoom) => Some((*at, *zoom)),
                _ => None,
            })
        })
    }
}

impl MapSurface for RecordingSurface {
    type Marker = RecordedMarker;

    fn create_marker(&mut self, id: MarkerId) -> Self::Marker {
        self.with_log(|log| {
            log.created += 1;
            log.events.push(SurfaceEvent::Created(id));
        });
        RecordedMarker { id }
    }

    fn show_marker(&mut self, marker: &mut Self::Marker, at: Coordinate, options: &MarkerOptions) {
        self.with_log(|log| {
            log.visible.insert(marker.id);
            match &options.title {
                Some(title) => log.titles.insert(marker.id, title.clone()),
                None => log.titles.remove(&marker.id),
            };
            log.events.push(SurfaceEvent::Shown(marker.id, at));
        });
    }

    fn hide_marker(&mut self, marker: &mut Self::Marker) {
        self.with_log(|log| {
            log.visible.remove(&marker.id);
            log.events.push(SurfaceEvent::Hidden(marker.id));
        });
    }

    fn set_center(&mut self, at: Coordinate, zoom_level: Option<u8>) {
        self.with_log(|log| log.events.push(SurfaceEvent::Centered(at, zoom_level)));
    }
}

/// A geolocator with a canned answer.
#[derive(Debug, Clone)]
pub struct FixedGeolocator {
    answer: Option<Result<Coordinate, GeolocationError>>,
    delay: Duration,
}

impl FixedGeolocator {
    pub fn at(position: Coordinate) -> Self {
        Self {
            answer: Some(Ok(position)),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(error: GeolocationError) -> Self {
        Self {
            answer: Some(Err(error)),
            delay: Duration::ZERO,
        }
    }

    /// Never answers.
    pub fn hanging() -> Self {
        Self {
            answer: None,
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Geolocator for FixedGeolocator {
    fn current_position(&self) -> BoxFuture<'_, Result<Coordinate, GeolocationError>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.answer {
                Some(answer) => answer.clone(),
                None => futures::future::pending().await,
            }
        })
    }
}
