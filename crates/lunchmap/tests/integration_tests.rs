//! Integration tests for lunchmap geo search
//!
//! These tests drive the public API end to end against the scripted provider,
//! recording surface and fixed geolocator from `lunchmap_provider::test_data`.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use lunchmap::{
    Coordinate, GeoSearchConfigBuilder, GeoSearchCoordinator, KeywordPolicy, MarkerOptions,
    SearchError, SearchNotice, SearchState, distance,
    keywords::base_menu,
    marker::MarkerPool,
    radius::{RadiusLadder, select},
};
use lunchmap_provider::{
    ProviderStatus,
    test_data::{
        FixedGeolocator, RecordingSurface, ScriptedProvider, north_of, raw_place,
        raw_place_at_distance, seoul_sample,
    },
};

const ORIGIN: Coordinate = Coordinate::SEOUL_CITY_HALL;

fn setup_test_env() {
    let _ = lunchmap::init_logging(tracing::Level::WARN);
}

#[tokio::test]
async fn test_full_workflow() {
    setup_test_env();

    let provider = ScriptedProvider::new()
        .places("떡볶이", seoul_sample(12))
        .places(
            "떡볶이 맛집",
            vec![raw_place_at_distance("seoul-0", "중복", ORIGIN, 250.0)],
        );
    let surface = RecordingSurface::new();
    let coordinator = GeoSearchCoordinator::new(
        provider,
        surface.clone(),
        GeoSearchConfigBuilder::new().marker_pool(0, 20).build(),
    );
    let picked = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&picked);
    coordinator.on_select(move |place| log.lock().unwrap().push(place.name.clone()));

    // 1. Search
    let outcome = coordinator
        .search(ORIGIN, "떡볶이 (국물)")
        .await
        .expect("Search should succeed");
    assert_eq!(outcome.selected.len(), 5, "Should surface the minimum count");
    assert_eq!(
        outcome.selected[0].name, "시청 맛집 0",
        "The first keyword's record wins the duplicate"
    );
    assert!(
        outcome
            .selected
            .windows(2)
            .all(|w| w[0].distance_meters <= w[1].distance_meters),
        "Results should be sorted by distance"
    );

    // 2. Every selected place has a visible marker
    for place in &outcome.selected {
        let marker = coordinator
            .marker_for(&place.id)
            .expect("Selected place should have a marker");
        assert!(surface.is_visible(marker));
    }

    // 3. Click a marker
    let marker = coordinator.marker_for(&outcome.selected[4].id).unwrap();
    assert!(coordinator.handle_marker_click(marker));
    assert_eq!(*picked.lock().unwrap(), vec![outcome.selected[4].name.clone()]);

    // 4. Close
    coordinator.close_search();
    assert_eq!(surface.visible_count(), 0);
    assert_eq!(coordinator.snapshot().state, SearchState::Idle);
}

#[tokio::test]
async fn test_subscribers_observe_done_state() {
    setup_test_env();

    let coordinator = GeoSearchCoordinator::new(
        ScriptedProvider::new().places("우동", seoul_sample(5)),
        RecordingSurface::new(),
        GeoSearchConfigBuilder::new()
            .keyword_policy(KeywordPolicy::menu_only())
            .build(),
    );
    let mut updates = coordinator.subscribe();

    let handle = coordinator
        .start_search(ORIGIN, "우동")
        .expect("Search should start");
    handle.await.unwrap().unwrap();

    assert!(updates.has_changed().unwrap());
    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(snapshot.state, SearchState::Done);
    assert_eq!(snapshot.menu.as_deref(), Some("우동"));
    assert_eq!(snapshot.selected.len(), 5);
    assert_eq!(snapshot.effective_radius_meters, 5_000.0);
}

#[tokio::test(start_paused = true)]
async fn test_late_results_never_overwrite_newer_search() {
    setup_test_env();

    let provider = ScriptedProvider::new()
        .respond_after(
            "쌀국수",
            Duration::from_secs(3),
            ProviderStatus::Ok(vec![raw_place_at_distance("old", "old", ORIGIN, 10.0)]),
        )
        .respond_after(
            "쌀국수",
            Duration::from_millis(50),
            ProviderStatus::Ok(vec![raw_place_at_distance("new", "new", ORIGIN, 10.0)]),
        );
    let coordinator = GeoSearchCoordinator::new(
        provider,
        RecordingSurface::new(),
        GeoSearchConfigBuilder::new()
            .keyword_policy(KeywordPolicy::menu_only())
            .build(),
    );

    let moved = north_of(ORIGIN, 2_000.0);
    let first = coordinator.start_search(ORIGIN, "쌀국수").unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    let second = coordinator.start_search(moved, "쌀국수").unwrap();

    assert!(second.await.unwrap().is_ok());
    assert!(matches!(
        first.await.unwrap(),
        Err(SearchError::StaleSearchDiscarded { .. })
    ));

    let snapshot = coordinator.snapshot();
    assert_eq!(snapshot.origin, Some(moved));
    assert_eq!(snapshot.selected[0].id, "new");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_partial_failure_on_multi_thread_runtime() {
    setup_test_env();

    let provider = ScriptedProvider::new()
        .respond("냉면", ProviderStatus::Unknown("connection reset".into()))
        .places("냉면 맛집", vec![raw_place("1", "평양면옥", north_of(ORIGIN, 400.0))])
        .respond("냉면 음식점", ProviderStatus::ZeroResult);
    let coordinator =
        GeoSearchCoordinator::new(provider, RecordingSurface::new(), Default::default());

    let outcome = coordinator.search(ORIGIN, "냉면").await.unwrap();
    assert_eq!(outcome.selected.len(), 1);
    assert_eq!(outcome.failed_queries, 1);
    assert_eq!(outcome.matched_rung, None, "One place cannot satisfy the minimum");
}

#[tokio::test]
async fn test_every_query_failing_is_reported() {
    setup_test_env();

    let provider = ScriptedProvider::new()
        .respond("냉면", ProviderStatus::ErrorResponse("quota".into()))
        .respond("냉면 맛집", ProviderStatus::ErrorResponse("quota".into()))
        .respond("냉면 음식점", ProviderStatus::ErrorResponse("quota".into()));
    let coordinator =
        GeoSearchCoordinator::new(provider, RecordingSurface::new(), Default::default());

    let result = coordinator.search(ORIGIN, "냉면").await;
    assert!(matches!(result, Err(SearchError::AllQueriesFailed { .. })));
    assert_eq!(coordinator.snapshot().state, SearchState::Error);

    // A retry is always possible.
    let retry = coordinator.search(ORIGIN, "냉면").await;
    assert!(retry.is_err());
    assert_eq!(coordinator.current_generation(), 2);
}

#[tokio::test]
async fn test_empty_area_reports_notice() {
    setup_test_env();

    let coordinator = GeoSearchCoordinator::new(
        ScriptedProvider::new(),
        RecordingSurface::new(),
        GeoSearchConfigBuilder::fixed_radius(5_000).build(),
    );
    let outcome = coordinator
        .search_near_me(&FixedGeolocator::at(north_of(ORIGIN, 500.0)), "훠궈")
        .await
        .unwrap();

    assert!(outcome.selected.is_empty());
    assert_eq!(outcome.notice, Some(SearchNotice::NoResultsInRange));
    assert_eq!(outcome.effective_radius_meters, 0.0);
}

#[test]
fn test_marker_pool_reuse() {
    let surface = RecordingSurface::new();
    let mut pool = MarkerPool::with_surface(surface.clone(), 0);

    for key in ["1", "2", "3", "4", "5"] {
        pool.acquire(key, ORIGIN, &MarkerOptions::default()).unwrap();
    }
    for key in ["1", "2", "3"] {
        pool.release(key);
    }
    for key in ["6", "7", "8"] {
        pool.acquire(key, ORIGIN, &MarkerOptions::default()).unwrap();
    }

    assert_eq!(surface.created(), 5, "No net growth from reuse");
}

#[test]
fn test_distance_and_radius_building_blocks() {
    let north = Coordinate::new(37.5755, 126.9780);
    let meters = distance(ORIGIN, north);
    assert!((meters - 1_000.0).abs() <= 10.0);
    assert_eq!(distance(ORIGIN, north), distance(north, ORIGIN));

    let records = seoul_sample(3)
        .into_iter()
        .map(|raw| {
            let record = raw.normalize().unwrap();
            let meters = distance(ORIGIN, record.coordinate);
            record.with_distance(meters)
        })
        .collect();
    let selection = select(records, &RadiusLadder::default(), 5).unwrap();
    assert_eq!(selection.selected.len(), 3);
    assert_eq!(
        selection.effective_radius_meters,
        selection.selected[2].distance_meters.unwrap()
    );

    assert_eq!(base_menu("  제육 볶음 (매운맛) "), "제육 볶음");
}
