//! Basic nearby-restaurant search
//!
//! This example demonstrates the fundamental search flow:
//! - Building a coordinator over a places provider and a map surface
//! - Running a search for a menu around a fixed origin
//! - Reading the selected places and the radius the search settled on
//!
//! It runs against scripted test doubles so it works offline. Swap in
//! `lunchmap::provider::kakao::KakaoPlaces::from_env()?` to hit the real API.

use lunchmap::{Coordinate, GeoSearchConfig, GeoSearchCoordinator, PlaceRecord};
use lunchmap_provider::{
    ProviderStatus,
    test_data::{RecordingSurface, ScriptedProvider, raw_place_at_distance, seoul_sample},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let origin = Coordinate::SEOUL_CITY_HALL;

    // Two of the three default keywords answer; one overlaps with the first.
    let provider = ScriptedProvider::new()
        .places("김치찌개", seoul_sample(8))
        .places(
            "김치찌개 맛집",
            vec![
                raw_place_at_distance("seoul-1", "duplicate of seoul-1", origin, 601.0),
                raw_place_at_distance("extra", "을지로 찌개집", origin, 1_800.0),
            ],
        )
        .respond("김치찌개 음식점", ProviderStatus::ErrorResponse("503".into()));

    let surface = RecordingSurface::new();
    let coordinator = GeoSearchCoordinator::new(provider, surface.clone(), GeoSearchConfig::default());

    println!("Searching for '김치찌개' around {origin}:");
    let outcome = coordinator.search(origin, "김치찌개").await?;
    print_places(&outcome.selected);

    println!(
        "\nSettled on {} m ({} keyword query failed, absorbed)",
        outcome.effective_radius_meters, outcome.failed_queries
    );
    println!("Markers on the map: {}", surface.visible_count());

    // Highlight the second place as if the user clicked it in the list.
    if let Some(place) = outcome.selected.get(1) {
        coordinator.select_place(&place.id);
        println!("Highlighted: {}", place.name);
    }

    coordinator.close_search();
    println!("Closed search, markers on the map: {}", surface.visible_count());

    Ok(())
}

fn print_places(places: &[PlaceRecord]) {
    for (i, place) in places.iter().enumerate() {
        println!(
            "  {}. {} - {:.0} m, {}",
            i + 1,
            place.name,
            place.distance_meters.unwrap_or_default(),
            place.address
        );
    }
}
