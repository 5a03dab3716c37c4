//! Searching the live Kakao Local API
//!
//! Requires a REST API key in `KAKAO_REST_API_KEY`. The device position is
//! not available from a terminal, so the search falls back to the configured
//! origin (Seoul City Hall unless overridden).
//!
//! ```text
//! KAKAO_REST_API_KEY=... cargo run --example kakao_search -- 칼국수
//! ```

use lunchmap::{GeoSearchConfigBuilder, GeoSearchCoordinator, provider::kakao::KakaoPlaces};
use lunchmap_provider::{
    GeolocationError,
    test_data::{FixedGeolocator, RecordingSurface},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lunchmap::init_logging(tracing::Level::INFO)?;

    let menu = std::env::args().nth(1).unwrap_or_else(|| "칼국수".to_string());
    let provider = match KakaoPlaces::from_env() {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("{e}");
            return Ok(());
        }
    };

    let config = GeoSearchConfigBuilder::new().build();
    let coordinator = GeoSearchCoordinator::new(provider, RecordingSurface::new(), config);

    let outcome = coordinator
        .search_near_me(&FixedGeolocator::failing(GeolocationError::Unsupported), &menu)
        .await?;

    println!(
        "{} places for '{menu}' within {} m:",
        outcome.selected.len(),
        outcome.effective_radius_meters
    );
    for place in &outcome.selected {
        println!(
            "  {} ({:.0} m) {}",
            place.name,
            place.distance_meters.unwrap_or_default(),
            place.road_address.as_deref().unwrap_or(&place.address)
        );
    }
    Ok(())
}
