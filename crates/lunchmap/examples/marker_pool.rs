//! Marker pooling and click handling
//!
//! This example shows how the marker pool keeps allocation bounded:
//! - Binding markers to place keys and releasing them again
//! - Re-running searches without creating new marker objects
//! - Forwarding marker clicks back to the coordinator

use std::sync::{Arc, Mutex};

use lunchmap::{
    Coordinate, GeoSearchConfigBuilder, GeoSearchCoordinator, MarkerOptions, marker::MarkerPool,
};
use lunchmap_provider::test_data::{RecordingSurface, ScriptedProvider, seoul_sample};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    standalone_pool()?;
    pooled_searches().await?;
    Ok(())
}

fn standalone_pool() -> Result<(), Box<dyn std::error::Error>> {
    println!("Standalone pool:");
    let surface = RecordingSurface::new();
    let mut pool = MarkerPool::with_surface(surface.clone(), 0);
    let at = Coordinate::SEOUL_CITY_HALL;

    for key in ["a", "b", "c", "d", "e"] {
        pool.acquire(key, at, &MarkerOptions::titled(key))?;
    }
    for key in ["a", "b", "c"] {
        pool.release(key);
    }
    for key in ["f", "g", "h"] {
        pool.acquire(key, at, &MarkerOptions::default())?;
    }

    let stats = pool.stats();
    println!(
        "  bound: {}, available: {}, created: {} (surface saw {})",
        stats.bound,
        stats.available,
        stats.created,
        surface.created()
    );
    Ok(())
}

async fn pooled_searches() -> Result<(), Box<dyn std::error::Error>> {
    println!("\nRepeated searches:");
    let provider = ScriptedProvider::new()
        .places("돈까스", seoul_sample(12))
        .places("돈까스 맛집", seoul_sample(12));
    let surface = RecordingSurface::new();
    let config = GeoSearchConfigBuilder::new().marker_pool(5, 10).build();
    let coordinator = GeoSearchCoordinator::new(provider, surface.clone(), config);

    let clicked = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&clicked);
    coordinator.on_select(move |place| {
        if let Ok(mut slot) = sink.lock() {
            *slot = Some(place.name.clone());
        }
    });

    for round in 1..=10 {
        coordinator
            .search(Coordinate::SEOUL_CITY_HALL, "돈까스")
            .await?;
        if round % 5 == 0 {
            println!(
                "  after {round} searches: {} marker objects created",
                surface.created()
            );
        }
    }

    if let Some(marker) = coordinator.marker_for("seoul-2") {
        coordinator.handle_marker_click(marker);
    }
    if let Ok(slot) = clicked.lock() {
        println!("  clicked: {}", slot.as_deref().unwrap_or("nothing"));
    }
    Ok(())
}
