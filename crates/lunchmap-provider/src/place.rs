//! Place records and the raw provider documents they are normalised from.

use serde::{Deserialize, Serialize};

use crate::{Coordinate, ProviderError, Result};

/// A single search result, normalised from a provider document.
///
/// `id` is the deduplication key. `distance_meters` is always computed by the
/// search core from `coordinate` and the query origin; it starts unset and is
/// never copied from the provider, whose distance semantics differ between
/// query types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    pub address: String,
    pub road_address: Option<String>,
    pub phone: Option<String>,
    pub category_name: Option<String>,
    pub external_url: Option<String>,
    pub distance_meters: Option<f64>,
}

impl PlaceRecord {
    /// Creates a record with only the required fields populated.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        coordinate: Coordinate,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            coordinate,
            address: address.into(),
            road_address: None,
            phone: None,
            category_name: None,
            external_url: None,
            distance_meters: None,
        }
    }

    /// Returns a copy annotated with the given distance.
    #[must_use]
    pub fn with_distance(mut self, distance_meters: f64) -> Self {
        self.distance_meters = Some(distance_meters);
        self
    }
}

/// A place document as returned by the Kakao Local keyword search.
///
/// Coordinates arrive as decimal strings with `x` as longitude and `y` as
/// latitude. Optional fields arrive as empty strings rather than nulls.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPlace {
    pub id: String,
    pub place_name: String,
    #[serde(default)]
    pub category_name: String,
    #[serde(default)]
    pub category_group_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address_name: String,
    #[serde(default)]
    pub road_address_name: String,
    pub x: String,
    pub y: String,
    #[serde(default)]
    pub place_url: String,
    /// Provider-reported distance. Only present for some query shapes and
    /// deliberately dropped by [`RawPlace::normalize`].
    #[serde(default)]
    pub distance: String,
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_component(id: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ProviderError::UnparsableCoordinate {
            id: id.to_string(),
            value: value.to_string(),
        })
}

impl RawPlace {
    /// Converts the provider document into a [`PlaceRecord`].
    ///
    /// Fails when the coordinate strings do not parse or fall outside the
    /// valid ranges. The provider distance field is ignored.
    pub fn normalize(self) -> Result<PlaceRecord> {
        let longitude = parse_component(&self.id, &self.x)?;
        let latitude = parse_component(&self.id, &self.y)?;
        let coordinate = Coordinate::try_new(latitude, longitude)?;

        Ok(PlaceRecord {
            id: self.id,
            name: self.place_name,
            coordinate,
            address: self.address_name,
            road_address: non_empty(&self.road_address_name),
            phone: non_empty(&self.phone),
            category_name: non_empty(&self.category_name),
            external_url: non_empty(&self.place_url),
            distance_meters: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KAKAO_DOCUMENT: &str = r#"{
        "address_name": "서울 중구 태평로1가 31",
        "category_group_code": "FD6",
        "category_group_name": "음식점",
        "category_name": "음식점 > 한식 > 찌개,전골",
        "distance": "418",
        "id": "26338954",
        "phone": "02-123-4567",
        "place_name": "시청 김치찌개",
        "place_url": "http://place.map.kakao.com/26338954",
        "road_address_name": "",
        "x": "126.97723484374",
        "y": "37.56682420267543"
    }"#;

    #[test]
    fn test_normalize_kakao_document() {
        let raw: RawPlace = serde_json::from_str(KAKAO_DOCUMENT).unwrap();
        let record = raw.normalize().unwrap();

        assert_eq!(record.id, "26338954");
        assert_eq!(record.name, "시청 김치찌개");
        assert!((record.coordinate.latitude - 37.566_824).abs() < 1e-5);
        assert!((record.coordinate.longitude - 126.977_234).abs() < 1e-5);
        assert_eq!(record.road_address, None, "Empty strings become None");
        assert_eq!(record.phone.as_deref(), Some("02-123-4567"));
        assert_eq!(
            record.distance_meters, None,
            "Provider distance must never be trusted"
        );
    }

    #[test]
    fn test_normalize_rejects_garbage_coordinates() {
        let raw = RawPlace {
            id: "1".into(),
            place_name: "broken".into(),
            x: "not-a-number".into(),
            y: "37.5".into(),
            ..Default::default()
        };
        assert!(matches!(
            raw.normalize(),
            Err(ProviderError::UnparsableCoordinate { .. })
        ));

        let raw = RawPlace {
            id: "2".into(),
            place_name: "swapped".into(),
            x: "37.5".into(),
            y: "126.9".into(),
            ..Default::default()
        };
        assert!(
            matches!(raw.normalize(), Err(ProviderError::InvalidCoordinate { .. })),
            "Latitude above 90 must be rejected"
        );
    }

    #[test]
    fn test_with_distance() {
        let record = PlaceRecord::new("a", "A", Coordinate::new(0.0, 0.0), "addr").with_distance(12.5);
        assert_eq!(record.distance_meters, Some(12.5));
    }
}
