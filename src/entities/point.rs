use serde::{Deserialize, Serialize};

/// Wire form of a position. Map clicks arrive as `{lat, lng}`, the routing
/// service speaks `{lat, lon}`; both deserialize here.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
}

impl Coordinates {
    pub fn label(&self) -> String {
        format!("{:.5}, {:.5}", self.lat, self.lon)
    }
}

impl From<Coordinates> for geo_types::Coord<f64> {
    fn from(coordinates: Coordinates) -> Self {
        geo_types::Coord {
            x: coordinates.lon,
            y: coordinates.lat,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub label: Option<String>,
}

impl GeoPoint {
    pub fn new(coordinates: Coordinates, label: Option<String>) -> Self {
        Self {
            latitude: coordinates.lat,
            longitude: coordinates.lon,
            label,
        }
    }

    pub fn unlabelled(coordinates: Coordinates) -> Self {
        Self::new(coordinates, None)
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.latitude,
            lon: self.longitude,
        }
    }

    pub fn coordinate_label(&self) -> String {
        self.coordinates().label()
    }

    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => self.coordinate_label(),
        }
    }
}

#[test]
fn coordinate_label_uses_five_decimals() {
    let point = GeoPoint::unlabelled(Coordinates { lat: 12.3, lon: 45.6 });

    assert_eq!(point.coordinate_label(), "12.30000, 45.60000");
    assert_eq!(point.display_label(), "12.30000, 45.60000");
}

#[test]
fn click_payload_accepts_lng() {
    let coordinates: Coordinates = serde_json::from_str(r#"{"lat": 1.5, "lng": 2.5}"#).unwrap();

    assert_eq!(coordinates, Coordinates { lat: 1.5, lon: 2.5 });
    assert_eq!(
        serde_json::to_value(coordinates).unwrap(),
        serde_json::json!({"lat": 1.5, "lon": 2.5})
    );
}
