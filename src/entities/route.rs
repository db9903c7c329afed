use geo_types::LineString;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub total_distance_meters: f64,
    #[serde(with = "geojson_line_string")]
    pub path_geometry: LineString<f64>,
}

impl Route {
    pub fn distance_summary(&self) -> String {
        format!("{:.2} km", self.total_distance_meters / 1000.0)
    }
}

/// `LineString` carried as a GeoJSON geometry object, `[lon, lat]` positions.
mod geojson_line_string {
    use geo_types::LineString;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(line: &LineString<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        geojson::Geometry::from(line).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LineString<f64>, D::Error> {
        let geometry = geojson::Geometry::deserialize(deserializer)?;

        LineString::try_from(geometry.value).map_err(de::Error::custom)
    }
}

#[test]
fn route_reads_service_payload() {
    let route: Route = serde_json::from_value(serde_json::json!({
        "total_distance_meters": 1234.5,
        "path_geometry": {
            "type": "LineString",
            "coordinates": [[126.97, 37.56], [126.98, 37.57]]
        }
    }))
    .unwrap();

    assert_eq!(route.path_geometry.0.len(), 2);
    assert_eq!(route.path_geometry.0[0].x, 126.97);
    assert_eq!(route.path_geometry.0[0].y, 37.56);
    assert_eq!(route.distance_summary(), "1.23 km");
}

#[test]
fn route_rejects_other_geometries() {
    let result: Result<Route, _> = serde_json::from_value(serde_json::json!({
        "total_distance_meters": 0.0,
        "path_geometry": {"type": "Point", "coordinates": [1.0, 2.0]}
    }));

    assert!(result.is_err());
}
