use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    #[serde(default = "unknown_category", deserialize_with = "or_default_category")]
    pub category: String,
    #[serde(default = "unknown_address", deserialize_with = "or_default_address")]
    pub address: String,
    pub location: Coordinates,
}

fn unknown_category() -> String {
    "unknown".into()
}

fn unknown_address() -> String {
    "N/A".into()
}

fn or_default_category<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_else(unknown_category))
}

fn or_default_address<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_else(unknown_address))
}

#[test]
fn missing_fields_take_defaults() {
    let result: SearchResult = serde_json::from_str(
        r#"{"name": "Seoul Station", "category": null, "location": {"lat": 37.55, "lon": 126.97}}"#,
    )
    .unwrap();

    assert_eq!(result.category, "unknown");
    assert_eq!(result.address, "N/A");
    assert_eq!(result.location.lat, 37.55);
}
