use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    api::{ReverseGeocodeAPI, RouteAPI, SearchAPI, API},
    config::Config,
    entities::{Coordinates, Route, SearchResult},
    error::{invalid_input_error, route_error, upstream_error, Error},
};

/// HTTP client for the search, reverse-geocode and routing endpoints.
#[derive(Clone, Debug)]
pub struct RoutingService {
    client: reqwest::Client,
    base: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ReverseResponse {
    name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct RouteRequest {
    start_point: Coordinates,
    end_point: Coordinates,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct ErrorResponse {
    detail: String,
}

impl RoutingService {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: config.service_base.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }
}

fn check_status(status_code: u16) -> Result<(), Error> {
    if (400..500).contains(&status_code) {
        return Err(invalid_input_error());
    } else if !(200..300).contains(&status_code) {
        return Err(upstream_error());
    }

    Ok(())
}

/// Maps a non-2xx route response to the message shown to the user.
fn route_failure(body: &str) -> Error {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|response| response.detail);

    route_error(detail)
}

#[async_trait]
impl SearchAPI for RoutingService {
    #[tracing::instrument(skip(self))]
    async fn search(&self, text: String) -> Result<Vec<SearchResult>, Error> {
        let res = self
            .client
            .get(self.url("search"))
            .query(&[("q", text)])
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        let data: SearchResponse = res.json().await?;

        Ok(data.results)
    }
}

#[async_trait]
impl ReverseGeocodeAPI for RoutingService {
    #[tracing::instrument(skip(self))]
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, Error> {
        let res = self
            .client
            .get(self.url("reverse"))
            .query(&[("lat", coordinates.lat), ("lon", coordinates.lon)])
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        let data: ReverseResponse = res.json().await?;

        Ok(data.name)
    }
}

#[async_trait]
impl RouteAPI for RoutingService {
    #[tracing::instrument(skip(self))]
    async fn fetch_route(&self, start: Coordinates, end: Coordinates) -> Result<Route, Error> {
        let res = self
            .client
            .post(self.url("route"))
            .json(&RouteRequest {
                start_point: start,
                end_point: end,
            })
            .send()
            .await
            .map_err(|err| {
                tracing::error!("route request failed: {:?}", err);
                route_error(None)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            tracing::error!("route service answered {}: {}", status, body);

            return Err(route_failure(&body));
        }

        res.json().await.map_err(|err| {
            tracing::error!("malformed route payload: {:?}", err);
            route_error(None)
        })
    }
}

impl API for RoutingService {}

#[test]
fn route_failure_uses_detail() {
    let err = route_failure(r#"{"detail": "No path found between the road segments."}"#);

    assert_eq!(err.message, "No path found between the road segments.");
}

#[test]
fn route_failure_without_detail() {
    let err = route_failure("<html>bad gateway</html>");

    assert_eq!(err.message, crate::error::ROUTE_FETCH_FALLBACK_MESSAGE);
}

#[test]
fn status_classes() {
    assert!(check_status(200).is_ok());
    assert_eq!(check_status(422).unwrap_err().code, 101);
    assert_eq!(check_status(503).unwrap_err().code, 4);
}

#[test]
fn route_request_body_shape() {
    let body = serde_json::to_value(RouteRequest {
        start_point: Coordinates { lat: 1.0, lon: 2.0 },
        end_point: Coordinates { lat: 3.0, lon: 4.0 },
    })
    .unwrap();

    assert_eq!(
        body,
        serde_json::json!({
            "start_point": {"lat": 1.0, "lon": 2.0},
            "end_point": {"lat": 3.0, "lon": 4.0},
        })
    );
}

#[test]
fn base_url_joins_paths() {
    let service = RoutingService::new(&Config {
        service_base: "http://127.0.0.1:8000".into(),
    });

    assert_eq!(service.url("route"), "http://127.0.0.1:8000/route");
}
