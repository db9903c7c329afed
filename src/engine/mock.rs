use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{
    api::{ReverseGeocodeAPI, RouteAPI, SearchAPI, API},
    entities::{Coordinates, Route, SearchResult},
    error::{route_error, upstream_error, Error},
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Search(String),
    Reverse(Coordinates),
    Route(Coordinates, Coordinates),
}

/// In-memory stand-in for the remote services. Answers immediately unless
/// told otherwise, and records every call it receives.
#[derive(Default)]
pub struct MockAPI {
    calls: Mutex<Vec<Call>>,
    reverse_delays: Mutex<VecDeque<Duration>>,
    reverse_fails: Mutex<bool>,
    route_failure: Mutex<Option<String>>,
}

impl MockAPI {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Latencies for upcoming reverse-geocode calls, in call order.
    pub fn delay_reverse(&self, delays: Vec<Duration>) {
        self.reverse_delays.lock().unwrap().extend(delays);
    }

    pub fn fail_reverse(&self) {
        *self.reverse_fails.lock().unwrap() = true;
    }

    pub fn fail_route(&self, detail: &str) {
        *self.route_failure.lock().unwrap() = Some(detail.into());
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SearchAPI for MockAPI {
    async fn search(&self, text: String) -> Result<Vec<SearchResult>, Error> {
        self.record(Call::Search(text.clone()));

        Ok(vec![SearchResult {
            name: format!("{} result", text),
            category: "unknown".into(),
            address: "N/A".into(),
            location: Coordinates { lat: 37.5, lon: 127.0 },
        }])
    }
}

#[async_trait]
impl ReverseGeocodeAPI for MockAPI {
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, Error> {
        self.record(Call::Reverse(coordinates));

        let delay = self.reverse_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if *self.reverse_fails.lock().unwrap() {
            return Err(upstream_error());
        }

        Ok(format!("Place at {:.1}", coordinates.lat))
    }
}

#[async_trait]
impl RouteAPI for MockAPI {
    async fn fetch_route(&self, start: Coordinates, end: Coordinates) -> Result<Route, Error> {
        self.record(Call::Route(start, end));

        if let Some(detail) = self.route_failure.lock().unwrap().clone() {
            return Err(route_error(Some(detail)));
        }

        Ok(Route {
            total_distance_meters: 1000.0,
            path_geometry: geo_types::LineString::from(vec![
                geo_types::Coord::from(start),
                geo_types::Coord::from(end),
            ]),
        })
    }
}

impl API for MockAPI {}
