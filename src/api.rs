use async_trait::async_trait;
use std::sync::Arc;

use crate::entities::{Coordinates, Route, SearchResult};
use crate::error::Error;

#[async_trait]
pub trait SearchAPI {
    async fn search(&self, text: String) -> Result<Vec<SearchResult>, Error>;
}

#[async_trait]
pub trait ReverseGeocodeAPI {
    /// Returns the place name for a position.
    async fn reverse_geocode(&self, coordinates: Coordinates) -> Result<String, Error>;
}

#[async_trait]
pub trait RouteAPI {
    async fn fetch_route(&self, start: Coordinates, end: Coordinates) -> Result<Route, Error>;
}

pub trait API: SearchAPI + ReverseGeocodeAPI + RouteAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
