mod point;
mod role;
mod route;
mod search;

pub use point::{Coordinates, GeoPoint};
pub use role::Role;
pub use route::Route;
pub use search::SearchResult;
