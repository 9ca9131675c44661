//! Map point lookup and free-text search over the area layer.

pub mod reverse;
pub mod search;

use serde::Serialize;
use std::sync::Arc;

use crate::app::ports::FeatureServicePort;
use crate::constants::EARTH_RADIUS_M;

pub use reverse::{AreaAtPoint, AreaMatch};
pub use search::{SearchItem, SearchResults};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Spherical Web Mercator projection of WGS84 degrees.
pub fn project_web_mercator(lon: f64, lat: f64) -> Point {
    let x = lon.to_radians() * EARTH_RADIUS_M;
    let y = (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln() * EARTH_RADIUS_M;
    Point { x, y }
}

pub struct GeoLocator {
    service: Arc<dyn FeatureServicePort>,
}

impl GeoLocator {
    pub fn new(service: Arc<dyn FeatureServicePort>) -> Self {
        Self { service }
    }
}
