use serde::Serialize;
use serde_json::json;
use tracing::instrument;

use super::{project_web_mercator, GeoLocator, Point};
use crate::app::ports::FeatureQuery;
use crate::constants::*;
use crate::error::{CalendarError, Result};
use crate::types::attr_string;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaMatch {
    pub id: String,
    pub nome_calend: Option<String>,
    pub nome_abast: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaAtPoint {
    pub lat: f64,
    pub lon: f64,
    pub mercator: Point,
    pub count: usize,
    pub features: Vec<AreaMatch>,
}

/// Parses and range-checks a WGS84 coordinate pair.
pub fn parse_coordinates(lat: Option<&str>, lon: Option<&str>) -> Result<(f64, f64)> {
    let (Some(lat), Some(lon)) = (
        lat.map(str::trim).filter(|s| !s.is_empty()),
        lon.map(str::trim).filter(|s| !s.is_empty()),
    ) else {
        return Err(CalendarError::invalid("Required parameters: lat, lon"));
    };
    let (Ok(lat), Ok(lon)) = (lat.parse::<f64>(), lon.parse::<f64>()) else {
        return Err(CalendarError::invalid("Invalid lat/lon"));
    };
    if !lat.is_finite() || !lon.is_finite() {
        return Err(CalendarError::invalid("Invalid lat/lon"));
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(CalendarError::invalid("lat/lon out of range"));
    }
    Ok((lat, lon))
}

impl GeoLocator {
    /// Supply areas containing the given map point.
    #[instrument(skip(self))]
    pub async fn area_at(&self, lat: Option<&str>, lon: Option<&str>) -> Result<AreaAtPoint> {
        let (lat, lon) = parse_coordinates(lat, lon)?;
        let mercator = project_web_mercator(lon, lat);

        let geometry = json!({
            "x": mercator.x,
            "y": mercator.y,
            "spatialReference": { "wkid": WEB_MERCATOR_WKID },
        });
        let query = FeatureQuery::new("1=1")
            .out_fields([FIELD_OBJECT_ID, FIELD_CALENDAR_NAME, FIELD_AREA_NAME, FIELD_AREA_ID])
            .param("geometry", geometry)
            .param("geometryType", "esriGeometryPoint")
            .param("inSR", WEB_MERCATOR_WKID)
            .param("outSR", WEB_MERCATOR_WKID);
        let resp = self.service.query(AREA_LAYER, &query).await?;

        let features: Vec<AreaMatch> = resp
            .feature_set
            .features
            .iter()
            .filter_map(|f| {
                let id = attr_string(&f.attributes, FIELD_AREA_ID).filter(|id| !id.is_empty())?;
                Some(AreaMatch {
                    id,
                    nome_calend: attr_string(&f.attributes, FIELD_CALENDAR_NAME),
                    nome_abast: attr_string(&f.attributes, FIELD_AREA_NAME),
                })
            })
            .collect();

        Ok(AreaAtPoint { lat, lon, mercator, count: features.len(), features })
    }
}
