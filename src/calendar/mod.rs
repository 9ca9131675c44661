//! Month calendar of supply interruptions for one area.
//!
//! Pipeline: query every event layer, normalize records into events, expand
//! events over the days of the requested month and keep the most severe
//! status per day.

pub mod layers;
pub mod normalize;
pub mod query;
pub mod resolver;
pub mod response;

use std::sync::Arc;

use metrics::counter;
use tracing::{info, instrument};

use crate::app::ports::FeatureServicePort;
use crate::error::{CalendarError, Result};
use crate::types::CalendarResult;
use layers::LayerConfig;

/// Validated calendar request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRequest {
    pub area: String,
    pub month: u32,
    pub year: i32,
    pub debug: bool,
}

impl CalendarRequest {
    /// Validates raw query values. Rejects missing values, non-integers and
    /// months outside 1..=12.
    pub fn parse(
        area: Option<&str>,
        month: Option<&str>,
        year: Option<&str>,
        debug: Option<&str>,
    ) -> Result<Self> {
        let (Some(area), Some(month), Some(year)) = (
            area.map(str::trim).filter(|s| !s.is_empty()),
            month.map(str::trim).filter(|s| !s.is_empty()),
            year.map(str::trim).filter(|s| !s.is_empty()),
        ) else {
            return Err(CalendarError::invalid("Required parameters: area, month, year"));
        };

        let month: u32 = month
            .parse()
            .map_err(|_| CalendarError::invalid(format!("Invalid month: {month}")))?;
        let year: i32 = year
            .parse()
            .map_err(|_| CalendarError::invalid(format!("Invalid year: {year}")))?;
        if !(1..=12).contains(&month) {
            return Err(CalendarError::invalid(format!("Month out of range: {month}")));
        }
        if resolver::month_bounds(year, month).is_none() {
            return Err(CalendarError::invalid(format!("Year out of range: {year}")));
        }

        Ok(Self { area: area.to_string(), month, year, debug: debug_flag(debug) })
    }
}

/// `debug=1`, `debug=true` or any other non-empty value except `0`/`false`.
pub fn debug_flag(value: Option<&str>) -> bool {
    match value.map(|v| v.trim().to_lowercase()) {
        None => false,
        Some(v) => !matches!(v.as_str(), "" | "0" | "false"),
    }
}

/// Stateless aggregation engine; safe to share across concurrent requests.
pub struct CalendarEngine {
    service: Arc<dyn FeatureServicePort>,
    layers: Vec<LayerConfig>,
}

impl CalendarEngine {
    pub fn new(service: Arc<dyn FeatureServicePort>) -> Self {
        Self::with_layers(service, layers::default_layers())
    }

    pub fn with_layers(service: Arc<dyn FeatureServicePort>, layers: Vec<LayerConfig>) -> Self {
        Self { service, layers }
    }

    pub fn layers(&self) -> &[LayerConfig] {
        &self.layers
    }

    /// Builds the calendar. Never fails because of a single layer; failed
    /// layers show up in the debug attempts.
    #[instrument(skip(self), fields(area = %request.area, month = request.month, year = request.year))]
    pub async fn run(&self, request: &CalendarRequest) -> CalendarResult {
        counter!("calendar_requests_total").increment(1);

        let fetch = query::fetch_layers(self.service.as_ref(), &self.layers, request).await;
        let total_events = fetch.features.len();
        let events = normalize::normalize_all(&self.layers, &fetch.features);
        let resolution = resolver::resolve(&events, request.year, request.month);

        info!(
            total_events,
            normalized = events.len(),
            days = resolution.days.len(),
            failed_layers = fetch.attempts.iter().filter(|a| !a.is_success()).count(),
            "calendar built"
        );

        response::build_response(request, resolution, total_events, events.len(), fetch.attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_valid_input() {
        let req = CalendarRequest::parse(Some("AB123"), Some("3"), Some("2024"), Some("1")).unwrap();
        assert_eq!(req, CalendarRequest { area: "AB123".into(), month: 3, year: 2024, debug: true });
    }

    #[test]
    fn parse_rejects_missing_values() {
        for (a, m, y) in [
            (None, Some("3"), Some("2024")),
            (Some("A"), None, Some("2024")),
            (Some("A"), Some("3"), None),
            (Some(""), Some("3"), Some("2024")),
        ] {
            let err = CalendarRequest::parse(a, m, y, None).unwrap_err();
            assert!(matches!(err, CalendarError::InvalidInput(_)));
        }
    }

    #[test]
    fn parse_rejects_bad_numbers() {
        for (m, y) in [("0", "2024"), ("13", "2024"), ("março", "2024"), ("3", "20x4"), ("-1", "2024")] {
            assert!(CalendarRequest::parse(Some("A"), Some(m), Some(y), None).is_err(), "{m}/{y}");
        }
    }

    #[test]
    fn debug_flag_values() {
        assert!(debug_flag(Some("1")));
        assert!(debug_flag(Some("true")));
        assert!(!debug_flag(Some("0")));
        assert!(!debug_flag(Some("")));
        assert!(!debug_flag(None));
    }
}
