use super::resolver::DayResolution;
use super::CalendarRequest;
use crate::types::{CalendarResult, LayerAttempt};

/// Assembles the outbound calendar. Attempts are only exposed in debug mode.
pub fn build_response(
    request: &CalendarRequest,
    resolution: DayResolution,
    total_events: usize,
    normalized_events: usize,
    attempts: Vec<LayerAttempt>,
) -> CalendarResult {
    CalendarResult {
        area: request.area.clone(),
        year: request.year,
        month: request.month,
        days: resolution.days,
        day_details: resolution.day_details,
        total_events,
        normalized_events,
        attempts: request.debug.then_some(attempts),
    }
}
