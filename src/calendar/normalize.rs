use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

use super::layers::{LayerConfig, StatusRule};
use crate::types::{DayStatus, NormalizedEvent, RawFeature};

/// Keyword classification of a free-text service description.
pub fn classify_description(description: &str) -> DayStatus {
    let desc = description.to_lowercase();
    if desc.contains("rompimento") || desc.contains("conserto") || desc.contains("manuten") {
        DayStatus::Manutencao
    } else if desc.contains("parcial") {
        DayStatus::AbastecimentoParcial
    } else if desc.contains("abastec") {
        DayStatus::Abastecimento
    } else {
        // an event with no recognizable keyword still disrupts supply
        DayStatus::AbastecimentoParcial
    }
}

/// Truthiness of a flag attribute. Numbers are true when non-zero; strings
/// unless empty or a negative word.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(Value::String(s)) => {
            let s = s.trim().to_lowercase();
            !matches!(s.as_str(), "" | "0" | "false" | "n" | "nao" | "não")
        }
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

pub fn classify(layer: &LayerConfig, feature: &RawFeature) -> DayStatus {
    let source = feature.attributes.get(layer.status_field);
    match layer.rule {
        StatusRule::ServiceDescription => {
            classify_description(source.and_then(Value::as_str).unwrap_or_default())
        }
        StatusRule::CollapseFlag => {
            if is_truthy(source) {
                DayStatus::Manutencao
            } else {
                DayStatus::Abastecimento
            }
        }
        StatusRule::Unclassified => DayStatus::AbastecimentoParcial,
    }
}

/// Parses a feature service date. Numbers are epoch milliseconds; strings
/// without an offset are read as UTC. Falsy values count as absent.
pub fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            if millis == 0 {
                return None;
            }
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => parse_date_text(s.trim()),
        _ => None,
    }
}

fn parse_date_text(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Maps one raw feature onto its layer's event shape. Records lacking a usable
/// start or end are dropped.
pub fn normalize(layer: &LayerConfig, feature: &RawFeature) -> Option<NormalizedEvent> {
    let start = parse_timestamp(feature.attributes.get(layer.start_field));
    let end = parse_timestamp(feature.attributes.get(layer.end_field));
    let (Some(start), Some(end)) = (start, end) else {
        debug!(layer = layer.layer_id, "dropping record without start/end");
        return None;
    };

    Some(NormalizedEvent {
        layer_id: layer.layer_id,
        start,
        end,
        status: classify(layer, feature),
        attributes: feature.attributes.clone(),
    })
}

/// Normalizes every feature whose layer is configured, preserving input order.
pub fn normalize_all(layers: &[LayerConfig], features: &[RawFeature]) -> Vec<NormalizedEvent> {
    features
        .iter()
        .filter_map(|feature| {
            let layer = layers.iter().find(|l| l.layer_id == feature.layer_id);
            if layer.is_none() {
                debug!(layer = feature.layer_id, "no configuration for layer, skipping record");
            }
            normalize(layer?, feature)
        })
        .collect()
}
