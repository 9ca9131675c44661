use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// Attribute bag of one upstream record, as returned by the feature service
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Supply status of a calendar day, declared from most to least severe.
///
/// The derived `Ord` is the severity order: `min()` over a set of statuses
/// yields the most severe one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DayStatus {
    Manutencao,
    AbastecimentoParcial,
    Abastecimento,
    SemAbastecimento,
}

impl DayStatus {
    pub fn is_more_severe_than(self, other: DayStatus) -> bool {
        self < other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayStatus::Manutencao => "manutencao",
            DayStatus::AbastecimentoParcial => "abastecimento-parcial",
            DayStatus::Abastecimento => "abastecimento",
            DayStatus::SemAbastecimento => "sem-abastecimento",
        }
    }
}

impl Default for DayStatus {
    fn default() -> Self {
        DayStatus::SemAbastecimento
    }
}

impl std::fmt::Display for DayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One upstream record tagged with the layer it came from
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeature {
    pub layer_id: u32,
    pub attributes: Attributes,
}

/// A raw feature mapped onto the common event shape
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub layer_id: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: DayStatus,
    pub attributes: Attributes,
}

/// Per-day detail entry: the event's source attributes plus its classification.
///
/// Serializes as one flat object; `status` and `_layer` replace any upstream
/// attributes of the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct DayDetail {
    pub attributes: Attributes,
    pub status: DayStatus,
    pub layer_id: u32,
}

impl Serialize for DayDetail {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.attributes {
            if key != "status" && key != "_layer" {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("status", &self.status)?;
        map.serialize_entry("_layer", &self.layer_id)?;
        map.end()
    }
}

impl From<&NormalizedEvent> for DayDetail {
    fn from(event: &NormalizedEvent) -> Self {
        DayDetail {
            attributes: event.attributes.clone(),
            status: event.status,
            layer_id: event.layer_id,
        }
    }
}

/// Diagnostic record of one layer query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LayerAttempt {
    Completed {
        layer: u32,
        #[serde(rename = "where")]
        where_clause: String,
        status: u16,
        count: usize,
    },
    Failed {
        layer: u32,
        #[serde(rename = "where")]
        where_clause: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        error: String,
    },
}

impl LayerAttempt {
    pub fn layer(&self) -> u32 {
        match self {
            LayerAttempt::Completed { layer, .. } | LayerAttempt::Failed { layer, .. } => *layer,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LayerAttempt::Completed { .. })
    }
}

/// Month calendar for one supply area
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarResult {
    pub area: String,
    pub year: i32,
    pub month: u32,
    pub days: BTreeMap<NaiveDate, DayStatus>,
    pub day_details: BTreeMap<NaiveDate, Vec<DayDetail>>,
    pub total_events: usize,
    pub normalized_events: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<Vec<LayerAttempt>>,
}

impl CalendarResult {
    /// Status for a day, treating days without events as `sem-abastecimento`.
    pub fn status_on(&self, day: NaiveDate) -> DayStatus {
        self.days.get(&day).copied().unwrap_or_default()
    }
}

/// Feature collection body returned by `<layer>/query?f=json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSet {
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub exceeded_transfer_limit: bool,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Attributes,
    #[serde(default)]
    pub geometry: Option<serde_json::Value>,
}

/// Error object ArcGIS embeds in a 200 response
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl FeatureSet {
    pub fn from_attributes(rows: Vec<Attributes>) -> Self {
        FeatureSet {
            features: rows
                .into_iter()
                .map(|attributes| Feature { attributes, geometry: None })
                .collect(),
            ..Default::default()
        }
    }
}

/// Reads an attribute as text; numeric ids come back as numbers on some layers.
pub fn attr_string(attributes: &Attributes, key: &str) -> Option<String> {
    match attributes.get(key)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
