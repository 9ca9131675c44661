use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::instrument;

use super::{collate, split_multi, AreaDirectory};
use crate::app::ports::FeatureQuery;
use crate::constants::{AREA_LAYER, FIELD_MUNICIPALITIES, FIELD_NEIGHBORHOODS, FIELD_NEIGHBORHOOD_CODES};
use crate::error::{CalendarError, Result};
use crate::types::Feature;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighborhoods {
    pub municipio: String,
    pub bairros: Vec<String>,
    /// neighborhood name -> code
    pub codigos: BTreeMap<String, String>,
}

impl AreaDirectory {
    #[instrument(skip(self))]
    pub async fn neighborhoods(&self, municipio: Option<&str>, q: Option<&str>) -> Result<Neighborhoods> {
        let municipio = municipio
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CalendarError::invalid("Parameter municipio is required"))?;

        let mut where_clause = format!("{FIELD_MUNICIPALITIES}='{}'", FeatureQuery::literal(municipio));
        if let Some(q) = q.map(str::trim).filter(|s| !s.is_empty()) {
            where_clause.push_str(&format!(
                " AND {FIELD_NEIGHBORHOODS} LIKE '%{}%'",
                FeatureQuery::literal(&q.to_uppercase())
            ));
        }
        let query = FeatureQuery::new(where_clause)
            .out_fields([FIELD_NEIGHBORHOODS, FIELD_NEIGHBORHOOD_CODES]);
        let resp = self.service.query(AREA_LAYER, &query).await?;

        let (bairros, codigos) = collect_neighborhoods(&resp.feature_set.features);
        Ok(Neighborhoods { municipio: municipio.to_string(), bairros, codigos })
    }
}

/// Names and codes are parallel comma lists; a name's code is the one at
/// the same position, later records overriding earlier ones.
fn collect_neighborhoods(features: &[Feature]) -> (Vec<String>, BTreeMap<String, String>) {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    let mut codes = BTreeMap::new();

    for f in features {
        let Some(raw_names) = f.attributes.get(FIELD_NEIGHBORHOODS).and_then(|v| v.as_str()) else {
            continue;
        };
        let raw_codes = f
            .attributes
            .get(FIELD_NEIGHBORHOOD_CODES)
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let row_codes: Vec<&str> = split_multi(raw_codes).collect();

        for (i, name) in split_multi(raw_names).enumerate() {
            if seen.insert(name.to_string()) {
                names.push(name.to_string());
            }
            if let Some(code) = row_codes.get(i) {
                codes.insert(name.to_string(), code.to_string());
            }
        }
    }

    names.sort_by(|a, b| collate(a, b));
    (names, codes)
}
