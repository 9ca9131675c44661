use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::{GeoLocator, Point};
use crate::app::ports::FeatureQuery;
use crate::constants::*;
use crate::error::Result;
use crate::types::{attr_string, Feature};

const NO_MATCH_SCORE: usize = 5000;
const NO_FIELDS_SCORE: usize = 9999;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    pub id: Option<String>,
    pub nome_calend: Option<String>,
    pub nome_abast: Option<String>,
    pub municipio: Option<String>,
    pub bairro: Option<String>,
    pub center: Option<Point>,
    pub score: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub q: String,
    pub count: usize,
    pub items: Vec<SearchItem>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    pub raw_count: usize,
}

/// Center of a point geometry, or the bounding-box center of all ring vertices.
pub fn centroid(geometry: &Value) -> Option<Point> {
    if let (Some(x), Some(y)) = (geometry.get("x").and_then(Value::as_f64), geometry.get("y").and_then(Value::as_f64)) {
        return Some(Point { x, y });
    }

    let rings = geometry.get("rings")?.as_array()?;
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    let mut seen = false;
    for vertex in rings.iter().filter_map(Value::as_array).flatten() {
        let Some(coords) = vertex.as_array() else { continue };
        let (Some(x), Some(y)) = (
            coords.first().and_then(Value::as_f64),
            coords.get(1).and_then(Value::as_f64),
        ) else {
            continue;
        };
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
        seen = true;
    }
    seen.then(|| Point { x: (min_x + max_x) / 2.0, y: (min_y + max_y) / 2.0 })
}

/// Lower is better: `2 * position + |len(field) - len(term)|` over the best
/// matching field. `term` must already be upper-case.
pub fn score_match(fields: &[Option<&str>], term: &str) -> usize {
    let present: Vec<&str> = fields.iter().flatten().copied().filter(|f| !f.is_empty()).collect();
    if present.is_empty() {
        return NO_FIELDS_SCORE;
    }
    let term_len = term.chars().count();
    present
        .iter()
        .filter_map(|field| {
            let upper = field.to_uppercase();
            let byte_idx = upper.find(term)?;
            let idx = upper[..byte_idx].chars().count();
            let len = upper.chars().count();
            Some(idx * 2 + len.abs_diff(term_len))
        })
        .fold(NO_MATCH_SCORE, usize::min)
}

fn search_where(term: &str) -> String {
    let t = FeatureQuery::literal(term);
    format!(
        "(UPPER({FIELD_AREA_NAME}) LIKE '%{t}%' OR UPPER({FIELD_CALENDAR_NAME}) LIKE '%{t}%' OR UPPER({FIELD_MUNICIPALITIES}) LIKE '%{t}%' OR UPPER({FIELD_NEIGHBORHOODS}) LIKE '%{t}%')"
    )
}

fn to_item(feature: &Feature, term: &str) -> SearchItem {
    let a = &feature.attributes;
    let nome_abast = attr_string(a, FIELD_AREA_NAME);
    let nome_calend = attr_string(a, FIELD_CALENDAR_NAME);
    let municipio = attr_string(a, FIELD_MUNICIPALITIES);
    let bairro = attr_string(a, FIELD_NEIGHBORHOODS);
    let score = score_match(
        &[nome_abast.as_deref(), nome_calend.as_deref(), municipio.as_deref(), bairro.as_deref()],
        term,
    );
    SearchItem {
        id: attr_string(a, FIELD_AREA_ID),
        nome_calend,
        nome_abast,
        municipio,
        bairro,
        center: feature.geometry.as_ref().and_then(centroid),
        score,
    }
}

impl GeoLocator {
    /// Ranked supply areas whose names, municipalities or neighborhoods contain `q`.
    #[instrument(skip(self, debug))]
    pub async fn search(&self, q: Option<&str>, debug: bool) -> Result<SearchResults> {
        let q = q.map(str::trim).unwrap_or_default();
        if q.chars().count() < SEARCH_MIN_CHARS {
            return Ok(SearchResults {
                q: q.to_string(),
                count: 0,
                items: Vec::new(),
                where_clause: None,
                raw_count: 0,
            });
        }

        let term = q.to_uppercase();
        let where_clause = search_where(&term);
        let query = FeatureQuery::new(where_clause.clone())
            .out_fields(["*"])
            .with_geometry()
            .param("inSR", WGS84_WKID)
            .param("outSR", WGS84_WKID);
        let resp = self.service.query(AREA_LAYER, &query).await?;

        let raw_count = resp.feature_set.features.len();
        let mut items: Vec<SearchItem> =
            resp.feature_set.features.iter().map(|f| to_item(f, &term)).collect();
        items.sort_by_key(|item| item.score);
        let items: Vec<SearchItem> = items
            .into_iter()
            .filter(|item| item.id.as_deref().is_some_and(|id| !id.is_empty()))
            .take(SEARCH_MAX_RESULTS)
            .collect();
        debug!(raw_count, kept = items.len(), "search ranked");

        Ok(SearchResults {
            q: q.to_string(),
            count: items.len(),
            items,
            where_clause: debug.then_some(where_clause),
            raw_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::in_memory::{InMemoryFeatureService, LayerReply};
    use crate::types::Attributes;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn centroid_of_point_and_rings() {
        assert_eq!(centroid(&json!({"x": 1.5, "y": -2.0})), Some(Point { x: 1.5, y: -2.0 }));
        let poly = json!({"rings": [[[0.0, 0.0], [4.0, 0.0], [4.0, 2.0], [0.0, 0.0]], [[10.0, 10.0]]]});
        assert_eq!(centroid(&poly), Some(Point { x: 5.0, y: 5.0 }));
        assert_eq!(centroid(&json!({"rings": []})), None);
        assert_eq!(centroid(&json!({"paths": [[[0, 0]]]})), None);
    }

    #[test]
    fn scoring_prefers_early_and_tight_matches() {
        assert_eq!(score_match(&[Some("RECIFE")], "RECIFE"), 0);
        assert_eq!(score_match(&[Some("Jaboatão")], "BOA"), 4 + 5);
        assert_eq!(score_match(&[Some("Olinda"), Some("Boa Viagem")], "BOA"), 7);
        assert_eq!(score_match(&[Some("Olinda")], "BOA"), NO_MATCH_SCORE);
        assert_eq!(score_match(&[None, Some("")], "BOA"), NO_FIELDS_SCORE);
    }

    fn feature(attrs: serde_json::Value, geometry: Option<serde_json::Value>) -> Feature {
        Feature { attributes: attrs.as_object().unwrap().clone(), geometry }
    }

    #[tokio::test]
    async fn short_queries_do_not_hit_upstream() {
        let svc = InMemoryFeatureService::new();
        let geo = GeoLocator::new(Arc::new(svc.clone()));
        let res = geo.search(Some(" a "), false).await.unwrap();
        assert!(res.items.is_empty());
        assert!(svc.received().is_empty());
    }

    #[tokio::test]
    async fn ranks_filters_and_caps_results() {
        let mut features = vec![
            feature(json!({"ID": "2", "NOMABAST": "JARDIM BOA VIAGEM"}), None),
            feature(json!({"ID": "1", "NOMABAST": "BOA VIAGEM"}), Some(json!({"x": -34.9, "y": -8.1}))),
            feature(json!({"NOMABAST": "BOA"}), None),
        ];
        for i in 0..30 {
            features.push(feature(json!({"ID": format!("x{i}"), "BAIRROS": "Outro, Boa Vista"}), None));
        }
        let svc = InMemoryFeatureService::new().with_reply(0, LayerReply::Features(features));
        let geo = GeoLocator::new(Arc::new(svc.clone()));

        let res = geo.search(Some("boa viagem"), true).await.unwrap();
        assert_eq!(res.raw_count, 33);
        assert_eq!(res.count, SEARCH_MAX_RESULTS);
        assert_eq!(res.items[0].id.as_deref(), Some("1"));
        assert_eq!(res.items[0].center, Some(Point { x: -34.9, y: -8.1 }));
        assert_eq!(res.items[1].id.as_deref(), Some("2"));
        assert!(res.where_clause.as_deref().unwrap().contains("UPPER(NOMABAST) LIKE '%BOA VIAGEM%'"));

        let (_, query) = &svc.received()[0];
        assert!(query.return_geometry);
        assert_eq!(query.get("outSR"), Some("4326"));
    }

    #[tokio::test]
    async fn where_clause_hidden_without_debug() {
        let rows: Vec<Attributes> = vec![json!({"ID": "1", "NOMECALEND": "D'ÁGUA"}).as_object().unwrap().clone()];
        let svc = InMemoryFeatureService::new().with_attributes(0, rows);
        let geo = GeoLocator::new(Arc::new(svc.clone()));
        let res = geo.search(Some("d'água"), false).await.unwrap();
        assert!(res.where_clause.is_none());
        assert_eq!(res.count, 1);
        assert!(svc.received()[0].1.where_clause.contains("'%D''ÁGUA%'"));
    }

    #[tokio::test]
    async fn upstream_failure_propagates() {
        let svc = InMemoryFeatureService::new().with_reply(0, LayerReply::Status(503));
        let geo = GeoLocator::new(Arc::new(svc));
        assert!(geo.search(Some("recife"), false).await.is_err());
    }
}
