use async_trait::async_trait;

use crate::error::Result;
use crate::types::FeatureSet;

/// Parameters of one `<layer>/query` call. `f=json` is implied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureQuery {
    pub where_clause: String,
    pub out_fields: Vec<String>,
    pub return_geometry: bool,
    /// Extra service parameters (pagination, distinct, spatial filters)
    pub extra: Vec<(String, String)>,
}

impl FeatureQuery {
    pub fn new(where_clause: impl Into<String>) -> Self {
        Self { where_clause: where_clause.into(), ..Default::default() }
    }

    pub fn out_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.out_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_geometry(mut self) -> Self {
        self.return_geometry = true;
        self
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.extra.push((key.to_string(), value.to_string()));
        self
    }

    /// Escapes a value for use inside a single-quoted SQL literal.
    pub fn literal(value: &str) -> String {
        value.replace('\'', "''")
    }

    /// Value of an extra parameter, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.extra.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Query-string pairs in the order the service expects them.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("f".to_string(), "json".to_string()),
            ("where".to_string(), self.where_clause.clone()),
            ("returnGeometry".to_string(), self.return_geometry.to_string()),
            ("spatialRel".to_string(), "esriSpatialRelIntersects".to_string()),
        ];
        if !self.out_fields.is_empty() {
            params.push(("outFields".to_string(), self.out_fields.join(",")));
        }
        params.extend(self.extra.iter().cloned());
        params
    }
}

#[derive(Clone, Debug)]
pub struct QueryResponse {
    pub status: u16,
    pub feature_set: FeatureSet,
}

/// Read-only access to the upstream geospatial feature service.
///
/// Implementations return `Err` for transport failures, timeouts, non-success
/// HTTP statuses and service-level error bodies alike.
#[async_trait]
pub trait FeatureServicePort: Send + Sync {
    async fn query(&self, layer_id: u32, query: &FeatureQuery) -> Result<QueryResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_include_format_and_fields() {
        let q = FeatureQuery::new("1=1")
            .out_fields(["A", "B"])
            .param("resultOffset", 1000);
        let params = q.to_params();
        assert_eq!(params[0], ("f".into(), "json".into()));
        assert!(params.contains(&("where".into(), "1=1".into())));
        assert!(params.contains(&("outFields".into(), "A,B".into())));
        assert!(params.contains(&("returnGeometry".into(), "false".into())));
        assert_eq!(q.get("resultOffset"), Some("1000"));
    }

    #[test]
    fn literal_doubles_quotes() {
        assert_eq!(FeatureQuery::literal("Olho d'Água"), "Olho d''Água");
    }

    #[test]
    fn out_fields_omitted_when_empty() {
        let params = FeatureQuery::new("1=1").to_params();
        assert!(!params.iter().any(|(k, _)| k == "outFields"));
    }
}
