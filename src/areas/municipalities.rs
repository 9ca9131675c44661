use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use super::{collate, split_multi, AreaDirectory, Municipalities};
use crate::app::ports::FeatureQuery;
use crate::constants::{AREA_LAYER, FIELD_MUNICIPALITIES, MAX_PAGES, PAGE_SIZE};
use crate::error::Result;
use crate::types::Feature;

impl AreaDirectory {
    /// Distinct municipality names, optionally filtered by `q`.
    ///
    /// Unfiltered lists are served from and stored in the cache; a filter
    /// bypasses it entirely.
    #[instrument(skip(self))]
    pub async fn municipalities(&self, q: Option<&str>) -> Result<Municipalities> {
        let filter = q.map(str::trim).filter(|s| !s.is_empty());
        if filter.is_none() {
            if let Some(hit) = self.cache.get() {
                debug!("municipality cache hit");
                return Ok(hit);
            }
        }

        let distinct = match self.distinct_municipalities(filter).await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "distinct municipality query failed, paging instead");
                Vec::new()
            }
        };
        let names = if distinct.is_empty() {
            self.paged_municipalities(filter).await?
        } else {
            distinct
        };

        let municipios = dedup_sorted(names);
        info!(count = municipios.len(), filtered = filter.is_some(), "municipalities loaded");

        let now = Utc::now();
        Ok(match filter {
            None => self.cache.set_at(municipios, now),
            Some(_) => Municipalities {
                municipios,
                expires: (now + self.cache.ttl()).timestamp_millis(),
            },
        })
    }

    async fn distinct_municipalities(&self, filter: Option<&str>) -> Result<Vec<String>> {
        let query = FeatureQuery::new(municipality_where(filter))
            .out_fields([FIELD_MUNICIPALITIES])
            .param("returnDistinctValues", "true");
        let resp = self.service.query(AREA_LAYER, &query).await?;
        Ok(collect_municipalities(&resp.feature_set.features))
    }

    /// Pages through the layer until a short page, capped at `MAX_PAGES`.
    async fn paged_municipalities(&self, filter: Option<&str>) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for page in 0..MAX_PAGES {
            let query = FeatureQuery::new(municipality_where(filter))
                .out_fields([FIELD_MUNICIPALITIES])
                .param("resultOffset", page * PAGE_SIZE)
                .param("resultRecordCount", PAGE_SIZE)
                .param("orderByFields", format!("{FIELD_MUNICIPALITIES} ASC"));
            let resp = self.service.query(AREA_LAYER, &query).await?;
            let features = &resp.feature_set.features;
            names.extend(collect_municipalities(features));
            if features.len() < PAGE_SIZE {
                return Ok(names);
            }
        }
        warn!(pages = MAX_PAGES, "municipality paging cap reached, returning partial list");
        Ok(names)
    }
}

fn municipality_where(filter: Option<&str>) -> String {
    match filter {
        None => format!("{FIELD_MUNICIPALITIES} IS NOT NULL"),
        Some(q) => format!("{FIELD_MUNICIPALITIES} LIKE '%{}%'", FeatureQuery::literal(q)),
    }
}

fn collect_municipalities(features: &[Feature]) -> Vec<String> {
    features
        .iter()
        .filter_map(|f| f.attributes.get(FIELD_MUNICIPALITIES)?.as_str())
        .flat_map(split_multi)
        .map(str::to_string)
        .collect()
}

/// Case-insensitive dedup (first spelling wins), then collated sort.
fn dedup_sorted(names: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique: Vec<String> =
        names.into_iter().filter(|n| seen.insert(n.to_lowercase())).collect();
    unique.sort_by(|a, b| collate(a, b));
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::MunicipalityCache;
    use crate::infra::in_memory::{InMemoryFeatureService, LayerReply};
    use crate::types::Attributes;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn rows(values: &[&str]) -> Vec<Attributes> {
        values
            .iter()
            .map(|v| json!({ "MUNICIPIOS": v }).as_object().unwrap().clone())
            .collect()
    }

    fn directory(svc: &InMemoryFeatureService) -> AreaDirectory {
        AreaDirectory::new(
            Arc::new(svc.clone()),
            Arc::new(MunicipalityCache::new(Duration::from_secs(1800))),
        )
    }

    #[tokio::test]
    async fn distinct_values_are_split_deduped_and_sorted() {
        let svc = InMemoryFeatureService::new()
            .with_attributes(0, rows(&["Recife, Olinda", "OLINDA", "Água Preta", "recife"]));
        let list = directory(&svc).municipalities(None).await.unwrap();
        assert_eq!(list.municipios, vec!["Água Preta", "Olinda", "Recife"]);

        let received = svc.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1.get("returnDistinctValues"), Some("true"));
        assert_eq!(received[0].1.where_clause, "MUNICIPIOS IS NOT NULL");
    }

    #[tokio::test]
    async fn unfiltered_result_is_cached() {
        let svc = InMemoryFeatureService::new().with_attributes(0, rows(&["Recife"]));
        let dir = directory(&svc);
        let first = dir.municipalities(None).await.unwrap();
        let second = dir.municipalities(Some("  ")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(svc.received().len(), 1);
    }

    #[tokio::test]
    async fn filter_bypasses_cache() {
        let svc = InMemoryFeatureService::new().with_attributes(0, rows(&["Recife"]));
        let dir = directory(&svc);
        dir.municipalities(None).await.unwrap();
        dir.municipalities(Some("d'Arco")).await.unwrap();
        dir.municipalities(Some("d'Arco")).await.unwrap();

        let received = svc.received();
        assert_eq!(received.len(), 3);
        assert_eq!(received[1].1.where_clause, "MUNICIPIOS LIKE '%d''Arco%'");
        // filtered results never replace the cached list
        assert_eq!(dir.cache.get().unwrap().municipios, vec!["Recife"]);
    }

    #[tokio::test]
    async fn falls_back_to_paging_when_distinct_fails() {
        let full_page: Vec<Attributes> = (0..PAGE_SIZE)
            .map(|i| json!({ "MUNICIPIOS": format!("M{i:04}") }).as_object().unwrap().clone())
            .collect();
        let svc = InMemoryFeatureService::new()
            .with_reply(0, LayerReply::Status(500))
            .with_attributes(0, full_page)
            .with_attributes(0, rows(&["Zona"]));

        let list = directory(&svc).municipalities(None).await.unwrap();
        assert_eq!(list.municipios.len(), PAGE_SIZE + 1);

        let received = svc.received();
        assert_eq!(received.len(), 3);
        assert_eq!(received[1].1.get("resultOffset"), Some("0"));
        assert_eq!(received[2].1.get("resultOffset"), Some("1000"));
        assert_eq!(received[2].1.get("orderByFields"), Some("MUNICIPIOS ASC"));
    }

    #[tokio::test]
    async fn paging_stops_at_cap() {
        let full_page: Vec<Attributes> = (0..PAGE_SIZE)
            .map(|_| json!({ "MUNICIPIOS": "Recife" }).as_object().unwrap().clone())
            .collect();
        let svc = InMemoryFeatureService::new()
            .with_reply(0, LayerReply::Features(Vec::new()))
            .with_attributes(0, full_page);

        let list = directory(&svc).municipalities(None).await.unwrap();
        assert_eq!(list.municipios, vec!["Recife"]);
        assert_eq!(svc.received().len(), 1 + MAX_PAGES);
    }

    #[tokio::test]
    async fn paging_failure_is_fatal() {
        let svc = InMemoryFeatureService::new().with_reply(0, LayerReply::Status(502));
        assert!(directory(&svc).municipalities(None).await.is_err());
    }
}
