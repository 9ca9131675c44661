use serde::Serialize;
use std::collections::HashMap;
use tracing::instrument;

use super::{collate, AreaDirectory};
use crate::app::ports::FeatureQuery;
use crate::constants::{AREA_LAYER, FIELD_AREA_ID, FIELD_AREA_NAME, FIELD_MUNICIPALITIES, FIELD_NEIGHBORHOODS};
use crate::error::{CalendarError, Result};
use crate::types::{attr_string, Feature};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyArea {
    pub id: String,
    pub nome: Option<String>,
    pub municipios: Option<String>,
    pub bairros: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplyAreas {
    pub municipio: String,
    pub bairro: Option<String>,
    pub areas: Vec<SupplyArea>,
}

impl AreaDirectory {
    /// Supply areas of a municipality, optionally narrowed by neighborhood and name.
    #[instrument(skip(self))]
    pub async fn supply_areas(
        &self,
        municipio: Option<&str>,
        bairro: Option<&str>,
        q: Option<&str>,
    ) -> Result<SupplyAreas> {
        let municipio = municipio
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CalendarError::invalid("Parameter municipio is required"))?;
        let bairro = bairro.map(str::trim).filter(|s| !s.is_empty());
        let q = q.map(str::trim).filter(|s| !s.is_empty());

        let mut clauses = vec![format!("{FIELD_MUNICIPALITIES}='{}'", FeatureQuery::literal(municipio))];
        if let Some(b) = bairro {
            clauses.push(format!("{FIELD_NEIGHBORHOODS} LIKE '%{}%'", FeatureQuery::literal(b)));
        }
        if let Some(q) = q {
            clauses.push(format!(
                "{FIELD_AREA_NAME} LIKE '%{}%'",
                FeatureQuery::literal(&q.to_uppercase())
            ));
        }
        let query = FeatureQuery::new(clauses.join(" AND ")).out_fields([
            FIELD_AREA_ID,
            FIELD_AREA_NAME,
            FIELD_NEIGHBORHOODS,
            FIELD_MUNICIPALITIES,
        ]);
        let resp = self.service.query(AREA_LAYER, &query).await?;

        Ok(SupplyAreas {
            municipio: municipio.to_string(),
            bairro: bairro.map(str::to_string),
            areas: collect_areas(&resp.feature_set.features),
        })
    }
}

/// One entry per id (the last record wins), sorted by name.
fn collect_areas(features: &[Feature]) -> Vec<SupplyArea> {
    let mut by_id: HashMap<String, SupplyArea> = HashMap::new();
    for f in features {
        let Some(id) = attr_string(&f.attributes, FIELD_AREA_ID).filter(|id| !id.is_empty()) else {
            continue;
        };
        let area = SupplyArea {
            id: id.clone(),
            nome: attr_string(&f.attributes, FIELD_AREA_NAME),
            municipios: attr_string(&f.attributes, FIELD_MUNICIPALITIES),
            bairros: attr_string(&f.attributes, FIELD_NEIGHBORHOODS),
        };
        by_id.insert(id, area);
    }

    let mut areas: Vec<SupplyArea> = by_id.into_values().collect();
    areas.sort_by(|a, b| {
        collate(a.nome.as_deref().unwrap_or_default(), b.nome.as_deref().unwrap_or_default())
            .then_with(|| a.id.cmp(&b.id))
    });
    areas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::MunicipalityCache;
    use crate::infra::in_memory::InMemoryFeatureService;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn directory(svc: &InMemoryFeatureService) -> AreaDirectory {
        AreaDirectory::new(
            Arc::new(svc.clone()),
            Arc::new(MunicipalityCache::new(Duration::from_secs(60))),
        )
    }

    #[tokio::test]
    async fn deduplicates_by_id_and_sorts_by_name() {
        let svc = InMemoryFeatureService::new().with_attributes(
            0,
            vec![
                json!({"ID": "B2", "NOMABAST": "VÁRZEA"}).as_object().unwrap().clone(),
                json!({"ID": "A1", "NOMABAST": "AFOGADOS", "BAIRROS": "Afogados"}).as_object().unwrap().clone(),
                json!({"ID": "A1", "NOMABAST": "AFOGADOS", "BAIRROS": "Afogados, Mustardinha"}).as_object().unwrap().clone(),
                json!({"NOMABAST": "SEM ID"}).as_object().unwrap().clone(),
            ],
        );
        let result = directory(&svc).supply_areas(Some("Recife"), None, None).await.unwrap();
        let ids: Vec<_> = result.areas.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "B2"]);
        assert_eq!(result.areas[0].bairros.as_deref(), Some("Afogados, Mustardinha"));
        assert_eq!(result.bairro, None);
    }

    #[tokio::test]
    async fn builds_clauses_for_filters() {
        let svc = InMemoryFeatureService::new();
        let result = directory(&svc)
            .supply_areas(Some("Recife"), Some("Boa Viagem"), Some("setor"))
            .await
            .unwrap();
        assert_eq!(result.bairro.as_deref(), Some("Boa Viagem"));
        let (layer, query) = &svc.received()[0];
        assert_eq!(*layer, 0);
        assert_eq!(
            query.where_clause,
            "MUNICIPIOS='Recife' AND BAIRROS LIKE '%Boa Viagem%' AND NOMABAST LIKE '%SETOR%'"
        );
        assert_eq!(query.out_fields, vec!["ID", "NOMABAST", "BAIRROS", "MUNICIPIOS"]);
    }

    #[tokio::test]
    async fn municipio_is_required() {
        let svc = InMemoryFeatureService::new();
        assert!(directory(&svc).supply_areas(Some(" "), None, None).await.is_err());
    }
}
