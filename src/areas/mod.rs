//! Municipality, neighborhood and supply-area lookups over the area layer.

pub mod cache;
pub mod municipalities;
pub mod neighborhoods;
pub mod supply_areas;

use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::app::ports::FeatureServicePort;
pub use cache::MunicipalityCache;
pub use neighborhoods::Neighborhoods;
pub use supply_areas::{SupplyArea, SupplyAreas};

/// Municipality list as served, with its cache expiry in epoch milliseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Municipalities {
    pub municipios: Vec<String>,
    pub expires: i64,
}

/// Lookup collaborator shared by the `/areas/*` routes.
pub struct AreaDirectory {
    service: Arc<dyn FeatureServicePort>,
    cache: Arc<MunicipalityCache>,
}

impl AreaDirectory {
    pub fn new(service: Arc<dyn FeatureServicePort>, cache: Arc<MunicipalityCache>) -> Self {
        Self { service, cache }
    }
}

/// Splits a comma-delimited multi-value field, trimming and dropping blanks.
pub fn split_multi(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Primary collation key for Portuguese names: case and accents ignored.
pub fn collation_key(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

pub fn collate(a: &str, b: &str) -> Ordering {
    collation_key(a).cmp(&collation_key(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_multi_trims_and_skips_blanks() {
        let parts: Vec<_> = split_multi(" Boa Viagem, Pina,, Imbiribeira ").collect();
        assert_eq!(parts, vec!["Boa Viagem", "Pina", "Imbiribeira"]);
    }

    #[test]
    fn collation_ignores_accents_and_case() {
        let mut names = vec!["Olinda", "Água Preta", "abreu e Lima", "Igarassu", "Ipojuca"];
        names.sort_by(|a, b| collate(a, b));
        assert_eq!(names, vec!["abreu e Lima", "Água Preta", "Igarassu", "Ipojuca", "Olinda"]);
    }
}
