use crate::app::ports::FeatureQuery;
use crate::constants::*;

/// How a layer's status field maps onto a `DayStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusRule {
    /// Free-text service description matched by keyword
    ServiceDescription,
    /// Boolean-ish collapse flag
    CollapseFlag,
    /// Layer without a known rule; events count as partial supply
    Unclassified,
}

/// Static description of one upstream event layer.
///
/// Adding a layer shape means adding one of these; nothing downstream branches
/// on layer ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfig {
    pub layer_id: u32,
    pub area_field: &'static str,
    pub start_field: &'static str,
    pub end_field: &'static str,
    pub status_field: &'static str,
    pub rule: StatusRule,
    pub extra_fields: &'static [&'static str],
}

impl LayerConfig {
    /// Records for `area` whose start or end falls in `month`, started in `year`.
    pub fn where_clause(&self, area: &str, month: u32, year: i32) -> String {
        format!(
            "({area_field}='{area}') AND (DATEPART(MONTH,{start})='{mm:02}' OR DATEPART(MONTH,{end})='{mm:02}') AND (DATEPART(YEAR,{start})='{year}')",
            area_field = self.area_field,
            area = FeatureQuery::literal(area),
            start = self.start_field,
            end = self.end_field,
            mm = month,
            year = year,
        )
    }

    pub fn out_fields(&self) -> Vec<&'static str> {
        let mut fields = vec![self.start_field, self.end_field];
        for &f in self.extra_fields {
            if !fields.contains(&f) {
                fields.push(f);
            }
        }
        fields
    }

    pub fn query(&self, area: &str, month: u32, year: i32) -> FeatureQuery {
        FeatureQuery::new(self.where_clause(area, month, year)).out_fields(self.out_fields())
    }
}

/// The two event layers of the Calendario service.
pub fn default_layers() -> Vec<LayerConfig> {
    vec![
        LayerConfig {
            layer_id: SERVICE_EVENTS_LAYER,
            area_field: FIELD_SERVICE_AREA,
            start_field: FIELD_SERVICE_START,
            end_field: FIELD_SERVICE_END,
            status_field: FIELD_SERVICE_DESCRIPTION,
            rule: StatusRule::ServiceDescription,
            extra_fields: &[FIELD_SERVICE_DESCRIPTION],
        },
        LayerConfig {
            layer_id: COLLAPSE_EVENTS_LAYER,
            area_field: FIELD_COLLAPSE_AREA,
            start_field: FIELD_COLLAPSE_START,
            end_field: FIELD_COLLAPSE_END,
            status_field: FIELD_COLLAPSE_FLAG,
            rule: StatusRule::CollapseFlag,
            extra_fields: &[FIELD_COLLAPSE_FLAG],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn where_clause_pads_month_and_filters_year_on_start() {
        let layers = default_layers();
        assert_eq!(
            layers[0].where_clause("AB123", 3, 2024),
            "(ID_AREA_ABASTECIMENTO='AB123') AND (DATEPART(MONTH,INICIO_PREVISTO)='03' OR DATEPART(MONTH,TERMINO_PREVISTO)='03') AND (DATEPART(YEAR,INICIO_PREVISTO)='2024')"
        );
        assert_eq!(
            layers[1].where_clause("AB123", 11, 2023),
            "(ID='AB123') AND (DATEPART(MONTH,Inicio)='11' OR DATEPART(MONTH,Termino)='11') AND (DATEPART(YEAR,Inicio)='2023')"
        );
    }

    #[test]
    fn where_clause_escapes_area() {
        let clause = default_layers()[1].where_clause("X' OR '1'='1", 1, 2024);
        assert!(clause.starts_with("(ID='X'' OR ''1''=''1')"));
    }

    #[test]
    fn out_fields_lists_dates_then_extras() {
        let layers = default_layers();
        assert_eq!(
            layers[0].out_fields(),
            vec!["INICIO_PREVISTO", "TERMINO_PREVISTO", "DESCRICAO_SERVICO"]
        );
        assert_eq!(layers[1].out_fields(), vec!["Inicio", "Termino", "colapso"]);
        assert!(!layers[1].query("A", 1, 2024).return_geometry);
    }
}
