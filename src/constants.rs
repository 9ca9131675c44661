/// Feature service constants shared by the calendar engine and the lookup endpoints.
/// Field names are the upstream's, kept verbatim.

pub const DEFAULT_SERVICE_URL: &str =
    "https://geo.compesa.com.br:6443/arcgis/rest/services/Calendario/Calendario/MapServer";

// Layer ids within the MapServer
pub const AREA_LAYER: u32 = 0;
pub const SERVICE_EVENTS_LAYER: u32 = 2;
pub const COLLAPSE_EVENTS_LAYER: u32 = 5;

// Area layer (0) fields
pub const FIELD_AREA_ID: &str = "ID";
pub const FIELD_OBJECT_ID: &str = "OBJECTID";
pub const FIELD_AREA_NAME: &str = "NOMABAST";
pub const FIELD_CALENDAR_NAME: &str = "NOMECALEND";
pub const FIELD_MUNICIPALITIES: &str = "MUNICIPIOS";
pub const FIELD_NEIGHBORHOODS: &str = "BAIRROS";
pub const FIELD_NEIGHBORHOOD_CODES: &str = "COD_BAIRRO";

// Service events layer (2) fields
pub const FIELD_SERVICE_AREA: &str = "ID_AREA_ABASTECIMENTO";
pub const FIELD_SERVICE_START: &str = "INICIO_PREVISTO";
pub const FIELD_SERVICE_END: &str = "TERMINO_PREVISTO";
pub const FIELD_SERVICE_DESCRIPTION: &str = "DESCRICAO_SERVICO";

// Collapse events layer (5) fields
pub const FIELD_COLLAPSE_AREA: &str = "ID";
pub const FIELD_COLLAPSE_START: &str = "Inicio";
pub const FIELD_COLLAPSE_END: &str = "Termino";
pub const FIELD_COLLAPSE_FLAG: &str = "colapso";

/// Web Mercator spatial reference used by the area layer.
pub const WEB_MERCATOR_WKID: u32 = 102100;
pub const WGS84_WKID: u32 = 4326;
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// maxRecordCount reported by the service
pub const PAGE_SIZE: usize = 1000;
pub const MAX_PAGES: usize = 10;

pub const SEARCH_MIN_CHARS: usize = 2;
pub const SEARCH_MAX_RESULTS: usize = 25;

/// Upper bound on days a single event may contribute to one month.
pub const MAX_DAYS_PER_EVENT: usize = 31;

pub const DEFAULT_LAYER_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_MUNICIPIOS_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_PORT: u16 = 3000;
