use std::time::Instant;

use futures::future::join_all;
use metrics::{counter, histogram};
use tracing::{debug, warn};

use super::layers::LayerConfig;
use super::CalendarRequest;
use crate::app::ports::FeatureServicePort;
use crate::types::{LayerAttempt, RawFeature};

/// Raw records gathered from every layer, plus one attempt entry per layer
#[derive(Debug, Default)]
pub struct LayerFetch {
    pub features: Vec<RawFeature>,
    pub attempts: Vec<LayerAttempt>,
}

/// Queries every layer concurrently. A failing layer becomes a failed attempt
/// and never affects the others. Output order follows `layers`.
pub async fn fetch_layers(
    service: &dyn FeatureServicePort,
    layers: &[LayerConfig],
    request: &CalendarRequest,
) -> LayerFetch {
    let outcomes = join_all(layers.iter().map(|layer| fetch_layer(service, layer, request))).await;

    let mut fetch = LayerFetch::default();
    for (features, attempt) in outcomes {
        fetch.features.extend(features);
        fetch.attempts.push(attempt);
    }
    fetch
}

async fn fetch_layer(
    service: &dyn FeatureServicePort,
    layer: &LayerConfig,
    request: &CalendarRequest,
) -> (Vec<RawFeature>, LayerAttempt) {
    let query = layer.query(&request.area, request.month, request.year);
    let where_clause = query.where_clause.clone();
    let layer_label = layer.layer_id.to_string();
    let started = Instant::now();

    let result = service.query(layer.layer_id, &query).await;
    histogram!("calendar_layer_query_seconds", "layer" => layer_label.clone())
        .record(started.elapsed().as_secs_f64());

    match result {
        Ok(resp) => {
            let count = resp.feature_set.features.len();
            debug!(layer = layer.layer_id, count, "layer query succeeded");
            counter!("calendar_layer_queries_total", "layer" => layer_label, "outcome" => "ok")
                .increment(1);
            let features = resp
                .feature_set
                .features
                .into_iter()
                .map(|f| RawFeature { layer_id: layer.layer_id, attributes: f.attributes })
                .collect();
            let attempt = LayerAttempt::Completed {
                layer: layer.layer_id,
                where_clause,
                status: resp.status,
                count,
            };
            (features, attempt)
        }
        Err(e) => {
            warn!(layer = layer.layer_id, error = %e, "layer query failed");
            counter!("calendar_layer_queries_total", "layer" => layer_label, "outcome" => "error")
                .increment(1);
            let status = match &e {
                crate::error::CalendarError::UpstreamStatus { status, .. } => Some(*status),
                _ => None,
            };
            let attempt = LayerAttempt::Failed {
                layer: layer.layer_id,
                where_clause,
                status,
                error: e.to_string(),
            };
            (Vec::new(), attempt)
        }
    }
}
