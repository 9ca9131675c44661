use crate::app::ports::{FeatureQuery, FeatureServicePort, QueryResponse};
use crate::error::{CalendarError, Result};
use crate::types::{Attributes, Feature, FeatureSet};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Canned answer for one layer
#[derive(Debug, Clone)]
pub enum LayerReply {
    Features(Vec<Feature>),
    Status(u16),
    TransportError(String),
    Timeout,
}

/// In-memory feature service for development/testing.
///
/// Each layer answers from a queue of replies; the last reply repeats once the
/// queue is down to one entry. Unconfigured layers return an empty feature set.
#[derive(Clone, Default)]
pub struct InMemoryFeatureService {
    replies: Arc<Mutex<HashMap<u32, Vec<LayerReply>>>>,
    received: Arc<Mutex<Vec<(u32, FeatureQuery)>>>,
}

impl InMemoryFeatureService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(self, layer_id: u32, reply: LayerReply) -> Self {
        self.replies.lock().unwrap().entry(layer_id).or_default().push(reply);
        self
    }

    pub fn with_attributes(self, layer_id: u32, rows: Vec<Attributes>) -> Self {
        let features = FeatureSet::from_attributes(rows).features;
        self.with_reply(layer_id, LayerReply::Features(features))
    }

    /// Every query received so far, in arrival order.
    pub fn received(&self) -> Vec<(u32, FeatureQuery)> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeatureServicePort for InMemoryFeatureService {
    async fn query(&self, layer_id: u32, query: &FeatureQuery) -> Result<QueryResponse> {
        self.received.lock().unwrap().push((layer_id, query.clone()));

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&layer_id) {
                Some(queue) if queue.len() > 1 => Some(queue.remove(0)),
                Some(queue) => queue.first().cloned(),
                None => None,
            }
        };
        debug!(layer = layer_id, "in-memory feature service answering");

        match reply {
            None => Ok(QueryResponse { status: 200, feature_set: FeatureSet::default() }),
            Some(LayerReply::Features(features)) => Ok(QueryResponse {
                status: 200,
                feature_set: FeatureSet { features, ..Default::default() },
            }),
            Some(LayerReply::Status(status)) => {
                Err(CalendarError::UpstreamStatus { layer: layer_id, status })
            }
            Some(LayerReply::TransportError(message)) => Err(CalendarError::Io(
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, message),
            )),
            Some(LayerReply::Timeout) => {
                Err(CalendarError::UpstreamTimeout { layer: layer_id, after_ms: 0 })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Attributes {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn replies_are_consumed_in_order_and_last_repeats() {
        let svc = InMemoryFeatureService::new()
            .with_reply(0, LayerReply::Status(500))
            .with_attributes(0, vec![row(json!({"ID": "A"}))]);

        assert!(svc.query(0, &FeatureQuery::new("1=1")).await.is_err());
        let second = svc.query(0, &FeatureQuery::new("1=1")).await.unwrap();
        assert_eq!(second.feature_set.features.len(), 1);
        let third = svc.query(0, &FeatureQuery::new("1=1")).await.unwrap();
        assert_eq!(third.feature_set.features.len(), 1);
        assert_eq!(svc.received().len(), 3);
    }

    #[tokio::test]
    async fn unknown_layer_is_empty() {
        let svc = InMemoryFeatureService::new();
        let resp = svc.query(9, &FeatureQuery::new("1=1")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert!(resp.feature_set.features.is_empty());
    }
}
