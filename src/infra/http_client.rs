use crate::app::ports::{FeatureQuery, FeatureServicePort, QueryResponse};
use crate::error::{CalendarError, Result};
use crate::types::FeatureSet;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Feature service client over reqwest.
pub struct ReqwestFeatureService {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ReqwestFeatureService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("supply_calendar/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn layer_url(&self, layer_id: u32) -> String {
        format!("{}/{}/query", self.base_url, layer_id)
    }
}

#[async_trait]
impl FeatureServicePort for ReqwestFeatureService {
    async fn query(&self, layer_id: u32, query: &FeatureQuery) -> Result<QueryResponse> {
        let url = self.layer_url(layer_id);
        debug!(layer = layer_id, where_clause = %query.where_clause, "querying feature service");

        let resp = self
            .client
            .get(&url)
            .query(&query.to_params())
            .send()
            .await
            .map_err(|e| self.classify(layer_id, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CalendarError::UpstreamStatus { layer: layer_id, status: status.as_u16() });
        }

        let bytes = resp.bytes().await.map_err(|e| self.classify(layer_id, e))?;
        let feature_set: FeatureSet = serde_json::from_slice(&bytes)?;
        if let Some(err) = &feature_set.error {
            return Err(CalendarError::UpstreamService {
                layer: layer_id,
                code: err.code,
                message: err.message.clone(),
            });
        }

        Ok(QueryResponse { status: status.as_u16(), feature_set })
    }
}

impl ReqwestFeatureService {
    fn classify(&self, layer_id: u32, err: reqwest::Error) -> CalendarError {
        if err.is_timeout() {
            CalendarError::UpstreamTimeout {
                layer: layer_id,
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            CalendarError::Http(err)
        }
    }
}
