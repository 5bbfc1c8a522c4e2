//! HTTP implementation of the refresh API

use crate::client::{ClientError, ClientResult, RefreshApi};
use crate::db::Snapshot;
use crate::server::{HistoryResponse, LatestResponse, StatusResponse};
use crate::services::{RefreshStatus, StartRefreshResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh API over the service's REST endpoints
pub struct HttpRefreshApi {
    client: Client,
    base_url: String,
}

impl HttpRefreshApi {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
            .to_string();
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RefreshApi for HttpRefreshApi {
    async fn start_refresh(&self) -> ClientResult<StartRefreshResult> {
        let response = self
            .client
            .post(self.url("/report/market-overview/refresh"))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn refresh_status(&self) -> ClientResult<RefreshStatus> {
        let response = self
            .client
            .get(self.url("/report/market-overview/refresh-status"))
            .send()
            .await?;
        let body: StatusResponse = Self::decode(response).await?;
        Ok(body.status)
    }

    async fn latest_snapshot(&self) -> ClientResult<Option<Snapshot>> {
        let response = self
            .client
            .get(self.url("/report/market-overview"))
            .send()
            .await?;
        let body: LatestResponse = Self::decode(response).await?;
        Ok(body.latest)
    }

    async fn snapshot_history(&self, limit: usize) -> ClientResult<Vec<Snapshot>> {
        let response = self
            .client
            .get(self.url("/report/market-overview/history"))
            .query(&[("limit", limit)])
            .send()
            .await?;
        let body: HistoryResponse = Self::decode(response).await?;
        Ok(body.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::ApiServer;
    use crate::testing::{app_state, FakeProvider};

    #[tokio::test]
    async fn test_http_api_against_server() {
        let mut server = ApiServer::new(app_state(FakeProvider::default(), "AAPL"));
        let addr = server
            .start_on("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let api = HttpRefreshApi::new(&format!("http://{}/", addr)).unwrap();

        assert!(api.latest_snapshot().await.unwrap().is_none());
        assert!(api.start_refresh().await.unwrap().accepted);
        assert!(api.refresh_status().await.unwrap().started_at.is_some());

        let err = api.snapshot_history(0).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 400, .. }));
    }
}
