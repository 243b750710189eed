// HTTP client for the external data providers

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shipscreen_core::domain::Imo;
use shipscreen_core::error::{AppError, Result};
use shipscreen_core::port::{
    Inspection, InspectionsSource, MovementsSource, PortCall, ProviderError, SanctionHit,
    SanctionsSource, ZoneVisit,
};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// One client for all three provider APIs, which share a base URL and key
pub struct HttpProviderClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HttpProviderClient {
    pub fn new(settings: ProviderSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a GET and decode a JSON list. 404 means the provider knows nothing.
    async fn fetch_list<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<Vec<T>, ProviderError> {
        let response = request
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "Provider response");

        match status {
            s if s.is_success() => response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string())),
            StatusCode::NOT_FOUND => Ok(Vec::new()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ProviderError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            s if s.is_server_error() => {
                let body = response.text().await.unwrap_or_default();
                warn!(status = s.as_u16(), body = %body, "Provider server error");
                Err(ProviderError::Unavailable(format!("HTTP {}", s.as_u16())))
            }
            s => Err(ProviderError::InvalidResponse(format!(
                "Unexpected HTTP status {}",
                s.as_u16()
            ))),
        }
    }
}

#[async_trait]
impl SanctionsSource for HttpProviderClient {
    async fn ship_sanctions(&self, imo: &Imo) -> std::result::Result<Vec<SanctionHit>, ProviderError> {
        let url = self.url(&format!("/sanctions/ships/{}", imo));
        self.fetch_list(self.http.get(url)).await
    }

    async fn company_sanctions(
        &self,
        name: &str,
    ) -> std::result::Result<Vec<SanctionHit>, ProviderError> {
        let request = self
            .http
            .get(self.url("/sanctions/companies"))
            .query(&[("name", name)]);
        self.fetch_list(request).await
    }
}

#[async_trait]
impl InspectionsSource for HttpProviderClient {
    async fn inspections(
        &self,
        imo: &Imo,
        since: i64,
    ) -> std::result::Result<Vec<Inspection>, ProviderError> {
        let request = self
            .http
            .get(self.url(&format!("/inspections/{}", imo)))
            .query(&[("since", since)]);
        self.fetch_list(request).await
    }
}

#[async_trait]
impl MovementsSource for HttpProviderClient {
    async fn port_calls(
        &self,
        imo: &Imo,
        since: i64,
    ) -> std::result::Result<Vec<PortCall>, ProviderError> {
        let request = self
            .http
            .get(self.url(&format!("/movements/{}/port-calls", imo)))
            .query(&[("since", since)]);
        self.fetch_list(request).await
    }

    async fn zone_visits(
        &self,
        imo: &Imo,
        since: i64,
    ) -> std::result::Result<Vec<ZoneVisit>, ProviderError> {
        let request = self
            .http
            .get(self.url(&format!("/movements/{}/zone-visits", imo)))
            .query(&[("since", since)]);
        self.fetch_list(request).await
    }
}
