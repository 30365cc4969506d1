//! Backend API client
//!
//! Endpoints:
//! - GET /locations                      → map locations with current indices
//! - GET /ranking/current?option=<m>     → current ranking for air or traffic
//! - GET /data?id=<id>[&date=YYYY-MM-DD] → per-location current + hourly data

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::model::{
    LocatedReading, LocationResponse, Metric, RankingEntry, RankingResponse, TrafficAirDataResponse,
};
use crate::ranking::RankingSource;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, token: Option<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("aqtraffic/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ApiError::Http {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| ApiError::Http {
            url: url.clone(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response.text().await.map_err(|source| ApiError::Http {
            url: url.clone(),
            source,
        })?;
        tracing::debug!("Received {} bytes from {}", body.len(), url);

        serde_json::from_str(&body).map_err(|source| ApiError::Decode { url, source })
    }

    /// All map locations, carrying the index for `metric`
    pub async fn locations(&self, metric: Metric) -> Result<Vec<LocatedReading>, ApiError> {
        let response: LocationResponse = self.get_json("/locations").await?;
        if response.count != response.locations.len() {
            tracing::debug!(
                "Location count mismatch: header says {}, got {}",
                response.count,
                response.locations.len()
            );
        }
        Ok(response.locations.iter().map(|l| l.to_reading(metric)).collect())
    }

    /// Freshly computed ranking, in the order the backend delivers it
    pub async fn current_ranking(&self, metric: Metric) -> Result<Vec<RankingEntry>, ApiError> {
        let path = format!("/ranking/current?option={}", urlencoding::encode(metric.as_str()));
        let response: RankingResponse = self.get_json(&path).await?;
        Ok(response.entries(metric))
    }

    /// Current and hourly data for one location
    pub async fn traffic_air_data(
        &self,
        id: u64,
        date: Option<NaiveDate>,
    ) -> Result<TrafficAirDataResponse, ApiError> {
        let mut path = format!("/data?id={}", id);
        if let Some(date) = date {
            let date = date.format("%Y-%m-%d").to_string();
            path.push_str(&format!("&date={}", urlencoding::encode(&date)));
        }
        self.get_json(&path).await
    }
}

impl RankingSource for ApiClient {
    fn fetch_ranking(
        &self,
        metric: Metric,
    ) -> impl std::future::Future<Output = Result<Vec<RankingEntry>, ApiError>> + Send {
        self.current_ranking(metric)
    }
}
