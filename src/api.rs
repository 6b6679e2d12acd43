// Remote homestay API: wire models, errors and the HTTP client

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::filter_request::FilterRequest;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError {
        status_code: u16,
        message: String,
        is_retryable: bool,
    },

    #[error("Could not decode response: {0}")]
    DecodeError(String),

    #[error("Client error: {0}")]
    ClientError(String),
}

// Extra fields returned by the API are carried through untouched
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HomeStaySummary {
    pub home_stay_id: i64,
    pub name: String,
    pub address: String,
    pub price: Option<f64>,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Booking {
    pub booking_id: i64,
    pub home_stay_name: String,
    pub check_in_date: String,
    pub check_out_date: String,
    pub status: String,
    pub total_price: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[async_trait]
pub trait HomestayApi: Send + Sync + 'static {
    async fn filter_home_stays(
        &self,
        request: &FilterRequest,
    ) -> Result<Vec<HomeStaySummary>, ApiError>;

    async fn get_bookings_by_account_id(&self, user_id: &str) -> Result<Vec<Booking>, ApiError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout_ms: u64,
    pub filter_path: String,
    // `{accountId}` is replaced with the user id
    pub bookings_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            access_token: None,
            timeout_ms: 15000,
            filter_path: "/api/HomeStay/FilterHomeStay".to_string(),
            bookings_path: "/api/Booking/GetBookingsByAccountID/{accountId}".to_string(),
        }
    }
}

pub struct HttpHomestayApi {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpHomestayApi {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ApiError::ClientError(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.config.timeout_ms)
        } else if e.is_decode() {
            ApiError::DecodeError(e.to_string())
        } else {
            ApiError::NetworkError(e.to_string())
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("API responded with {}: {}", status, message);
            return Err(ApiError::ApiResponseError {
                status_code: status.as_u16(),
                message,
                is_retryable: status.is_server_error(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| self.map_transport_error(e))
    }
}

#[async_trait]
impl HomestayApi for HttpHomestayApi {
    async fn filter_home_stays(
        &self,
        request: &FilterRequest,
    ) -> Result<Vec<HomeStaySummary>, ApiError> {
        let url = self.url(&self.config.filter_path);
        debug!("POST {}", url);
        let response = self
            .authorize(self.client.post(&url).json(request))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        self.read_json(response).await
    }

    async fn get_bookings_by_account_id(&self, user_id: &str) -> Result<Vec<Booking>, ApiError> {
        let path = self.config.bookings_path.replace("{accountId}", user_id);
        let url = self.url(&path);
        debug!("GET {}", url);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;
        self.read_json(response).await
    }
}
