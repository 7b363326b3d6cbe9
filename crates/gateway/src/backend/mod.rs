//! HTTP client for the marketplace Data Service.
//!
//! # Architecture
//!
//! - The Data Service is the source of truth - NO local persistence,
//!   direct API calls only
//! - Typed reads (events, categories, locations, orders, balance) parse
//!   responses at the boundary into the types in [`types`]
//! - Proxy routes use [`BackendClient::forward`], which relays the raw
//!   upstream status and body without interpretation
//!
//! Gateway-level catalog reads authenticate with the service token; the
//! caller's own `Authorization` header is only ever forwarded verbatim and
//! never mixed with the service credential.

pub mod types;

use axum::body::Bytes;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::instrument;

use segundo_lote_core::Balance;

use crate::config::BackendConfig;
use crate::store::{ResourceData, ResourceFetcher, ResourceKey, StoreError};
use types::{
    BalanceResponse, Category, Event, ListCategoriesResponse, ListEventsResponse,
    ListLocationsResponse, ListOrdersResponse, Location, Order,
};

/// How much upstream body to keep in error diagnostics.
const ERROR_BODY_LIMIT: usize = 500;

/// Errors that can occur when talking to the Data Service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed at the transport layer.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered a typed read with a non-success status.
    #[error("Data Service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match the endpoint's wire type.
    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A raw upstream reply, relayed by proxy routes without interpretation.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Client for the marketplace Data Service.
///
/// Cheap to clone; the underlying `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    service_token: SecretString,
}

impl BackendClient {
    /// Create a new Data Service client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            service_token: config.service_token.clone(),
        })
    }

    /// Forward a request to the Data Service and hand back the raw reply.
    ///
    /// The caller's `Authorization` header is attached when present; the
    /// service token is never used here. Any upstream status, including
    /// errors, is a successful forward - only transport failures error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent or the body not read.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        authorization: Option<&str>,
        body: Option<&serde_json::Value>,
    ) -> Result<UpstreamResponse, BackendError> {
        let url = format!("{}{path}", self.base_url);

        let mut request = self.client.request(method, url);
        if let Some(auth) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        if let Some(json) = body {
            request = request.json(json);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        Ok(UpstreamResponse { status, body })
    }

    /// Check the Data Service's health endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or unhealthy.
    pub async fn health(&self) -> Result<(), BackendError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Status {
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }

    // =========================================================================
    // Typed reads (service token)
    // =========================================================================

    /// List all published events.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    #[instrument(skip(self))]
    pub async fn list_events(&self) -> Result<Vec<Event>, BackendError> {
        let response: ListEventsResponse = self.get_json("/api/events", "events").await?;
        Ok(response.events)
    }

    /// List event categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, BackendError> {
        let response: ListCategoriesResponse =
            self.get_json("/api/categories", "categories").await?;
        Ok(response.categories)
    }

    /// List venue locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    #[instrument(skip(self))]
    pub async fn list_locations(&self) -> Result<Vec<Location>, BackendError> {
        let response: ListLocationsResponse = self.get_json("/api/locations", "locations").await?;
        Ok(response.locations)
    }

    /// List marketplace orders visible to the gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, BackendError> {
        let response: ListOrdersResponse = self.get_json("/api/orders", "orders").await?;
        Ok(response.orders)
    }

    /// Fetch the calling seller's balance.
    ///
    /// Balance is scoped to the caller, so this uses the forwarded
    /// `Authorization` header rather than the service token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response does not parse.
    #[instrument(skip(self, authorization))]
    pub async fn get_balance(&self, authorization: &str) -> Result<Balance, BackendError> {
        let url = format!("{}/api/balance", self.base_url);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let envelope: BalanceResponse = Self::decode(response, "balance").await?;
        Ok(envelope.balance)
    }

    /// GET `path` with the service token and decode the JSON body.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        endpoint: &'static str,
    ) -> Result<T, BackendError> {
        let url = format!("{}{path}", self.base_url);

        let response = self
            .client
            .get(url)
            .bearer_auth(self.service_token.expose_secret())
            .send()
            .await?;

        Self::decode(response, endpoint).await
    }

    /// Check the status and parse the body, keeping diagnostics on failure.
    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &'static str,
    ) -> Result<T, BackendError> {
        let status = response.status();

        // Read the body as text first for better error diagnostics
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                endpoint,
                status = %status,
                body = %truncate(&text),
                "Data Service returned non-success status"
            );
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                endpoint,
                error = %e,
                body = %truncate(&text),
                "Failed to parse Data Service response"
            );
            BackendError::Decode {
                endpoint,
                source: e,
            }
        })
    }
}

impl ResourceFetcher for BackendClient {
    fn fetch(
        &self,
        key: ResourceKey,
    ) -> impl std::future::Future<Output = Result<ResourceData, StoreError>> + Send {
        async move {
            match key {
                ResourceKey::Events => Ok(ResourceData::Events(self.list_events().await?)),
                ResourceKey::Categories => {
                    Ok(ResourceData::Categories(self.list_categories().await?))
                }
                ResourceKey::Locations => Ok(ResourceData::Locations(self.list_locations().await?)),
                ResourceKey::Orders => Ok(ResourceData::Orders(self.list_orders().await?)),
            }
        }
    }
}

/// Clamp a body to a loggable size.
fn truncate(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}
