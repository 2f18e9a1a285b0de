//! HTTP client for the Amadeus self-service travel API
//!
//! Two endpoints are used: airport/city location search and flight-offer search.
//! Both sit behind small traits so the resolver and the wizard can run against
//! in-memory fakes.

use crate::flights::FlightOffer;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Currency every offer is priced in
pub const CURRENCY_CODE: &str = "USD";

/// The flight-offer search is capped to a single result
pub const MAX_OFFERS: u32 = 1;

const TOKEN_PATH: &str = "/v1/security/oauth2/token";
const LOCATIONS_PATH: &str = "/v1/reference-data/locations";
const FLIGHT_OFFERS_PATH: &str = "/v2/shopping/flight-offers";
const LOCATION_SUBTYPES: &str = "AIRPORT,CITY";
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

/// Amadeus-specific error types
#[derive(Error, Debug)]
pub enum TravelApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Amadeus API returned status {status}: {body}")]
    Service { status: u16, body: String },
}

/// One match from the location search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub iata_code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sub_type: Option<String>,
}

/// Parameters of a flight-offer search
#[derive(Debug, Clone, PartialEq)]
pub struct FlightOfferQuery {
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub return_date: String,
    pub adults: u32,
}

impl FlightOfferQuery {
    /// Query parameters in the order the API documents them
    fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("originLocationCode", self.origin.clone()),
            ("destinationLocationCode", self.destination.clone()),
            ("departureDate", self.departure_date.clone()),
            ("returnDate", self.return_date.clone()),
            ("adults", self.adults.to_string()),
            ("currencyCode", CURRENCY_CODE.to_string()),
            ("max", MAX_OFFERS.to_string()),
        ]
    }
}

/// Free-text airport/city lookup
#[async_trait]
pub trait LocationSearch: Send + Sync {
    /// Ordered matches for `keyword`, restricted to airports and cities
    async fn search_locations(&self, keyword: &str) -> Result<Vec<Location>, TravelApiError>;
}

/// Priced flight-offer lookup
#[async_trait]
pub trait FlightSearch: Send + Sync {
    async fn search_flight_offers(&self, query: &FlightOfferQuery) -> Result<Vec<FlightOffer>, TravelApiError>;
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Parse a location-search response body
pub fn parse_locations(body: &str) -> Result<Vec<Location>, TravelApiError> {
    let envelope: DataEnvelope<Location> = serde_json::from_str(body)?;
    Ok(envelope.data)
}

/// Parse a flight-offer search response body
pub fn parse_flight_offers(body: &str) -> Result<Vec<FlightOffer>, TravelApiError> {
    let envelope: DataEnvelope<FlightOffer> = serde_json::from_str(body)?;
    Ok(envelope.data)
}

/// Amadeus client holding the OAuth token between calls
pub struct AmadeusClient {
    http_client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
}

impl AmadeusClient {
    /// Create a new Amadeus client
    pub fn new(base_url: &str, client_id: &str, client_secret: &str) -> Result<Self, TravelApiError> {
        debug!(base_url, "Creating new Amadeus client");
        let http_client = Client::builder()
            .user_agent(concat!("trip-wizard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Mutex::new(None),
        })
    }

    /// Return the cached bearer token, fetching a fresh one when missing or about to expire
    async fn access_token(&self) -> Result<String, TravelApiError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
            debug!("Amadeus access token expired, requesting a new one");
        }

        let url = format!("{}{}", self.base_url, TOKEN_PATH);
        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "Amadeus token request rejected");
            return Err(TravelApiError::Authentication(format!("status {}: {}", status, body)));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        info!(expires_in = token.expires_in, "Obtained Amadeus access token");

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        let value = token.access_token;
        *guard = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    /// Authenticated GET returning the raw response body
    async fn get_body(&self, path: &str, params: &[(&str, String)]) -> Result<String, TravelApiError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, path);

        let start_time = Instant::now();
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .query(params)
            .send()
            .await?;
        let status = response.status();

        info!(
            path,
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "Amadeus request completed"
        );

        let body = response.text().await?;
        match status {
            s if s.is_success() => Ok(body),
            StatusCode::UNAUTHORIZED => {
                // a rejected token is never reused
                self.token.lock().await.take();
                Err(TravelApiError::Authentication(body))
            }
            s => {
                warn!(status = %s, "Amadeus request failed");
                Err(TravelApiError::Service {
                    status: s.as_u16(),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl LocationSearch for AmadeusClient {
    #[instrument(level = "info", skip(self))]
    async fn search_locations(&self, keyword: &str) -> Result<Vec<Location>, TravelApiError> {
        let params = [
            ("keyword", keyword.to_string()),
            ("subType", LOCATION_SUBTYPES.to_string()),
        ];
        let body = self.get_body(LOCATIONS_PATH, &params).await?;
        let locations = parse_locations(&body)?;
        debug!(matches = locations.len(), "Location search returned");
        Ok(locations)
    }
}

#[async_trait]
impl FlightSearch for AmadeusClient {
    #[instrument(level = "info", skip(self, query), fields(origin = %query.origin, destination = %query.destination))]
    async fn search_flight_offers(&self, query: &FlightOfferQuery) -> Result<Vec<FlightOffer>, TravelApiError> {
        let body = self.get_body(FLIGHT_OFFERS_PATH, &query.to_params()).await?;
        let offers = parse_flight_offers(&body)?;
        debug!(offers = offers.len(), "Flight-offer search returned");
        Ok(offers)
    }
}
