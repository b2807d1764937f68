//! Free-text address lookup against a Nominatim-compatible search endpoint.

use crate::config::GeocoderConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocode request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoder responded with {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed geocoder response: {0}")]
    Parse(String),

    #[error("invalid coordinate {lat:?}, {lon:?}")]
    InvalidCoordinate { lat: String, lon: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// First match for `query`, or `None` when the service found nothing.
    async fn geocode(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError>;
}

// Coordinates arrive string-encoded.
#[derive(Debug, Deserialize)]
struct Candidate {
    lat: String,
    lon: String,
}

pub struct NominatimGeocoder {
    http: reqwest::Client,
    config: GeocoderConfig,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Option<GeoPoint>, GeocodeError> {
        let resp = self
            .http
            .get(&self.config.endpoint)
            .query(&[
                ("format", "json"),
                ("addressdetails", "1"),
                ("countrycodes", self.config.country_codes.as_str()),
                ("limit", "1"),
                ("q", query),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(GeocodeError::Status(resp.status()));
        }

        let body = resp.text().await?;
        parse_response(&body)
    }
}

/// First candidate of a search response body.
pub fn parse_response(body: &str) -> Result<Option<GeoPoint>, GeocodeError> {
    let candidates: Vec<Candidate> =
        serde_json::from_str(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;
    let Some(first) = candidates.into_iter().next() else {
        return Ok(None);
    };

    let lat = first.lat.trim().parse::<f64>();
    let lon = first.lon.trim().parse::<f64>();
    match (lat, lon) {
        (Ok(lat), Ok(lon))
            if lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0 =>
        {
            Ok(Some(GeoPoint { lat, lon }))
        }
        _ => Err(GeocodeError::InvalidCoordinate {
            lat: first.lat,
            lon: first.lon,
        }),
    }
}
