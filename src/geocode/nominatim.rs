//! Nominatim search client

use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::geocode::Geocoder;
use crate::models::Coordinates;
use crate::utils::error::GeocodeError;

/// One search hit; Nominatim encodes coordinates as strings
#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim `/search` endpoint
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    search_url: Url,
    user_agent: String,
}

impl NominatimGeocoder {
    /// Create a client for the service rooted at `base_url`
    ///
    /// # Errors
    ///
    /// Returns `GeocodeError::Http` if the HTTP client cannot be created
    pub fn new(
        base_url: &Url,
        user_agent: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(timeout).gzip(true).build()?;

        let mut root = base_url.clone();
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let search_url = root
            .join("search")
            .map_err(|e| GeocodeError::Decode(e.to_string()))?;

        Ok(Self {
            client,
            search_url,
            user_agent: user_agent.into(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.geocoder.base_url)?;
        Ok(Self::new(
            &base_url,
            config.geocoder.user_agent.clone(),
            config.geocoder_timeout(),
        )?)
    }

    /// Full search endpoint
    pub fn search_url(&self) -> &Url {
        &self.search_url
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(
        &self,
        query: &str,
        country: &str,
    ) -> Result<Option<Coordinates>, GeocodeError> {
        tracing::debug!(query, country, "Geocoding address");

        let response = self
            .client
            .get(self.search_url.clone())
            .header(USER_AGENT, &self.user_agent)
            .query(&[
                ("q", query),
                ("countrycodes", country),
                ("format", "jsonv2"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::ServerError(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;
        let places: Vec<Place> =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Decode(e.to_string()))?;

        places.first().map(parse_place).transpose()
    }
}

fn parse_place(place: &Place) -> Result<Coordinates, GeocodeError> {
    let latitude = place
        .lat
        .trim()
        .parse::<f64>()
        .map_err(|_| GeocodeError::Decode(format!("bad latitude {:?}", place.lat)))?;
    let longitude = place
        .lon
        .trim()
        .parse::<f64>()
        .map_err(|_| GeocodeError::Decode(format!("bad longitude {:?}", place.lon)))?;

    Ok(Coordinates::new(latitude, longitude))
}

fn classify(err: reqwest::Error) -> GeocodeError {
    if err.is_timeout() {
        GeocodeError::Timeout
    } else {
        GeocodeError::Http(err)
    }
}
