//! HTTP access to the catalog API.
//!
//! Every failure is absorbed here: callers get `None` and carry on with the next branch.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use tracing::{debug, error};

use crate::config::{ApiSettings, SitemapConfig};
use crate::error::SitemapError;

const CITIES_CAUSE: &str = "cities api connection";
const ACTIVITIES_CAUSE: &str = "activities api connection";

/// Source of the raw cities listing (a flat JSON array).
#[async_trait]
pub trait CityFetcher: Send + Sync {
    async fn fetch_cities(&self, locale: &str, limit: u32) -> Option<Vec<u8>>;
}

/// Source of the raw activities listing of one city (`{"data": [...]}`).
#[async_trait]
pub trait ActivityFetcher: Send + Sync {
    async fn fetch_activities(&self, city_id: u64, locale: &str, limit: u32) -> Option<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings, timeout: Duration) -> Result<Self, SitemapError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &SitemapConfig) -> Result<Self, SitemapError> {
        Self::new(&config.api, config.connection_timeout())
    }

    pub fn cities_url(&self) -> String {
        format!("{}/cities", self.base_url)
    }

    pub fn activities_url(&self, city_id: u64) -> String {
        format!("{}/cities/{}/activities", self.base_url, city_id)
    }

    async fn get(&self, url: &str, locale: &str, limit: u32, cause: &'static str) -> Option<Vec<u8>> {
        debug!(url, locale, limit, "Requesting catalog page");

        let response = match self
            .client
            .get(url)
            .query(&[("limit", limit)])
            .header(ACCEPT, "application/json")
            .header(ACCEPT_LANGUAGE, locale)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!(cause, url, error = %err, "API request failed");
                return None;
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            error!(cause, url, status = %status, "API request error");
            return None;
        }

        match response.bytes().await {
            Ok(body) => Some(body.to_vec()),
            Err(err) => {
                error!(cause, url, error = %err, "Failed to read API response body");
                None
            }
        }
    }
}

#[async_trait]
impl CityFetcher for ApiClient {
    async fn fetch_cities(&self, locale: &str, limit: u32) -> Option<Vec<u8>> {
        let url = self.cities_url();
        self.get(&url, locale, limit, CITIES_CAUSE).await
    }
}

#[async_trait]
impl ActivityFetcher for ApiClient {
    async fn fetch_activities(&self, city_id: u64, locale: &str, limit: u32) -> Option<Vec<u8>> {
        let url = self.activities_url(city_id);
        self.get(&url, locale, limit, ACTIVITIES_CAUSE).await
    }
}
