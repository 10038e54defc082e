use std::time::Duration;

use async_trait::async_trait;
use ekiboard_core::config::{SourcesConfig, WeatherConfig};
use ekiboard_core::EkiboardConfig;
use tracing::{debug, warn};

use crate::error::{FetchError, Result};
use crate::upstream::{TransitQuery, Upstream};

/// [`Upstream`] over HTTPS with `reqwest`.
pub struct HttpUpstream {
    client: reqwest::Client,
    sources: SourcesConfig,
    weather: WeatherConfig,
}

impl HttpUpstream {
    pub fn new(config: &EkiboardConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.sources.user_agent.as_str())
            .timeout(Duration::from_secs(config.sources.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            sources: config.sources.clone(),
            weather: config.weather.clone(),
        })
    }

    fn weather_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.weather_timeout_secs)
    }

    fn delay_board_url(&self) -> String {
        format!(
            "{}/{}",
            self.sources.delay_board_base_url.trim_end_matches('/'),
            self.sources.delay_board_area
        )
    }

    async fn text(&self, builder: reqwest::RequestBuilder, what: &str) -> Result<String> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let url = resp.url().to_string();
            warn!(%url, status = status.as_u16(), "{what} request failed");
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        debug!(url = %resp.url(), "{what} fetched");
        Ok(resp.text().await?)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn transit_search(&self, query: &TransitQuery) -> Result<String> {
        let builder = self
            .client
            .get(&self.sources.transit_base_url)
            .query(&query.params());
        self.text(builder, "transit search").await
    }

    async fn delay_board(&self) -> Result<String> {
        let builder = self.client.get(self.delay_board_url());
        self.text(builder, "delay board").await
    }

    async fn forecast(&self) -> Result<String> {
        let builder = self
            .client
            .get(self.weather.forecast_url())
            .timeout(self.weather_timeout());
        self.text(builder, "forecast").await
    }

    async fn latest_update(&self) -> Result<String> {
        let builder = self
            .client
            .get(&self.weather.latest_time_url)
            .timeout(self.weather_timeout());
        Ok(self.text(builder, "latest update").await?.trim().to_string())
    }
}
