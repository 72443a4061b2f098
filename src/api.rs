use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::data::{WorkoutCache, WorkoutPage, WorkoutRecord};

const WORKOUTS_ENDPOINT: &str = "/workouts";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CACHE_TTL_SECS: i64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} is not set")]
    NotConfigured(&'static str),
    #[error("API request failed: {endpoint} returned {status} - {message}")]
    RequestFailed {
        endpoint: String,
        status: u16,
        message: String,
    },
    #[error("Failed to parse response from {endpoint}: {source}")]
    ParseError {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Client for the workouts record store.
pub struct WorkoutAPI {
    client: reqwest::Client,
    config: Config,
}

impl WorkoutAPI {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    pub async fn test_connection(&self) -> Result<()> {
        let page = self.fetch_page(1, 1).await?;
        info!(total = page.pagination.total, "record store reachable");
        Ok(())
    }

    /// Walks every page of the store. Stats must never be computed from a
    /// single page, so this is the only way records enter the dashboard.
    pub async fn fetch_all_workouts(&self) -> Result<Vec<WorkoutRecord>> {
        let limit = self.config.page_size.max(1);
        let mut records = Vec::new();
        let mut page = 1;

        let expected = loop {
            let batch = self.fetch_page(page, limit).await?;
            let received = batch.workouts.len();
            debug!(
                page,
                received,
                total = batch.pagination.total,
                "fetched workout page"
            );

            records.extend(batch.workouts);
            if received == 0 || page >= batch.pagination.pages {
                break batch.pagination.total;
            }
            page += 1;
        };

        if records.len() as u64 != expected {
            warn!(
                fetched = records.len(),
                expected, "record store total does not match fetched workouts"
            );
        }
        Ok(records)
    }

    pub async fn refresh_records(&self) -> Result<WorkoutCache> {
        let records = self.fetch_all_workouts().await?;
        info!(count = records.len(), "refreshed workouts");

        let cache = WorkoutCache {
            records,
            refreshed_at: Some(chrono::Utc::now()),
        };

        self.config.save_cache(&cache)?;
        Ok(cache)
    }

    pub async fn load_cached_or_refresh(&self) -> Result<WorkoutCache> {
        if let Ok(cached) = self.config.load_cache() {
            if let Some(refreshed_at) = cached.refreshed_at {
                let age = chrono::Utc::now().signed_duration_since(refreshed_at);
                if age.num_seconds() < CACHE_TTL_SECS {
                    debug!(age_secs = age.num_seconds(), "using cached workouts");
                    return Ok(cached);
                }
            }
        }

        self.refresh_records().await
    }

    pub async fn fetch_page(&self, page: u32, limit: u32) -> Result<WorkoutPage> {
        let base = self
            .config
            .api_url
            .as_deref()
            .ok_or(ApiError::NotConfigured("WORKOUTTERM_API_URL"))?;
        let url = format!("{}{}", base.trim_end_matches('/'), WORKOUTS_ENDPOINT);

        let mut request = self
            .client
            .get(&url)
            .query(&[("page", page), ("limit", limit)]);
        if let Some(token) = &self.config.api_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request.send().await?;
        let body = self.check_response(response, WORKOUTS_ENDPOINT).await?;
        let page =
            serde_json::from_str::<WorkoutPage>(&body).map_err(|e| ApiError::ParseError {
                endpoint: WORKOUTS_ENDPOINT.to_string(),
                source: anyhow::anyhow!("{} (body excerpt: {})", e, excerpt(&body, 200)),
            })?;

        Ok(page)
    }

    async fn check_response(
        &self,
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<String, ApiError> {
        let status = response.status();
        let endpoint_str = endpoint.to_string();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.is_empty() {
                "Empty response".to_string()
            } else {
                excerpt(&body, 500)
            };
            return Err(ApiError::RequestFailed {
                endpoint: endpoint_str,
                status: status.as_u16(),
                message,
            });
        }

        response.text().await.map_err(|e| ApiError::RequestFailed {
            endpoint: endpoint_str.clone(),
            status: status.as_u16(),
            message: format!("Failed to read response body: {}", e),
        })
    }
}

fn excerpt(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}
