//! TMDB metadata provider
//!
//! Looks titles up through `/search/movie` and takes the first hit, the same
//! way a user typing the title into TMDB would. Responses are optionally
//! cached in Redis, including "no match" answers.
use reqwest::Client as HttpClient;
use tracing::instrument;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{Metadata, TmdbSearchResponse},
    services::providers::MetadataProvider,
};

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
    cache_ttl: u64,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, cache: Option<Cache>, cache_ttl: u64) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
            cache_ttl,
        }
    }

    /// Queries TMDB with the trimmed title. TMDB search ignores case, which is
    /// why cache keys can be lower-cased without changing the answer.
    async fn search(&self, title: &str) -> AppResult<Option<Metadata>> {
        let url = format!("{}/search/movie", self.api_url);
        let title = title.trim();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("query", title),
                ("language", "en-US"),
                ("page", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        let search: TmdbSearchResponse = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                response = %response_text,
                "Failed to deserialize TMDB response"
            );
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })?;

        let Some(best) = search.results.into_iter().next() else {
            tracing::debug!(title = %title, provider = "tmdb", "No TMDB match");
            return Ok(None);
        };

        tracing::debug!(
            title = %title,
            matched_title = best.title.as_deref().unwrap_or_default(),
            provider = "tmdb",
            "Metadata search completed"
        );

        Ok(Some(Metadata::from(best)))
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    #[instrument(skip(self), fields(provider = "tmdb"))]
    async fn fetch(&self, title: &str) -> AppResult<Option<Metadata>> {
        if title.trim().is_empty() {
            return Ok(None);
        }

        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::Metadata(title.to_string()),
                self.cache_ttl,
                self.search(title)
            ),
            None => self.search(title).await,
        }
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
