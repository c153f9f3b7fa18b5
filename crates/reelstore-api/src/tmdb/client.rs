//! `TmdbClient` - TMDB API client implementation.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use tracing::instrument;
use url::Url;

use super::api::TmdbApi;
use super::error::TmdbHttpError;
use super::types::{
    DiscoverMovieParams, SearchMovieParams, TmdbErrorResponse, TmdbMovieDetails, TmdbMoviePage,
};

/// Default base URL for TMDB API v3.
const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3/";

/// Sub-resource appended to detail requests so certifications arrive in the same response.
const DETAILS_APPEND: &str = "release_dates";

/// TMDB API client.
///
/// Issues plain GET requests; no retries, no pacing. Quota-sensitive callers
/// route requests through their own scheduler.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbClient {
    /// HTTP client.
    http_client: Client,
    /// Base URL for API requests.
    base_url: Url,
    /// Static v3 API key, sent as the `api_key` query parameter.
    api_key: String,
}

/// Builder for `TmdbClient`.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbClientBuilder {
    base_url: Option<Url>,
    api_key: Option<String>,
    user_agent: Option<String>,
}

impl TmdbClientBuilder {
    /// Creates a new builder.
    const fn new() -> Self {
        Self {
            base_url: None,
            api_key: None,
            user_agent: None,
        }
    }

    /// Overrides the base URL (for wiremock in tests).
    #[must_use]
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the API key (required).
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the User-Agent (required).
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// - `api_key` is not set.
    /// - `user_agent` is not set.
    /// - `reqwest::Client` build fails.
    pub fn build(self) -> Result<TmdbClient> {
        let api_key = self.api_key.context("api_key is required")?;
        let user_agent = self.user_agent.context("user_agent is required")?;

        let base_url = if let Some(url) = self.base_url {
            url
        } else {
            let result = Url::parse(DEFAULT_BASE_URL);
            result.context("invalid default base URL")?
        };

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .gzip(true)
            .build()
            .context("failed to build HTTP client")?;

        Ok(TmdbClient {
            http_client,
            base_url,
            api_key,
        })
    }
}

impl TmdbClient {
    /// Creates a new builder.
    #[must_use]
    pub const fn builder() -> TmdbClientBuilder {
        TmdbClientBuilder::new()
    }

    /// Sends a GET request with the API key and query params, decoding the JSON body.
    ///
    /// Non-success statuses become [`TmdbHttpError`].
    #[instrument(skip_all)]
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("failed to join URL path: {path}"))?;

        let request = self
            .http_client
            .get(url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .build()
            .with_context(|| format!("failed to build request: {path}"))?;

        // The full URL carries the API key, so only the path is logged.
        tracing::debug!(path, params = ?query, "TMDB API request");

        let result = self.http_client.execute(request).await;
        let response = result.with_context(|| format!("request failed: {path}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<failed to read body>"));
            return Err(TmdbHttpError {
                status: status.as_u16(),
                reason: error_reason(status, body),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("failed to read response body: {path}"))?;
        let raw_result: std::result::Result<T, _> = serde_json::from_str(&body);
        let parsed = raw_result.with_context(|| format!("failed to decode JSON response: {path}"))?;
        Ok(parsed)
    }
}

/// Picks the message for a failed response: TMDB's `status_message`, the raw
/// body, or the canonical reason when the body is empty.
fn error_reason(status: StatusCode, body: String) -> String {
    match serde_json::from_str::<TmdbErrorResponse>(&body) {
        Ok(error_response) => {
            tracing::debug!(
                http_status = status.as_u16(),
                tmdb_status_code = error_response.status_code,
                "TMDB API error response"
            );
            error_response.status_message
        }
        Err(_) if body.trim().is_empty() => {
            String::from(status.canonical_reason().unwrap_or("unknown status"))
        }
        Err(_) => body,
    }
}

impl TmdbApi for TmdbClient {
    #[instrument(skip_all)]
    async fn discover_movies(&self, params: &DiscoverMovieParams) -> Result<TmdbMoviePage> {
        let mut query: Vec<(&str, String)> = vec![
            ("language", params.language.clone()),
            ("page", params.page.to_string()),
            ("sort_by", String::from(params.sort_by.as_str())),
            ("include_adult", params.include_adult.to_string()),
            ("include_video", params.include_video.to_string()),
        ];
        if let Some(genre) = params.with_genres {
            query.push(("with_genres", genre.to_string()));
        }
        if let Some(from) = params.release_date_gte {
            query.push(("primary_release_date.gte", from.to_string()));
        }
        if let Some(to) = params.release_date_lte {
            query.push(("primary_release_date.lte", to.to_string()));
        }

        self.get_json("discover/movie", &query).await
    }

    #[instrument(skip_all)]
    async fn search_movies(&self, params: &SearchMovieParams) -> Result<TmdbMoviePage> {
        let query: Vec<(&str, String)> = vec![
            ("query", params.query.clone()),
            ("language", params.language.clone()),
            ("page", params.page.to_string()),
            ("include_adult", params.include_adult.to_string()),
        ];

        self.get_json("search/movie", &query).await
    }

    #[instrument(skip_all)]
    async fn movie_details(&self, movie_id: u64, language: &str) -> Result<TmdbMovieDetails> {
        let path = format!("movie/{movie_id}");
        let query = [
            ("language", String::from(language)),
            ("append_to_response", String::from(DETAILS_APPEND)),
        ];
        self.get_json(&path, &query).await
    }
}
