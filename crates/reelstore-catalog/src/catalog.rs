//! Cached, rate-limited catalog over a [`TmdbApi`] implementation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reelstore_api::tmdb::{
    DiscoverMovieParams, MovieSort, SearchMovieParams, TmdbApi, TmdbMovieDetails, TmdbMoviePage,
    extract_certification,
};
use tracing::instrument;

use crate::batch::{BatchOptions, batch_fetch};
use crate::cache::{CacheStore, DiscoverPageKey, MovieDetailsKey, SearchPageKey};
use crate::movie::{Movie, MoviePage, RELEASE_WINDOW, in_release_window};
use crate::scheduler::{DEFAULT_REQUEST_INTERVAL, RequestScheduler};

/// Tunables for a [`Catalog`].
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct CatalogConfig {
    /// Response language sent with every request.
    pub language: String,
    /// Sort order used by [`Catalog::fetch_basic_page`].
    pub default_sort: MovieSort,
    /// Pause between two queued detail lookups.
    pub request_interval: Duration,
    /// Grouping for [`Catalog::enrich_many`].
    pub batch: BatchOptions,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            language: String::from("en-US"),
            default_sort: MovieSort::default(),
            request_interval: DEFAULT_REQUEST_INTERVAL,
            batch: BatchOptions::default(),
        }
    }
}

/// The storefront's view of TMDB: 1980s movies, cached and paced.
///
/// Wrap in an [`Arc`] to use the prefetch operations.
#[derive(Debug)]
pub struct Catalog<A> {
    api: Arc<A>,
    cache: Arc<CacheStore>,
    scheduler: RequestScheduler,
    config: CatalogConfig,
}

impl<A> Catalog<A>
where
    A: TmdbApi + Sync + 'static,
{
    /// Creates a catalog over `api`, storing responses in `cache`.
    #[must_use]
    pub fn new(api: A, cache: CacheStore, config: CatalogConfig) -> Self {
        Self {
            api: Arc::new(api),
            cache: Arc::new(cache),
            scheduler: RequestScheduler::new(config.request_interval),
            config,
        }
    }

    /// Returns the response cache.
    #[must_use]
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Returns the detail-lookup scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Discovers movies released in the 1980s. Not cached, not queued.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be decoded.
    #[instrument(skip(self))]
    pub async fn discover(
        &self,
        page: u32,
        genre: Option<u32>,
        sort: MovieSort,
    ) -> Result<TmdbMoviePage> {
        let (from, to) = release_window_dates()?;
        let params = DiscoverMovieParams::default()
            .language(self.config.language.as_str())
            .page(page)
            .sort_by(sort)
            .with_genres(genre)
            .release_window(from, to);

        self.api
            .discover_movies(&params)
            .await
            .with_context(|| format!("failed to discover movies (page {page})"))
    }

    /// Searches by title, keeping only movies released in the 1980s.
    ///
    /// When nothing survives the filter the totals are reported as zero. A
    /// blank query yields an empty page without a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be decoded.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, page: u32) -> Result<TmdbMoviePage> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(TmdbMoviePage {
                page,
                results: Vec::new(),
                total_pages: 0,
                total_results: 0,
            });
        }

        let params = SearchMovieParams::new(query)
            .language(self.config.language.as_str())
            .page(page);
        let mut response = self
            .api
            .search_movies(&params)
            .await
            .with_context(|| format!("failed to search movies for {query:?}"))?;

        response
            .results
            .retain(|movie| in_release_window(movie.release_date.as_deref()));
        if response.results.is_empty() {
            response.total_pages = 0;
            response.total_results = 0;
        }
        Ok(response)
    }

    /// Returns a movie's details including release dates.
    ///
    /// Cache hits return immediately. Misses are queued on the scheduler, and
    /// the queued unit checks the cache again so duplicate lookups collapse.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be decoded.
    #[instrument(skip(self))]
    pub async fn details_with_certification(&self, movie_id: u64) -> Result<TmdbMovieDetails> {
        let key = MovieDetailsKey(movie_id);
        if let Some(details) = self.cache.get(&key) {
            return Ok(details);
        }

        let api = Arc::clone(&self.api);
        let cache = Arc::clone(&self.cache);
        let language = self.config.language.clone();

        self.scheduler
            .enqueue(async move {
                if let Some(details) = cache.get(&key) {
                    tracing::debug!(movie_id, "details cached while queued");
                    return Ok(details);
                }
                let details = api
                    .movie_details(movie_id, &language)
                    .await
                    .with_context(|| format!("failed to fetch details for movie {movie_id}"))?;
                cache.set(&key, details.clone());
                Ok(details)
            })
            .await
    }

    /// Returns the US certification of a movie, `"NR"` when it has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the details cannot be fetched.
    pub async fn certification(&self, movie_id: u64) -> Result<String> {
        let details = self.details_with_certification(movie_id).await?;
        Ok(extract_certification(details.release_dates.as_ref()))
    }

    /// Returns a basic discover page using the configured default sort.
    ///
    /// # Errors
    ///
    /// Returns an error if the page is not cached and the request fails.
    pub async fn fetch_basic_page(&self, page: u32, genre: Option<u32>) -> Result<MoviePage> {
        self.fetch_basic_page_sorted(page, genre, self.config.default_sort)
            .await
    }

    /// Returns a basic (unenriched) discover page, caching it.
    ///
    /// # Errors
    ///
    /// Returns an error if the page is not cached and the request fails.
    pub async fn fetch_basic_page_sorted(
        &self,
        page: u32,
        genre: Option<u32>,
        sort: MovieSort,
    ) -> Result<MoviePage> {
        let key = DiscoverPageKey { page, genre, sort };
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let response = self.discover(page, genre, sort).await?;
        let movies = MoviePage::from_response(&response);
        self.cache.set(&key, movies.clone());
        Ok(movies)
    }

    /// Returns a basic (unenriched) search page, caching it.
    ///
    /// # Errors
    ///
    /// Returns an error if the page is not cached and the request fails.
    pub async fn search_basic_page(&self, query: &str, page: u32) -> Result<MoviePage> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(MoviePage::empty(page));
        }

        let key = SearchPageKey {
            query: String::from(query),
            page,
        };
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let response = self.search(query, page).await?;
        let movies = MoviePage::from_response(&response);
        self.cache.set(&key, movies.clone());
        Ok(movies)
    }

    /// Upgrades a basic movie with tagline, runtime, rating and genre names.
    ///
    /// On failure the movie is returned unchanged.
    pub async fn enrich_one(&self, movie: &Movie) -> Movie {
        match self.details_with_certification(movie.id).await {
            Ok(details) => movie.enriched_with(&details),
            Err(e) => {
                tracing::debug!(movie_id = movie.id, error = %e, "enrichment failed");
                movie.clone()
            }
        }
    }

    /// Enriches a whole page in paced concurrent groups, keeping input order.
    ///
    /// Movies whose details cannot be fetched are returned unchanged.
    pub async fn enrich_many(&self, movies: &[Movie]) -> Vec<Movie> {
        let ids: Vec<u64> = movies.iter().map(|movie| movie.id).collect();
        let details = batch_fetch(&ids, self.config.batch, |id| self.cached_details(id)).await;

        movies
            .iter()
            .map(|movie| {
                details
                    .get(&movie.id)
                    .map_or_else(|| movie.clone(), |d| movie.enriched_with(d))
            })
            .collect()
    }

    /// Drops every cached response. Returns the number of persisted rows removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistent tier cannot be cleared.
    pub fn clear_cache(&self) -> Result<usize> {
        self.cache.clear()
    }

    /// Cache-first detail lookup that skips the scheduler; batch pacing applies instead.
    async fn cached_details(&self, movie_id: u64) -> Result<TmdbMovieDetails> {
        let key = MovieDetailsKey(movie_id);
        if let Some(details) = self.cache.get(&key) {
            return Ok(details);
        }

        let details = self
            .api
            .movie_details(movie_id, &self.config.language)
            .await
            .with_context(|| format!("failed to fetch details for movie {movie_id}"))?;
        self.cache.set(&key, details.clone());
        Ok(details)
    }
}

/// First and last day of [`RELEASE_WINDOW`].
fn release_window_dates() -> Result<(NaiveDate, NaiveDate)> {
    let from = NaiveDate::from_ymd_opt(*RELEASE_WINDOW.start(), 1, 1)
        .context("invalid release window start")?;
    let to = NaiveDate::from_ymd_opt(*RELEASE_WINDOW.end(), 12, 31)
        .context("invalid release window end")?;
    Ok((from, to))
}

#[cfg(test)]
pub(crate) mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use reelstore_api::tmdb::TmdbClient;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    pub(crate) fn catalog_for(mock_server: &MockServer) -> Catalog<TmdbClient> {
        let base_url = format!("{}/3/", mock_server.uri());
        let client = TmdbClient::builder()
            .base_url(base_url.parse().unwrap())
            .api_key("test-key")
            .user_agent("test/0.0.0")
            .build()
            .unwrap();
        let config = CatalogConfig {
            request_interval: Duration::from_millis(1),
            batch: BatchOptions {
                batch_size: 2,
                batch_delay: Duration::from_millis(1),
            },
            ..CatalogConfig::default()
        };
        Catalog::new(client, CacheStore::memory_only(), config)
    }

    async fn mount_json(mock_server: &MockServer, url_path: &str, body: &str, times: u64) {
        Mock::given(method("GET"))
            .and(path(url_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(times)
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn test_discover_sends_release_window() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/discover/movie"))
            .and(query_param("primary_release_date.gte", "1980-01-01"))
            .and(query_param("primary_release_date.lte", "1989-12-31"))
            .and(query_param("include_adult", "false"))
            .and(query_param("include_video", "false"))
            .and(query_param("language", "en-US"))
            .respond_with(ResponseTemplate::new(200).set_body_string(include_str!(
                "../../../fixtures/tmdb/discover_movie_1980s.json"
            )))
            .expect(1)
            .mount(&mock_server)
            .await;
        let catalog = catalog_for(&mock_server);

        // Act
        let page = catalog.fetch_basic_page(1, None).await.unwrap();

        // Assert
        assert!(page.movies.len() <= 20);
        assert!(page.movies.iter().all(|m| (1980..=1989).contains(&m.year)));
        assert!(page.movies.iter().all(|m| m.rating == "NR" && m.runtime.is_empty()));
    }

    #[tokio::test]
    async fn test_basic_page_second_call_is_cache_hit() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/3/discover/movie",
            include_str!("../../../fixtures/tmdb/discover_movie_1980s.json"),
            1,
        )
        .await;
        let catalog = catalog_for(&mock_server);

        // Act
        let first = catalog.fetch_basic_page(1, None).await.unwrap();
        let second = catalog.fetch_basic_page(1, None).await.unwrap();

        // Assert
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/3/discover/movie",
            include_str!("../../../fixtures/tmdb/discover_movie_1980s.json"),
            2,
        )
        .await;
        let catalog = catalog_for(&mock_server);
        catalog.fetch_basic_page(1, None).await.unwrap();

        // Act
        catalog.clear_cache().unwrap();
        catalog.fetch_basic_page(1, None).await.unwrap();

        // Assert: expect(2) verified when the server drops
    }

    #[tokio::test]
    async fn test_discover_error_propagates() {
        // Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/discover/movie"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        let catalog = catalog_for(&mock_server);

        // Act
        let result = catalog.fetch_basic_page(1, None).await;

        // Assert
        let err = result.unwrap_err();
        let http = err.downcast_ref::<reelstore_api::tmdb::TmdbHttpError>().unwrap();
        assert_eq!(http.status, 500);
        assert!(!catalog.cache().contains(&DiscoverPageKey {
            page: 1,
            genre: None,
            sort: MovieSort::PopularityDesc,
        }));
    }

    #[tokio::test]
    async fn test_search_filters_to_release_window() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/3/search/movie",
            include_str!("../../../fixtures/tmdb/search_movie_back_to_the_future.json"),
            1,
        )
        .await;
        let catalog = catalog_for(&mock_server);

        // Act
        let page = catalog.search_basic_page("back to the future", 1).await.unwrap();

        // Assert
        let ids: Vec<u64> = page.movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![105, 165]);
        assert_eq!(page.total_results, 4);
    }

    #[tokio::test]
    async fn test_search_with_no_window_matches_reports_zero_totals() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/3/search/movie",
            include_str!("../../../fixtures/tmdb/search_movie_outside_window.json"),
            1,
        )
        .await;
        let catalog = catalog_for(&mock_server);

        // Act
        let page = catalog.search("inception", 1).await.unwrap();

        // Assert
        assert!(page.results.is_empty());
        assert_eq!((page.total_pages, page.total_results), (0, 0));
    }

    #[tokio::test]
    async fn test_blank_search_sends_no_request() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(&mock_server, "/3/search/movie", "{}", 0).await;
        let catalog = catalog_for(&mock_server);

        // Act
        let page = catalog.search_basic_page("   ", 2).await.unwrap();

        // Assert
        assert_eq!(page, MoviePage::empty(2));
    }

    #[tokio::test]
    async fn test_details_second_call_is_cache_hit() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/3/movie/105",
            include_str!("../../../fixtures/tmdb/movie_details_105.json"),
            1,
        )
        .await;
        let catalog = catalog_for(&mock_server);

        // Act
        let first = catalog.details_with_certification(105).await.unwrap();
        let second = catalog.details_with_certification(105).await.unwrap();

        // Assert
        assert_eq!(first, second);
        assert!(catalog.cache().contains(&MovieDetailsKey(105)));
    }

    #[tokio::test]
    async fn test_concurrent_detail_lookups_collapse() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/3/movie/105",
            include_str!("../../../fixtures/tmdb/movie_details_105.json"),
            1,
        )
        .await;
        let catalog = catalog_for(&mock_server);

        // Act
        let (a, b) = tokio::join!(
            catalog.details_with_certification(105),
            catalog.details_with_certification(105),
        );

        // Assert
        assert_eq!(a.unwrap().id, 105);
        assert_eq!(b.unwrap().id, 105);
    }

    #[tokio::test]
    async fn test_certification_without_us_entry_is_not_rated() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/3/movie/31011",
            include_str!("../../../fixtures/tmdb/movie_details_no_us.json"),
            1,
        )
        .await;
        let catalog = catalog_for(&mock_server);

        // Act
        let rating = catalog.certification(31011).await.unwrap();

        // Assert
        assert_eq!(rating, "NR");
    }

    #[tokio::test]
    async fn test_enrich_one_is_idempotent() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/3/discover/movie",
            include_str!("../../../fixtures/tmdb/discover_movie_1980s.json"),
            1,
        )
        .await;
        mount_json(
            &mock_server,
            "/3/movie/105",
            include_str!("../../../fixtures/tmdb/movie_details_105.json"),
            1,
        )
        .await;
        let catalog = catalog_for(&mock_server);
        let page = catalog.fetch_basic_page(1, None).await.unwrap();

        // Act
        let once = catalog.enrich_one(&page.movies[0]).await;
        let twice = catalog.enrich_one(&once).await;

        // Assert
        assert_eq!(once.rating, "PG");
        assert_eq!(once.runtime, "1h 56m");
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_enrich_one_failure_returns_input() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/3/discover/movie",
            include_str!("../../../fixtures/tmdb/discover_movie_1980s.json"),
            1,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/3/movie/105"))
            .respond_with(ResponseTemplate::new(404).set_body_string(
                r#"{"status_code":34,"status_message":"The resource you requested could not be found.","success":false}"#,
            ))
            .mount(&mock_server)
            .await;
        let catalog = catalog_for(&mock_server);
        let movie = catalog.fetch_basic_page(1, None).await.unwrap().movies[0].clone();

        // Act
        let result = catalog.enrich_one(&movie).await;

        // Assert
        assert_eq!(result, movie);
    }

    #[tokio::test]
    async fn test_enrich_many_keeps_order_and_failed_items() {
        // Arrange
        let mock_server = MockServer::start().await;
        mount_json(
            &mock_server,
            "/3/discover/movie",
            include_str!("../../../fixtures/tmdb/discover_movie_1980s.json"),
            1,
        )
        .await;
        mount_json(
            &mock_server,
            "/3/movie/105",
            include_str!("../../../fixtures/tmdb/movie_details_105.json"),
            1,
        )
        .await;
        // Every other detail lookup fails.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;
        let catalog = catalog_for(&mock_server);
        let page = catalog.fetch_basic_page(1, None).await.unwrap();

        // Act
        let enriched = catalog.enrich_many(&page.movies).await;

        // Assert
        let ids: Vec<u64> = enriched.iter().map(|m| m.id).collect();
        let expected: Vec<u64> = page.movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, expected);
        assert_eq!(enriched[0].rating, "PG");
        assert_eq!(enriched[1..], page.movies[1..]);
    }
}
