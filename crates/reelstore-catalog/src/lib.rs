//! Movie catalog for the reelstore storefront.
//!
//! Wraps a TMDB client with a two-tier response cache, a serial request
//! scheduler for detail lookups, batched enrichment and background prefetch.

/// Grouped concurrent fetching.
pub mod batch;
/// Typed two-tier response cache.
pub mod cache;
/// Catalog client and enrichment pipeline.
pub mod catalog;
/// Static genre table.
pub mod genres;
/// Storefront view model.
pub mod movie;
/// Background cache warming.
pub mod prefetch;
/// Serial request scheduler.
pub mod scheduler;

pub use batch::{BatchOptions, batch_fetch};
pub use cache::{
    CACHE_KEY_PREFIX, CACHE_TTL, CacheEntry, CacheKey, CacheNamespace, CacheStore,
    DiscoverPageKey, MovieDetailsKey, SearchPageKey,
};
pub use catalog::{Catalog, CatalogConfig};
pub use genres::{MOVIE_GENRES, genre_name, genre_names};
pub use movie::{Movie, MoviePage, RELEASE_WINDOW, format_runtime, release_year};
pub use prefetch::{PageFilter, PrefetchOutcome, PrefetchReport};
pub use scheduler::{DEFAULT_REQUEST_INTERVAL, RequestScheduler, WorkerState};
