//! Background cache warming.
//!
//! Prefetches never fail their caller. Each spawned task settles into a
//! [`PrefetchReport`] and logs a `warn` event when the fetch did not succeed.

use std::sync::Arc;

use anyhow::Result;
use reelstore_api::tmdb::{MovieSort, TmdbApi};
use tokio::task::JoinHandle;

use crate::cache::{DiscoverPageKey, MovieDetailsKey, SearchPageKey};
use crate::catalog::Catalog;

/// Which listing a page prefetch continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFilter {
    /// Discover listing with optional genre and a sort order.
    Discover {
        /// Genre filter.
        genre: Option<u32>,
        /// Sort order.
        sort: MovieSort,
    },
    /// Search listing for a query.
    Search {
        /// Search query.
        query: String,
    },
}

/// What a prefetch call did.
#[derive(Debug)]
pub enum PrefetchOutcome {
    /// A fresh entry already exists; nothing was launched.
    AlreadyCached,
    /// A background fetch was spawned. Dropping the handle detaches it.
    Launched(JoinHandle<PrefetchReport>),
    /// The current page is the last one.
    NoNextPage,
}

/// How a launched prefetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchReport {
    /// The fetched value is in the cache.
    Completed,
    /// The fetch failed; the message was logged at `warn`.
    Failed(String),
}

impl<A> Catalog<A>
where
    A: TmdbApi + Sync + 'static,
{
    /// Warms the details cache for `movie_id` in the background.
    pub fn prefetch_details(self: &Arc<Self>, movie_id: u64) -> PrefetchOutcome {
        if self.cache().contains(&MovieDetailsKey(movie_id)) {
            return PrefetchOutcome::AlreadyCached;
        }

        let catalog = Arc::clone(self);
        PrefetchOutcome::Launched(tokio::spawn(async move {
            let result = catalog.details_with_certification(movie_id).await;
            settle("details", result.map(|_| ()))
        }))
    }

    /// Warms the cache for the page after `current_page` of the same listing.
    pub fn prefetch_next_page(
        self: &Arc<Self>,
        current_page: u32,
        total_pages: u32,
        filter: PageFilter,
    ) -> PrefetchOutcome {
        if current_page >= total_pages {
            return PrefetchOutcome::NoNextPage;
        }
        let next_page = current_page.saturating_add(1);

        let cached = match &filter {
            PageFilter::Discover { genre, sort } => self.cache().contains(&DiscoverPageKey {
                page: next_page,
                genre: *genre,
                sort: *sort,
            }),
            PageFilter::Search { query } => self.cache().contains(&SearchPageKey {
                query: String::from(query.trim()),
                page: next_page,
            }),
        };
        if cached {
            return PrefetchOutcome::AlreadyCached;
        }

        let catalog = Arc::clone(self);
        PrefetchOutcome::Launched(tokio::spawn(async move {
            let result = match filter {
                PageFilter::Discover { genre, sort } => catalog
                    .fetch_basic_page_sorted(next_page, genre, sort)
                    .await
                    .map(|_| ()),
                PageFilter::Search { query } => catalog
                    .search_basic_page(&query, next_page)
                    .await
                    .map(|_| ()),
            };
            settle("page", result)
        }))
    }
}

/// Converts a prefetch result into a report, logging failures.
fn settle(kind: &str, result: Result<()>) -> PrefetchReport {
    match result {
        Ok(()) => PrefetchReport::Completed,
        Err(e) => {
            let message = format!("{e:#}");
            tracing::warn!(kind, error = %message, "prefetch failed");
            PrefetchReport::Failed(message)
        }
    }
}
