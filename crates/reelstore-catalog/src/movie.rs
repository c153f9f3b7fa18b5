//! Storefront view model built from TMDB records.

use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reelstore_api::tmdb::{
    NOT_RATED, TmdbMovie, TmdbMovieDetails, TmdbMoviePage, extract_certification,
};
use serde::{Deserialize, Serialize};

use crate::genres::genre_names;

/// Release years carried by the storefront.
pub const RELEASE_WINDOW: RangeInclusive<i32> = 1980..=1989;

/// Share of titles shown as in stock.
const AVAILABILITY_RATE: f64 = 0.9;

/// A movie as presented by the storefront.
///
/// Created from a list record with placeholder detail fields, then upgraded
/// in place by [`Movie::enriched_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    /// TMDB movie ID.
    pub id: u64,
    /// Localized title.
    pub title: String,
    /// Release year, `0` when the release date is missing or malformed.
    pub year: i32,
    /// Genre names.
    pub genres: Vec<String>,
    /// Tagline, empty until enriched.
    pub tagline: String,
    /// US certification, `"NR"` until enriched.
    pub rating: String,
    /// Runtime such as `"1h 56m"`, empty until enriched.
    pub runtime: String,
    /// Simulated stock flag. Cosmetic only; there is no inventory behind it.
    pub available: bool,
    /// Poster image path.
    pub poster_path: Option<String>,
    /// Backdrop image path.
    pub backdrop_path: Option<String>,
    /// TMDB vote average.
    pub vote_average: f64,
    /// Overview text.
    pub overview: String,
}

impl Movie {
    /// Builds the basic (unenriched) view of a list record.
    #[must_use]
    pub fn from_listing(movie: &TmdbMovie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            year: release_year(movie.release_date.as_deref()),
            genres: genre_names(&movie.genre_ids),
            tagline: String::new(),
            rating: String::from(NOT_RATED),
            runtime: String::new(),
            available: simulated_availability(movie.id),
            poster_path: movie.poster_path.clone(),
            backdrop_path: movie.backdrop_path.clone(),
            vote_average: movie.vote_average,
            overview: movie.overview.clone().unwrap_or_default(),
        }
    }

    /// Returns a copy upgraded with authoritative detail values.
    ///
    /// Only non-empty values are taken, so a populated field never regresses.
    #[must_use]
    pub fn enriched_with(&self, details: &TmdbMovieDetails) -> Self {
        let mut enriched = self.clone();

        if let Some(tagline) = details.tagline.as_deref().map(str::trim)
            && !tagline.is_empty()
        {
            enriched.tagline = String::from(tagline);
        }

        let runtime = format_runtime(details.runtime);
        if !runtime.is_empty() {
            enriched.runtime = runtime;
        }

        let rating = extract_certification(details.release_dates.as_ref());
        if rating != NOT_RATED {
            enriched.rating = rating;
        }

        let genres: Vec<String> = details
            .genres
            .iter()
            .map(|genre| genre.name.trim())
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        if !genres.is_empty() {
            enriched.genres = genres;
        }

        enriched
    }
}

/// One page of storefront movies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviePage {
    /// Page number (1-based).
    pub page: u32,
    /// Movies on this page.
    pub movies: Vec<Movie>,
    /// Total number of pages.
    pub total_pages: u32,
    /// Total number of results.
    pub total_results: u32,
}

impl MoviePage {
    /// Transforms a raw TMDB page into storefront movies.
    #[must_use]
    pub fn from_response(response: &TmdbMoviePage) -> Self {
        Self {
            page: response.page,
            movies: response.results.iter().map(Movie::from_listing).collect(),
            total_pages: response.total_pages,
            total_results: response.total_results,
        }
    }

    /// A page with no results.
    #[must_use]
    pub const fn empty(page: u32) -> Self {
        Self {
            page,
            movies: Vec::new(),
            total_pages: 0,
            total_results: 0,
        }
    }
}

/// Parses the year of a `YYYY-MM-DD` date, returning `0` when it cannot be parsed.
#[must_use]
pub fn release_year(date: Option<&str>) -> i32 {
    date.and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
        .map_or(0, |d| d.year())
}

/// Returns whether a release date falls inside [`RELEASE_WINDOW`].
#[must_use]
pub fn in_release_window(date: Option<&str>) -> bool {
    RELEASE_WINDOW.contains(&release_year(date))
}

/// Formats a runtime in minutes as `"1h 56m"`, `"2h"` or `"45m"`.
///
/// Missing or zero runtimes format as an empty string.
#[must_use]
#[allow(clippy::arithmetic_side_effects)]
pub fn format_runtime(minutes: Option<u32>) -> String {
    let Some(total) = minutes.filter(|m| *m > 0) else {
        return String::new();
    };
    let hours = total / 60;
    let mins = total % 60;
    match (hours, mins) {
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Placeholder stock simulation, seeded by movie ID so a title does not
/// flicker between pages or cache reloads.
fn simulated_availability(movie_id: u64) -> bool {
    StdRng::seed_from_u64(movie_id).random_bool(AVAILABILITY_RATE)
}
