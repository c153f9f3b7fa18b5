//! TMDB API response types and request parameters.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

// --- Movie lists (discover / search) ---

/// Response from the `discover/movie` and `search/movie` endpoints.
#[derive(Debug, Clone, Deserialize)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbMoviePage {
    /// Current page number.
    pub page: u32,
    /// Movies on this page.
    pub results: Vec<TmdbMovie>,
    /// Total number of pages.
    pub total_pages: u32,
    /// Total number of results.
    pub total_results: u32,
}

/// A single movie record as returned by list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbMovie {
    /// TMDB movie ID.
    pub id: u64,
    /// Localized title.
    pub title: String,
    /// Original title.
    #[serde(default)]
    pub original_title: String,
    /// Overview text.
    #[serde(default)]
    pub overview: Option<String>,
    /// Poster image path.
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Backdrop image path.
    #[serde(default)]
    pub backdrop_path: Option<String>,
    /// Release date (YYYY-MM-DD, empty, or null).
    #[serde(default)]
    pub release_date: Option<String>,
    /// Genre IDs.
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    /// Vote average.
    #[serde(default)]
    pub vote_average: f64,
    /// Vote count.
    #[serde(default)]
    pub vote_count: u32,
    /// Popularity score.
    #[serde(default)]
    pub popularity: f64,
    /// Adult flag.
    #[serde(default)]
    pub adult: bool,
    /// Video-only flag.
    #[serde(default)]
    pub video: bool,
    /// Original language (ISO 639-1).
    #[serde(default)]
    pub original_language: String,
}

// --- Movie details ---

/// Response from `movie/{movie_id}?append_to_response=release_dates`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbMovieDetails {
    /// TMDB movie ID.
    pub id: u64,
    /// Localized title.
    pub title: String,
    /// Original title.
    #[serde(default)]
    pub original_title: String,
    /// Overview text.
    #[serde(default)]
    pub overview: Option<String>,
    /// Tagline (often empty).
    #[serde(default)]
    pub tagline: Option<String>,
    /// Runtime in minutes.
    #[serde(default)]
    pub runtime: Option<u32>,
    /// Poster image path.
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Backdrop image path.
    #[serde(default)]
    pub backdrop_path: Option<String>,
    /// Release date (YYYY-MM-DD, empty, or null).
    #[serde(default)]
    pub release_date: Option<String>,
    /// Genres.
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    /// Vote average.
    #[serde(default)]
    pub vote_average: f64,
    /// Vote count.
    #[serde(default)]
    pub vote_count: u32,
    /// Popularity score.
    #[serde(default)]
    pub popularity: f64,
    /// Adult flag.
    #[serde(default)]
    pub adult: bool,
    /// Video-only flag.
    #[serde(default)]
    pub video: bool,
    /// Original language (ISO 639-1).
    #[serde(default)]
    pub original_language: String,
    /// Status (e.g., "Released").
    #[serde(default)]
    pub status: Option<String>,
    /// Budget in USD.
    #[serde(default)]
    pub budget: u64,
    /// Revenue in USD.
    #[serde(default)]
    pub revenue: u64,
    /// IMDb identifier.
    #[serde(default)]
    pub imdb_id: Option<String>,
    /// Appended release dates with certifications.
    ///
    /// A sub-resource that does not match the expected shape is treated as absent.
    #[serde(default, deserialize_with = "deserialize_lenient_release_dates")]
    pub release_dates: Option<TmdbReleaseDates>,
}

/// Genre entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmdbGenre {
    /// Genre ID.
    pub id: u32,
    /// Genre name.
    pub name: String,
}

/// `release_dates` sub-resource, grouped by country.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmdbReleaseDates {
    /// One entry per country.
    #[serde(default)]
    pub results: Vec<TmdbCountryReleaseDates>,
}

/// Release dates for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmdbCountryReleaseDates {
    /// Country code (ISO 3166-1).
    pub iso_3166_1: String,
    /// Releases in this country, in TMDB order.
    #[serde(default)]
    pub release_dates: Vec<TmdbReleaseDate>,
}

/// A single release with its certification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmdbReleaseDate {
    /// Certification (e.g., "PG-13"); often empty.
    #[serde(default)]
    pub certification: String,
    /// Release timestamp (ISO 8601).
    #[serde(default)]
    pub release_date: Option<String>,
    /// Release type (1 = premiere ... 6 = TV).
    #[serde(rename = "type", default)]
    pub release_type: Option<u32>,
    /// Free-form note.
    #[serde(default)]
    pub note: Option<String>,
}

/// Accepts any JSON for `release_dates` and keeps it only if it has the expected shape.
fn deserialize_lenient_release_dates<'de, D>(
    deserializer: D,
) -> Result<Option<TmdbReleaseDates>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| serde_json::from_value(value).ok()))
}

// --- Error Response ---

/// TMDB API error response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbErrorResponse {
    /// TMDB error code.
    pub status_code: u32,
    /// Error message.
    pub status_message: String,
    /// Success flag (always false for errors).
    #[allow(dead_code)]
    #[serde(default)]
    pub success: bool,
}

// --- Sort order ---

/// Sort orders accepted by `discover/movie`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MovieSort {
    /// Most popular first.
    #[default]
    PopularityDesc,
    /// Highest rated first.
    VoteAverageDesc,
    /// Newest release first.
    ReleaseDateDesc,
    /// Oldest release first.
    ReleaseDateAsc,
    /// Alphabetical by title.
    TitleAsc,
    /// Highest grossing first.
    RevenueDesc,
}

impl MovieSort {
    /// All sort orders, in display order.
    pub const ALL: [Self; 6] = [
        Self::PopularityDesc,
        Self::VoteAverageDesc,
        Self::ReleaseDateDesc,
        Self::ReleaseDateAsc,
        Self::TitleAsc,
        Self::RevenueDesc,
    ];

    /// Returns the TMDB `sort_by` value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PopularityDesc => "popularity.desc",
            Self::VoteAverageDesc => "vote_average.desc",
            Self::ReleaseDateDesc => "primary_release_date.desc",
            Self::ReleaseDateAsc => "primary_release_date.asc",
            Self::TitleAsc => "title.asc",
            Self::RevenueDesc => "revenue.desc",
        }
    }
}

impl fmt::Display for MovieSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known `sort_by` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMovieSortError(String);

impl fmt::Display for ParseMovieSortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sort order: {}", self.0)
    }
}

impl std::error::Error for ParseMovieSortError {}

impl FromStr for MovieSort {
    type Err = ParseMovieSortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| ParseMovieSortError(String::from(s)))
    }
}

// --- Request Parameters ---

/// Parameters for the `discover/movie` endpoint.
#[derive(Debug, Clone)]
pub struct DiscoverMovieParams {
    /// Response language (default: "en-US").
    pub language: String,
    /// Result page (1-500, default: 1).
    pub page: u32,
    /// Sort order.
    pub sort_by: MovieSort,
    /// Restrict to a single genre ID.
    pub with_genres: Option<u32>,
    /// Earliest primary release date (inclusive).
    pub release_date_gte: Option<NaiveDate>,
    /// Latest primary release date (inclusive).
    pub release_date_lte: Option<NaiveDate>,
    /// Include adult content.
    pub include_adult: bool,
    /// Include video-only releases.
    pub include_video: bool,
}

impl Default for DiscoverMovieParams {
    fn default() -> Self {
        Self {
            language: String::from("en-US"),
            page: 1,
            sort_by: MovieSort::default(),
            with_genres: None,
            release_date_gte: None,
            release_date_lte: None,
            include_adult: false,
            include_video: false,
        }
    }
}

impl DiscoverMovieParams {
    /// Sets the response language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the result page.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the sort order.
    #[must_use]
    pub const fn sort_by(mut self, sort: MovieSort) -> Self {
        self.sort_by = sort;
        self
    }

    /// Restricts results to a genre, or clears the restriction.
    #[must_use]
    pub const fn with_genres(mut self, genre: Option<u32>) -> Self {
        self.with_genres = genre;
        self
    }

    /// Restricts results to a closed interval of primary release dates.
    #[must_use]
    pub const fn release_window(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.release_date_gte = Some(from);
        self.release_date_lte = Some(to);
        self
    }
}

/// Parameters for the `search/movie` endpoint.
#[derive(Debug, Clone)]
pub struct SearchMovieParams {
    /// Search query (required).
    pub query: String,
    /// Response language (default: "en-US").
    pub language: String,
    /// Result page (1-500, default: 1).
    pub page: u32,
    /// Include adult content.
    pub include_adult: bool,
}

impl SearchMovieParams {
    /// Creates new search params with the given query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: String::from("en-US"),
            page: 1,
            include_adult: false,
        }
    }

    /// Sets the response language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the result page.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_movie_sort_roundtrips_through_str() {
        // Arrange & Act & Assert
        for sort in MovieSort::ALL {
            assert_eq!(sort.as_str().parse::<MovieSort>().unwrap(), sort);
        }
    }

    #[test]
    fn test_movie_sort_rejects_unknown() {
        // Arrange & Act
        let result = "budget.desc".parse::<MovieSort>();

        // Assert
        assert_eq!(
            result.unwrap_err().to_string(),
            "unknown sort order: budget.desc"
        );
    }

    #[test]
    fn test_malformed_release_dates_become_none() {
        // Arrange
        let json = r#"{"id":1,"title":"X","release_dates":{"results":"not-a-list"}}"#;

        // Act
        let details: TmdbMovieDetails = serde_json::from_str(json).unwrap();

        // Assert
        assert!(details.release_dates.is_none());
    }

    #[test]
    fn test_missing_optional_fields_use_defaults() {
        // Arrange
        let json = r#"{"id":7,"title":"Minimal"}"#;

        // Act
        let movie: TmdbMovie = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(movie.id, 7);
        assert!(movie.genre_ids.is_empty());
        assert!(movie.release_date.is_none());
        assert!(!movie.adult);
    }

    #[test]
    fn test_discover_params_defaults() {
        // Arrange & Act
        let params = DiscoverMovieParams::default().page(3).with_genres(Some(27));

        // Assert
        assert_eq!(params.page, 3);
        assert_eq!(params.with_genres, Some(27));
        assert_eq!(params.sort_by, MovieSort::PopularityDesc);
        assert!(!params.include_adult);
        assert!(!params.include_video);
    }
}
