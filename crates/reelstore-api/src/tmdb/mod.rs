//! TMDB API client module.
//!
//! Handles HTTP requests to the TMDB API v3 movie endpoints
//! (discover, search, details with release dates).

mod api;
mod certification;
mod client;
mod error;
mod images;
mod types;

#[allow(clippy::module_name_repetitions)]
pub use api::{LocalTmdbApi, TmdbApi};
pub use certification::{NOT_RATED, extract_certification};
#[allow(clippy::module_name_repetitions)]
pub use client::{TmdbClient, TmdbClientBuilder};
#[allow(clippy::module_name_repetitions)]
pub use error::TmdbHttpError;
pub use images::{DEFAULT_IMAGE_BASE_URL, ImageSize, ImageUrls};
#[allow(clippy::module_name_repetitions)]
pub use types::{
    DiscoverMovieParams, MovieSort, ParseMovieSortError, SearchMovieParams,
    TmdbCountryReleaseDates, TmdbGenre, TmdbMovie, TmdbMovieDetails, TmdbMoviePage,
    TmdbReleaseDate, TmdbReleaseDates,
};
