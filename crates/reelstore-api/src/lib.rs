//! API client library for reelstore.
//!
//! Provides a typed client for the TMDB v3 movie endpoints used by the
//! storefront catalog.

/// TMDB API client.
pub mod tmdb;
