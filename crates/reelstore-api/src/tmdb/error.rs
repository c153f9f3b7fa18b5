//! Typed failure for non-success TMDB responses.

use std::fmt;

/// A non-2xx response from the TMDB API.
///
/// Returned inside `anyhow::Error`; recover it with
/// `err.downcast_ref::<TmdbHttpError>()`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::module_name_repetitions)]
pub struct TmdbHttpError {
    /// HTTP status code.
    pub status: u16,
    /// TMDB `status_message`, or the raw body / canonical reason.
    pub reason: String,
}

impl fmt::Display for TmdbHttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TMDB API error (HTTP {}): {}", self.status, self.reason)
    }
}

impl std::error::Error for TmdbHttpError {}
