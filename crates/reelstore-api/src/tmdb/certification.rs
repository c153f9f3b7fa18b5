//! US certification lookup over the `release_dates` sub-resource.

use super::types::TmdbReleaseDates;

/// Rating reported when no US certification is available.
pub const NOT_RATED: &str = "NR";

/// Country whose certification is canonical for the storefront.
const CERTIFICATION_COUNTRY: &str = "US";

/// Returns the first non-empty US certification, or [`NOT_RATED`].
///
/// Never fails: a missing sub-resource, a missing US entry, or a US entry
/// with only blank certifications all yield `"NR"`.
#[must_use]
pub fn extract_certification(release_dates: Option<&TmdbReleaseDates>) -> String {
    release_dates
        .and_then(|dates| {
            dates
                .results
                .iter()
                .find(|country| country.iso_3166_1 == CERTIFICATION_COUNTRY)
        })
        .and_then(|us| {
            us.release_dates
                .iter()
                .map(|release| release.certification.trim())
                .find(|certification| !certification.is_empty())
        })
        .map_or_else(|| String::from(NOT_RATED), String::from)
}
