//! Image URL resolution for poster and backdrop paths.

use anyhow::{Context, Result};
use url::Url;

/// Default TMDB image CDN base.
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/";

/// Named image size tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    /// `w185`
    Small,
    /// `w342`
    Medium,
    /// `w500`
    Large,
    /// `w780`
    Wide,
    /// Full resolution.
    Original,
}

impl ImageSize {
    /// Returns the TMDB size path segment.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::Small => "w185",
            Self::Medium => "w342",
            Self::Large => "w500",
            Self::Wide => "w780",
            Self::Original => "original",
        }
    }
}

/// Resolves relative image paths returned by the API into absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrls {
    base_url: Url,
}

impl ImageUrls {
    /// Creates a resolver for the given base URL.
    ///
    /// A missing trailing slash is added so size tokens append instead of replacing
    /// the last segment.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid absolute URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            String::from(base_url)
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .with_context(|| format!("invalid image base URL: {base_url}"))?;
        Ok(Self { base_url })
    }

    /// Returns the URL for `path` at `size`, or `None` when there is no image.
    #[must_use]
    pub fn resolve(&self, path: Option<&str>, size: ImageSize) -> Option<Url> {
        let path = path?.trim().trim_start_matches('/');
        if path.is_empty() {
            return None;
        }
        self.base_url
            .join(&format!("{}/{path}", size.token()))
            .ok()
    }

    /// Poster URL at the storefront's medium size.
    #[must_use]
    pub fn poster(&self, path: Option<&str>) -> Option<Url> {
        self.resolve(path, ImageSize::Medium)
    }

    /// Backdrop URL at the storefront's wide size.
    #[must_use]
    pub fn backdrop(&self, path: Option<&str>) -> Option<Url> {
        self.resolve(path, ImageSize::Wide)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_poster_url_uses_medium_size() {
        // Arrange
        let images = ImageUrls::new(DEFAULT_IMAGE_BASE_URL).unwrap();

        // Act
        let url = images.poster(Some("/fNOH9f1aA7XRTzl1sAOx9iF553Q.jpg")).unwrap();

        // Assert
        assert_eq!(
            url.as_str(),
            "https://image.tmdb.org/t/p/w342/fNOH9f1aA7XRTzl1sAOx9iF553Q.jpg"
        );
    }

    #[test]
    fn test_missing_path_has_no_url() {
        // Arrange
        let images = ImageUrls::new(DEFAULT_IMAGE_BASE_URL).unwrap();

        // Act & Assert
        assert!(images.poster(None).is_none());
        assert!(images.backdrop(Some("")).is_none());
    }

    #[test]
    fn test_custom_base_without_trailing_slash() {
        // Arrange
        let images = ImageUrls::new("http://localhost:9000/img").unwrap();

        // Act
        let url = images.resolve(Some("/a.jpg"), ImageSize::Original).unwrap();

        // Assert
        assert_eq!(url.as_str(), "http://localhost:9000/img/original/a.jpg");
    }

    #[test]
    fn test_invalid_base_url() {
        // Arrange & Act
        let result = ImageUrls::new("not a url");

        // Assert
        assert!(result.is_err());
    }
}
