use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListReferenceError {
    #[error("list URL is required")]
    Missing,
    #[error("list URL is not a valid URL")]
    Malformed,
    #[error("list URL must use http or https")]
    UnsupportedScheme,
    #[error("list URL must point at {expected}")]
    WrongHost { expected: String },
}

/// Validated reference to an externally hosted movie list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListReference {
    url: Url,
}

impl ListReference {
    /// Parses `raw` and checks its host is `expected_host` or one of its
    /// subdomains (`letterboxd.com` accepts `www.letterboxd.com`).
    pub fn parse(raw: &str, expected_host: &str) -> Result<Self, ListReferenceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ListReferenceError::Missing);
        }

        let url = Url::parse(raw).map_err(|_| ListReferenceError::Malformed)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ListReferenceError::UnsupportedScheme);
        }

        let expected = expected_host.trim().trim_start_matches('.').to_ascii_lowercase();
        let host = url
            .host_str()
            .map(str::to_ascii_lowercase)
            .ok_or(ListReferenceError::Malformed)?;
        let host_matches =
            host == expected || host.ends_with(&format!(".{expected}"));
        if !host_matches {
            return Err(ListReferenceError::WrongHost { expected });
        }

        Ok(Self { url })
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl fmt::Display for ListReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}
