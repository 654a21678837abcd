use once_cell::sync::Lazy;
use regex::Regex;

static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<title>.*?)\s*\((?P<year>\d{4})\)\s*$")
        .expect("valid trailing year regex")
});

/// A search query split into the bare title and an optional year hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleQuery {
    pub title: String,
    pub year: Option<u16>,
}

impl TitleQuery {
    /// Strips a trailing `(YYYY)` token and carries it as the year hint.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(caps) = TRAILING_YEAR.captures(trimmed) {
            let title = caps["title"].trim();
            if !title.is_empty()
                && let Ok(year) = caps["year"].parse::<u16>()
            {
                return Self {
                    title: title.to_string(),
                    year: Some(year),
                };
            }
        }

        Self {
            title: trimmed.to_string(),
            year: None,
        }
    }
}
