use sha2::{Digest, Sha256};
use std::fmt;

/// Width, in hex characters, of the digest embedded in every key.
pub const KEY_DIGEST_WIDTH: usize = 32;

/// Case and whitespace insensitive identity of a title.
///
/// Used verbatim as the cache key suffix and as the dedup membership key, so
/// `"Heat (1995)"` and `"  heat (1995) "` collapse to the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn from_title(title: &str) -> Self {
        Self::digest(&normalize_title(title))
    }

    fn digest(normalized: &str) -> Self {
        let hash = Sha256::digest(normalized.as_bytes());
        let mut hex = hex::encode(hash);
        hex.truncate(KEY_DIGEST_WIDTH);
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fully qualified cache key under `namespace` (e.g. `streaming:`).
    pub fn cache_key(&self, namespace: &str) -> String {
        format!("{namespace}{}", self.0)
    }

    /// Short prefix used in log lines and synthetic ids.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_surrounding_whitespace_do_not_change_the_key() {
        let variants = ["Heat (1995)", "heat (1995)", "  HEAT (1995)\t", "\nHeat (1995) "];
        let first = NormalizedKey::from_title(variants[0]);
        for v in &variants[1..] {
            assert_eq!(first, NormalizedKey::from_title(v), "variant {v:?}");
        }
    }

    #[test]
    fn distinct_titles_get_distinct_keys() {
        assert_ne!(
            NormalizedKey::from_title("Heat"),
            NormalizedKey::from_title("Heat (1995)")
        );
    }

    #[test]
    fn keys_have_fixed_width() {
        for title in ["", "a", "A very long title that goes on and on for a while"] {
            assert_eq!(NormalizedKey::from_title(title).as_str().len(), KEY_DIGEST_WIDTH);
        }
    }

    #[test]
    fn cache_key_prefixes_namespace() {
        let key = NormalizedKey::from_title("Heat");
        let full = key.cache_key("streaming:");
        assert!(full.starts_with("streaming:"));
        assert!(full.ends_with(key.as_str()));
    }
}
