//! Client configuration with sensible defaults.
//!
//! [`ClientOptions`] controls where the index lives, how results are
//! presented (excerpt length, url base, highlight parameter) and how the
//! engine ranks them.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SearchError;

/// Ranking weight overrides handed to the engine at initialisation.
///
/// Unset weights are sent as `null` and keep the engine's built-in value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    /// How much closer term matches outrank looser ones.
    pub term_similarity: Option<f64>,
    /// How strongly page length normalises scores.
    pub page_length: Option<f64>,
    /// How quickly repeated terms stop adding to the score.
    pub term_saturation: Option<f64>,
    /// Weight of raw term frequency versus unique term count.
    pub term_frequency: Option<f64>,
}

impl RankingWeights {
    /// Encode as the JSON object the engine expects.
    pub fn to_json(&self) -> Result<String, SearchError> {
        serde_json::to_string(self)
            .map_err(|e| SearchError::Config(format!("failed to encode ranking weights: {e}")))
    }
}

/// Configuration for a [`crate::PagefindClient`].
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Where the index files live: an absolute `http(s)://` url.
    /// A trailing `/` is added if missing. The default `/pagefind/` names
    /// the conventional location on a site and must be joined onto that
    /// site's origin before use.
    pub base_path: String,
    /// Prefix joined onto site-relative fragment urls.
    pub base_url: String,
    /// Excerpt length in words.
    pub excerpt_length: usize,
    /// Multiplier applied to every result score.
    pub index_weight: f64,
    /// Optional ranking weight overrides.
    pub ranking: Option<RankingWeights>,
    /// Query parameter name used to pass the search terms on result urls.
    pub highlight_param: Option<String>,
    /// Preferred language code; falls back to the largest index.
    pub language: Option<String>,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_path: "/pagefind/".into(),
            base_url: "/".into(),
            excerpt_length: 30,
            index_weight: 1.0,
            ranking: None,
            highlight_param: None,
            language: None,
            timeout_seconds: 30,
        }
    }
}

impl ClientOptions {
    /// Options pointing at an index rooted at `base_path`.
    pub fn with_base_path(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Default::default()
        }
    }

    /// The base path with exactly one trailing `/`.
    pub fn normalized_base_path(&self) -> String {
        if self.base_path.ends_with('/') {
            self.base_path.clone()
        } else {
            format!("{}/", self.base_path)
        }
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `base_path` must be an absolute `http` or `https` url
    /// - `excerpt_length` must be greater than 0
    /// - `index_weight` must be finite and not negative
    /// - `timeout_seconds` must be greater than 0
    /// - `highlight_param`, when set, must not be empty
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.base_path.trim().is_empty() {
            return Err(SearchError::Config("base_path must not be empty".into()));
        }
        match Url::parse(&self.base_path) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(SearchError::Config(format!(
                    "base_path must be an absolute http(s) url, got {:?}",
                    self.base_path
                )));
            }
        }
        if self.excerpt_length == 0 {
            return Err(SearchError::Config(
                "excerpt_length must be greater than 0".into(),
            ));
        }
        if !self.index_weight.is_finite() || self.index_weight < 0.0 {
            return Err(SearchError::Config(
                "index_weight must be a finite, non-negative number".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self
            .highlight_param
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            return Err(SearchError::Config(
                "highlight_param must not be empty when set".into(),
            ));
        }
        Ok(())
    }
}
