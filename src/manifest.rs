//! The entry manifest: which language indexes exist and where they live.
//!
//! Fetched once at initialisation from `<base>pagefind-entry.json`. Each
//! language entry names the content hash of its meta file, the engine
//! binary built for it, and how many pages it indexes.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::error::{Result, SearchError};
use crate::http;

/// Manifest file name under the base path.
pub const MANIFEST_FILE: &str = "pagefind-entry.json";

/// One language's index.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LanguageIndex {
    /// Content hash of the language's meta file.
    pub hash: String,
    /// Identifier of the engine binary built for this language.
    #[serde(default)]
    pub wasm: Option<String>,
    /// Number of pages in this language's index.
    #[serde(default)]
    pub page_count: u64,
}

impl LanguageIndex {
    /// Engine binary identifier, `unknown` when the indexer recorded none.
    pub fn engine_id(&self) -> &str {
        self.wasm.as_deref().unwrap_or("unknown")
    }
}

/// Parsed `pagefind-entry.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryManifest {
    /// Version of the indexer that wrote the files.
    #[serde(default)]
    pub version: Option<String>,
    /// Language code → index.
    #[serde(default)]
    pub languages: BTreeMap<String, LanguageIndex>,
    /// Extra characters the indexer treated as word characters.
    #[serde(default)]
    pub include_characters: Vec<String>,
}

impl EntryManifest {
    /// Parse manifest JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::ManifestFetch`] if the JSON is invalid.
    pub fn from_json(bytes: &[u8], source: &str) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| SearchError::ManifestFetch(format!("{source}: invalid manifest: {e}")))
    }

    /// Choose the language index to search.
    ///
    /// Preference order: exact match on `preferred`, then its primary
    /// subtag (`pt-br` → `pt`), then the index with the most pages. Ties
    /// on page count go to the alphabetically first language code.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::NoLanguageIndex`] if the manifest is empty.
    pub fn select(&self, preferred: Option<&str>, source: &str) -> Result<(&str, &LanguageIndex)> {
        if let Some(preferred) = preferred {
            let preferred = preferred.to_lowercase();
            let primary = preferred.split('-').next().unwrap_or_default();
            for candidate in [preferred.as_str(), primary] {
                if let Some((code, index)) = self.languages.get_key_value(candidate) {
                    return Ok((code.as_str(), index));
                }
            }
        }

        self.languages
            .iter()
            // max_by keeps the last of equal maxima; reversed key order
            // makes that the alphabetically first code.
            .max_by(|(ka, a), (kb, b)| a.page_count.cmp(&b.page_count).then(kb.cmp(ka)))
            .map(|(code, index)| (code.as_str(), index))
            .ok_or_else(|| SearchError::NoLanguageIndex(source.to_owned()))
    }
}

/// Url of the manifest with a cache-busting timestamp.
pub fn manifest_url(base_path: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{base_path}{MANIFEST_FILE}?ts={millis}")
}

/// Fetch and parse the manifest under `base_path`.
///
/// # Errors
///
/// Returns [`SearchError::ManifestFetch`] on a network, status or parse
/// failure.
pub async fn fetch(client: &reqwest::Client, base_path: &str) -> Result<EntryManifest> {
    let url = manifest_url(base_path);
    let bytes = http::fetch_bytes(client, &url, SearchError::ManifestFetch).await?;
    let manifest = EntryManifest::from_json(&bytes, &format!("{base_path}{MANIFEST_FILE}"))?;
    tracing::debug!(
        version = manifest.version.as_deref().unwrap_or("unknown"),
        languages = manifest.languages.len(),
        "loaded index manifest"
    );
    Ok(manifest)
}
