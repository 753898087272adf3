//! Error types for the pagefind-client crate.
//!
//! Every variant carries the url, hash or engine call involved so a failure
//! can be diagnosed without the query text. Errors are `Clone` because one
//! failed chunk load is delivered to every task waiting on it.

use pagefind_bridge::BridgeError;

/// Errors that can occur while initialising the client or running a search.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// The entry manifest could not be fetched or parsed. Fatal to initialisation.
    #[error("manifest fetch failed: {0}")]
    ManifestFetch(String),

    /// The manifest lists no language indexes. Fatal to initialisation.
    #[error("no language indexes found in {0}")]
    NoLanguageIndex(String),

    /// A chunk, meta file or engine binary could not be fetched.
    #[error("chunk fetch failed: {0}")]
    ChunkFetch(String),

    /// A downloaded file could not be inflated or parsed.
    #[error("decode error: {0}")]
    Decode(String),

    /// A search was issued before initialisation succeeded.
    #[error("engine not initialized: {0}")]
    EngineUninitialized(String),

    /// The engine's response does not follow the expected delimiter grammar.
    #[error("malformed engine response: {0}")]
    MalformedResponse(String),

    /// The engine bridge reported a failure.
    #[error("engine error: {0}")]
    Engine(#[from] BridgeError),

    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for pagefind-client results.
pub type Result<T> = std::result::Result<T, SearchError>;
