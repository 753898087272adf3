//! Content-addressed chunk loading.
//!
//! The engine names the index and filter chunks a query needs by hash; a
//! result names its fragment by hash. [`ChunkStore`] fetches each one at
//! most once per client, decodes it, and either feeds it to the engine
//! (index, filter) or parses it (fragment). Concurrent requests for the
//! same hash wait on the same load.

pub mod memo;

use std::sync::Arc;

use pagefind_bridge::{EngineBridge, EngineHandle};
use tokio::sync::Mutex;

use crate::decompress::decompress;
use crate::error::{Result, SearchError};
use crate::fragment::RawFragment;
use crate::http;

pub use memo::LoadOnce;

/// The engine, shared between the client and the store. Every engine call
/// goes through this lock, so mutating calls never interleave.
pub type SharedEngine = Arc<Mutex<EngineBridge>>;

/// The three kinds of chunk the indexer writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Index,
    Filter,
    Fragment,
}

impl ChunkKind {
    /// Directory under the base path.
    pub fn dir(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Filter => "filter",
            Self::Fragment => "fragment",
        }
    }

    /// File extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Index => "pf_index",
            Self::Filter => "pf_filter",
            Self::Fragment => "pf_fragment",
        }
    }

    /// Url of the chunk `hash` under `base_path` (which ends in `/`).
    pub fn url_for(self, base_path: &str, hash: &str) -> String {
        format!("{base_path}{}/{hash}.{}", self.dir(), self.extension())
    }
}

type EngineLoad = fn(&mut EngineBridge, &[u8]) -> pagefind_bridge::Result<EngineHandle>;

/// Memoised fetch, decode and load of chunks for one client.
pub struct ChunkStore {
    http: reqwest::Client,
    base_path: String,
    engine: SharedEngine,
    index_chunks: LoadOnce<()>,
    filter_chunks: LoadOnce<()>,
    fragments: LoadOnce<Arc<RawFragment>>,
}

impl ChunkStore {
    /// Create a store loading from `base_path` into `engine`.
    pub fn new(http: reqwest::Client, base_path: impl Into<String>, engine: SharedEngine) -> Self {
        Self {
            http,
            base_path: base_path.into(),
            engine,
            index_chunks: LoadOnce::new(),
            filter_chunks: LoadOnce::new(),
            fragments: LoadOnce::new(),
        }
    }

    /// Make chunk `hash` of `kind` available.
    ///
    /// Index and filter chunks are loaded into the engine; fragments are
    /// fetched and parsed into the cache behind [`ChunkStore::fragment`].
    ///
    /// # Errors
    ///
    /// [`SearchError::ChunkFetch`] or [`SearchError::Decode`] naming the
    /// chunk url, or [`SearchError::Engine`] if the engine rejects it. A
    /// failed load stays failed for the life of the store.
    pub async fn load(&self, kind: ChunkKind, hash: &str) -> Result<()> {
        match kind {
            ChunkKind::Index => {
                self.load_into_engine(kind, hash, &self.index_chunks, EngineBridge::load_index_chunk)
                    .await
            }
            ChunkKind::Filter => {
                self.load_into_engine(
                    kind,
                    hash,
                    &self.filter_chunks,
                    EngineBridge::load_filter_chunk,
                )
                .await
            }
            ChunkKind::Fragment => self.fragment(hash).await.map(drop),
        }
    }

    /// The parsed fragment `hash`, fetching it on first use.
    ///
    /// # Errors
    ///
    /// [`SearchError::ChunkFetch`] or [`SearchError::Decode`] naming the
    /// fragment url.
    pub async fn fragment(&self, hash: &str) -> Result<Arc<RawFragment>> {
        let url = ChunkKind::Fragment.url_for(&self.base_path, hash);
        let http = self.http.clone();
        let key = hash.to_owned();
        self.fragments
            .get_or_load(hash, move || async move {
                tracing::debug!(kind = "fragment", hash = %key, "fetching chunk");
                let payload = fetch_decoded(&http, &url).await?;
                let fragment: RawFragment = serde_json::from_slice(&payload)
                    .map_err(|e| SearchError::Decode(format!("{url}: invalid fragment: {e}")))?;
                tracing::debug!(kind = "fragment", hash = %key, bytes = payload.len(), "chunk loaded");
                Ok::<_, SearchError>(Arc::new(fragment))
            })
            .await
    }

    /// Whether a load of `hash` has been started (or finished).
    #[cfg(test)]
    pub(crate) fn is_requested(&self, kind: ChunkKind, hash: &str) -> bool {
        match kind {
            ChunkKind::Index => self.index_chunks.contains(hash),
            ChunkKind::Filter => self.filter_chunks.contains(hash),
            ChunkKind::Fragment => self.fragments.contains(hash),
        }
    }

    async fn load_into_engine(
        &self,
        kind: ChunkKind,
        hash: &str,
        memo: &LoadOnce<()>,
        load: EngineLoad,
    ) -> Result<()> {
        let url = kind.url_for(&self.base_path, hash);
        let http = self.http.clone();
        let engine = Arc::clone(&self.engine);
        let key = hash.to_owned();
        memo.get_or_load(hash, move || async move {
            tracing::debug!(kind = kind.dir(), hash = %key, "fetching chunk");
            let payload = fetch_decoded(&http, &url).await?;
            let handle = {
                let mut engine = engine.lock().await;
                load(&mut *engine, &payload)?
            };
            tracing::debug!(
                kind = kind.dir(),
                hash = %key,
                bytes = payload.len(),
                handle = handle.raw(),
                "chunk loaded"
            );
            Ok::<_, SearchError>(())
        })
        .await
    }
}

/// Fetch `url` as a chunk and decode it.
pub(crate) async fn fetch_decoded(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let bytes = http::fetch_bytes(client, url, SearchError::ChunkFetch).await?;
    decompress(&bytes, url)
}
