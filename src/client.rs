//! The search client: initialisation and the search pipeline.
//!
//! # Pipeline
//!
//! 1. Normalise the query; an empty query returns an empty response
//! 2. Encode filters and sort for the engine
//! 3. Ask the engine which index and filter chunks the query needs
//! 4. Load all of them concurrently through the [`ChunkStore`]
//! 5. Run the engine's search and parse the response
//! 6. Wrap each hit in a [`SearchResult`] that loads its page on demand

use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use pagefind_bridge::{EngineBridge, EngineLoader};
use tokio::sync::{Mutex, OnceCell};

use crate::config::ClientOptions;
use crate::error::{Result, SearchError};
use crate::fragment::EnrichOptions;
use crate::http;
use crate::manifest::{self, MANIFEST_FILE};
use crate::query::{self, NormalizedQuery};
use crate::store::{self, ChunkKind, ChunkStore, SharedEngine};
use crate::types::{Resolver, SearchOptions, SearchResponse, SearchResult, SearchTimings};

/// Pipeline step logging: `debug` when the search is verbose, else `trace`.
macro_rules! step {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::debug!($($arg)+);
        } else {
            tracing::trace!($($arg)+);
        }
    };
}

/// Everything that exists once initialisation has succeeded.
struct Session {
    language: String,
    engine: SharedEngine,
    store: Arc<ChunkStore>,
    enrich: EnrichOptions,
}

/// A query whose chunks are loaded, encoded for the search call.
struct Prepared {
    query: NormalizedQuery,
    filters_json: String,
    sort: String,
}

/// A search client for one index.
///
/// Create with [`PagefindClient::new`] and call [`PagefindClient::init`]
/// once, or use [`PagefindClient::initialize`] for both. Searches may run
/// concurrently; they share loaded chunks.
pub struct PagefindClient {
    options: ClientOptions,
    session: OnceCell<Session>,
}

impl PagefindClient {
    /// Create an uninitialised client.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `options` are invalid.
    pub fn new(options: ClientOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            session: OnceCell::new(),
        })
    }

    /// Create a client and initialise it.
    ///
    /// # Errors
    ///
    /// See [`PagefindClient::new`] and [`PagefindClient::init`].
    pub async fn initialize(options: ClientOptions, loader: &dyn EngineLoader) -> Result<Self> {
        let client = Self::new(options)?;
        client.init(loader).await?;
        Ok(client)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Whether [`PagefindClient::init`] has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.session.initialized()
    }

    /// The language index in use, once initialised.
    pub fn language(&self) -> Option<&str> {
        self.session.get().map(|s| s.language.as_str())
    }

    /// Fetch the manifest, pick a language, and start the engine.
    ///
    /// Calling this again after success does nothing. A failed attempt
    /// leaves the client uninitialised.
    ///
    /// # Errors
    ///
    /// - [`SearchError::ManifestFetch`] if the manifest is unavailable
    /// - [`SearchError::NoLanguageIndex`] if it lists no languages
    /// - [`SearchError::ChunkFetch`] / [`SearchError::Decode`] for the meta
    ///   file or engine binary
    /// - [`SearchError::Engine`] if the engine cannot be instantiated or
    ///   rejects the meta file or ranking weights
    pub async fn init(&self, loader: &dyn EngineLoader) -> Result<()> {
        self.session
            .get_or_try_init(|| self.start(loader))
            .await
            .map(drop)
    }

    async fn start(&self, loader: &dyn EngineLoader) -> Result<Session> {
        let base_path = self.options.normalized_base_path();
        let client = http::build_client(&self.options)?;

        let manifest = manifest::fetch(&client, &base_path).await?;
        let source = format!("{base_path}{MANIFEST_FILE}");
        let preferred = self.options.language.as_deref();
        let (language, index) = manifest.select(preferred, &source)?;
        if let Some(preferred) = preferred {
            if !preferred.eq_ignore_ascii_case(language) {
                tracing::debug!(preferred, selected = language, "preferred language not indexed exactly");
            }
        }
        tracing::debug!(language, pages = index.page_count, "selected language index");

        let meta_url = format!("{base_path}pagefind.{}.pf_meta", index.hash);
        let binary_url = format!("{base_path}wasm.{}.pagefind", index.engine_id());
        let (meta, binary) = futures::try_join!(
            store::fetch_decoded(&client, &meta_url),
            store::fetch_decoded(&client, &binary_url)
        )?;

        let module = loader.instantiate(&binary)?;
        let mut bridge = EngineBridge::new(module);
        bridge.init(&meta)?;
        if let Some(ranking) = &self.options.ranking {
            bridge.set_ranking_weights(&ranking.to_json()?)?;
            tracing::debug!(?ranking, "ranking weights applied");
        }

        let engine: SharedEngine = Arc::new(Mutex::new(bridge));
        let store = Arc::new(ChunkStore::new(client, base_path, Arc::clone(&engine)));
        Ok(Session {
            language: language.to_owned(),
            engine,
            store,
            enrich: EnrichOptions {
                excerpt_length: self.options.excerpt_length,
                base_url: self.options.base_url.clone(),
                highlight_param: self.options.highlight_param.clone(),
            },
        })
    }

    fn session(&self) -> Result<&Session> {
        self.session.get().ok_or_else(|| {
            SearchError::EngineUninitialized("call init before searching".into())
        })
    }

    /// Search the index.
    ///
    /// Results keep the engine's order. Their pages are not loaded until
    /// [`SearchResult::resolve`] is called.
    ///
    /// # Errors
    ///
    /// - [`SearchError::EngineUninitialized`] before a successful init
    /// - [`SearchError::ChunkFetch`] / [`SearchError::Decode`] if a chunk
    ///   the query needs cannot be loaded
    /// - [`SearchError::MalformedResponse`] if the engine's answer does
    ///   not parse
    /// - [`SearchError::Engine`] if an engine call fails
    pub async fn search(&self, raw_query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let session = self.session()?;
        let started = Instant::now();

        let Some(prepared) = self.prepare(session, raw_query, options).await? else {
            return Ok(SearchResponse::empty());
        };
        let preload = started.elapsed();

        let search_started = Instant::now();
        let raw = {
            let mut engine = session.engine.lock().await;
            engine.search(
                &prepared.query.term,
                &prepared.filters_json,
                &prepared.sort,
                prepared.query.exact,
            )?
        };
        step!(options.verbose, response = %raw, "engine response");
        let parsed = query::parse_response(&raw)?;

        let resolver = Arc::new(Resolver {
            store: Arc::clone(&session.store),
            options: session.enrich.clone(),
            term: prepared.query.term,
        });
        let index_weight = self.options.index_weight;
        let results: Vec<SearchResult> = parsed
            .results
            .into_iter()
            .map(|hit| {
                SearchResult::new(
                    hit.hash,
                    hit.score * index_weight,
                    hit.weighted_locations,
                    Arc::clone(&resolver),
                )
            })
            .collect();

        let timings = SearchTimings {
            preload,
            search: search_started.elapsed(),
            total: started.elapsed(),
        };
        tracing::debug!(
            results = results.len(),
            unfiltered = parsed.unfiltered_result_count,
            preload_ms = timings.preload.as_millis() as u64,
            search_ms = timings.search.as_millis() as u64,
            "search complete"
        );

        Ok(SearchResponse {
            results,
            unfiltered_result_count: parsed.unfiltered_result_count,
            filters: parsed.filters,
            total_filters: parsed.total_filters,
            timings,
        })
    }

    /// Load the chunks `raw_query` needs without searching, so a later
    /// search for it returns sooner.
    ///
    /// # Errors
    ///
    /// As for [`PagefindClient::search`], minus response parsing.
    pub async fn preload(&self, raw_query: &str, options: &SearchOptions) -> Result<()> {
        let session = self.session()?;
        self.prepare(session, raw_query, options).await.map(drop)
    }

    /// Steps 1 to 4 of the pipeline. `None` for an empty query.
    async fn prepare(
        &self,
        session: &Session,
        raw_query: &str,
        options: &SearchOptions,
    ) -> Result<Option<Prepared>> {
        let query = query::normalize(raw_query);
        if query.is_empty() {
            step!(options.verbose, "empty query after normalisation");
            return Ok(None);
        }
        let filters_json = query::encode_filters(&options.filters)?;
        let sort = query::encode_sort(&options.sort);
        step!(
            options.verbose,
            term = %query.term,
            exact = query.exact,
            filters = %filters_json,
            sort = %sort,
            "normalised query"
        );

        let (index_hashes, filter_hashes) = {
            let mut engine = session.engine.lock().await;
            let index = engine.request_indexes(&query.term)?;
            let filter = engine.request_filter_indexes(&filters_json)?;
            (query::split_hashes(&index), query::split_hashes(&filter))
        };
        step!(
            options.verbose,
            index_chunks = index_hashes.len(),
            filter_chunks = filter_hashes.len(),
            "loading chunks"
        );

        let loads = index_hashes
            .iter()
            .map(|hash| (ChunkKind::Index, hash))
            .chain(filter_hashes.iter().map(|hash| (ChunkKind::Filter, hash)))
            .map(|(kind, hash)| session.store.load(kind, hash));
        try_join_all(loads).await?;

        Ok(Some(Prepared {
            query,
            filters_json,
            sort,
        }))
    }
}

impl std::fmt::Debug for PagefindClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagefindClient")
            .field("base_path", &self.options.base_path)
            .field("language", &self.language())
            .finish_non_exhaustive()
    }
}
