//! Public search types: per-call options, results and responses.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::error::{Result, SearchError};
use crate::fragment::{EnrichOptions, Fragment, WeightedLocation};
use crate::query::{FilterCounts, Sort};
use crate::store::ChunkStore;

/// Per-search options.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Facet name → values a result must have.
    pub filters: BTreeMap<String, Vec<String>>,
    /// Sort fields; the engine uses the first.
    pub sort: Vec<Sort>,
    /// Log pipeline steps at `debug` instead of `trace`.
    pub verbose: bool,
}

impl SearchOptions {
    /// Require `value` for facet `name`.
    pub fn filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Add a sort field.
    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Where a search spent its time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchTimings {
    /// Loading the chunks the query needs.
    pub preload: Duration,
    /// The engine's search call and response parsing.
    pub search: Duration,
    /// Everything, from normalisation to the response.
    pub total: Duration,
}

/// What a result needs to load and enrich its fragment.
pub(crate) struct Resolver {
    pub(crate) store: Arc<ChunkStore>,
    pub(crate) options: EnrichOptions,
    pub(crate) term: String,
}

/// One search hit. The page itself is loaded by [`SearchResult::resolve`].
pub struct SearchResult {
    /// Fragment hash.
    pub id: String,
    /// Engine score, scaled by the index weight.
    pub score: f64,
    /// Matched word offsets.
    pub words: Vec<usize>,
    pub weighted_locations: Vec<WeightedLocation>,
    resolver: Arc<Resolver>,
    resolved: OnceCell<Fragment>,
}

impl SearchResult {
    pub(crate) fn new(
        id: String,
        score: f64,
        weighted_locations: Vec<WeightedLocation>,
        resolver: Arc<Resolver>,
    ) -> Self {
        Self {
            id,
            score,
            words: weighted_locations.iter().map(|l| l.location).collect(),
            weighted_locations,
            resolver,
            resolved: OnceCell::new(),
        }
    }

    /// Load this result's page and enrich it with an excerpt and
    /// sub-results for the query.
    ///
    /// The raw page is fetched once per client; the enriched copy is built
    /// once per result.
    ///
    /// # Errors
    ///
    /// [`crate::SearchError::ChunkFetch`] or [`crate::SearchError::Decode`]
    /// if the fragment cannot be loaded.
    pub async fn resolve(&self) -> Result<Fragment> {
        self.resolved
            .get_or_try_init(|| async {
                let raw = self.resolver.store.fragment(&self.id).await?;
                Ok::<_, SearchError>(Fragment::enrich(
                    &raw,
                    &self.weighted_locations,
                    &self.resolver.term,
                    &self.resolver.options,
                ))
            })
            .await
            .cloned()
    }
}

impl fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResult")
            .field("id", &self.id)
            .field("score", &self.score)
            .field("words", &self.words)
            .field("resolved", &self.resolved.initialized())
            .finish_non_exhaustive()
    }
}

/// The outcome of a search.
#[derive(Debug, Default)]
pub struct SearchResponse {
    /// Hits in engine order.
    pub results: Vec<SearchResult>,
    /// Matches before filters were applied.
    pub unfiltered_result_count: usize,
    /// Facet counts among the filtered results.
    pub filters: FilterCounts,
    /// Facet counts among all matches.
    pub total_filters: FilterCounts,
    pub timings: SearchTimings,
}

impl SearchResponse {
    /// No results, counts or timings.
    pub fn empty() -> Self {
        Self::default()
    }
}
