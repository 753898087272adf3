//! pagefind-client: search a static Pagefind index from Rust.
//!
//! The index is a directory of content-addressed chunk files produced by the
//! Pagefind indexer, plus a search engine binary that ranks terms. This
//! crate drives that engine and does everything around it:
//!
//! - **Manifest**: picks a language index from `pagefind-entry.json`
//! - **Chunk store**: fetches, decodes and loads each chunk once, shared by
//!   concurrent searches
//! - **Query pipeline**: normalises queries, encodes filters and sort, and
//!   parses the engine's response
//! - **Excerpts**: centres a highlighted excerpt on the densest matches
//! - **Sub-results**: splits a page's matches into heading-anchored sections
//!
//! The engine itself is reached through [`pagefind_bridge`]; plug in a
//! runtime by implementing [`EngineLoader`].
//!
//! ```no_run
//! # async fn demo(loader: &dyn pagefind_client::EngineLoader) -> pagefind_client::Result<()> {
//! use pagefind_client::{ClientOptions, PagefindClient, SearchOptions};
//!
//! let options = ClientOptions::with_base_path("https://docs.example.com/pagefind/");
//! let client = PagefindClient::initialize(options, loader).await?;
//! let response = client
//!     .search("async runtime", &SearchOptions::default().filter("section", "guide"))
//!     .await?;
//! for result in response.results.iter().take(5) {
//!     let page = result.resolve().await?;
//!     println!("{}: {}", page.url, page.excerpt);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod decompress;
pub mod error;
pub mod excerpt;
pub mod fragment;
pub mod http;
pub mod manifest;
pub mod query;
pub mod segment;
pub mod store;
pub mod types;
pub mod urls;

pub use client::PagefindClient;
pub use config::{ClientOptions, RankingWeights};
pub use error::{Result, SearchError};
pub use fragment::{Anchor, Fragment, SubResult, WeightedLocation};
pub use pagefind_bridge::{EngineLoader, EngineModule};
pub use query::{FilterCounts, Sort, SortDirection};
pub use types::{SearchOptions, SearchResponse, SearchResult, SearchTimings};
