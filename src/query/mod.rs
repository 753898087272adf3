//! The query pipeline: normalising input, encoding filters and sort for
//! the engine, and parsing what it sends back.

pub mod encode;
pub mod normalize;
pub mod response;

pub use encode::{encode_filters, encode_sort, split_hashes, Sort, SortDirection};
pub use normalize::{normalize, NormalizedQuery};
pub use response::{parse_filters, parse_response, EngineResponse, FilterCounts, RawResult};
