//! Parsing the engine's search response.
//!
//! The engine answers a search with one string:
//!
//! ```text
//! <unfiltered count>:<results>:<filters>__PF_UNFILTERED_DELIM__<total filters>
//! ```
//!
//! `<results>` is a space-separated list of `hash@score@locations`, where
//! locations are comma-separated `weight>balanced_score>word_offset`
//! triples. Filter sections use `__PF_FILTER_DELIM__` between facets and
//! `__PF_VALUE_DELIM__` between `value:count` entries.

use std::collections::BTreeMap;

use crate::error::{Result, SearchError};
use crate::fragment::WeightedLocation;

pub const UNFILTERED_DELIM: &str = "__PF_UNFILTERED_DELIM__";
pub const FILTER_DELIM: &str = "__PF_FILTER_DELIM__";
pub const VALUE_DELIM: &str = "__PF_VALUE_DELIM__";

/// Weights arrive in 24ths.
const WEIGHT_SCALE: f64 = 24.0;

/// Facet name → value → number of matching pages.
pub type FilterCounts = BTreeMap<String, BTreeMap<String, usize>>;

/// One scored hit before its fragment is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub hash: String,
    pub score: f64,
    pub weighted_locations: Vec<WeightedLocation>,
}

/// A parsed search response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineResponse {
    pub unfiltered_result_count: usize,
    pub results: Vec<RawResult>,
    pub filters: FilterCounts,
    pub total_filters: FilterCounts,
}

fn malformed(detail: impl Into<String>) -> SearchError {
    SearchError::MalformedResponse(detail.into())
}

/// Parse a raw search response.
///
/// # Errors
///
/// Returns [`SearchError::MalformedResponse`] if a section is missing or a
/// count, score or location does not parse.
pub fn parse_response(raw: &str) -> Result<EngineResponse> {
    let (count, rest) = raw
        .split_once(':')
        .ok_or_else(|| malformed("missing result count"))?;
    let (results, rest) = rest
        .split_once(':')
        .ok_or_else(|| malformed("missing results section"))?;
    let (filters, total_filters) = rest
        .rsplit_once(UNFILTERED_DELIM)
        .ok_or_else(|| malformed("missing unfiltered filter section"))?;

    let unfiltered_result_count = count
        .trim()
        .parse()
        .map_err(|_| malformed(format!("invalid result count {count:?}")))?;

    let results = results
        .split(' ')
        .filter(|entry| !entry.is_empty())
        .map(parse_result)
        .collect::<Result<Vec<_>>>()?;

    Ok(EngineResponse {
        unfiltered_result_count,
        results,
        filters: parse_filters(filters),
        total_filters: parse_filters(total_filters),
    })
}

fn parse_result(entry: &str) -> Result<RawResult> {
    let mut parts = entry.splitn(3, '@');
    let (Some(hash), Some(score), Some(locations)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(malformed(format!("result {entry:?} is not hash@score@locations")));
    };
    if hash.is_empty() {
        return Err(malformed(format!("result {entry:?} has no hash")));
    }
    let score: f64 = score
        .parse()
        .map_err(|_| malformed(format!("result {hash} has invalid score {score:?}")))?;

    let weighted_locations = locations
        .split(',')
        .filter(|l| !l.is_empty())
        .map(|l| parse_location(hash, l))
        .collect::<Result<Vec<_>>>()?;

    Ok(RawResult {
        hash: hash.to_owned(),
        score,
        weighted_locations,
    })
}

fn parse_location(hash: &str, triple: &str) -> Result<WeightedLocation> {
    let invalid = || malformed(format!("result {hash} has invalid location {triple:?}"));
    let mut parts = triple.split('>');
    let (Some(weight), Some(balanced), Some(location), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };
    Ok(WeightedLocation {
        weight: weight.parse::<f64>().map_err(|_| invalid())? / WEIGHT_SCALE,
        balanced_score: balanced.parse().map_err(|_| invalid())?,
        location: location.parse().map_err(|_| invalid())?,
    })
}

/// Parse a filter section into per-facet value counts.
///
/// Each value entry takes its count from trailing `:<digits>`; the value
/// itself may contain colons. Entries without a count are counted as 0.
pub fn parse_filters(raw: &str) -> FilterCounts {
    let mut counts = FilterCounts::new();
    for block in raw.split(FILTER_DELIM).filter(|b| !b.is_empty()) {
        let (name, values) = block.split_once(':').unwrap_or((block, ""));
        let facet = counts.entry(name.to_owned()).or_default();
        for entry in values.split(VALUE_DELIM).filter(|v| !v.is_empty()) {
            let (value, count) = match entry.rsplit_once(':') {
                Some((value, digits))
                    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
                {
                    (value, digits.parse().unwrap_or(0))
                }
                _ => (entry, 0),
            };
            facet.insert(value.to_owned(), count);
        }
    }
    counts
}
