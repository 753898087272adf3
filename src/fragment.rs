//! Page records: the raw fragment as stored, and the per-query enriched copy.
//!
//! A [`RawFragment`] is fetched once per hash and shared. Each search result
//! builds its own [`Fragment`] from it, with the weighted locations, excerpt
//! and sub-results of that query.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::excerpt;
use crate::segment;
use crate::urls;

/// Word boundary marker used in pre-tokenized content (e.g. CJK text).
pub const ZERO_WIDTH_SPACE: char = '\u{200B}';

/// One matched-term occurrence inside a fragment's word stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedLocation {
    /// Term weight at this position.
    pub weight: f64,
    /// Score contribution used for excerpt placement.
    pub balanced_score: f64,
    /// Word offset into the fragment content.
    pub location: usize,
}

/// An element with an id, recorded by the indexer with its word offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Tag name, e.g. `h2`.
    pub element: String,
    /// The element's `id` attribute.
    pub id: String,
    /// Text content of the element.
    #[serde(default)]
    pub text: String,
    /// Word offset where the element starts.
    pub location: usize,
}

impl Anchor {
    /// Headings (`h1`–`h9`) with visible text start a sub-result.
    pub fn is_heading(&self) -> bool {
        let element = self.element.to_ascii_lowercase();
        let is_h_digit = element
            .as_bytes()
            .windows(2)
            .any(|w| w[0] == b'h' && w[1].is_ascii_digit());
        is_h_digit && self.text.chars().any(|c| !c.is_whitespace())
    }
}

/// A page as the indexer wrote it to `fragment/<hash>.pf_fragment`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFragment {
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub filters: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
    #[serde(default)]
    pub anchors: Vec<Anchor>,
}

/// A heading-scoped slice of a fragment's matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubResult {
    /// Heading text, or the page title for the part before the first heading.
    pub title: String,
    /// Page url, with the heading id as fragment identifier when anchored.
    pub url: String,
    /// The heading this section starts at.
    pub anchor: Option<Anchor>,
    pub weighted_locations: Vec<WeightedLocation>,
    pub locations: Vec<usize>,
    pub excerpt: String,
}

/// A page enriched for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    /// Full url, with highlight parameters when configured.
    pub url: String,
    /// Url as stored in the index.
    pub raw_url: String,
    /// Content with zero-width spaces removed.
    pub content: String,
    /// Content with `<`/`>` escaped and zero-width spaces kept.
    pub raw_content: String,
    pub word_count: usize,
    pub filters: BTreeMap<String, Vec<String>>,
    pub meta: BTreeMap<String, String>,
    pub anchors: Vec<Anchor>,
    pub weighted_locations: Vec<WeightedLocation>,
    pub locations: Vec<usize>,
    pub excerpt: String,
    pub sub_results: Vec<SubResult>,
}

/// Presentation settings applied during enrichment.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub excerpt_length: usize,
    pub base_url: String,
    pub highlight_param: Option<String>,
}

impl Fragment {
    /// Build this query's view of `raw`.
    ///
    /// `term` is the normalized query, used for highlight parameters.
    pub fn enrich(
        raw: &RawFragment,
        weighted_locations: &[WeightedLocation],
        term: &str,
        options: &EnrichOptions,
    ) -> Self {
        let raw_content = raw.content.replace('<', "&lt;").replace('>', "&gt;");
        let content = raw.content.replace(ZERO_WIDTH_SPACE, "");
        let url = urls::processed_url(
            &raw.url,
            &options.base_url,
            options.highlight_param.as_deref(),
            term,
        );
        let locations: Vec<usize> = weighted_locations.iter().map(|l| l.location).collect();

        let start = excerpt::densest_region(weighted_locations, options.excerpt_length);
        let excerpt = excerpt::build_excerpt(
            &raw_content,
            start,
            options.excerpt_length,
            &locations,
            None,
            None,
        );

        let mut fragment = Self {
            url,
            raw_url: raw.url.clone(),
            content,
            raw_content,
            word_count: raw.word_count,
            filters: raw.filters.clone(),
            meta: raw.meta.clone(),
            anchors: raw.anchors.clone(),
            weighted_locations: weighted_locations.to_vec(),
            locations,
            excerpt,
            sub_results: Vec::new(),
        };
        fragment.sub_results = segment::sub_results(&fragment, options.excerpt_length);
        fragment
    }

    /// The page title from metadata, if any.
    pub fn title(&self) -> Option<&str> {
        self.meta.get("title").map(String::as_str)
    }
}
