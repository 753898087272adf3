//! Splitting a fragment's matches into heading-anchored sections.

use crate::excerpt;
use crate::fragment::{Anchor, Fragment, SubResult, WeightedLocation};
use crate::urls;

/// A section being accumulated while walking the matches.
struct Section<'a> {
    anchor: Option<&'a Anchor>,
    start: usize,
    matches: Vec<WeightedLocation>,
}

impl<'a> Section<'a> {
    fn at(anchor: &'a Anchor) -> Self {
        Self {
            anchor: Some(anchor),
            start: anchor.location,
            matches: Vec::new(),
        }
    }
}

/// Sub-results of an enriched fragment, one per section with matches.
///
/// Matches before the first heading form a section titled with the page
/// title. Each later section starts at a heading and runs to the next
/// heading that has matches after it; headings passed over without matches
/// do not produce sections.
pub fn sub_results(fragment: &Fragment, excerpt_length: usize) -> Vec<SubResult> {
    let mut headings: Vec<&Anchor> = fragment.anchors.iter().filter(|a| a.is_heading()).collect();
    headings.sort_by_key(|a| a.location);
    let mut headings = headings.into_iter().peekable();

    let mut results = Vec::new();
    let mut current = Section {
        anchor: None,
        start: 0,
        matches: Vec::new(),
    };

    for hit in &fragment.weighted_locations {
        if let Some(boundary) = headings.next_if(|h| hit.location >= h.location) {
            let mut opened = boundary;
            while let Some(later) = headings.next_if(|h| hit.location >= h.location) {
                opened = later;
            }
            let done = std::mem::replace(&mut current, Section::at(opened));
            results.extend(close(fragment, done, Some(boundary.location), excerpt_length));
        }
        current.matches.push(*hit);
    }

    let end = headings.peek().map(|h| h.location);
    results.extend(close(fragment, current, end, excerpt_length));
    results
}

/// Finish a section, or drop it if it matched nothing.
fn close(
    fragment: &Fragment,
    section: Section<'_>,
    end: Option<usize>,
    excerpt_length: usize,
) -> Option<SubResult> {
    if section.matches.is_empty() {
        return None;
    }

    let relative: Vec<WeightedLocation> = section
        .matches
        .iter()
        .map(|m| WeightedLocation {
            location: m.location.saturating_sub(section.start),
            ..*m
        })
        .collect();
    let excerpt_start = excerpt::densest_region(&relative, excerpt_length) + section.start;
    let excerpt_length = end.map_or(excerpt_length, |end| {
        end.saturating_sub(excerpt_start).min(excerpt_length)
    });

    let locations: Vec<usize> = section.matches.iter().map(|m| m.location).collect();
    let excerpt = excerpt::build_excerpt(
        &fragment.raw_content,
        excerpt_start,
        excerpt_length,
        &locations,
        Some(section.start),
        end,
    );

    let (title, url) = match section.anchor {
        Some(anchor) => (anchor.text.clone(), urls::anchored_url(&fragment.url, &anchor.id)),
        None => (
            fragment.title().unwrap_or_default().to_owned(),
            fragment.url.clone(),
        ),
    };

    Some(SubResult {
        title,
        url,
        anchor: section.anchor.cloned(),
        weighted_locations: section.matches,
        locations,
        excerpt,
    })
}
