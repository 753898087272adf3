//! Excerpt selection and construction.
//!
//! [`densest_region`] picks where an excerpt should start by sliding a
//! window over per-word match scores. [`build_excerpt`] cuts that window
//! out of the content and wraps matched words in highlight markers.

use std::collections::{BTreeMap, BTreeSet};

use crate::fragment::{WeightedLocation, ZERO_WIDTH_SPACE};

/// Opening highlight marker.
pub const MARK_OPEN: &str = "<mark>";
/// Closing highlight marker.
pub const MARK_CLOSE: &str = "</mark>";

/// Start offset of the `window`-word span with the most match weight.
///
/// Scores are summed per word offset (`balanced_score`, adding up where
/// locations collide). If the scored span fits in one window the excerpt
/// starts at 0. Otherwise every start offset up to the last scored word is
/// considered; among the starts that reach the maximum sum, the first
/// contiguous run of them is taken and its middle entry returned, which
/// centres the excerpt on the densest cluster.
///
/// Offsets come from the engine and may be arbitrarily large, so only
/// scored offsets are stored and the window sum is evaluated once per
/// stretch of starts over which it cannot change.
pub fn densest_region(locations: &[WeightedLocation], window: usize) -> usize {
    let Some(last) = locations.iter().map(|l| l.location).max() else {
        return 0;
    };
    if last < window || window == 0 {
        return 0;
    }

    let mut words: BTreeMap<usize, f64> = BTreeMap::new();
    for l in locations {
        *words.entry(l.location).or_default() += l.balanced_score;
    }

    // The window sum only changes where a scored word enters or leaves it.
    let mut breaks: BTreeSet<usize> = BTreeSet::from([0]);
    for &offset in words.keys() {
        if offset >= window - 1 {
            breaks.insert(offset - (window - 1));
        }
        if offset < last {
            breaks.insert(offset + 1);
        }
    }
    let starts: Vec<usize> = breaks.into_iter().collect();

    let mut best: Option<f64> = None;
    // Inclusive bounds of the first run of starts reaching `best`.
    let mut run: (usize, usize) = (0, 0);
    for (i, &first) in starts.iter().enumerate() {
        let through = starts.get(i + 1).map_or(last, |next| next - 1);
        let end = first.saturating_add(window - 1);
        let sum: f64 = words.range(first..=end).map(|(_, score)| score).sum();
        match best {
            Some(b) if (sum - b).abs() <= f64::EPSILON * b.abs().max(1.0) => {
                if run.1.checked_add(1) == Some(first) {
                    run.1 = through;
                }
            }
            Some(b) if sum < b => {}
            _ => {
                best = Some(sum);
                run = (first, through);
            }
        }
    }

    run.0 + (run.1 - run.0).div_ceil(2)
}

/// Cut a highlighted excerpt out of `content`.
///
/// Content containing zero-width spaces is split on them and re-joined
/// without separators; anything else is split on whitespace and joined
/// with single spaces. Words at `highlights` are wrapped in
/// [`MARK_OPEN`]/[`MARK_CLOSE`] unless already wrapped.
///
/// The requested `[start, start + length)` window is clamped into
/// `[lower, upper)` (default: all words): length shrinks first, then start
/// shifts back to fit, then start is raised to `lower`.
pub fn build_excerpt(
    content: &str,
    start: usize,
    length: usize,
    highlights: &[usize],
    lower: Option<usize>,
    upper: Option<usize>,
) -> String {
    let zws_delimited = content.contains(ZERO_WIDTH_SPACE);
    let mut words: Vec<String> = if zws_delimited {
        content.split(ZERO_WIDTH_SPACE).map(str::to_owned).collect()
    } else {
        content.split_whitespace().map(str::to_owned).collect()
    };

    for &offset in highlights {
        if let Some(word) = words.get_mut(offset) {
            if !word.starts_with(MARK_OPEN) {
                *word = format!("{MARK_OPEN}{word}{MARK_CLOSE}");
            }
        }
    }

    let upper = upper.unwrap_or(words.len()).min(words.len());
    let lower = lower.unwrap_or(0).min(upper);

    let length = length.min(upper - lower);
    let mut start = start;
    if start.saturating_add(length) > upper {
        start = upper - length;
    }
    start = start.max(lower);

    let separator = if zws_delimited { "" } else { " " };
    words[start..start + length]
        .join(separator)
        .trim()
        .to_owned()
}
