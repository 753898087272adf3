//! Encoding filter and sort selections for the engine.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Sort order for a [`Sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort results by an indexed sort field instead of relevance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Encode filters as a JSON object of facet name to selected values.
pub fn encode_filters(filters: &BTreeMap<String, Vec<String>>) -> Result<String> {
    serde_json::to_string(filters)
        .map_err(|e| SearchError::Config(format!("failed to encode filters: {e}")))
}

/// Encode the sort as `field:direction`, or `""` for relevance order.
///
/// The engine accepts a single sort field; only the first is sent.
pub fn encode_sort(sorts: &[Sort]) -> String {
    let Some(first) = sorts.first() else {
        return String::new();
    };
    if sorts.len() > 1 {
        tracing::warn!(
            requested = sorts.len(),
            used = %first.field,
            "only one sort field is supported; ignoring the rest"
        );
    }
    format!("{}:{}", first.field, first.direction)
}

/// Split the engine's space-separated hash list.
pub fn split_hashes(list: &str) -> Vec<String> {
    list.split_whitespace().map(str::to_owned).collect()
}
