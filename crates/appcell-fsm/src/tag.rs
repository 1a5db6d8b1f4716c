//! State tags
//!
//! A tag is the persisted, dimension-based identity of a state, e.g.
//! `{mode: editing, params: incomplete}`. Two tags are equal only when they
//! carry the same set of dimensions with the same values; insertion order
//! is kept for display but ignored by equality.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered mapping of dimension name to value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateTag(IndexMap<String, String>);

impl StateTag {
    /// Empty tag
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag with a single `mode` dimension
    pub fn mode(mode: impl Into<String>) -> Self {
        Self::new().with("mode", mode)
    }

    /// Add or replace one dimension
    #[must_use]
    pub fn with(mut self, dimension: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(dimension.into(), value.into());
        self
    }

    /// Value of one dimension
    #[must_use]
    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.0.get(dimension).map(String::as_str)
    }

    /// Number of dimensions
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tag has no dimension
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Dimensions in insertion order
    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (dimension, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{dimension}: {value}")?;
        }
        f.write_str("}")
    }
}

impl<K, V> FromIterator<(K, V)> for StateTag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
