//! Channel identities
//!
//! A channel partitions bus traffic so that unrelated components sharing one
//! bus never see each other's messages. Listeners only match sends on the
//! identical channel.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Scope of a listener registration or a send
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "scope", content = "id")]
pub enum Channel {
    /// The global channel used when no channel is given
    #[default]
    Default,
    /// Opaque generated identity (channel buses without a name)
    Id(Uuid),
    /// Caller-supplied descriptive name
    Named(String),
    /// Per-cell channel shared by the widgets of one notebook cell
    Cell(String),
    /// Per-job channel carrying job status pushes
    Job(String),
}

impl Channel {
    /// Generate a fresh anonymous channel
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self::Id(Uuid::new_v4())
    }

    /// Channel identified by name
    #[inline]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Channel of a notebook cell
    #[inline]
    pub fn cell(cell_id: impl Into<String>) -> Self {
        Self::Cell(cell_id.into())
    }

    /// Channel of a remote job
    #[inline]
    pub fn job(job_id: impl Into<String>) -> Self {
        Self::Job(job_id.into())
    }

    /// Whether this is the global channel
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Named(name) => write!(f, "name:{name}"),
            Self::Cell(id) => write!(f, "cell:{id}"),
            Self::Job(id) => write!(f, "job:{id}"),
        }
    }
}

impl From<&str> for Channel {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for Channel {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}
