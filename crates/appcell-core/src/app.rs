//! App references

use crate::error::{AppCellError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Release channel of an app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppTag {
    /// Released; pinned to a version
    Release,
    /// Beta channel; always the latest beta
    Beta,
    /// Development channel; always the latest build
    Dev,
}

impl AppTag {
    /// Tag name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Beta => "beta",
            Self::Dev => "dev",
        }
    }
}

/// Canonical app identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppRef {
    /// Catalog id, e.g. `Module/method`
    pub id: String,
    /// Release channel
    pub tag: AppTag,
    /// Pinned version; only kept for releases
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl AppRef {
    /// Canonical reference from loose parts
    ///
    /// Releases keep their version, beta and dev drop it.
    ///
    /// # Errors
    ///
    /// [`AppCellError::InvalidApp`] for any other tag.
    pub fn canonical(id: impl Into<String>, tag: &str, version: Option<String>) -> Result<Self> {
        let id = id.into();
        let (tag, version) = match tag {
            "release" => (AppTag::Release, version),
            "beta" => (AppTag::Beta, None),
            "dev" => (AppTag::Dev, None),
            other => {
                return Err(AppCellError::InvalidApp(format!(
                    "invalid tag {other:?} for app {id}"
                )))
            }
        };
        Ok(Self { id, tag, version })
    }

    /// Catalog page of the app
    #[must_use]
    pub fn info_url(&self) -> String {
        format!("/#appcatalog/app/{}/{}", self.id, self.tag.as_str())
    }
}

impl fmt::Display for AppRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.tag.as_str())?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}
