use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options for [`crate::read_uff`].
///
/// Loaded from JSON, every key is optional; an explicit `null` pattern
/// turns that domain off:
///
/// ```json
/// { "time_pattern": null, "freq_pattern": "Pt=", "header_keys": ["id1", "rsp_node"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Identifier pattern for time responses; `None` skips the time table.
    pub time_pattern: Option<String>,
    /// Identifier pattern for frequency-domain records; `None` skips that table.
    pub freq_pattern: Option<String>,
    /// Header fields whose values label each column.
    pub header_keys: Vec<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            time_pattern: Some(".*".to_string()),
            freq_pattern: Some(".*".to_string()),
            header_keys: vec!["id1".to_string()],
        }
    }
}

impl ReadOptions {
    pub fn time_only(pattern: impl Into<String>) -> Self {
        Self {
            time_pattern: Some(pattern.into()),
            freq_pattern: None,
            ..Self::default()
        }
    }

    pub fn freq_only(pattern: impl Into<String>) -> Self {
        Self {
            time_pattern: None,
            freq_pattern: Some(pattern.into()),
            ..Self::default()
        }
    }

    pub fn with_header_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
