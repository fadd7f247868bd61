//! Non-fatal conditions found while reshaping.
//!
//! Each diagnostic is logged at warn level when it is raised and also
//! returned to the caller, so tests and tools can check for a specific
//! condition without scraping log output.

use std::fmt;

use serde::Serialize;

use crate::data::model::{FuncType, EXPECTED_FORMAT_TYPE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The record is not a dataset 58; its function type was still used.
    UnexpectedFormatType { id1: String, format_type: i64 },
    /// `func_type` 0, left out of both tables.
    Unclassified { id1: String },
    /// `func_type` 11, left out of both tables.
    ProbabilityDensity { id1: String },
}

impl Diagnostic {
    pub fn id1(&self) -> &str {
        match self {
            Diagnostic::UnexpectedFormatType { id1, .. }
            | Diagnostic::Unclassified { id1 }
            | Diagnostic::ProbabilityDensity { id1 } => id1,
        }
    }

    /// Log at warn level and hand the diagnostic back.
    pub fn emit(self) -> Self {
        log::warn!("{self}");
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnexpectedFormatType { id1, format_type } => write!(
                f,
                "{id1} in file is format type {format_type}, though type {EXPECTED_FORMAT_TYPE} is expected."
            ),
            Diagnostic::Unclassified { id1 } => write!(
                f,
                "Data {id1} has func_type of '{}' and will not be included in either table.",
                FuncType::GeneralOrUnknown.name()
            ),
            Diagnostic::ProbabilityDensity { id1 } => write!(
                f,
                "Data {id1} has func_type of '{}' and will not be included in either table.",
                FuncType::ProbabilityDensityFunction.name()
            ),
        }
    }
}
