use std::io;

use thiserror::Error;

use crate::data::model::Domain;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Need to specify a pattern for the time or frequency domain")]
    NoPatterns,

    #[error("At least one header key is required to label table columns")]
    NoHeaderKeys,

    #[error("Invalid {domain} pattern '{pattern}': {source}")]
    Pattern {
        domain: Domain,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Record '{id1}' has no field '{key}'")]
    MissingField { id1: String, key: String },

    #[error("Record '{id1}': x has {x_len} values but data has {data_len}")]
    LengthMismatch {
        id1: String,
        x_len: usize,
        data_len: usize,
    },

    #[error("Series '{label}' has duplicate abscissa value {value} and cannot be aligned")]
    DuplicateAbscissa { label: String, value: f64 },

    #[error("Malformed UFF data at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Unsupported ordinate data type {0} (expected 2, 4, 5 or 6)")]
    UnsupportedOrdinateType(i64),

    #[error("Unsupported binary floating point format {0} (only IEEE 754 is supported)")]
    UnsupportedFloatFormat(i64),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
