//! # uff-tables
//!
//! Read Universal File Format (UFF) measurement files and reshape their
//! function records (dataset 58) into a time-domain table and a
//! frequency-domain table.
//!
//! Records are picked by an identifier pattern (matched from the start of
//! `id1`) and by function type: time responses go to the time table,
//! spectra, FRFs, coherences and the like to the frequency table. Each
//! picked record becomes one column, aligned with the others on its
//! abscissa values and labeled by the header fields you ask for.
//!
//! ## Example
//!
//! ```no_run
//! use uff_tables::{read_uff, ReadOptions};
//!
//! let options = ReadOptions::default().with_header_keys(["id1", "rsp_node"]);
//! let output = read_uff("measurement.uff", &options).expect("Failed to read file");
//!
//! if let Some(freq) = output.frequency() {
//!     println!("{} spectra over {} lines", freq.n_columns(), freq.n_rows());
//! }
//! for warning in &output.diagnostics {
//!     eprintln!("{warning}");
//! }
//! ```

pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod reshape;

pub use config::ReadOptions;
pub use data::loader::{parse_bytes, RecordSet, RecordSource, SkippedSet, UffFile};
pub use data::model::{
    Domain, FuncType, MetadataValue, Ordinate, UffRecord, EXPECTED_FORMAT_TYPE,
    FREQUENCY_FUNC_TYPES, TIME_FUNC_TYPE,
};
pub use data::table::{Column, ColumnLabel, ColumnValues, Series, Table};
pub use data::writer::{write_file, write_records};
pub use diagnostics::Diagnostic;
pub use error::{Error, Result};
pub use reshape::{read_from, read_uff, reshape, DomainTable, ReadOutput};
