/// Data layer: record model, UFF decoding, selection and tables.
///
/// Architecture:
/// ```text
///   .uff / .unv (dataset 58 / 58b)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  split `-1` blocks → Vec<UffRecord>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  id1 pattern + func_type → time / frequency / dropped
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  table    │  outer join on abscissa → labeled Table
///   └──────────┘
/// ```
///
/// `writer` goes the other way and emits ASCII dataset 58.
pub mod filter;
pub mod loader;
pub mod model;
pub mod table;
pub mod writer;
