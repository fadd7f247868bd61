use std::path::Path;

use crate::config::ReadOptions;
use crate::data::filter::{Classification, Selector};
use crate::data::loader::{RecordSet, RecordSource, UffFile};
use crate::data::model::{Domain, UffRecord, EXPECTED_FORMAT_TYPE};
use crate::data::table::{Series, Table};
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DomainTable {
    pub domain: Domain,
    pub table: Table,
}

/// Requested tables (time first, then frequency) plus what was left out.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadOutput {
    pub tables: Vec<DomainTable>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ReadOutput {
    pub fn table(&self, domain: Domain) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.domain == domain)
            .map(|t| &t.table)
    }

    pub fn time(&self) -> Option<&Table> {
        self.table(Domain::Time)
    }

    pub fn frequency(&self) -> Option<&Table> {
        self.table(Domain::Frequency)
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables.into_iter().map(|t| t.table).collect()
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Read a UFF file and reshape its records into time and frequency tables.
///
/// Options are validated before the file is opened.
pub fn read_uff<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<ReadOutput> {
    let selector = prepare(options)?;
    let file = UffFile::open(path)?;
    decode_and_assemble(&file, &selector, &options.header_keys)
}

/// Same as [`read_uff`] for records coming from any decoder.
pub fn read_from<S: RecordSource + ?Sized>(source: &S, options: &ReadOptions) -> Result<ReadOutput> {
    let selector = prepare(options)?;
    decode_and_assemble(source, &selector, &options.header_keys)
}

/// Reshape records that are already decoded.
pub fn reshape(records: RecordSet, options: &ReadOptions) -> Result<ReadOutput> {
    let selector = prepare(options)?;
    assemble(records.into_records(), Vec::new(), &selector, &options.header_keys)
}

fn prepare(options: &ReadOptions) -> Result<Selector> {
    let selector = Selector::new(
        options.time_pattern.as_deref(),
        options.freq_pattern.as_deref(),
    )?;
    if options.header_keys.is_empty() {
        return Err(Error::NoHeaderKeys);
    }
    Ok(selector)
}

/// Datasets of other types are reported ahead of the records.
fn decode_and_assemble<S: RecordSource + ?Sized>(
    source: &S,
    selector: &Selector,
    header_keys: &[String],
) -> Result<ReadOutput> {
    let skipped = source
        .skipped_sets()?
        .into_iter()
        .map(|set| {
            Diagnostic::UnexpectedFormatType {
                id1: set.id1,
                format_type: set.set_type,
            }
            .emit()
        })
        .collect();
    assemble(source.read_sets()?.into_records(), skipped, selector, header_keys)
}

fn assemble(
    records: Vec<UffRecord>,
    mut diagnostics: Vec<Diagnostic>,
    selector: &Selector,
    header_keys: &[String],
) -> Result<ReadOutput> {
    let mut time_series = Vec::new();
    let mut freq_series = Vec::new();

    for record in &records {
        if record.format_type != EXPECTED_FORMAT_TYPE {
            diagnostics.push(
                Diagnostic::UnexpectedFormatType {
                    id1: record.id1.clone(),
                    format_type: record.format_type,
                }
                .emit(),
            );
        }

        match selector.classify(record) {
            Classification::Include(Domain::Time) => {
                time_series.push(Series::from_record(record, header_keys)?);
            }
            Classification::Include(Domain::Frequency) => {
                freq_series.push(Series::from_record(record, header_keys)?);
            }
            Classification::Unclassified => {
                diagnostics.push(Diagnostic::Unclassified { id1: record.id1.clone() }.emit());
            }
            Classification::ProbabilityDensity => {
                diagnostics.push(Diagnostic::ProbabilityDensity { id1: record.id1.clone() }.emit());
            }
            Classification::Excluded => {
                log::debug!("Excluding {} ({})", record.id1, record.kind());
            }
        }
    }

    let mut tables = Vec::with_capacity(2);
    for (domain, series) in [(Domain::Time, time_series), (Domain::Frequency, freq_series)] {
        if !selector.returns(domain) {
            continue;
        }
        let table = Table::outer_join(series)?;
        log::info!(
            "Built {domain} table with {} columns and {} rows",
            table.n_columns(),
            table.n_rows()
        );
        tables.push(DomainTable { domain, table });
    }

    Ok(ReadOutput {
        tables,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{MetadataValue, Ordinate};
    use crate::data::table::ColumnLabel;

    fn real(id1: &str, func_type: i64, x: Vec<f64>) -> UffRecord {
        let y = x.iter().map(|v| v * 2.0).collect();
        UffRecord::new(id1, func_type, x, Ordinate::Real(y))
    }

    #[test]
    fn both_patterns_absent_fails_before_reading() {
        let opts = ReadOptions {
            time_pattern: None,
            freq_pattern: None,
            ..ReadOptions::default()
        };
        assert!(matches!(
            read_uff("/does/not/exist.uff", &opts),
            Err(Error::NoPatterns)
        ));
    }

    #[test]
    fn empty_header_keys_are_rejected() {
        let opts = ReadOptions::default().with_header_keys(Vec::<String>::new());
        assert!(matches!(
            reshape(RecordSet::Many(Vec::new()), &opts),
            Err(Error::NoHeaderKeys)
        ));
    }

    #[test]
    fn single_time_record_gives_one_column() {
        let rec = real("acc 1", 1, vec![0.0, 0.1, 0.2, 0.3]);
        let out = reshape(RecordSet::One(rec), &ReadOptions::default()).unwrap();

        assert_eq!(out.tables.len(), 2);
        assert_eq!(out.tables[0].domain, Domain::Time);
        assert_eq!(out.tables[1].domain, Domain::Frequency);

        let time = out.time().unwrap();
        assert_eq!(time.n_columns(), 1);
        assert_eq!(time.n_rows(), 4);
        assert!(out.frequency().unwrap().is_empty());
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn general_and_pdf_records_warn_and_are_dropped() {
        let records = vec![real("g", 0, vec![1.0]), real("p", 11, vec![1.0])];
        let out = reshape(records.into(), &ReadOptions::default()).unwrap();

        assert!(out.time().unwrap().is_empty());
        assert!(out.frequency().unwrap().is_empty());
        assert_eq!(
            out.diagnostics,
            vec![
                Diagnostic::Unclassified { id1: "g".into() },
                Diagnostic::ProbabilityDensity { id1: "p".into() },
            ]
        );
    }

    #[test]
    fn unknown_func_types_are_dropped_quietly() {
        let out = reshape(RecordSet::One(real("order", 27, vec![1.0])), &ReadOptions::default()).unwrap();
        assert!(out.diagnostics.is_empty());
        assert!(out.frequency().unwrap().is_empty());
    }

    #[test]
    fn other_format_types_warn_but_are_still_classified() {
        let mut rec = real("f", 4, vec![1.0, 2.0]);
        rec.format_type = 55;
        let out = reshape(RecordSet::One(rec), &ReadOptions::freq_only(".*")).unwrap();

        assert_eq!(out.tables.len(), 1);
        assert_eq!(out.frequency().unwrap().n_columns(), 1);
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic::UnexpectedFormatType { id1: "f".into(), format_type: 55 }]
        );
    }

    #[test]
    fn only_requested_tables_are_returned() {
        let records = vec![real("t", 1, vec![0.0]), real("f", 2, vec![1.0])];
        let out = reshape(records.clone().into(), &ReadOptions::time_only(".*")).unwrap();
        assert_eq!(out.tables.len(), 1);
        assert!(out.frequency().is_none());

        let out = reshape(records.into(), &ReadOptions::freq_only(".*")).unwrap();
        assert_eq!(out.tables.len(), 1);
        assert_eq!(out.tables[0].domain, Domain::Frequency);
    }

    #[test]
    fn frequency_table_is_the_union_of_abscissas() {
        let records = vec![real("a", 4, vec![1.0, 2.0]), real("b", 9, vec![2.0, 3.0])];
        let out = reshape(records.into(), &ReadOptions::freq_only(".*")).unwrap();
        let freq = out.frequency().unwrap();

        assert_eq!(freq.index, vec![1.0, 2.0, 3.0]);
        assert_eq!(freq.columns[0].values.as_real().unwrap(), &[Some(2.0), Some(4.0), None]);
        assert_eq!(freq.columns[1].values.as_real().unwrap(), &[None, Some(4.0), Some(6.0)]);
    }

    #[test]
    fn labels_follow_header_keys_in_inclusion_order() {
        let records = vec![
            real("second", 1, vec![0.0]).with_field("rsp_node", 2i64),
            real("first", 1, vec![0.0]).with_field("rsp_node", 1i64),
        ];
        let out = reshape(records.clone().into(), &ReadOptions::time_only(".*")).unwrap();
        let labels: Vec<&ColumnLabel> = out.time().unwrap().labels();
        assert_eq!(labels[0], &ColumnLabel(vec![MetadataValue::from("second")]));
        assert_eq!(labels[1], &ColumnLabel(vec![MetadataValue::from("first")]));

        let opts = ReadOptions::time_only(".*").with_header_keys(["id1", "rsp_node"]);
        let out = reshape(records.into(), &opts).unwrap();
        assert_eq!(
            out.time().unwrap().labels()[1],
            &ColumnLabel(vec![MetadataValue::from("first"), MetadataValue::Integer(1)])
        );
    }

    #[test]
    fn missing_header_key_propagates() {
        let opts = ReadOptions::default().with_header_keys(["id1", "rsp_node"]);
        assert!(matches!(
            reshape(RecordSet::One(real("t", 1, vec![0.0])), &opts),
            Err(Error::MissingField { .. })
        ));
    }

    #[test]
    fn patterns_pick_records_per_domain() {
        let records = vec![
            real("acc 1", 1, vec![0.0]),
            real("force", 1, vec![0.0]),
            real("acc 1/force", 4, vec![1.0]),
            real("coh", 6, vec![1.0]),
        ];
        let opts = ReadOptions {
            time_pattern: Some("acc".into()),
            freq_pattern: Some("acc|coh".into()),
            ..ReadOptions::default()
        };
        let out = read_from(&records, &opts).unwrap();
        assert_eq!(out.time().unwrap().n_columns(), 1);
        assert_eq!(out.frequency().unwrap().n_columns(), 2);
        assert_eq!(out.into_tables().len(), 2);
    }
}
