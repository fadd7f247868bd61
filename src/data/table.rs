use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StructArray};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Fields, Schema};
use arrow::record_batch::RecordBatch;
use num_complex::Complex64;

use super::model::{MetadataValue, Ordinate, UffRecord};
use crate::error::{Error, Result};

/// Field metadata key holding a column's label as a JSON array.
pub const LABEL_METADATA_KEY: &str = "uff.label";

// ---------------------------------------------------------------------------
// Column labels and series
// ---------------------------------------------------------------------------

/// Tuple of header values naming one column. Uniqueness is not enforced.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLabel(pub Vec<MetadataValue>);

impl ColumnLabel {
    /// Build a label from the `header_keys` fields of `record`.
    pub fn from_record(record: &UffRecord, header_keys: &[String]) -> Result<Self> {
        header_keys
            .iter()
            .map(|key| {
                record.field(key).ok_or_else(|| Error::MissingField {
                    id1: record.id1.clone(),
                    key: key.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(ColumnLabel)
    }

    pub fn parts(&self) -> &[MetadataValue] {
        &self.0
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", parts.join("/"))
    }
}

/// One labeled series keyed by its own abscissa.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: ColumnLabel,
    pub index: Vec<f64>,
    pub values: Ordinate,
}

impl Series {
    pub fn from_record(record: &UffRecord, header_keys: &[String]) -> Result<Self> {
        if record.x.len() != record.data.len() {
            return Err(Error::LengthMismatch {
                id1: record.id1.clone(),
                x_len: record.x.len(),
                data_len: record.data.len(),
            });
        }
        Ok(Series {
            label: ColumnLabel::from_record(record, header_keys)?,
            index: record.x.clone(),
            values: record.data.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Table – series aligned on a shared abscissa index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Real(Vec<Option<f64>>),
    Complex(Vec<Option<Complex64>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Real(v) => v.len(),
            ColumnValues::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_defined(&self, row: usize) -> bool {
        match self {
            ColumnValues::Real(v) => matches!(v.get(row), Some(Some(_))),
            ColumnValues::Complex(v) => matches!(v.get(row), Some(Some(_))),
        }
    }

    pub fn as_real(&self) -> Option<&[Option<f64>]> {
        match self {
            ColumnValues::Real(v) => Some(v.as_slice()),
            ColumnValues::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&[Option<Complex64>]> {
        match self {
            ColumnValues::Complex(v) => Some(v.as_slice()),
            ColumnValues::Real(_) => None,
        }
    }

    /// CSV text of one cell; empty when undefined.
    fn cell_text(&self, row: usize) -> String {
        match self {
            ColumnValues::Real(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(|v| v.to_string())
                .unwrap_or_default(),
            ColumnValues::Complex(v) => v
                .get(row)
                .copied()
                .flatten()
                .map(|c| format!("{}{:+}j", c.re, c.im))
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub label: ColumnLabel,
    pub values: ColumnValues,
}

/// Rows keyed by abscissa value, one column per included record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub index: Vec<f64>,
    pub columns: Vec<Column>,
}

/// Hash key of an abscissa value; `-0.0` and `0.0` share a row.
fn row_key(x: f64) -> u64 {
    if x == 0.0 {
        0
    } else if x.is_nan() {
        f64::NAN.to_bits()
    } else {
        x.to_bits()
    }
}

fn same_index(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| row_key(*x) == row_key(*y))
}

fn scatter<T: Copy>(rows: &[usize], values: &[T], n_rows: usize) -> Vec<Option<T>> {
    let mut out = vec![None; n_rows];
    for (&row, &v) in rows.iter().zip(values) {
        out[row] = Some(v);
    }
    out
}

impl Table {
    pub fn empty() -> Self {
        Table::default()
    }

    /// Align `series` on the union of their abscissas.
    ///
    /// When every series shares the same index it is kept as is, duplicates
    /// included. Otherwise rows appear in first-seen order and each series
    /// must have unique abscissa values.
    pub fn outer_join(series: Vec<Series>) -> Result<Self> {
        let Some(first) = series.first() else {
            return Ok(Table::empty());
        };

        let (index, rows): (Vec<f64>, Vec<Vec<usize>>) =
            if series.iter().all(|s| same_index(&s.index, &first.index)) {
                let rows = series.iter().map(|s| (0..s.index.len()).collect()).collect();
                (first.index.clone(), rows)
            } else {
                let mut index = Vec::new();
                let mut positions: HashMap<u64, usize> = HashMap::new();
                let mut rows = Vec::with_capacity(series.len());
                for s in &series {
                    let mut seen = HashSet::with_capacity(s.index.len());
                    let mut series_rows = Vec::with_capacity(s.index.len());
                    for &x in &s.index {
                        let key = row_key(x);
                        if !seen.insert(key) {
                            return Err(Error::DuplicateAbscissa {
                                label: s.label.to_string(),
                                value: x,
                            });
                        }
                        let row = *positions.entry(key).or_insert_with(|| {
                            index.push(x);
                            index.len() - 1
                        });
                        series_rows.push(row);
                    }
                    rows.push(series_rows);
                }
                (index, rows)
            };

        let n_rows = index.len();
        let columns = series
            .into_iter()
            .zip(&rows)
            .map(|(s, rows)| Column {
                label: s.label,
                values: match &s.values {
                    Ordinate::Real(v) => ColumnValues::Real(scatter(rows, v, n_rows)),
                    Ordinate::Complex(v) => ColumnValues::Complex(scatter(rows, v, n_rows)),
                },
            })
            .collect();

        Ok(Table { index, columns })
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty() && self.columns.is_empty()
    }

    pub fn column(&self, i: usize) -> Option<&Column> {
        self.columns.get(i)
    }

    pub fn labels(&self) -> Vec<&ColumnLabel> {
        self.columns.iter().map(|c| &c.label).collect()
    }

    /// Arrow view: an `x` column followed by one nullable column per label.
    /// Complex columns become `Struct{re, im}`.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = vec![Field::new("x", DataType::Float64, false)];
        let mut arrays: Vec<ArrayRef> = vec![Arc::new(Float64Array::from(self.index.clone()))];

        for col in &self.columns {
            let metadata = HashMap::from([(
                LABEL_METADATA_KEY.to_string(),
                serde_json::to_string(col.label.parts())?,
            )]);
            let name = col.label.to_string();
            match &col.values {
                ColumnValues::Real(v) => {
                    fields.push(Field::new(name, DataType::Float64, true).with_metadata(metadata));
                    arrays.push(Arc::new(Float64Array::from(v.clone())));
                }
                ColumnValues::Complex(v) => {
                    let parts = Fields::from(vec![
                        Field::new("re", DataType::Float64, true),
                        Field::new("im", DataType::Float64, true),
                    ]);
                    let re: Float64Array = v.iter().map(|c| c.map(|c| c.re)).collect();
                    let im: Float64Array = v.iter().map(|c| c.map(|c| c.im)).collect();
                    let nulls = NullBuffer::from(v.iter().map(Option::is_some).collect::<Vec<_>>());
                    let array = StructArray::try_new(
                        parts.clone(),
                        vec![Arc::new(re) as ArrayRef, Arc::new(im) as ArrayRef],
                        Some(nulls),
                    )?;
                    fields.push(
                        Field::new(name, DataType::Struct(parts), true).with_metadata(metadata),
                    );
                    arrays.push(Arc::new(array));
                }
            }
        }

        let schema = Arc::new(Schema::new(fields));
        Ok(RecordBatch::try_new(schema, arrays)?)
    }

    pub fn to_pretty_string(&self) -> Result<String> {
        let batch = self.to_record_batch()?;
        Ok(arrow::util::pretty::pretty_format_batches(&[batch])?.to_string())
    }

    /// CSV with an `x` column, one column per label and empty undefined cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec!["x".to_string()];
        header.extend(self.columns.iter().map(|c| c.label.to_string()));
        wtr.write_record(&header)?;

        for (row, x) in self.index.iter().enumerate() {
            let mut record = vec![x.to_string()];
            record.extend(self.columns.iter().map(|c| c.values.cell_text(row)));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    fn series(id: &str, index: Vec<f64>, values: Vec<f64>) -> Series {
        Series {
            label: ColumnLabel(vec![MetadataValue::from(id)]),
            index,
            values: Ordinate::Real(values),
        }
    }

    #[test]
    fn no_series_gives_an_empty_table() {
        let table = Table::outer_join(Vec::new()).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.n_rows(), 0);
        assert_eq!(table.n_columns(), 0);
    }

    #[test]
    fn differing_abscissas_are_unioned_in_first_seen_order() {
        let table = Table::outer_join(vec![
            series("a", vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]),
            series("b", vec![2.5, 3.0, 0.5], vec![1.0, 2.0, 3.0]),
        ])
        .unwrap();

        assert_eq!(table.index, vec![1.0, 2.0, 3.0, 2.5, 0.5]);
        assert_eq!(
            table.columns[0].values.as_real().unwrap(),
            &[Some(10.0), Some(20.0), Some(30.0), None, None]
        );
        assert_eq!(
            table.columns[1].values.as_real().unwrap(),
            &[None, None, Some(2.0), Some(1.0), Some(3.0)]
        );
    }

    #[test]
    fn negative_zero_shares_the_zero_row() {
        let table = Table::outer_join(vec![
            series("a", vec![0.0, 1.0], vec![1.0, 2.0]),
            series("b", vec![-0.0, 2.0], vec![3.0, 4.0]),
        ])
        .unwrap();
        assert_eq!(table.n_rows(), 3);
        assert!(table.columns[1].values.is_defined(0));
    }

    #[test]
    fn identical_indexes_keep_duplicates() {
        let table = Table::outer_join(vec![
            series("a", vec![1.0, 1.0], vec![1.0, 2.0]),
            series("b", vec![1.0, 1.0], vec![3.0, 4.0]),
        ])
        .unwrap();
        assert_eq!(table.index, vec![1.0, 1.0]);
        assert_eq!(table.columns[1].values.as_real().unwrap(), &[Some(3.0), Some(4.0)]);
    }

    #[test]
    fn duplicates_cannot_be_aligned_against_other_indexes() {
        let result = Table::outer_join(vec![
            series("a", vec![1.0, 1.0], vec![1.0, 2.0]),
            series("b", vec![1.0, 2.0], vec![3.0, 4.0]),
        ]);
        match result {
            Err(Error::DuplicateAbscissa { label, value }) => {
                assert_eq!(label, "a");
                assert_eq!(value, 1.0);
            }
            other => panic!("expected duplicate abscissa error, got {other:?}"),
        }
    }

    #[test]
    fn label_lookup_reports_missing_fields() {
        let rec = UffRecord::new("acc", 1, vec![0.0], Ordinate::Real(vec![1.0]));
        let err = ColumnLabel::from_record(&rec, &["id1".to_string(), "rsp_node".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::MissingField { ref key, .. } if key == "rsp_node"));
    }

    #[test]
    fn mismatched_record_lengths_are_rejected() {
        let rec = UffRecord::new("acc", 1, vec![0.0, 1.0], Ordinate::Real(vec![1.0]));
        assert!(matches!(
            Series::from_record(&rec, &["id1".to_string()]),
            Err(Error::LengthMismatch { x_len: 2, data_len: 1, .. })
        ));
    }

    #[test]
    fn record_batch_carries_labels_and_nulls() {
        let complex = Series {
            label: ColumnLabel(vec![MetadataValue::from("frf"), MetadataValue::Integer(3)]),
            index: vec![2.0],
            values: Ordinate::Complex(vec![Complex64::new(1.0, -1.0)]),
        };
        let table = Table::outer_join(vec![series("a", vec![1.0, 2.0], vec![5.0, 6.0]), complex]).unwrap();
        let batch = table.to_record_batch().unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 3);
        let schema = batch.schema();
        assert_eq!(schema.field(0).name(), "x");
        assert_eq!(schema.field(1).name(), "a");
        assert_eq!(schema.field(2).name(), "frf/3");
        assert_eq!(
            schema.field(2).metadata().get(LABEL_METADATA_KEY).map(String::as_str),
            Some(r#"["frf",3]"#)
        );
        assert!(matches!(schema.field(2).data_type(), DataType::Struct(_)));
        assert!(batch.column(2).is_null(0));
        assert!(batch.column(2).is_valid(1));
    }

    #[test]
    fn empty_table_still_has_an_x_column() {
        let batch = Table::empty().to_record_batch().unwrap();
        assert_eq!(batch.num_columns(), 1);
        assert_eq!(batch.num_rows(), 0);
    }

    #[test]
    fn csv_leaves_undefined_cells_blank() {
        let complex = Series {
            label: ColumnLabel(vec![MetadataValue::from("z")]),
            index: vec![2.0],
            values: Ordinate::Complex(vec![Complex64::new(1.5, -2.0)]),
        };
        let table = Table::outer_join(vec![series("a", vec![1.0, 2.0], vec![5.0, 6.5]), complex]).unwrap();
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "x,a,z\n1,5,\n2,6.5,1.5-2j\n");
    }

    #[test]
    fn pretty_print_lists_every_label() {
        let table = Table::outer_join(vec![
            series("left", vec![1.0], vec![5.0]),
            series("right", vec![1.0], vec![6.0]),
        ])
        .unwrap();
        let text = table.to_pretty_string().unwrap();
        assert!(text.contains("left"));
        assert!(text.contains("right"));
    }
}
