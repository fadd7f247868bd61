use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use num_complex::Complex64;

use super::model::{MetadataValue, Ordinate, UffRecord};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Record sources
// ---------------------------------------------------------------------------

/// What a decoder hands back: a lone record or a sequence of them.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordSet {
    One(UffRecord),
    Many(Vec<UffRecord>),
}

impl RecordSet {
    /// Normalise into a sequence, wrapping a lone record.
    pub fn into_records(self) -> Vec<UffRecord> {
        match self {
            RecordSet::One(record) => vec![record],
            RecordSet::Many(records) => records,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordSet::One(_) => 1,
            RecordSet::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<UffRecord>> for RecordSet {
    fn from(mut records: Vec<UffRecord>) -> Self {
        if records.len() == 1 {
            RecordSet::One(records.remove(0))
        } else {
            RecordSet::Many(records)
        }
    }
}

/// A dataset the decoder does not turn into a [`UffRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSet {
    pub set_type: i64,
    /// First text line of the dataset, which is `id1` for function-like sets.
    pub id1: String,
    /// 1-based line number of the dataset header.
    pub line: usize,
}

/// Anything that can decode a set of UFF records.
pub trait RecordSource {
    fn read_sets(&self) -> Result<RecordSet>;

    /// Datasets of other types that `read_sets` leaves out, in file order.
    fn skipped_sets(&self) -> Result<Vec<SkippedSet>> {
        Ok(Vec::new())
    }
}

impl RecordSource for [UffRecord] {
    fn read_sets(&self) -> Result<RecordSet> {
        Ok(self.to_vec().into())
    }
}

impl RecordSource for Vec<UffRecord> {
    fn read_sets(&self) -> Result<RecordSet> {
        self.as_slice().read_sets()
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// A UFF file held in memory.
///
/// Only dataset 58 (ASCII) and 58b (binary) are decoded; other dataset
/// types are listed by [`UffFile::set_types`] and skipped by
/// [`UffFile::read_sets`].
#[derive(Debug, Clone)]
pub struct UffFile {
    path: Option<PathBuf>,
    contents: Vec<u8>,
}

impl UffFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read(path.as_ref())?;
        Ok(UffFile {
            path: Some(path.as_ref().to_path_buf()),
            contents,
        })
    }

    pub fn from_bytes(contents: Vec<u8>) -> Self {
        UffFile {
            path: None,
            contents,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Dataset type numbers in file order.
    pub fn set_types(&self) -> Result<Vec<i64>> {
        Ok(split_datasets(&self.contents)?
            .iter()
            .map(|ds| ds.set_type)
            .collect())
    }

    pub fn n_sets(&self) -> Result<usize> {
        Ok(split_datasets(&self.contents)?.len())
    }
}

impl RecordSource for UffFile {
    fn read_sets(&self) -> Result<RecordSet> {
        let records = parse_bytes(&self.contents)?;
        log::info!(
            "Decoded {} type-58 records from {}",
            records.len(),
            self.path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<memory>".to_string())
        );
        Ok(records.into())
    }

    fn skipped_sets(&self) -> Result<Vec<SkippedSet>> {
        Ok(split_datasets(&self.contents)?
            .iter()
            .filter(|ds| ds.set_type != 58)
            .map(|ds| SkippedSet {
                set_type: ds.set_type,
                id1: ds.lines.first().map(|l| l.trim().to_string()).unwrap_or_default(),
                line: ds.line,
            })
            .collect())
    }
}

/// Decode every dataset 58 / 58b in `buf`.
pub fn parse_bytes(buf: &[u8]) -> Result<Vec<UffRecord>> {
    let mut records = Vec::new();
    for ds in split_datasets(buf)? {
        if ds.set_type == 58 {
            records.push(decode_58(&ds)?);
        } else {
            log::info!(
                "Skipping dataset type {}{} at line {}",
                ds.set_type,
                if ds.binary.is_some() { "b" } else { "" },
                ds.line
            );
        }
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Dataset splitting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct BinaryHeader {
    byte_order: i64,
    float_format: i64,
}

/// One `-1` … `-1` block, not yet decoded.
#[derive(Debug)]
struct RawDataset<'a> {
    set_type: i64,
    /// 1-based line number of the dataset header line.
    line: usize,
    binary: Option<BinaryHeader>,
    /// Text lines after the header line (ASCII sets: everything; binary sets: the ASCII header).
    lines: Vec<String>,
    payload: &'a [u8],
}

struct LineCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> LineCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        LineCursor {
            buf,
            pos: 0,
            line: 0,
        }
    }

    fn next_line(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let rest = &self.buf[self.pos..];
        let (line, advance) = match rest.iter().position(|&b| b == b'\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.pos += advance;
        self.line += 1;
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.buf.len() {
            return None;
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Some(bytes)
    }
}

fn is_delimiter(line: &[u8]) -> bool {
    line.trim_ascii() == b"-1"
}

fn text(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

fn malformed(line: usize, message: impl Into<String>) -> Error {
    Error::Malformed {
        line,
        message: message.into(),
    }
}

fn split_datasets(buf: &[u8]) -> Result<Vec<RawDataset<'_>>> {
    let mut cursor = LineCursor::new(buf);
    let mut datasets = Vec::new();

    while let Some(line) = cursor.next_line() {
        if !is_delimiter(line) {
            continue;
        }
        // A trailing delimiter with nothing after it ends the file.
        let Some(header) = cursor.next_line() else {
            break;
        };
        let header_line = cursor.line;
        let header = text(header);
        let mut tokens = header.split_whitespace();
        let first = tokens
            .next()
            .ok_or_else(|| malformed(header_line, "missing dataset type"))?;
        let (number, is_binary) = match first.strip_suffix('b').or_else(|| first.strip_suffix('B')) {
            Some(number) => (number, true),
            None => (first, false),
        };
        let set_type: i64 = number
            .parse()
            .map_err(|_| malformed(header_line, format!("invalid dataset type '{first}'")))?;

        let mut ds = RawDataset {
            set_type,
            line: header_line,
            binary: None,
            lines: Vec::new(),
            payload: &[],
        };

        if is_binary {
            let mut next_int = |what: &str| -> Result<i64> {
                tokens
                    .next()
                    .and_then(|t| t.parse::<i64>().ok())
                    .ok_or_else(|| malformed(header_line, format!("binary header is missing {what}")))
            };
            let byte_order = next_int("the byte ordering")?;
            let float_format = next_int("the floating point format")?;
            let ascii_lines = next_int("the ASCII line count")?;
            let n_bytes = next_int("the byte count")?;
            if ascii_lines < 0 || n_bytes < 0 {
                return Err(malformed(header_line, "negative sizes in binary header"));
            }
            for _ in 0..ascii_lines {
                let line = cursor
                    .next_line()
                    .ok_or_else(|| malformed(cursor.line, "binary dataset header is truncated"))?;
                ds.lines.push(text(line));
            }
            ds.payload = cursor.take(n_bytes as usize).ok_or_else(|| {
                malformed(cursor.line, format!("binary block of {n_bytes} bytes is truncated"))
            })?;
            ds.binary = Some(BinaryHeader {
                byte_order,
                float_format,
            });
            loop {
                match cursor.next_line() {
                    Some(line) if is_delimiter(line) => break,
                    Some(_) => continue,
                    None => return Err(malformed(cursor.line, "unterminated binary dataset")),
                }
            }
        } else {
            loop {
                match cursor.next_line() {
                    Some(line) if is_delimiter(line) => break,
                    Some(line) => ds.lines.push(text(line)),
                    None => return Err(malformed(cursor.line, "unterminated dataset")),
                }
            }
        }

        datasets.push(ds);
    }

    Ok(datasets)
}

// ---------------------------------------------------------------------------
// Dataset 58
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Kind {
    Int,
    Float,
    Text,
}

type Layout = &'static [(&'static str, usize, Kind)];

const RECORD_6: Layout = &[
    ("func_type", 5, Kind::Int),
    ("func_id", 10, Kind::Int),
    ("ver_num", 5, Kind::Int),
    ("load_case_id", 10, Kind::Int),
    ("rsp_ent_name", 11, Kind::Text),
    ("rsp_node", 10, Kind::Int),
    ("rsp_dir", 4, Kind::Int),
    ("ref_ent_name", 11, Kind::Text),
    ("ref_node", 10, Kind::Int),
    ("ref_dir", 4, Kind::Int),
];

const RECORD_7: Layout = &[
    ("ord_data_type", 10, Kind::Int),
    ("num_pts", 10, Kind::Int),
    ("abscissa_spacing", 10, Kind::Int),
    ("abscissa_min", 13, Kind::Float),
    ("abscissa_inc", 13, Kind::Float),
    ("z_axis_value", 13, Kind::Float),
];

const AXIS_WIDTHS: [usize; 6] = [10, 5, 5, 5, 21, 21];
const AXIS_SUFFIXES: [&str; 6] = [
    "spec_data_type",
    "len_unit_exp",
    "force_unit_exp",
    "temp_unit_exp",
    "axis_lab",
    "axis_units_lab",
];
/// Records 8 to 11, in order.
pub(crate) const AXIS_PREFIXES: [&str; 4] = ["abscissa", "ordinate", "orddenom", "z_axis"];

/// Number of text lines before the data in a dataset 58.
const HEADER_LINES: usize = 11;

#[derive(Clone, Copy, PartialEq, Debug)]
enum Precision {
    Single,
    Double,
}

/// Split `line` into trimmed fixed-width columns.
fn fixed_columns(line: &str, widths: impl IntoIterator<Item = usize>) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut start = 0;
    widths
        .into_iter()
        .map(|w| {
            let end = (start + w).min(chars.len());
            let col: String = if start < end {
                chars[start..end].iter().collect()
            } else {
                String::new()
            };
            start += w;
            col.trim().to_string()
        })
        .collect()
}

fn parse_f64(token: &str) -> Option<f64> {
    token.replace(['D', 'd'], "E").parse().ok()
}

fn parse_int(col: &str, line: usize, name: &str) -> Result<i64> {
    if col.is_empty() {
        return Ok(0);
    }
    col.parse()
        .map_err(|_| malformed(line, format!("{name}: '{col}' is not an integer")))
}

fn parse_float(col: &str, line: usize, name: &str) -> Result<f64> {
    if col.is_empty() {
        return Ok(0.0);
    }
    parse_f64(col).ok_or_else(|| malformed(line, format!("{name}: '{col}' is not a number")))
}

fn parse_layout(
    line: &str,
    line_no: usize,
    names: &[String],
    widths: &[usize],
    kinds: &[Kind],
    fields: &mut BTreeMap<String, MetadataValue>,
) -> Result<()> {
    let cols = fixed_columns(line, widths.iter().copied());
    for ((name, col), kind) in names.iter().zip(&cols).zip(kinds) {
        let value = match kind {
            Kind::Int => MetadataValue::Integer(parse_int(col, line_no, name)?),
            Kind::Float => MetadataValue::Float(parse_float(col, line_no, name)?),
            Kind::Text => MetadataValue::String(col.clone()),
        };
        fields.insert(name.clone(), value);
    }
    Ok(())
}

fn parse_static_layout(
    line: &str,
    line_no: usize,
    layout: Layout,
    fields: &mut BTreeMap<String, MetadataValue>,
) -> Result<()> {
    let names: Vec<String> = layout.iter().map(|(n, _, _)| n.to_string()).collect();
    let widths: Vec<usize> = layout.iter().map(|(_, w, _)| *w).collect();
    let kinds: Vec<Kind> = layout.iter().map(|(_, _, k)| *k).collect();
    parse_layout(line, line_no, &names, &widths, &kinds, fields)
}

fn take_int(fields: &BTreeMap<String, MetadataValue>, key: &str) -> i64 {
    fields.get(key).and_then(MetadataValue::as_i64).unwrap_or(0)
}

fn take_float(fields: &BTreeMap<String, MetadataValue>, key: &str) -> f64 {
    fields.get(key).and_then(MetadataValue::as_f64).unwrap_or(0.0)
}

/// Column widths of one data line, used when values run into each other.
fn data_widths(precision: Precision, complex: bool, even: bool) -> &'static [usize] {
    match (precision, complex, even) {
        (Precision::Single, _, _) => &[13],
        (Precision::Double, _, true) => &[20],
        (Precision::Double, false, false) => &[13, 20],
        (Precision::Double, true, false) => &[13, 20, 20],
    }
}

fn parse_ascii_values(lines: &[String], first_line: usize, widths: &[usize]) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let parsed: Option<Vec<f64>> = line.split_whitespace().map(parse_f64).collect();
        match parsed {
            Some(mut vals) => values.append(&mut vals),
            None => {
                let line_len = line.chars().count();
                let mut cols = Vec::new();
                let mut covered = 0;
                while covered < line_len {
                    for &w in widths {
                        cols.push(w);
                        covered += w;
                    }
                }
                for col in fixed_columns(line, cols) {
                    if col.is_empty() {
                        continue;
                    }
                    let v = parse_f64(&col).ok_or_else(|| {
                        malformed(first_line + i, format!("'{col}' is not a number"))
                    })?;
                    values.push(v);
                }
            }
        }
    }
    Ok(values)
}

fn decode_binary_values(payload: &[u8], precision: Precision, little_endian: bool) -> Vec<f64> {
    match precision {
        Precision::Single => payload
            .chunks_exact(4)
            .map(|b| {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(b);
                let v = if little_endian {
                    f32::from_le_bytes(raw)
                } else {
                    f32::from_be_bytes(raw)
                };
                v as f64
            })
            .collect(),
        Precision::Double => payload
            .chunks_exact(8)
            .map(|b| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                if little_endian {
                    f64::from_le_bytes(raw)
                } else {
                    f64::from_be_bytes(raw)
                }
            })
            .collect(),
    }
}

fn decode_58(ds: &RawDataset<'_>) -> Result<UffRecord> {
    if ds.lines.len() < HEADER_LINES {
        return Err(malformed(
            ds.line,
            format!(
                "dataset 58 needs {HEADER_LINES} header lines, found {}",
                ds.lines.len()
            ),
        ));
    }
    let line_no = |i: usize| ds.line + 1 + i;

    let mut fields = BTreeMap::new();
    for (i, key) in ["id1", "id2", "id3", "id4", "id5"].iter().enumerate() {
        fields.insert(key.to_string(), MetadataValue::String(ds.lines[i].trim().to_string()));
    }
    parse_static_layout(&ds.lines[5], line_no(5), RECORD_6, &mut fields)?;
    parse_static_layout(&ds.lines[6], line_no(6), RECORD_7, &mut fields)?;
    let axis_kinds = [Kind::Int, Kind::Int, Kind::Int, Kind::Int, Kind::Text, Kind::Text];
    for (i, prefix) in AXIS_PREFIXES.iter().enumerate() {
        let names: Vec<String> = AXIS_SUFFIXES
            .iter()
            .map(|suffix| format!("{prefix}_{suffix}"))
            .collect();
        parse_layout(
            &ds.lines[7 + i],
            line_no(7 + i),
            &names,
            &AXIS_WIDTHS,
            &axis_kinds,
            &mut fields,
        )?;
    }
    fields.insert(
        "binary".to_string(),
        MetadataValue::Integer(ds.binary.is_some() as i64),
    );

    let id1 = match fields.remove("id1") {
        Some(MetadataValue::String(s)) => s,
        _ => String::new(),
    };
    let func_type = take_int(&fields, "func_type");
    fields.remove("func_type");

    let ord_data_type = take_int(&fields, "ord_data_type");
    let (complex, precision) = match ord_data_type {
        2 => (false, Precision::Single),
        4 => (false, Precision::Double),
        5 => (true, Precision::Single),
        6 => (true, Precision::Double),
        other => return Err(Error::UnsupportedOrdinateType(other)),
    };
    let num_pts = take_int(&fields, "num_pts");
    if num_pts < 0 {
        return Err(malformed(line_no(6), format!("negative point count {num_pts}")));
    }
    let num_pts = num_pts as usize;
    let even = take_int(&fields, "abscissa_spacing") == 1;
    let abscissa_min = take_float(&fields, "abscissa_min");
    let abscissa_inc = take_float(&fields, "abscissa_inc");

    let mut values = match ds.binary {
        None => parse_ascii_values(
            &ds.lines[HEADER_LINES..],
            line_no(HEADER_LINES),
            data_widths(precision, complex, even),
        )?,
        Some(header) => {
            if header.float_format != 2 {
                return Err(Error::UnsupportedFloatFormat(header.float_format));
            }
            let little_endian = match header.byte_order {
                1 => true,
                2 => false,
                other => {
                    return Err(malformed(ds.line, format!("unknown byte ordering {other}")));
                }
            };
            decode_binary_values(ds.payload, precision, little_endian)
        }
    };

    let stride = 1 + complex as usize + (!even) as usize;
    let expected = num_pts * stride;
    if values.len() < expected {
        return Err(malformed(
            line_no(HEADER_LINES),
            format!(
                "record '{id1}' expects {expected} values for {num_pts} points, found {}",
                values.len()
            ),
        ));
    }
    if values.len() > expected {
        log::debug!(
            "Record '{id1}': ignoring {} trailing values",
            values.len() - expected
        );
        values.truncate(expected);
    }

    let offset = (!even) as usize;
    let x: Vec<f64> = if even {
        (0..num_pts)
            .map(|i| abscissa_min + i as f64 * abscissa_inc)
            .collect()
    } else {
        values.chunks_exact(stride).map(|c| c[0]).collect()
    };
    let data = if complex {
        Ordinate::Complex(
            values
                .chunks_exact(stride)
                .map(|c| Complex64::new(c[offset], c[offset + 1]))
                .collect(),
        )
    } else {
        Ordinate::Real(values.chunks_exact(stride).map(|c| c[offset]).collect())
    };

    Ok(UffRecord {
        format_type: ds.set_type,
        func_type,
        id1,
        x,
        data,
        fields,
    })
}
