use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::loader::AXIS_PREFIXES;
use super::model::{MetadataValue, Ordinate, UffRecord};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Dataset 58 ASCII writer
// ---------------------------------------------------------------------------

/// Write `records` as ASCII dataset 58 blocks to `path`.
pub fn write_file<P: AsRef<Path>>(path: P, records: &[UffRecord]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_records(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

/// Write `records` as ASCII dataset 58 blocks.
///
/// Real data is written in double precision (ordinate type 4), complex
/// data as type 6. Abscissas go out as even spacing only when the record 7
/// minimum and increment rebuild every value exactly.
pub fn write_records<W: Write>(writer: &mut W, records: &[UffRecord]) -> Result<()> {
    for rec in records {
        write_record(writer, rec)?;
    }
    Ok(())
}

/// Fortran-style `Ew.d`: mantissa with `decimals` digits, signed two-digit exponent.
fn fortran_e(v: f64, width: usize, decimals: usize) -> String {
    if !v.is_finite() {
        return format!("{v:>width$}");
    }
    let s = format!("{v:.decimals$E}");
    let (mantissa, exp) = s.split_once('E').unwrap_or((s.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{:>width$}", format!("{mantissa}E{sign}{:02}", exp.abs()))
}

fn clip(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

fn text_field(rec: &UffRecord, key: &str) -> String {
    match rec.fields.get(key) {
        Some(MetadataValue::String(s)) if !s.is_empty() => s.clone(),
        Some(MetadataValue::String(_)) | None => "NONE".to_string(),
        Some(other) => other.to_string(),
    }
}

fn int_field(rec: &UffRecord, key: &str) -> i64 {
    rec.fields
        .get(key)
        .and_then(|v| match v {
            MetadataValue::Integer(i) => Some(*i),
            MetadataValue::Float(f) => Some(*f as i64),
            MetadataValue::String(s) => s.trim().parse().ok(),
        })
        .unwrap_or(0)
}

fn float_field(rec: &UffRecord, key: &str) -> f64 {
    rec.fields
        .get(key)
        .and_then(MetadataValue::as_f64)
        .unwrap_or(0.0)
}

/// Value a record-7 real reads back as.
fn as_written(v: f64) -> f64 {
    fortran_e(v, 13, 5).trim().parse().unwrap_or(v)
}

/// `(abscissa_min, abscissa_inc)` when `x` survives being written as even spacing.
///
/// Readers rebuild `x` as `min + i * inc`, so every value must come back
/// bit for bit.
fn even_spacing(x: &[f64]) -> Option<(f64, f64)> {
    match x {
        [] => Some((0.0, 0.0)),
        [only] => (as_written(*only) == *only).then_some((*only, 0.0)),
        [first, .., last] => {
            let min = as_written(*first);
            let inc = as_written((last - first) / (x.len() - 1) as f64);
            x.iter()
                .enumerate()
                .all(|(i, v)| min + i as f64 * inc == *v)
                .then_some((min, inc))
        }
    }
}

fn write_record<W: Write>(w: &mut W, rec: &UffRecord) -> Result<()> {
    let spacing = even_spacing(&rec.x);
    let ord_data_type = if rec.data.is_complex() { 6 } else { 4 };
    let (abscissa_min, abscissa_inc) = spacing.unwrap_or((rec.x.first().copied().unwrap_or(0.0), 0.0));

    writeln!(w, "{:>6}", -1)?;
    writeln!(w, "{:>6}", 58)?;
    writeln!(w, "{}", clip(&rec.id1, 80))?;
    for key in ["id2", "id3", "id4", "id5"] {
        writeln!(w, "{}", clip(&text_field(rec, key), 80))?;
    }
    writeln!(
        w,
        "{:>5}{:>10}{:>5}{:>10} {:<10}{:>10}{:>4} {:<10}{:>10}{:>4}",
        rec.func_type,
        int_field(rec, "func_id"),
        int_field(rec, "ver_num"),
        int_field(rec, "load_case_id"),
        clip(&text_field(rec, "rsp_ent_name"), 10),
        int_field(rec, "rsp_node"),
        int_field(rec, "rsp_dir"),
        clip(&text_field(rec, "ref_ent_name"), 10),
        int_field(rec, "ref_node"),
        int_field(rec, "ref_dir"),
    )?;
    writeln!(
        w,
        "{:>10}{:>10}{:>10}{}{}{}",
        ord_data_type,
        rec.x.len(),
        spacing.is_some() as i64,
        fortran_e(abscissa_min, 13, 5),
        fortran_e(abscissa_inc, 13, 5),
        fortran_e(float_field(rec, "z_axis_value"), 13, 5),
    )?;
    for prefix in AXIS_PREFIXES {
        writeln!(
            w,
            "{:>10}{:>5}{:>5}{:>5} {:<20} {:<20}",
            int_field(rec, &format!("{prefix}_spec_data_type")),
            int_field(rec, &format!("{prefix}_len_unit_exp")),
            int_field(rec, &format!("{prefix}_force_unit_exp")),
            int_field(rec, &format!("{prefix}_temp_unit_exp")),
            clip(&text_field(rec, &format!("{prefix}_axis_lab")), 20),
            clip(&text_field(rec, &format!("{prefix}_axis_units_lab")), 20),
        )?;
    }

    let even = spacing.is_some();
    match (&rec.data, even) {
        (Ordinate::Real(y), true) => {
            for chunk in y.chunks(4) {
                let line: String = chunk.iter().map(|v| fortran_e(*v, 20, 12)).collect();
                writeln!(w, "{line}")?;
            }
        }
        (Ordinate::Real(y), false) => {
            let pairs: Vec<(f64, f64)> = rec.x.iter().copied().zip(y.iter().copied()).collect();
            for chunk in pairs.chunks(2) {
                let line: String = chunk
                    .iter()
                    .map(|(x, y)| format!("{}{}", fortran_e(*x, 13, 5), fortran_e(*y, 20, 12)))
                    .collect();
                writeln!(w, "{line}")?;
            }
        }
        (Ordinate::Complex(z), true) => {
            for chunk in z.chunks(2) {
                let line: String = chunk
                    .iter()
                    .map(|c| format!("{}{}", fortran_e(c.re, 20, 12), fortran_e(c.im, 20, 12)))
                    .collect();
                writeln!(w, "{line}")?;
            }
        }
        (Ordinate::Complex(z), false) => {
            for (x, c) in rec.x.iter().zip(z) {
                writeln!(
                    w,
                    "{}{}{}",
                    fortran_e(*x, 13, 5),
                    fortran_e(c.re, 20, 12),
                    fortran_e(c.im, 20, 12)
                )?;
            }
        }
    }
    writeln!(w, "{:>6}", -1)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::parse_bytes;
    use num_complex::Complex64;

    fn written(records: &[UffRecord]) -> String {
        let mut buf = Vec::new();
        write_records(&mut buf, records).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn fortran_exponent_format() {
        assert_eq!(fortran_e(1.0, 13, 5), "  1.00000E+00");
        assert_eq!(fortran_e(-0.00125, 13, 5), " -1.25000E-03");
        assert_eq!(fortran_e(2.5e120, 20, 12), " 2.500000000000E+120");
    }

    #[test]
    fn header_lines_have_fixed_layout() {
        let rec = UffRecord::new("Pt 1 +X", 1, vec![0.0, 0.001, 0.002], Ordinate::Real(vec![1.0, 2.0, 3.0]))
            .with_field("rsp_node", 7i64)
            .with_field("rsp_dir", 1i64)
            .with_field("ordinate_axis_lab", "Acceleration");
        let text = written(&[rec]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "    -1");
        assert_eq!(lines[1], "    58");
        assert_eq!(lines[2], "Pt 1 +X");
        assert_eq!(lines[3], "NONE");
        assert_eq!(lines[7].len(), 80);
        assert_eq!(&lines[7][..5], "    1");
        assert_eq!(&lines[7][41..51], "         7");
        assert_eq!(
            lines[8],
            "         4         3         1  0.00000E+00  1.00000E-03  0.00000E+00"
        );
        assert!(lines[10].contains("Acceleration"));
        assert_eq!(*lines.last().unwrap(), "    -1");
    }

    #[test]
    fn written_records_decode_to_the_same_values() {
        let records = vec![
            UffRecord::new("even", 1, vec![0.0, 0.5, 1.0, 1.5, 2.0], Ordinate::Real(vec![0.1, -0.2, 0.3, 1e-7, 4.0])),
            UffRecord::new("uneven", 4, vec![1.0, 2.5, 10.0], Ordinate::Complex(vec![
                Complex64::new(1.0, -1.0),
                Complex64::new(0.5, 0.25),
                Complex64::new(-3.0, 2.0),
            ]))
            .with_field("ref_node", 3i64),
            UffRecord::new("tenths", 4, vec![0.1, 0.2, 0.3], Ordinate::Real(vec![1.0, 2.0, 3.0])),
        ];
        let decoded = parse_bytes(written(&records).as_bytes()).unwrap();

        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[0].x, records[0].x);
        assert_eq!(decoded[0].data, records[0].data);
        assert_eq!(decoded[0].field("abscissa_spacing"), Some(MetadataValue::Integer(1)));
        assert_eq!(decoded[1].x, records[1].x);
        assert_eq!(decoded[1].data, records[1].data);
        assert_eq!(decoded[1].field("abscissa_spacing"), Some(MetadataValue::Integer(0)));
        assert_eq!(decoded[1].field("ref_node"), Some(MetadataValue::Integer(3)));
        assert_eq!(decoded[1].field("ord_data_type"), Some(MetadataValue::Integer(6)));
        // 0.1 + 2 * 0.1 != 0.3
        assert_eq!(decoded[2].x, vec![0.1, 0.2, 0.3]);
        assert_eq!(decoded[2].field("abscissa_spacing"), Some(MetadataValue::Integer(0)));
    }

    #[test]
    fn spacing_not_representable_in_record_7_is_written_uneven() {
        assert!(even_spacing(&[0.0, 1.0 / 3.0, 2.0 / 3.0]).is_none());
        assert_eq!(even_spacing(&[1.0, 2.0, 3.0]), Some((1.0, 1.0)));
        assert!(even_spacing(&[0.0, 1.0, 3.0]).is_none());
        assert!(even_spacing(&[0.1, 0.2, 0.3]).is_none());
        assert_eq!(even_spacing(&[0.0, 0.25, 0.5]), Some((0.0, 0.25)));
    }
}
