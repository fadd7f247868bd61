use std::collections::BTreeMap;
use std::fmt;

use num_complex::Complex64;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Domain knowledge for UFF dataset 58
// ---------------------------------------------------------------------------

/// Dataset type whose function-type codes the selector understands.
pub const EXPECTED_FORMAT_TYPE: i64 = 58;

/// `func_type` codes of dataset 58 that hold frequency-domain data.
///
/// Source: I-DEAS universal file format, dataset 58 "Function at Nodal DOF",
/// record 6 field 1 (function type). Correlations are kept in this set
/// alongside the spectra.
pub const FREQUENCY_FUNC_TYPES: [i64; 10] = [2, 3, 4, 5, 6, 7, 8, 9, 10, 12];

/// `func_type` code of a time response.
pub const TIME_FUNC_TYPE: i64 = 1;

/// Function type of a dataset 58 record (record 6, field 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncType {
    GeneralOrUnknown,
    TimeResponse,
    AutoSpectrum,
    CrossSpectrum,
    FrequencyResponseFunction,
    Transmissibility,
    Coherence,
    AutoCorrelation,
    CrossCorrelation,
    PowerSpectralDensity,
    EnergySpectralDensity,
    ProbabilityDensityFunction,
    Spectrum,
    Other(i64),
}

impl FuncType {
    pub fn from_code(code: i64) -> Self {
        use FuncType::*;
        match code {
            0 => GeneralOrUnknown,
            1 => TimeResponse,
            2 => AutoSpectrum,
            3 => CrossSpectrum,
            4 => FrequencyResponseFunction,
            5 => Transmissibility,
            6 => Coherence,
            7 => AutoCorrelation,
            8 => CrossCorrelation,
            9 => PowerSpectralDensity,
            10 => EnergySpectralDensity,
            11 => ProbabilityDensityFunction,
            12 => Spectrum,
            other => Other(other),
        }
    }

    pub fn code(self) -> i64 {
        use FuncType::*;
        match self {
            GeneralOrUnknown => 0,
            TimeResponse => 1,
            AutoSpectrum => 2,
            CrossSpectrum => 3,
            FrequencyResponseFunction => 4,
            Transmissibility => 5,
            Coherence => 6,
            AutoCorrelation => 7,
            CrossCorrelation => 8,
            PowerSpectralDensity => 9,
            EnergySpectralDensity => 10,
            ProbabilityDensityFunction => 11,
            Spectrum => 12,
            Other(code) => code,
        }
    }

    /// Human-readable name as used in UFF documentation.
    pub fn name(self) -> &'static str {
        use FuncType::*;
        match self {
            GeneralOrUnknown => "General or Unknown",
            TimeResponse => "Time Response",
            AutoSpectrum => "Auto Spectrum",
            CrossSpectrum => "Cross Spectrum",
            FrequencyResponseFunction => "Frequency Response Function",
            Transmissibility => "Transmissibility",
            Coherence => "Coherence",
            AutoCorrelation => "Auto Correlation",
            CrossCorrelation => "Cross Correlation",
            PowerSpectralDensity => "Power Spectral Density",
            EnergySpectralDensity => "Energy Spectral Density",
            ProbabilityDensityFunction => "Probability Density Function",
            Spectrum => "Spectrum",
            Other(_) => "Other",
        }
    }

    pub fn is_frequency_domain(self) -> bool {
        FREQUENCY_FUNC_TYPES.contains(&self.code())
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// Which output table a record ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Time,
    Frequency,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Time => write!(f, "time"),
            Domain::Frequency => write!(f, "frequency"),
        }
    }
}

// ---------------------------------------------------------------------------
// MetadataValue – a single header field
// ---------------------------------------------------------------------------

/// A dynamically-typed header value. UFF headers only carry text,
/// integer codes and reals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl MetadataValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Float(v) => Some(*v),
            MetadataValue::Integer(i) => Some(*i as f64),
            MetadataValue::String(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        MetadataValue::Integer(i)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

// ---------------------------------------------------------------------------
// Ordinate – the dependent values of a record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Ordinate {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl Ordinate {
    pub fn len(&self) -> usize {
        match self {
            Ordinate::Real(v) => v.len(),
            Ordinate::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Ordinate::Complex(_))
    }
}

// ---------------------------------------------------------------------------
// UffRecord – one decoded measurement function
// ---------------------------------------------------------------------------

/// A single decoded dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct UffRecord {
    /// Dataset type number (58 for functions at nodal DOF).
    pub format_type: i64,
    /// Function type code, see [`FuncType`].
    pub func_type: i64,
    /// Record 1 identifier, matched against the selection patterns.
    pub id1: String,
    /// Abscissa values.
    pub x: Vec<f64>,
    /// Ordinate values – same length as `x`.
    pub data: Ordinate,
    /// Every other header field: field_name → value.
    pub fields: BTreeMap<String, MetadataValue>,
}

impl UffRecord {
    /// A type-58 record with no extra header fields.
    pub fn new(id1: impl Into<String>, func_type: i64, x: Vec<f64>, data: Ordinate) -> Self {
        UffRecord {
            format_type: EXPECTED_FORMAT_TYPE,
            func_type,
            id1: id1.into(),
            x,
            data,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Look up a header field by its UFF name.
    pub fn field(&self, key: &str) -> Option<MetadataValue> {
        match key {
            "id1" => Some(MetadataValue::String(self.id1.clone())),
            "type" => Some(MetadataValue::Integer(self.format_type)),
            "func_type" => Some(MetadataValue::Integer(self.func_type)),
            other => self.fields.get(other).cloned(),
        }
    }

    pub fn kind(&self) -> FuncType {
        FuncType::from_code(self.func_type)
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn func_type_codes_map_both_ways() {
        for code in 0..=12 {
            assert_eq!(FuncType::from_code(code).code(), code);
        }
        assert_eq!(FuncType::from_code(27), FuncType::Other(27));
        assert_eq!(FuncType::from_code(11).name(), "Probability Density Function");
    }

    #[test]
    fn frequency_set_excludes_time_general_and_pdf() {
        assert!(!FuncType::GeneralOrUnknown.is_frequency_domain());
        assert!(!FuncType::TimeResponse.is_frequency_domain());
        assert!(!FuncType::ProbabilityDensityFunction.is_frequency_domain());
        assert!(FuncType::FrequencyResponseFunction.is_frequency_domain());
        assert!(FuncType::Spectrum.is_frequency_domain());
        assert!(!FuncType::Other(13).is_frequency_domain());
    }

    #[test]
    fn field_lookup_covers_typed_and_extra_fields() {
        let rec = UffRecord::new("acc 1", 4, vec![0.0], Ordinate::Real(vec![1.0]))
            .with_field("rsp_node", 12i64)
            .with_field("id2", "run 3");

        assert_eq!(rec.field("id1"), Some(MetadataValue::from("acc 1")));
        assert_eq!(rec.field("type"), Some(MetadataValue::Integer(58)));
        assert_eq!(rec.field("func_type"), Some(MetadataValue::Integer(4)));
        assert_eq!(rec.field("rsp_node"), Some(MetadataValue::Integer(12)));
        assert_eq!(rec.field("id2").unwrap().as_str(), Some("run 3"));
        assert!(rec.field("ref_node").is_none());
    }

    #[test]
    fn metadata_serializes_untagged() {
        let vals = vec![
            MetadataValue::from("a"),
            MetadataValue::Integer(3),
            MetadataValue::Float(0.5),
        ];
        assert_eq!(serde_json::to_string(&vals).unwrap(), r#"["a",3,0.5]"#);
        assert_eq!(serde_json::to_string(&Domain::Frequency).unwrap(), r#""frequency""#);
    }
}
