use regex::Regex;

use super::model::{Domain, FuncType, UffRecord, TIME_FUNC_TYPE};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Record selection: identifier patterns + function type
// ---------------------------------------------------------------------------

/// Outcome of classifying one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Goes into the table of this domain.
    Include(Domain),
    /// `func_type` 0: excluded with a warning.
    Unclassified,
    /// `func_type` 11: excluded with a warning.
    ProbabilityDensity,
    /// Anything else: dropped without a warning.
    Excluded,
}

/// Compiled selection criteria for both domains.
///
/// Patterns match from the start of `id1` but need not consume all of it,
/// so `"acc"` selects `"acc 1"` and `"acc 2"` but not `"x acc"`.
#[derive(Debug, Clone)]
pub struct Selector {
    time: Option<Regex>,
    freq: Option<Regex>,
}

fn compile(domain: Domain, pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})")).map_err(|source| Error::Pattern {
        domain,
        pattern: pattern.to_string(),
        source,
    })
}

impl Selector {
    /// A selector for the given patterns. `None` disables a domain; at
    /// least one domain must stay enabled.
    pub fn new(time_pattern: Option<&str>, freq_pattern: Option<&str>) -> Result<Self> {
        if time_pattern.is_none() && freq_pattern.is_none() {
            return Err(Error::NoPatterns);
        }
        Ok(Selector {
            time: time_pattern.map(|p| compile(Domain::Time, p)).transpose()?,
            freq: freq_pattern.map(|p| compile(Domain::Frequency, p)).transpose()?,
        })
    }

    pub fn returns(&self, domain: Domain) -> bool {
        match domain {
            Domain::Time => self.time.is_some(),
            Domain::Frequency => self.freq.is_some(),
        }
    }

    /// Decide where `record` goes. Frequency selection is checked first.
    pub fn classify(&self, record: &UffRecord) -> Classification {
        let kind = record.kind();
        let matches = |re: &Option<Regex>| re.as_ref().is_some_and(|re| re.is_match(&record.id1));

        if kind.is_frequency_domain() && matches(&self.freq) {
            Classification::Include(Domain::Frequency)
        } else if record.func_type == TIME_FUNC_TYPE && matches(&self.time) {
            Classification::Include(Domain::Time)
        } else if kind == FuncType::GeneralOrUnknown {
            Classification::Unclassified
        } else if kind == FuncType::ProbabilityDensityFunction {
            Classification::ProbabilityDensity
        } else {
            Classification::Excluded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Ordinate;

    fn rec(id1: &str, func_type: i64) -> UffRecord {
        UffRecord::new(id1, func_type, vec![0.0], Ordinate::Real(vec![1.0]))
    }

    #[test]
    fn both_patterns_absent_is_an_error() {
        assert!(matches!(Selector::new(None, None), Err(Error::NoPatterns)));
    }

    #[test]
    fn invalid_pattern_names_the_domain() {
        match Selector::new(Some(".*"), Some("(unclosed")) {
            Err(Error::Pattern { domain, pattern, .. }) => {
                assert_eq!(domain, Domain::Frequency);
                assert_eq!(pattern, "(unclosed");
            }
            other => panic!("expected a pattern error, got {other:?}"),
        }
    }

    #[test]
    fn patterns_are_anchored_at_the_start_only() {
        let sel = Selector::new(Some("acc"), None).unwrap();
        assert_eq!(sel.classify(&rec("acc 1", 1)), Classification::Include(Domain::Time));
        assert_eq!(sel.classify(&rec("accelerometer", 1)), Classification::Include(Domain::Time));
        assert_eq!(sel.classify(&rec("x acc", 1)), Classification::Excluded);
    }

    #[test]
    fn alternation_stays_anchored() {
        let sel = Selector::new(None, Some("a|b")).unwrap();
        assert_eq!(sel.classify(&rec("b2", 4)), Classification::Include(Domain::Frequency));
        assert_eq!(sel.classify(&rec("cb", 4)), Classification::Excluded);
    }

    #[test]
    fn func_type_routes_records() {
        let sel = Selector::new(Some(".*"), Some(".*")).unwrap();
        assert_eq!(sel.classify(&rec("t", 1)), Classification::Include(Domain::Time));
        for code in [2, 3, 4, 5, 6, 7, 8, 9, 10, 12] {
            assert_eq!(sel.classify(&rec("f", code)), Classification::Include(Domain::Frequency));
        }
        assert_eq!(sel.classify(&rec("g", 0)), Classification::Unclassified);
        assert_eq!(sel.classify(&rec("p", 11)), Classification::ProbabilityDensity);
        assert_eq!(sel.classify(&rec("o", 13)), Classification::Excluded);
    }

    #[test]
    fn disabled_domain_excludes_its_records() {
        let sel = Selector::new(Some(".*"), None).unwrap();
        assert!(sel.returns(Domain::Time));
        assert!(!sel.returns(Domain::Frequency));
        assert_eq!(sel.classify(&rec("f", 4)), Classification::Excluded);
    }
}
