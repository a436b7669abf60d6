//! Core data model: base records, the immutable snapshot, grouping keys and
//! filters shared by the aggregation and ranking layers.

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;

use crate::errors::{Error, Result};

/// One row per surveyed user, as supplied by the upstream ingestion
/// collaborator. Demographic and transaction attributes are read-only inputs
/// to grouping and filtering; the engine never transforms them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseRecord {
    pub user_id: String,
    pub use_case_1: Option<String>,
    pub use_case_2: Option<String>,
    pub barrier: Option<String>,
    pub gender: Option<String>,
    pub age_group: Option<String>,
    pub country: Option<String>,
    pub urban_rural: Option<String>,
    pub phone_type: Option<String>,
    pub fintech_used: Option<String>,
    pub year: Option<i32>,
    pub monthly_transactions: Option<u32>,
    pub avg_transaction_value: Option<f64>,
}

impl BaseRecord {
    /// A bare record with only the identifier set
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            use_case_1: None,
            use_case_2: None,
            barrier: None,
            gender: None,
            age_group: None,
            country: None,
            urban_rural: None,
            phone_type: None,
            fintech_used: None,
            year: None,
            monthly_transactions: None,
            avg_transaction_value: None,
        }
    }

    /// Whether this respondent is an active fintech user ("yes",
    /// case-insensitive)
    pub fn is_fintech_user(&self) -> bool {
        self.fintech_used
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("yes"))
    }
}

/// An immutable, validated collection of base records.
///
/// Cheap to clone (`Arc`-backed) and safe to share across concurrently
/// evaluated queries without locking. Construction is the single validation
/// point: every record must carry a non-blank `user_id`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    records: Arc<[BaseRecord]>,
}

impl Snapshot {
    /// Validate and wrap a set of base records.
    ///
    /// Fails fast with `MalformedRecord` identifying the first offending row.
    pub fn new(records: Vec<BaseRecord>) -> Result<Self> {
        for (row, record) in records.iter().enumerate() {
            if record.user_id.trim().is_empty() {
                return Err(Error::malformed_record(row, "blank UserID"));
            }
        }
        log::debug!("snapshot built with {} records", records.len());
        Ok(Self {
            records: records.into(),
        })
    }

    pub fn records(&self) -> &[BaseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Deref for Snapshot {
    type Target = [BaseRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

/// A grouping dimension extractable from a base record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dimension {
    Year,
    Country,
    AgeGroup,
    Gender,
    UrbanRural,
    PhoneType,
}

impl Dimension {
    /// Extract this dimension's label from a record, substituting the
    /// sentinel when the attribute is missing
    pub fn extract(&self, record: &BaseRecord, sentinel: &str) -> String {
        let raw = match self {
            Dimension::Year => {
                return record
                    .year
                    .map(|year| year.to_string())
                    .unwrap_or_else(|| sentinel.to_string())
            }
            Dimension::Country => &record.country,
            Dimension::AgeGroup => &record.age_group,
            Dimension::Gender => &record.gender,
            Dimension::UrbanRural => &record.urban_rural,
            Dimension::PhoneType => &record.phone_type,
        };
        match raw.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => sentinel.to_string(),
        }
    }
}

/// An opaque tuple of dimension labels partitioning an aggregation.
///
/// Equality and hashing are positional; the engine never interprets the
/// parts, so the same grouping logic serves any combination of dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey(Vec<String>);

impl GroupKey {
    pub fn new(parts: Vec<String>) -> Self {
        Self(parts)
    }

    /// Build the key for a record over the given dimensions
    pub fn extract(record: &BaseRecord, dims: &[Dimension], sentinel: &str) -> Self {
        Self(dims.iter().map(|d| d.extract(record, sentinel)).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

/// Optional equality constraints restricting which records a query sees.
///
/// `Default` matches everything; constraints on string attributes compare
/// trimmed and the record side must be present to match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupFilter {
    pub year: Option<i32>,
    pub country: Option<String>,
    pub age_group: Option<String>,
    pub gender: Option<String>,
}

impl GroupFilter {
    pub fn matches(&self, record: &BaseRecord) -> bool {
        matches_opt_year(self.year, record.year)
            && matches_opt_str(self.country.as_deref(), record.country.as_deref())
            && matches_opt_str(self.age_group.as_deref(), record.age_group.as_deref())
            && matches_opt_str(self.gender.as_deref(), record.gender.as_deref())
    }
}

fn matches_opt_year(wanted: Option<i32>, actual: Option<i32>) -> bool {
    match wanted {
        None => true,
        Some(y) => actual == Some(y),
    }
}

fn matches_opt_str(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted {
        None => true,
        Some(w) => actual.map(str::trim) == Some(w.trim()),
    }
}

/// A value's position in a deterministic ranking: label, distinct-user count
/// and 1-based rank within its partition. Computed fresh per query, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub value: String,
    pub count: usize,
    pub rank: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(user_id: &str) -> BaseRecord {
        BaseRecord::new(user_id)
    }

    #[test]
    fn snapshot_rejects_blank_user_id() {
        let records = vec![record("U1"), record("   ")];
        let err = Snapshot::new(records).unwrap_err();
        assert_eq!(err.to_string(), "malformed record at row 1: blank UserID");
    }

    #[test]
    fn snapshot_accepts_empty_input() {
        let snapshot = Snapshot::new(vec![]).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn fintech_user_flag_is_case_insensitive() {
        let mut r = record("U1");
        r.fintech_used = Some("Yes".to_string());
        assert!(r.is_fintech_user());
        r.fintech_used = Some("no".to_string());
        assert!(!r.is_fintech_user());
        r.fintech_used = None;
        assert!(!r.is_fintech_user());
    }

    #[test]
    fn dimension_extract_substitutes_sentinel() {
        let mut r = record("U1");
        r.country = Some("Kenya".to_string());
        assert_eq!(Dimension::Country.extract(&r, "Unknown"), "Kenya");
        assert_eq!(Dimension::Gender.extract(&r, "Unknown"), "Unknown");
        assert_eq!(Dimension::Year.extract(&r, "Unknown"), "Unknown");
        r.year = Some(2023);
        assert_eq!(Dimension::Year.extract(&r, "Unknown"), "2023");
    }

    #[test]
    fn group_key_is_positional() {
        let a = GroupKey::new(vec!["2023".into(), "Kenya".into()]);
        let b = GroupKey::new(vec!["Kenya".into(), "2023".into()]);
        assert_ne!(a, b);
    }

    #[test]
    fn default_filter_matches_everything() {
        let r = record("U1");
        assert!(GroupFilter::default().matches(&r));
    }

    #[test]
    fn filter_requires_present_attribute() {
        let mut r = record("U1");
        let filter = GroupFilter {
            country: Some("Kenya".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
        r.country = Some("Kenya".to_string());
        assert!(filter.matches(&r));
        r.country = Some("Nigeria".to_string());
        assert!(!filter.matches(&r));
    }

    #[test]
    fn filter_combines_constraints() {
        let mut r = record("U1");
        r.year = Some(2024);
        r.gender = Some("Female".to_string());
        let filter = GroupFilter {
            year: Some(2024),
            gender: Some("Female".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&r));
        let filter = GroupFilter {
            year: Some(2023),
            gender: Some("Female".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
    }
}
