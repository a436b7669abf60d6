//! Unpivot normalizer: turns wide per-user multi-valued categorical columns
//! into a tall (UserID, Value) relation.
//!
//! Blank handling follows the two-stage rule: the blank filter drops (or
//! substitutes, per policy) true blanks — missing source cells — before
//! sentinel substitution is applied to surviving values that still resolve
//! to blank, such as whitespace-only strings.
//!
//! The normalizer makes no deduplication guarantee: a user whose source
//! columns repeat a value produces repeated rows, and the aggregation layer
//! deduplicates by distinct user.

use serde::{Deserialize, Serialize};

use crate::config::{BlankPolicy, EngineConfig};
use crate::core::BaseRecord;
use crate::errors::{Error, Result};

/// A source column designated as multi-valued categorical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceColumn {
    UseCase1,
    UseCase2,
    Barrier,
}

impl SourceColumn {
    fn extract<'r>(&self, record: &'r BaseRecord) -> Option<&'r str> {
        match self {
            SourceColumn::UseCase1 => record.use_case_1.as_deref(),
            SourceColumn::UseCase2 => record.use_case_2.as_deref(),
            SourceColumn::Barrier => record.barrier.as_deref(),
        }
    }
}

/// The use-case source columns, in unpivot order
pub const USE_CASE_COLUMNS: &[SourceColumn] = &[SourceColumn::UseCase1, SourceColumn::UseCase2];

/// The barrier source column
pub const BARRIER_COLUMNS: &[SourceColumn] = &[SourceColumn::Barrier];

/// One (UserID, Value) pair of the tall relation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRow {
    pub user_id: String,
    pub value: String,
}

/// The tall relation produced by unpivoting. Rows preserve encounter order
/// (record order, then column order within a record), which the first-seen
/// tie-break depends on. Materialized fresh per query and discarded after.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueRelation {
    rows: Vec<ValueRow>,
}

impl ValueRelation {
    /// Unpivot the designated columns of the given records into a tall
    /// relation.
    ///
    /// Fails with `MalformedRecord` on a blank `user_id`; records reaching
    /// this point through a validated `Snapshot` cannot trigger that.
    pub fn unpivot<'a, I>(records: I, columns: &[SourceColumn], config: &EngineConfig) -> Result<Self>
    where
        I: IntoIterator<Item = &'a BaseRecord>,
    {
        let mut rows = Vec::new();
        for (row_index, record) in records.into_iter().enumerate() {
            if record.user_id.trim().is_empty() {
                return Err(Error::malformed_record(row_index, "blank UserID"));
            }
            for column in columns {
                if let Some(value) = normalize_value(column.extract(record), config) {
                    rows.push(ValueRow {
                        user_id: record.user_id.clone(),
                        value,
                    });
                }
            }
        }
        Ok(Self { rows })
    }

    /// Build a relation directly from already-normalized rows.
    ///
    /// Used by facade queries that derive (UserID, label) pairs from
    /// attributes other than the designated multi-valued columns but still
    /// want the shared summarize/rank pipeline.
    pub fn from_rows(rows: Vec<ValueRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ValueRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValueRow> {
        self.rows.iter()
    }
}

/// Resolve one raw cell to its relation value, if any.
///
/// `None` raw is a true blank and is governed by the blank policy; a
/// surviving value that trims to empty takes the sentinel.
fn normalize_value(raw: Option<&str>, config: &EngineConfig) -> Option<String> {
    match raw {
        None => match config.blank_policy {
            BlankPolicy::Drop => None,
            BlankPolicy::Substitute => Some(config.null_substitute.clone()),
        },
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(config.null_substitute.clone())
            } else {
                Some(trimmed.to_string())
            }
        }
    }
}
