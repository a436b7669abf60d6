//! Metrics facade: named, parameterized queries over an immutable snapshot.
//!
//! Every query is a pure function of (snapshot, filter): no hidden state,
//! identical output on re-evaluation, and safe to run concurrently since the
//! snapshot is shared read-only and each query builds its own transient
//! relations.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::aggregate::{self, ValueSummary};
use crate::config::EngineConfig;
use crate::core::{BaseRecord, Dimension, GroupFilter, GroupKey, RankedEntry, Snapshot};
use crate::errors::Result;
use crate::normalize::{
    SourceColumn, ValueRelation, ValueRow, BARRIER_COLUMNS, USE_CASE_COLUMNS,
};
use crate::rank;

/// Headline KPIs for the overview page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewKpis {
    pub total_respondents: usize,
    pub fintech_users: usize,
    /// `None` when the filter matches no respondents
    pub adoption_rate_percent: Option<f64>,
    pub country_count: usize,
}

/// Adoption figures for one survey year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearAdoption {
    pub year: i32,
    pub total: usize,
    pub fintech_users: usize,
    pub adoption_rate_percent: f64,
}

/// The KPI bundle one dashboard page render needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub overview: OverviewKpis,
    pub top_use_cases: Vec<RankedEntry>,
    pub top_barriers: Vec<RankedEntry>,
    pub multi_use_user_percent: Option<f64>,
}

/// The public query surface consumed by the reporting layer.
///
/// Construction validates the configuration up front; after that every query
/// is infallible and `&self`, so one engine serves concurrent page renders.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    snapshot: Snapshot,
    config: EngineConfig,
}

impl MetricsEngine {
    /// Build an engine over a validated snapshot.
    ///
    /// Fails with `InvalidConfiguration` before any query can run.
    pub fn new(snapshot: Snapshot, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { snapshot, config })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn filtered<'a>(&'a self, filter: &'a GroupFilter) -> impl Iterator<Item = &'a BaseRecord> {
        self.snapshot.iter().filter(move |r| filter.matches(r))
    }

    fn relation(&self, filter: &GroupFilter, columns: &[SourceColumn]) -> ValueRelation {
        // Snapshot construction already rejected blank UserIDs
        ValueRelation::unpivot(self.filtered(filter), columns, &self.config).unwrap_or_default()
    }

    /// Shared pipeline behind every ranked query: normalize, summarize, rank.
    fn ranked(&self, filter: &GroupFilter, columns: &[SourceColumn], n: Option<usize>) -> Vec<RankedEntry> {
        let relation = self.relation(filter, columns);
        let summary = aggregate::summarize(&relation);
        rank::top_n(
            &summary,
            n.unwrap_or(self.config.top_n_default),
            self.config.tie_break,
        )
    }

    /// The tall (UserID, UseCase) relation for the filtered records
    pub fn unified_use_cases(&self, filter: &GroupFilter) -> ValueRelation {
        self.relation(filter, USE_CASE_COLUMNS)
    }

    /// Count of distinct use-case labels among the filtered records
    pub fn distinct_use_case_count(&self, filter: &GroupFilter) -> usize {
        aggregate::distinct_values(&self.unified_use_cases(filter))
    }

    /// Share (in percent) of use-case-holding users with more distinct use
    /// cases than the configured threshold; `None` when no user has any
    pub fn multi_use_user_percent(&self, filter: &GroupFilter) -> Option<f64> {
        let relation = self.unified_use_cases(filter);
        aggregate::multi_use_ratio(&relation, self.config.multi_use_threshold)
            .map(|ratio| ratio * 100.0)
    }

    /// Top use cases by distinct-user count; `None` for `n` means the
    /// configured default
    pub fn top_use_cases(&self, filter: &GroupFilter, n: Option<usize>) -> Vec<RankedEntry> {
        self.ranked(filter, USE_CASE_COLUMNS, n)
    }

    /// Top barriers by distinct-user count, through the same pipeline as the
    /// use-case path
    pub fn top_barriers(&self, filter: &GroupFilter, n: Option<usize>) -> Vec<RankedEntry> {
        self.ranked(filter, BARRIER_COLUMNS, n)
    }

    /// Headline KPIs: respondent and fintech-user counts, adoption rate,
    /// distinct countries
    pub fn overview(&self, filter: &GroupFilter) -> OverviewKpis {
        let mut total = 0usize;
        let mut fintech_users = 0usize;
        let mut countries: HashSet<&str> = HashSet::new();
        for record in self.filtered(filter) {
            total += 1;
            if record.is_fintech_user() {
                fintech_users += 1;
            }
            if let Some(country) = record.country.as_deref().map(str::trim) {
                if !country.is_empty() {
                    countries.insert(country);
                }
            }
        }
        let adoption_rate_percent = if total == 0 {
            None
        } else {
            Some(fintech_users as f64 / total as f64 * 100.0)
        };
        OverviewKpis {
            total_respondents: total,
            fintech_users,
            adoption_rate_percent,
            country_count: countries.len(),
        }
    }

    /// Respondent totals and adoption rate per survey year, ascending.
    ///
    /// Records without a year are excluded.
    pub fn adoption_by_year(&self, filter: &GroupFilter) -> Vec<YearAdoption> {
        let mut by_year: BTreeMap<i32, (usize, usize)> = BTreeMap::new();
        for record in self.filtered(filter) {
            let Some(year) = record.year else { continue };
            let (total, fintech) = by_year.entry(year).or_default();
            *total += 1;
            if record.is_fintech_user() {
                *fintech += 1;
            }
        }
        by_year
            .into_iter()
            .map(|(year, (total, fintech_users))| YearAdoption {
                year,
                total,
                fintech_users,
                adoption_rate_percent: fintech_users as f64 / total as f64 * 100.0,
            })
            .collect()
    }

    /// Respondent counts per value of a demographic dimension, ranked with
    /// the configured tie-break. Missing values fold into the sentinel label.
    pub fn dimension_breakdown(&self, filter: &GroupFilter, dimension: Dimension) -> Vec<RankedEntry> {
        let rows: Vec<ValueRow> = self
            .filtered(filter)
            .map(|record| ValueRow {
                user_id: record.user_id.clone(),
                value: dimension.extract(record, &self.config.null_substitute),
            })
            .collect();
        let relation = ValueRelation::from_rows(rows);
        let summary = aggregate::summarize(&relation);
        rank::top_n(&summary, summary.len(), self.config.tie_break)
    }

    /// Per-group use-case summaries over caller-chosen dimensions
    pub fn grouped_use_case_counts(
        &self,
        filter: &GroupFilter,
        dims: &[Dimension],
    ) -> HashMap<GroupKey, ValueSummary> {
        let relation = self.unified_use_cases(filter);
        let index: HashMap<&str, &BaseRecord> = self
            .filtered(filter)
            .map(|record| (record.user_id.as_str(), record))
            .collect();
        let sentinel = &self.config.null_substitute;
        aggregate::grouped_summarize(&relation, |user_id| match index.get(user_id) {
            Some(record) => GroupKey::extract(record, dims, sentinel),
            None => GroupKey::new(vec![sentinel.clone(); dims.len()]),
        })
    }

    /// Mean transaction value over filtered records carrying one; `None`
    /// when none do
    pub fn average_transaction_value(&self, filter: &GroupFilter) -> Option<f64> {
        let (sum, count) = self
            .filtered(filter)
            .filter_map(|r| r.avg_transaction_value)
            .fold((0.0f64, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Evaluate the KPI bundle of one page render, running the independent
    /// queries in parallel over the shared snapshot
    pub fn page_summary(&self, filter: &GroupFilter) -> PageSummary {
        let ((overview, multi_use_user_percent), (top_use_cases, top_barriers)) = rayon::join(
            || {
                rayon::join(
                    || self.overview(filter),
                    || self.multi_use_user_percent(filter),
                )
            },
            || {
                rayon::join(
                    || self.top_use_cases(filter, None),
                    || self.top_barriers(filter, None),
                )
            },
        );
        PageSummary {
            overview,
            top_use_cases,
            top_barriers,
            multi_use_user_percent,
        }
    }
}
