//! finmetrics — derived-metrics computation engine for fintech-usage survey
//! data.
//!
//! The crate takes an immutable snapshot of per-user survey records and
//! answers the questions a reporting frontend asks per page render: distinct
//! use-case counts, multi-use ratios, deterministic Top-N rankings of use
//! cases and barriers, adoption KPIs and demographic breakdowns.
//!
//! Data flows strictly upward: base records → unpivot normalizer →
//! aggregation/ranking → metrics facade. No stage reads back from a
//! downstream one, no query caches anything across evaluations.

// Export modules for library usage
pub mod aggregate;
pub mod config;
pub mod core;
pub mod engine;
pub mod normalize;
pub mod rank;

mod errors;

// Re-export commonly used types
pub use crate::aggregate::{
    distinct_users, distinct_values, grouped_summarize, multi_use_ratio, summarize, ValueSummary,
};
pub use crate::config::{BlankPolicy, EngineConfig, TieBreak};
pub use crate::core::{
    BaseRecord, Dimension, GroupFilter, GroupKey, RankedEntry, Snapshot,
};
pub use crate::engine::{MetricsEngine, OverviewKpis, PageSummary, YearAdoption};
pub use crate::errors::{Error, Result};
pub use crate::normalize::{
    SourceColumn, ValueRelation, ValueRow, BARRIER_COLUMNS, USE_CASE_COLUMNS,
};
pub use crate::rank::top_n;
