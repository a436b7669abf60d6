//! Deterministic Top-N ranking over value summaries.
//!
//! Ordering is count descending with ties resolved only by the configured
//! tie-break rule, never by incidental input order.

use crate::aggregate::ValueSummary;
use crate::config::TieBreak;
use crate::core::RankedEntry;

/// Rank the summary's values and keep the top `n`.
///
/// Returns everything, ranked, when `n` exceeds the distinct-value count;
/// an empty summary (or `n = 0`) yields an empty sequence. Ranks are the
/// 1-based positions in the resulting order.
pub fn top_n(summary: &ValueSummary, n: usize, tie_break: TieBreak) -> Vec<RankedEntry> {
    let mut entries: Vec<(&str, usize)> = summary.iter().collect();
    match tie_break {
        TieBreak::Lexicographic => {
            entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        }
        TieBreak::FirstSeen => {
            // Stable sort: equal counts keep the summary's first-seen order
            entries.sort_by(|a, b| b.1.cmp(&a.1));
        }
    }

    entries
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, (value, count))| RankedEntry {
            value: value.to_string(),
            count,
            rank: (i + 1) as u32,
        })
        .collect()
}
