//! Sample based filtering, shared by feature tables and MEMO matrices.

use crate::errors::{
    MemoError,
    Result,
};
use crate::models::{
    ColumnKey,
    LabeledTable,
};
use regex::RegexBuilder;
use std::str::FromStr;
use tracing::{
    debug,
    info,
};

/// Which table of an analysis an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    FeatureTable,
    MemoMatrix,
}

impl FromStr for TableKind {
    type Err = MemoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "feature_table" | "feature_matrix" => Ok(TableKind::FeatureTable),
            "memo_matrix" => Ok(TableKind::MemoMatrix),
            other => Err(MemoError::configuration(format!(
                "unknown table '{}', expected one of [feature_table, memo_matrix]",
                other
            ))),
        }
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableKind::FeatureTable => write!(f, "feature_table"),
            TableKind::MemoMatrix => write!(f, "memo_matrix"),
        }
    }
}

/// Removes the samples whose name matches `samples_pattern` and the columns
/// that are over-represented in them.
///
/// 1. `matched` are the rows matching `samples_pattern`, a case-insensitive
///    regular expression searched anywhere in the sample name.
/// 2. With `max_occurrence = Some(m)`, every column that is non-zero in
///    more than `m` matched rows is dropped.
/// 3. The matched rows are dropped.
/// 4. Columns left all-zero are dropped.
///
/// Applying the same filter twice is a no-op the second time. When no row
/// matches, only step 4 has an effect.
pub fn filter_table<C: ColumnKey>(
    table: &LabeledTable<C>,
    samples_pattern: &str,
    max_occurrence: Option<usize>,
) -> Result<LabeledTable<C>> {
    let pattern = RegexBuilder::new(samples_pattern)
        .case_insensitive(true)
        .build()?;

    let (matched, kept_rows): (Vec<usize>, Vec<usize>) =
        (0..table.nrows()).partition(|&i| pattern.is_match(&table.row_labels()[i]));
    debug!(
        "{} of {} samples match '{}'",
        matched.len(),
        table.nrows(),
        samples_pattern
    );

    let candidate_cols: Vec<usize> = match max_occurrence {
        Some(max_occurrence) => {
            let counts = table.nonzero_counts(&matched);
            (0..table.ncols())
                .filter(|&j| counts[j] <= max_occurrence)
                .collect()
        }
        None => (0..table.ncols()).collect(),
    };

    let remaining_counts = table.nonzero_counts(&kept_rows);
    let kept_cols: Vec<usize> = candidate_cols
        .into_iter()
        .filter(|&j| remaining_counts[j] > 0)
        .collect();

    info!(
        "Filtered '{}' (max occurrence {:?}): {}x{} -> {}x{}",
        samples_pattern,
        max_occurrence,
        table.nrows(),
        table.ncols(),
        kept_rows.len(),
        kept_cols.len()
    );
    Ok(table.select(&kept_rows, &kept_cols))
}
