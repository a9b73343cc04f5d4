//! The MEMO matrix: per sample counts of fragment and loss tokens.
//!
//! A sample's row is the multiset union of the documents of every feature
//! detected in it. Tokens shared by several features of the same sample
//! add up, they are never deduplicated.

use crate::analysis::AnyTable;
use crate::errors::{
    EntityKind,
    MemoError,
    Result,
};
use crate::feature_table::FeatureTable;
use crate::filtering::filter_table;
use crate::io::{
    export_path,
    read_path,
};
use crate::models::{
    ColumnJoin,
    LabeledTable,
    Spectrum,
};
use crate::spectra_documents::SpectraDocuments;
use crate::tokenizer::tokenize;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{
    debug,
    info,
    instrument,
};

/// Samples x tokens occurrence matrix. Values are integral counts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoMatrix {
    table: LabeledTable<String>,
}

impl MemoMatrix {
    pub fn new(table: LabeledTable<String>) -> Self {
        Self { table }
    }

    /// Shorthand for a [`MemoMatrixBuilder`] with both inputs set.
    pub fn from_aligned_samples(
        feature_table: &FeatureTable,
        spectra_documents: &SpectraDocuments,
    ) -> Result<Self> {
        MemoMatrixBuilder::new()
            .feature_table(feature_table)
            .spectra_documents(spectra_documents)
            .build()
    }

    /// Builds a matrix from samples that were never aligned into a feature
    /// table: every spectrum of a sample counts towards that sample's row.
    ///
    /// Columns appear in the order tokens are first seen, scanning samples
    /// in the given order.
    #[instrument(skip_all, fields(num_samples = samples.len()))]
    pub fn from_unaligned_samples(
        samples: &[(String, Vec<Spectrum>)],
        n_decimals: usize,
    ) -> Result<Self> {
        let st = Instant::now();
        let per_sample: Vec<Vec<(String, u32)>> = samples
            .par_iter()
            .map(|(_, spectra)| {
                let words = spectra
                    .iter()
                    .flat_map(|s| tokenize(s, n_decimals).words().to_vec());
                ordered_counts(words)
            })
            .collect();

        let mut vocab = Vocabulary::default();
        let per_sample: Vec<Vec<(usize, u32)>> = per_sample
            .into_iter()
            .map(|counts| {
                counts
                    .into_iter()
                    .map(|(token, count)| (vocab.intern(token), count))
                    .collect()
            })
            .collect();

        let ntokens = vocab.len();
        let mut values = vec![0.0; samples.len() * ntokens];
        for (i, counts) in per_sample.iter().enumerate() {
            for (idx, count) in counts {
                values[i * ntokens + idx] = *count as f64;
            }
        }
        let row_labels = samples.iter().map(|(name, _)| name.clone()).collect();
        let table = LabeledTable::new(row_labels, vocab.into_tokens(), values)?;
        info!(
            "Built unaligned MEMO matrix of {} samples x {} tokens in {:?}",
            table.nrows(),
            table.ncols(),
            st.elapsed()
        );
        Ok(Self { table })
    }

    /// Reads a matrix previously written with [`MemoMatrix::export`].
    pub fn from_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        Ok(Self::new(read_path(path, delimiter)?))
    }

    pub fn table(&self) -> &LabeledTable<String> {
        &self.table
    }

    pub fn into_inner(self) -> LabeledTable<String> {
        self.table
    }

    pub fn samples(&self) -> &[String] {
        self.table.row_labels()
    }

    pub fn tokens(&self) -> &[String] {
        self.table.col_labels()
    }

    /// Count of `token` in `sample`, `None` when either is unknown.
    pub fn count(&self, sample: &str, token: &str) -> Option<f64> {
        self.table.get(sample, &token.to_string())
    }

    /// See [`filter_table`].
    pub fn filter(&self, samples_pattern: &str, max_occurrence: Option<usize>) -> Result<Self> {
        Ok(Self::new(filter_table(
            &self.table,
            samples_pattern,
            max_occurrence,
        )?))
    }

    /// Stacks the samples of `other` below the samples of `self`.
    ///
    /// With `drop_not_in_common`, only tokens present in both matrices are
    /// kept. Otherwise all tokens are kept and missing cells are 0.
    /// Sample names are not deduplicated.
    pub fn merge(&self, other: &MemoMatrix, drop_not_in_common: bool) -> MemoMatrix {
        let join = if drop_not_in_common {
            ColumnJoin::Intersection
        } else {
            ColumnJoin::Union
        };
        let table = self.table.concat_rows(&other.table, join);
        debug!(
            "Merged {:?} and {:?} into {:?}",
            self.table.shape(),
            other.table.shape(),
            table.shape()
        );
        MemoMatrix { table }
    }

    /// [`MemoMatrix::merge`] for a tagged input, failing if it is not a MEMO matrix.
    pub fn merge_any(&self, other: &AnyTable, drop_not_in_common: bool) -> Result<MemoMatrix> {
        match other {
            AnyTable::MemoMatrix(other) => Ok(self.merge(other, drop_not_in_common)),
            other => Err(MemoError::KindMismatch {
                expected: "MemoMatrix",
                found: other.kind(),
            }),
        }
    }

    pub fn export(&self, path: impl AsRef<Path>, delimiter: u8) -> Result<()> {
        export_path(&self.table, path, delimiter)
    }
}

impl TryFrom<AnyTable> for MemoMatrix {
    type Error = MemoError;

    fn try_from(value: AnyTable) -> Result<Self> {
        match value {
            AnyTable::MemoMatrix(x) => Ok(x),
            other => Err(MemoError::KindMismatch {
                expected: "MemoMatrix",
                found: other.kind(),
            }),
        }
    }
}

/// Token to column index, in first-seen order.
#[derive(Debug, Default)]
struct Vocabulary {
    index: HashMap<String, usize>,
    tokens: Vec<String>,
}

impl Vocabulary {
    fn intern(&mut self, token: String) -> usize {
        if let Some(&idx) = self.index.get(&token) {
            return idx;
        }
        let idx = self.tokens.len();
        self.index.insert(token.clone(), idx);
        self.tokens.push(token);
        idx
    }

    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn into_tokens(self) -> Vec<String> {
        self.tokens
    }
}

/// Token counts in first-seen order.
fn ordered_counts<S: AsRef<str>>(tokens: impl IntoIterator<Item = S>) -> Vec<(String, u32)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<(String, u32)> = Vec::new();
    for token in tokens {
        let token = token.as_ref();
        match positions.get(token) {
            Some(&pos) => out[pos].1 += 1,
            None => {
                positions.insert(token.to_string(), out.len());
                out.push((token.to_string(), 1));
            }
        }
    }
    out
}

/// Assembles a MEMO matrix from a feature table and the documents of the
/// features' spectra.
///
/// ```
/// use memo::{FeatureTable, MemoMatrixBuilder, SpectraDocuments, Spectrum};
///
/// let features = FeatureTable::from_rows(
///     vec!["qc_01".into()],
///     vec![1],
///     vec![vec![1200.0]],
/// ).unwrap();
/// let spectra = vec![Spectrum::new("1", 338.342, vec![(71.0497, 1.0)], vec![])];
/// let documents = SpectraDocuments::from_spectra(&spectra, 2).unwrap();
/// let matrix = MemoMatrixBuilder::new()
///     .feature_table(&features)
///     .spectra_documents(&documents)
///     .build()
///     .unwrap();
/// assert_eq!(matrix.count("qc_01", "peak@71.05"), Some(1.0));
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoMatrixBuilder<'a> {
    feature_table: Option<&'a FeatureTable>,
    spectra_documents: Option<&'a SpectraDocuments>,
}

impl<'a> MemoMatrixBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feature_table(mut self, feature_table: &'a FeatureTable) -> Self {
        self.feature_table = Some(feature_table);
        self
    }

    pub fn spectra_documents(mut self, spectra_documents: &'a SpectraDocuments) -> Self {
        self.spectra_documents = Some(spectra_documents);
        self
    }

    /// Sets whichever input `input` is. A MEMO matrix is not a valid input.
    pub fn with_input(self, input: &'a AnyTable) -> Result<Self> {
        match input {
            AnyTable::FeatureTable(x) => Ok(self.feature_table(x)),
            AnyTable::SpectraDocuments(x) => Ok(self.spectra_documents(x)),
            AnyTable::MemoMatrix(_) => Err(MemoError::KindMismatch {
                expected: "FeatureTable or SpectraDocuments",
                found: EntityKind::MemoMatrix,
            }),
        }
    }

    #[instrument(skip_all)]
    pub fn build(self) -> Result<MemoMatrix> {
        let feature_table = self.feature_table.ok_or(MemoError::Argument {
            argument: "feature_table",
        })?;
        let spectra_documents = self.spectra_documents.ok_or(MemoError::Argument {
            argument: "spectra_documents",
        })?;
        let st = Instant::now();
        let table = build_memo_table(feature_table, spectra_documents)?;
        info!(
            "Generated MEMO matrix of {} samples x {} tokens in {:?}",
            table.nrows(),
            table.ncols(),
            st.elapsed()
        );
        Ok(MemoMatrix { table })
    }
}

/// Sparse token counts of one feature's document over the vocabulary.
type FeatureCounts = Vec<(usize, u32)>;

fn build_memo_table(
    feature_table: &FeatureTable,
    spectra_documents: &SpectraDocuments,
) -> Result<LabeledTable<String>> {
    let table = feature_table.table();

    // Count each feature's tokens once. Features with no spectrum stay None.
    let mut vocab = Vocabulary::default();
    let mut num_missing = 0;
    let feature_counts: Vec<Option<FeatureCounts>> = table
        .col_labels()
        .iter()
        .map(|id| match spectra_documents.get(*id) {
            Some(doc) => Some(
                ordered_counts(doc.iter())
                    .into_iter()
                    .map(|(token, count)| (vocab.intern(token), count))
                    .collect(),
            ),
            None => {
                num_missing += 1;
                None
            }
        })
        .collect();
    debug!(
        "{} of {} features have no document, {} distinct tokens",
        num_missing,
        table.ncols(),
        vocab.len()
    );

    let ntokens = vocab.len();
    let rows: Vec<Vec<f64>> = (0..table.nrows())
        .into_par_iter()
        .map(|i| {
            let mut row = vec![0.0; ntokens];
            let detected = table
                .row(i)
                .iter()
                .zip(feature_counts.iter())
                .filter(|(value, _)| **value != 0.0);
            for (_, counts) in detected {
                for (idx, count) in counts.iter().flatten() {
                    row[*idx] += *count as f64;
                }
            }
            row
        })
        .collect();

    // Tokens of features never detected in any sample are not columns.
    let tokens = vocab.into_tokens();
    let used: Vec<usize> = (0..ntokens)
        .filter(|&k| rows.iter().any(|row| row[k] != 0.0))
        .collect();
    let col_labels: Vec<String> = used.iter().map(|&k| tokens[k].clone()).collect();
    let mut values = Vec::with_capacity(rows.len() * used.len());
    for row in rows.iter() {
        values.extend(used.iter().map(|&k| row[k]));
    }

    LabeledTable::new(table.row_labels().to_vec(), col_labels, values)
}
