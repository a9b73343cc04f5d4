use crate::errors::{
    EntityKind,
    Result,
};
use crate::feature_table::FeatureTable;
use crate::filtering::TableKind;
use crate::memo_matrix::MemoMatrix;
use crate::spectra_documents::SpectraDocuments;
use std::path::Path;
use tracing::info;

/// One of the tables produced along the pipeline, tagged with its kind.
#[derive(Debug, Clone)]
pub enum AnyTable {
    FeatureTable(FeatureTable),
    SpectraDocuments(SpectraDocuments),
    MemoMatrix(MemoMatrix),
}

impl AnyTable {
    pub fn kind(&self) -> EntityKind {
        match self {
            AnyTable::FeatureTable(_) => EntityKind::FeatureTable,
            AnyTable::SpectraDocuments(_) => EntityKind::SpectraDocuments,
            AnyTable::MemoMatrix(_) => EntityKind::MemoMatrix,
        }
    }
}

impl From<FeatureTable> for AnyTable {
    fn from(x: FeatureTable) -> Self {
        AnyTable::FeatureTable(x)
    }
}

impl From<SpectraDocuments> for AnyTable {
    fn from(x: SpectraDocuments) -> Self {
        AnyTable::SpectraDocuments(x)
    }
}

impl From<MemoMatrix> for AnyTable {
    fn from(x: MemoMatrix) -> Self {
        AnyTable::MemoMatrix(x)
    }
}

/// A feature table and the MEMO matrix built from it.
///
/// Filtering returns a new analysis, the original is left untouched.
#[derive(Debug, Clone)]
pub struct MemoAnalysis {
    feature_table: FeatureTable,
    memo_matrix: MemoMatrix,
}

impl MemoAnalysis {
    pub fn new(feature_table: FeatureTable, memo_matrix: MemoMatrix) -> Self {
        Self {
            feature_table,
            memo_matrix,
        }
    }

    /// Builds the MEMO matrix of `feature_table` from `spectra_documents`.
    pub fn build(feature_table: FeatureTable, spectra_documents: &SpectraDocuments) -> Result<Self> {
        let memo_matrix = MemoMatrix::from_aligned_samples(&feature_table, spectra_documents)?;
        Ok(Self::new(feature_table, memo_matrix))
    }

    pub fn feature_table(&self) -> &FeatureTable {
        &self.feature_table
    }

    pub fn memo_matrix(&self) -> &MemoMatrix {
        &self.memo_matrix
    }

    pub fn into_parts(self) -> (FeatureTable, MemoMatrix) {
        (self.feature_table, self.memo_matrix)
    }

    /// Filters one of the two tables, the other one is carried over as is.
    pub fn filter(
        &self,
        table: TableKind,
        samples_pattern: &str,
        max_occurrence: Option<usize>,
    ) -> Result<Self> {
        let out = match table {
            TableKind::FeatureTable => Self {
                feature_table: self.feature_table.filter(samples_pattern, max_occurrence)?,
                memo_matrix: self.memo_matrix.clone(),
            },
            TableKind::MemoMatrix => Self {
                feature_table: self.feature_table.clone(),
                memo_matrix: self.memo_matrix.filter(samples_pattern, max_occurrence)?,
            },
        };
        Ok(out)
    }

    pub fn export(&self, table: TableKind, path: impl AsRef<Path>, delimiter: u8) -> Result<()> {
        info!("Exporting {}", table);
        match table {
            TableKind::FeatureTable => self.feature_table.export(path, delimiter),
            TableKind::MemoMatrix => self.memo_matrix.export(path, delimiter),
        }
    }
}
