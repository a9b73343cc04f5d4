#![doc = include_str!("../README.md")]

// Declare modules
pub mod analysis;
pub mod data_sources;
pub mod errors;
pub mod feature_table;
pub mod filtering;
pub mod io;
pub mod memo_matrix;
pub mod models;
pub mod spectra_documents;
pub mod tokenizer;

// Re-export main structures
pub use crate::analysis::{
    AnyTable,
    MemoAnalysis,
};
pub use crate::data_sources::{
    SpectraFile,
    SpectraFormat,
    SpectraSource,
};
pub use crate::feature_table::{
    FeatureTable,
    Software,
};
pub use crate::filtering::{
    TableKind,
    filter_table,
};
pub use crate::memo_matrix::{
    MemoMatrix,
    MemoMatrixBuilder,
};
pub use crate::models::{
    ColumnJoin,
    Document,
    FeatureId,
    LabeledTable,
    Spectrum,
};
pub use crate::spectra_documents::{
    DocumentRecord,
    SpectraDocuments,
};
pub use crate::tokenizer::{
    DEFAULT_N_DECIMALS,
    tokenize,
};

// Re-export errors
pub use crate::errors::{
    EntityKind,
    MemoError,
    Result,
};
