pub mod spectrum;
pub mod table;

pub use spectrum::{
    Document,
    FeatureId,
    Spectrum,
    TokenKind,
};
pub use table::{
    ColumnJoin,
    ColumnKey,
    LabeledTable,
};
