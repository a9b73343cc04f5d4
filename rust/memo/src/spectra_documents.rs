use crate::data_sources::SpectraSource;
use crate::errors::{
    MemoError,
    Result,
};
use crate::models::{
    Document,
    FeatureId,
    Spectrum,
};
use crate::tokenizer::{
    DEFAULT_N_DECIMALS,
    tokenize,
};
use std::collections::{
    BTreeMap,
    HashMap,
};
use tracing::{
    info,
    warn,
};

/// One row of the document table, one per retained spectrum.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DocumentRecord {
    pub feature_id: FeatureId,
    pub precursor_mz: f64,
    pub document: Document,
    pub metadata: BTreeMap<String, String>,
}

/// Documents of every retained spectrum, keyed by feature id.
#[derive(Debug, Clone, Default)]
pub struct SpectraDocuments {
    n_decimals: usize,
    documents: HashMap<FeatureId, Document>,
    records: Vec<DocumentRecord>,
    duplicate_ids: Vec<FeatureId>,
}

impl SpectraDocuments {
    /// Tokenizes every spectrum.
    ///
    /// Fails with a data error if a spectrum id is not an integer. When two
    /// spectra share an id the later one replaces the earlier one in the id
    /// to document mapping; `records` keeps both rows.
    pub fn from_spectra(spectra: &[Spectrum], n_decimals: usize) -> Result<Self> {
        let mut documents = HashMap::with_capacity(spectra.len());
        let mut records = Vec::with_capacity(spectra.len());
        let mut duplicate_ids = Vec::new();

        for spectrum in spectra {
            let feature_id = spectrum.feature_id().ok_or_else(|| {
                MemoError::data(format!(
                    "spectrum identifier '{}' cannot be converted to an integer feature id",
                    spectrum.scans
                ))
            })?;
            let document = tokenize(spectrum, n_decimals);
            if documents.insert(feature_id, document.clone()).is_some() {
                warn!(
                    "Feature id {} has more than one spectrum, keeping the last one",
                    feature_id
                );
                duplicate_ids.push(feature_id);
            }
            records.push(DocumentRecord {
                feature_id,
                precursor_mz: spectrum.precursor_mz,
                document,
                metadata: spectrum.metadata.clone(),
            });
        }

        info!(
            "Built {} documents ({} decimals) from {} spectra",
            documents.len(),
            n_decimals,
            spectra.len()
        );
        Ok(Self {
            n_decimals,
            documents,
            records,
            duplicate_ids,
        })
    }

    pub fn from_source<S: SpectraSource + ?Sized>(source: &S, n_decimals: usize) -> Result<Self> {
        let spectra = source.load_spectra()?;
        Self::from_spectra(&spectra, n_decimals)
    }

    /// Builds the table straight from an id to document mapping, with no
    /// spectrum metadata. Mostly useful for documents computed elsewhere.
    pub fn from_documents(documents: HashMap<FeatureId, Document>) -> Self {
        let mut ids: Vec<FeatureId> = documents.keys().copied().collect();
        ids.sort_unstable();
        let records = ids
            .iter()
            .map(|id| DocumentRecord {
                feature_id: *id,
                precursor_mz: f64::NAN,
                document: documents[id].clone(),
                metadata: BTreeMap::new(),
            })
            .collect();
        Self {
            n_decimals: DEFAULT_N_DECIMALS,
            documents,
            records,
            duplicate_ids: Vec::new(),
        }
    }

    pub fn get(&self, feature_id: FeatureId) -> Option<&Document> {
        self.documents.get(&feature_id)
    }

    pub fn documents(&self) -> &HashMap<FeatureId, Document> {
        &self.documents
    }

    pub fn records(&self) -> &[DocumentRecord] {
        &self.records
    }

    /// Ids that were seen more than once, once per overwrite.
    pub fn duplicate_ids(&self) -> &[FeatureId] {
        &self.duplicate_ids
    }

    pub fn n_decimals(&self) -> usize {
        self.n_decimals
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
