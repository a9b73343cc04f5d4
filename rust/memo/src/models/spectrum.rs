use serde::{
    Deserialize,
    Deserializer,
    Serialize,
};
use std::collections::BTreeMap;

/// Integer identifier shared by a feature table column and the spectrum
/// acquired for that feature ("scans" / "row ID").
pub type FeatureId = u32;

/// One processed MS2 spectrum, as handed over by the spectral importer.
///
/// Peaks and losses are already filtered (relative intensity window,
/// loss m/z window, minimum peak count ...). Tokenization only reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Feature identifier as written in the source file. It is coerced
    /// to a [`FeatureId`] when building the document table.
    #[serde(
        alias = "feature_id",
        alias = "scan",
        deserialize_with = "deserialize_identifier"
    )]
    pub scans: String,
    pub precursor_mz: f64,
    /// (m/z, intensity) pairs in acquisition order.
    #[serde(default)]
    pub peaks: Vec<(f64, f64)>,
    /// (m/z, intensity) neutral-loss pairs.
    #[serde(default)]
    pub losses: Vec<(f64, f64)>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Spectrum {
    pub fn new(
        scans: impl Into<String>,
        precursor_mz: f64,
        peaks: Vec<(f64, f64)>,
        losses: Vec<(f64, f64)>,
    ) -> Self {
        Self {
            scans: scans.into(),
            precursor_mz,
            peaks,
            losses,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Parses the identifier into a [`FeatureId`].
    ///
    /// Only plain integers (surrounding whitespace allowed) are accepted,
    /// "12.0" or "FT12" are ambiguous and rejected.
    pub fn feature_id(&self) -> Option<FeatureId> {
        self.scans.trim().parse::<FeatureId>().ok()
    }

    pub fn num_peaks(&self) -> usize {
        self.peaks.len()
    }

    pub fn num_losses(&self) -> usize {
        self.losses.len()
    }

    #[cfg(test)]
    pub fn sample() -> Self {
        Self::new(
            "1",
            338.342,
            vec![(71.0497, 0.12), (85.0653, 1.0), (99.0809, 0.4)],
            vec![(18.0106, 0.3), (44.9977, 0.05)],
        )
    }
}

/// Identifiers are written either as numbers or as strings depending on
/// the exporter, both end up as the string form.
fn deserialize_identifier<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawIdentifier {
        Unsigned(u64),
        Signed(i64),
        Text(String),
    }

    Ok(match RawIdentifier::deserialize(deserializer)? {
        RawIdentifier::Unsigned(x) => x.to_string(),
        RawIdentifier::Signed(x) => x.to_string(),
        RawIdentifier::Text(x) => x,
    })
}

/// Whether a token was produced from a fragment peak or a neutral loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Peak,
    Loss,
}

impl TokenKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            TokenKind::Peak => "peak@",
            TokenKind::Loss => "loss@",
        }
    }
}

/// Ordered token sequence derived from a single spectrum.
///
/// Peak tokens come first (in peak order) followed by loss tokens.
/// Repeated tokens are kept; their multiplicity is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    words: Vec<String>,
}

impl Document {
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|x| x.as_str())
    }
}

impl<S: Into<String>> FromIterator<S> for Document {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            words: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<String>> for Document {
    fn from(words: Vec<String>) -> Self {
        Self { words }
    }
}

impl From<Vec<&str>> for Document {
    fn from(words: Vec<&str>) -> Self {
        words.into_iter().collect()
    }
}
