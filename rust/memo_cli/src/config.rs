use memo::{
    DEFAULT_N_DECIMALS,
    Software,
    TableKind,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::path::{
    Path,
    PathBuf,
};

use crate::errors::CliError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub input: Option<InputConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// Feature table filters run before the MEMO matrix is built, MEMO
    /// matrix filters after. Within each table, filters run in order.
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "type")]
pub enum InputConfig {
    #[serde(rename = "aligned")]
    Aligned {
        feature_table: PathBuf,
        spectra: PathBuf,
    },
    #[serde(rename = "unaligned")]
    Unaligned { spectra_dir: PathBuf },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisConfig {
    pub n_decimals: usize,
    pub software: Software,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            n_decimals: DEFAULT_N_DECIMALS,
            software: Software::Mzmine,
        }
    }
}

/// Removes the samples matching `samples_pattern` from `table`, with the
/// columns seen in more than `max_occurrence` of them.
///
/// Feature table filters are applied before the MEMO matrix is built.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FilterConfig {
    pub table: TableKind,
    pub samples_pattern: String,
    pub max_occurrence: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    pub directory: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    ','
}

impl OutputConfig {
    pub fn delimiter_byte(&self) -> Result<u8, CliError> {
        delimiter_byte(self.delimiter)
    }

    /// `memo_matrix` -> `<directory>/memo_matrix.csv` (or `.tsv` for tabs).
    pub fn table_path(&self, stem: &str) -> PathBuf {
        let ext = if self.delimiter == '\t' { "tsv" } else { "csv" };
        self.directory.join(format!("{}.{}", stem, ext))
    }
}

pub fn delimiter_byte(delimiter: char) -> Result<u8, CliError> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(CliError::Config(format!(
            "delimiter must be a single ascii character, got '{}'",
            delimiter
        )))
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self, CliError> {
        let file = std::fs::File::open(path).map_err(|e| {
            CliError::Config(format!("unable to open {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn template() -> Self {
        Self {
            input: Some(InputConfig::Aligned {
                feature_table: PathBuf::from("quant.csv"),
                spectra: PathBuf::from("spectra.ndjson.zst"),
            }),
            analysis: AnalysisConfig::default(),
            filters: vec![FilterConfig {
                table: TableKind::MemoMatrix,
                samples_pattern: "blank".to_string(),
                max_occurrence: Some(0),
            }],
            output: Some(OutputConfig {
                directory: PathBuf::from("memo_results"),
                delimiter: default_delimiter(),
            }),
        }
    }

    pub fn output(&self) -> Result<&OutputConfig, CliError> {
        self.output.as_ref().ok_or_else(|| {
            CliError::Config(
                "No output directory provided, please provide one in either the config file or with the --output-dir flag".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_roundtrips() {
        let text = serde_json::to_string_pretty(&Config::template()).unwrap();
        let back: Config = serde_json::from_str(&text).unwrap();
        assert!(matches!(back.input, Some(InputConfig::Aligned { .. })));
        assert_eq!(back.filters[0].table, TableKind::MemoMatrix);
        assert_eq!(back.analysis.n_decimals, 2);
    }

    #[test]
    fn test_minimal_config() {
        let text = r#"{
            "input": {"type": "unaligned", "spectra_dir": "spectra/"},
            "output": {"directory": "out", "delimiter": "\t"}
        }"#;
        let config: Config = serde_json::from_str(text).unwrap();
        assert!(config.filters.is_empty());
        assert_eq!(config.analysis.software, Software::Mzmine);
        let output = config.output().unwrap();
        assert_eq!(output.delimiter_byte().unwrap(), b'\t');
        assert_eq!(output.table_path("memo_matrix"), PathBuf::from("out/memo_matrix.tsv"));
    }

    #[test]
    fn test_unknown_table_kind_is_rejected() {
        let text = r#"{"table": "filtered_memo", "samples_pattern": "blank", "max_occurrence": null}"#;
        assert!(serde_json::from_str::<FilterConfig>(text).is_err());
    }

    #[test]
    fn test_non_ascii_delimiter() {
        assert!(delimiter_byte('é').is_err());
        assert_eq!(delimiter_byte(';').unwrap(), b';');
    }
}
