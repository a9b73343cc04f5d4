//! Sample x feature quantification tables.
//!
//! Feature detection tools all export "one row per feature, one column per
//! sample" tables with their own decorations. The adapters here strip
//! those and transpose to the canonical orientation: samples as rows,
//! feature ids as columns, intensity (0 for not detected) as values.

use crate::errors::{
    MemoError,
    Result,
};
use crate::filtering::filter_table;
use crate::io::{
    export_path,
    parse_cell,
};
use crate::models::{
    FeatureId,
    LabeledTable,
};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{
    debug,
    info,
};

const MZMINE_INDEX_COLUMN: &str = "row ID";
const MZMINE_AREA_SUFFIX: &str = " Peak area";
const MZMINE_AREA_MARKER: &str = "Peak area";
const MSDIAL_SPECTRUM_COLUMN: &str = "MS/MS spectrum";
const XCMS_FEATURE_PREFIX: &str = "FT";

/// Feature detection software a quantification table comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Software {
    /// MZmine 2 csv export: `row ID` index, `<sample> Peak area` columns.
    Mzmine,
    /// XCMS tsv export: `FT<id>` index, sample columns carrying the file extension.
    Xcms,
    /// MS-DIAL tsv alignment export with an embedded header row.
    Msdial,
}

impl Software {
    pub fn delimiter(&self) -> u8 {
        match self {
            Software::Mzmine => b',',
            Software::Xcms | Software::Msdial => b'\t',
        }
    }
}

impl std::fmt::Display for Software {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Software::Mzmine => "mzmine",
            Software::Xcms => "xcms",
            Software::Msdial => "msdial",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Software {
    type Err = MemoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mzmine" => Ok(Software::Mzmine),
            "xcms" => Ok(Software::Xcms),
            "msdial" => Ok(Software::Msdial),
            other => Err(MemoError::configuration(format!(
                "unsupported software '{}', choose one of the currently supported pre-processing softwares: [mzmine, xcms, msdial]",
                other
            ))),
        }
    }
}

/// Normalized quantification table (samples x features).
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    table: LabeledTable<FeatureId>,
}

impl FeatureTable {
    pub fn new(table: LabeledTable<FeatureId>) -> Self {
        Self { table }
    }

    /// Convenience constructor, one intensity vector per sample.
    pub fn from_rows(
        samples: Vec<String>,
        feature_ids: Vec<FeatureId>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        Ok(Self::new(LabeledTable::from_rows(samples, feature_ids, rows)?))
    }

    pub fn from_path(path: impl AsRef<Path>, software: Software) -> Result<Self> {
        let path = path.as_ref();
        info!("Reading {} feature table from {}", software, path.display());
        let file = std::fs::File::open(path).map_err(|e| MemoError::io(e, path))?;
        let out = Self::from_reader(std::io::BufReader::new(file), software)
            .map_err(|e| e.append_to_context(&format!("reading {}", path.display())))?;
        info!(
            "Loaded feature table with {} samples and {} features",
            out.table.nrows(),
            out.table.ncols()
        );
        Ok(out)
    }

    pub fn from_reader<R: Read>(reader: R, software: Software) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(software.delimiter())
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let records = rdr
            .records()
            .collect::<std::result::Result<Vec<csv::StringRecord>, csv::Error>>()?;
        if records.is_empty() {
            return Err(MemoError::data("feature table file is empty"));
        }
        let features = match software {
            Software::Mzmine => parse_mzmine(&records)?,
            Software::Msdial => parse_msdial(&records)?,
            Software::Xcms => parse_xcms(&records)?,
        };
        features.into_feature_table()
    }

    pub fn table(&self) -> &LabeledTable<FeatureId> {
        &self.table
    }

    pub fn into_inner(self) -> LabeledTable<FeatureId> {
        self.table
    }

    pub fn samples(&self) -> &[String] {
        self.table.row_labels()
    }

    pub fn feature_ids(&self) -> &[FeatureId] {
        self.table.col_labels()
    }

    /// Feature ids with a non-zero intensity in the given sample row, in
    /// column order.
    pub fn detected_features(&self, row: usize) -> impl Iterator<Item = FeatureId> + '_ {
        self.table
            .row(row)
            .iter()
            .zip(self.table.col_labels())
            .filter(|(v, _)| **v != 0.0)
            .map(|(_, id)| *id)
    }

    /// Removes the samples matching `samples_pattern` and, when
    /// `max_occurrence` is set, the features detected in more than
    /// `max_occurrence` of those samples. See [`filter_table`].
    pub fn filter(&self, samples_pattern: &str, max_occurrence: Option<usize>) -> Result<Self> {
        Ok(Self::new(filter_table(
            &self.table,
            samples_pattern,
            max_occurrence,
        )?))
    }

    pub fn export(&self, path: impl AsRef<Path>, delimiter: u8) -> Result<()> {
        export_path(&self.table, path, delimiter)
    }
}

/// Feature-major intermediate: what every vendor table looks like once
/// decorations are removed.
struct FeatureMajor {
    samples: Vec<String>,
    feature_ids: Vec<FeatureId>,
    // One intensity vector (over samples) per feature.
    intensities: Vec<Vec<f64>>,
}

impl FeatureMajor {
    fn new(samples: Vec<String>) -> Self {
        Self {
            samples,
            feature_ids: Vec::new(),
            intensities: Vec::new(),
        }
    }

    fn push_feature(
        &mut self,
        id: FeatureId,
        record: &csv::StringRecord,
        columns: &[usize],
    ) -> Result<()> {
        let values = columns
            .iter()
            .map(|&j| {
                parse_cell(record.get(j).unwrap_or("")).map_err(|e| {
                    e.append_to_context(&format!("feature {}, column {}", id, j))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        self.feature_ids.push(id);
        self.intensities.push(values);
        Ok(())
    }

    fn into_feature_table(self) -> Result<FeatureTable> {
        let nfeatures = self.feature_ids.len();
        let nsamples = self.samples.len();
        let mut values = vec![0.0; nfeatures * nsamples];
        for (j, feature) in self.intensities.iter().enumerate() {
            for (i, v) in feature.iter().enumerate() {
                values[i * nfeatures + j] = *v;
            }
        }
        debug!("Transposed {} features x {} samples", nfeatures, nsamples);
        Ok(FeatureTable::new(LabeledTable::new(
            self.samples,
            self.feature_ids,
            values,
        )?))
    }
}

fn parse_feature_id(raw: &str) -> Result<FeatureId> {
    raw.trim()
        .parse::<FeatureId>()
        .map_err(|_| MemoError::data(format!("feature id '{}' is not an integer", raw)))
}

fn parse_mzmine(records: &[csv::StringRecord]) -> Result<FeatureMajor> {
    let header = &records[0];
    let index_col = header
        .iter()
        .position(|h| h.trim() == MZMINE_INDEX_COLUMN)
        .ok_or_else(|| {
            MemoError::data(format!("mzmine table has no '{}' column", MZMINE_INDEX_COLUMN))
        })?;
    let (columns, samples): (Vec<usize>, Vec<String>) = header
        .iter()
        .enumerate()
        .filter(|(_, h)| h.contains(MZMINE_AREA_MARKER))
        .map(|(j, h)| (j, h.replace(MZMINE_AREA_SUFFIX, "")))
        .unzip();

    let mut out = FeatureMajor::new(samples);
    for record in records.iter().skip(1) {
        let id = parse_feature_id(record.get(index_col).unwrap_or(""))?;
        out.push_feature(id, record, &columns)?;
    }
    Ok(out)
}

fn parse_msdial(records: &[csv::StringRecord]) -> Result<FeatureMajor> {
    let header = &records[0];
    // Column 0 is the index, unnamed header cells are layout artifacts.
    let named: Vec<usize> = header
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, h)| {
            let h = h.trim();
            !h.is_empty() && !h.starts_with("Unnamed")
        })
        .map(|(j, _)| j)
        .collect();

    let mut rows = records
        .iter()
        .skip(1)
        .filter(|r| r.get(0).is_some_and(|x| !x.trim().is_empty()));
    let embedded_header = rows
        .next()
        .ok_or_else(|| MemoError::data("msdial table has no embedded header row"))?;

    let (columns, samples): (Vec<usize>, Vec<String>) = named
        .into_iter()
        .map(|j| (j, embedded_header.get(j).unwrap_or("").trim().to_string()))
        .filter(|(_, name)| name != MSDIAL_SPECTRUM_COLUMN)
        .unzip();

    let mut out = FeatureMajor::new(samples);
    for record in rows {
        let id = parse_feature_id(record.get(0).unwrap_or(""))?;
        out.push_feature(id, record, &columns)?;
    }
    Ok(out)
}

fn parse_xcms(records: &[csv::StringRecord]) -> Result<FeatureMajor> {
    let header = &records[0];
    let last = header
        .iter()
        .last()
        .ok_or_else(|| MemoError::data("xcms table has an empty header"))?;
    let ext = last.rsplit('.').next().unwrap_or(last).trim().to_string();
    debug!("Using '{}' as the xcms sample column marker", ext);

    let (columns, samples): (Vec<usize>, Vec<String>) = header
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, h)| h.contains(ext.as_str()))
        .map(|(j, h)| (j, h.to_string()))
        .unzip();

    let mut out = FeatureMajor::new(samples);
    for record in records.iter().skip(1) {
        let raw = record.get(0).unwrap_or("");
        let id = parse_feature_id(&raw.replace(XCMS_FEATURE_PREFIX, ""))?;
        out.push_feature(id, record, &columns)?;
    }
    Ok(out)
}
