use indicatif::{
    ParallelProgressIterator,
    ProgressStyle,
};
use memo::{
    FeatureTable,
    MemoAnalysis,
    MemoError,
    MemoMatrix,
    SpectraDocuments,
    SpectraFile,
    SpectraFormat,
    SpectraSource,
    Spectrum,
    TableKind,
};
use rayon::prelude::*;
use std::path::{
    Path,
    PathBuf,
};
use std::time::Instant;
use tracing::{
    info,
    warn,
};

use crate::config::FilterConfig;
use crate::errors::CliError;

/// Spectra files of `dir`, one per sample, sorted by sample name.
/// Files without a known spectra suffix are skipped.
pub fn list_sample_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, CliError> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        match SpectraFormat::sample_name(&path) {
            Some(name) => out.push((name, path)),
            None => warn!("Skipping {}, not a spectra file", path.display()),
        }
    }
    out.sort();
    Ok(out)
}

pub fn load_unaligned_samples(
    files: &[(String, PathBuf)],
) -> Result<Vec<(String, Vec<Spectrum>)>, CliError> {
    let start = Instant::now();
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    let samples = files
        .par_iter()
        .progress_with_style(style)
        .map(|(name, path)| -> Result<(String, Vec<Spectrum>), MemoError> {
            Ok((name.clone(), SpectraFile::new(path).load_spectra()?))
        })
        .collect::<Result<Vec<_>, MemoError>>()?;
    let num_spectra: usize = samples.iter().map(|(_, s)| s.len()).sum();
    info!(
        "Loaded {} spectra from {} samples in {:?}",
        num_spectra,
        samples.len(),
        start.elapsed()
    );
    Ok(samples)
}

/// Builds the analysis with the configured filters.
///
/// Feature table filters run first, on the table the matrix is built from,
/// so the samples and features they remove never reach the MEMO matrix.
/// MEMO matrix filters then run on the built matrix. Each group keeps its
/// configured order.
pub fn build_filtered_analysis(
    feature_table: FeatureTable,
    spectra_documents: &SpectraDocuments,
    filters: &[FilterConfig],
) -> Result<MemoAnalysis, CliError> {
    let mut feature_table = feature_table;
    for filter in filters.iter().filter(|f| f.table == TableKind::FeatureTable) {
        feature_table = feature_table.filter(&filter.samples_pattern, filter.max_occurrence)?;
    }
    let mut analysis = MemoAnalysis::build(feature_table, spectra_documents)?;
    for filter in filters.iter().filter(|f| f.table == TableKind::MemoMatrix) {
        analysis = analysis.filter(
            TableKind::MemoMatrix,
            &filter.samples_pattern,
            filter.max_occurrence,
        )?;
    }
    Ok(analysis)
}

/// Unaligned runs have no feature table, feature table filters are skipped.
pub fn apply_matrix_filters(
    matrix: MemoMatrix,
    filters: &[FilterConfig],
) -> Result<MemoMatrix, CliError> {
    let mut matrix = matrix;
    for filter in filters {
        match filter.table {
            TableKind::MemoMatrix => {
                matrix = matrix.filter(&filter.samples_pattern, filter.max_occurrence)?;
            }
            TableKind::FeatureTable => warn!(
                "Ignoring feature table filter '{}', there is no feature table in unaligned mode",
                filter.samples_pattern
            ),
        }
    }
    Ok(matrix)
}
