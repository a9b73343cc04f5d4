use memo::{
    DocumentRecord,
    FeatureTable,
    MemoMatrix,
    SpectraDocuments,
    SpectraFile,
    TableKind,
};
use std::fs::File;
use std::io::{
    BufWriter,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing::{
    info,
    instrument,
    warn,
};

use crate::cli::{
    BuildArgs,
    MergeArgs,
    UnalignedArgs,
    WriteTemplateArgs,
};
use crate::config::{
    Config,
    InputConfig,
    OutputConfig,
    delimiter_byte,
};
use crate::errors::CliError;
use crate::processing::{
    apply_matrix_filters,
    build_filtered_analysis,
    list_sample_files,
    load_unaligned_samples,
};

fn override_output_dir(config: &mut Config, output_dir: Option<PathBuf>) {
    if let Some(directory) = output_dir {
        let delimiter = config.output.as_ref().map(|o| o.delimiter).unwrap_or(',');
        config.output = Some(OutputConfig {
            directory,
            delimiter,
        });
    }
}

/// Keeps a copy of the configuration actually used next to the results.
fn write_used_config(config: &Config, output: &OutputConfig) -> Result<(), CliError> {
    let path = output.directory.join("config.json");
    let file = File::create(&path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), config)?;
    Ok(())
}

fn write_documents(records: &[DocumentRecord], path: &Path) -> Result<(), CliError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    info!("Wrote {} documents to {}", records.len(), path.display());
    Ok(())
}

/// Main function for the 'build' subcommand.
#[instrument(skip_all)]
pub fn main_build(args: BuildArgs) -> Result<(), CliError> {
    let mut config = Config::from_path(&args.config)?;

    let (mut feature_table, mut spectra) = match config.input.take() {
        Some(InputConfig::Aligned {
            feature_table,
            spectra,
        }) => (Some(feature_table), Some(spectra)),
        _ => (None, None),
    };
    if let Some(x) = args.feature_table {
        feature_table = Some(x);
    }
    if let Some(x) = args.spectra {
        spectra = Some(x);
    }
    let (Some(feature_table), Some(spectra)) = (feature_table, spectra) else {
        return Err(CliError::Config(
            "No aligned input provided, please provide a feature table and a spectra file in either the config file or with the --feature-table and --spectra flags".to_string(),
        ));
    };
    config.input = Some(InputConfig::Aligned {
        feature_table: feature_table.clone(),
        spectra: spectra.clone(),
    });
    if let Some(software) = args.software {
        config.analysis.software = software;
    }
    override_output_dir(&mut config, args.output_dir);
    info!("Parsed configuration: {:#?}", config);

    let output = config.output()?;
    let delimiter = output.delimiter_byte()?;
    std::fs::create_dir_all(&output.directory)?;

    let features = FeatureTable::from_path(&feature_table, config.analysis.software)?;
    let documents =
        SpectraDocuments::from_source(&SpectraFile::new(&spectra), config.analysis.n_decimals)?;
    if !documents.duplicate_ids().is_empty() {
        warn!(
            "{} feature ids had more than one spectrum",
            documents.duplicate_ids().len()
        );
    }

    let analysis = build_filtered_analysis(features, &documents, &config.filters)?;

    analysis.export(
        TableKind::FeatureTable,
        output.table_path("feature_table"),
        delimiter,
    )?;
    analysis.export(
        TableKind::MemoMatrix,
        output.table_path("memo_matrix"),
        delimiter,
    )?;
    write_documents(
        documents.records(),
        &output.directory.join("documents.ndjson"),
    )?;
    write_used_config(&config, output)?;
    println!("Wrote results to {}", output.directory.display());
    Ok(())
}

/// Main function for the 'unaligned' subcommand.
#[instrument(skip_all)]
pub fn main_unaligned(args: UnalignedArgs) -> Result<(), CliError> {
    let mut config = Config::from_path(&args.config)?;
    if let Some(spectra_dir) = args.spectra_dir {
        config.input = Some(InputConfig::Unaligned { spectra_dir });
    }
    let spectra_dir = match &config.input {
        Some(InputConfig::Unaligned { spectra_dir }) => spectra_dir.clone(),
        _ => {
            return Err(CliError::Config(
                "No unaligned input provided, please provide a spectra directory in either the config file or with the --spectra-dir flag".to_string(),
            ));
        }
    };
    override_output_dir(&mut config, args.output_dir);
    info!("Parsed configuration: {:#?}", config);

    let output = config.output()?;
    let delimiter = output.delimiter_byte()?;
    std::fs::create_dir_all(&output.directory)?;

    let files = list_sample_files(&spectra_dir)?;
    if files.is_empty() {
        return Err(CliError::Config(format!(
            "No spectra files found in {}",
            spectra_dir.display()
        )));
    }
    let samples = load_unaligned_samples(&files)?;
    let matrix = MemoMatrix::from_unaligned_samples(&samples, config.analysis.n_decimals)?;
    let matrix = apply_matrix_filters(matrix, &config.filters)?;

    matrix.export(output.table_path("memo_matrix"), delimiter)?;
    write_used_config(&config, output)?;
    println!("Wrote results to {}", output.directory.display());
    Ok(())
}

/// Main function for the 'merge' subcommand.
#[instrument(skip_all)]
pub fn main_merge(args: MergeArgs) -> Result<(), CliError> {
    let delimiter = delimiter_byte(args.delimiter)?;
    let mut inputs = args.inputs.iter();
    let first = inputs
        .next()
        .ok_or_else(|| CliError::Config("Nothing to merge".to_string()))?;
    let mut merged = MemoMatrix::from_path(first, delimiter)?;
    for path in inputs {
        let other = MemoMatrix::from_path(path, delimiter)?;
        merged = merged.merge(&other, args.drop_not_in_common);
    }
    info!(
        "Merged {} matrices into {} samples x {} tokens",
        args.inputs.len(),
        merged.samples().len(),
        merged.tokens().len()
    );
    if let Some(parent) = args.output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    merged.export(&args.output_path, delimiter)?;
    println!("Wrote merged matrix to {}", args.output_path.display());
    Ok(())
}

/// Main function for the 'write-template' subcommand.
pub fn main_write_template(args: WriteTemplateArgs) -> Result<(), CliError> {
    let target_dir = args.output_path;
    std::fs::create_dir_all(&target_dir)?;

    let config_path = target_dir.join("memo_config_template.json");
    let text = serde_json::to_string_pretty(&Config::template())?;
    std::fs::write(&config_path, text)?;
    println!("Wrote config template to: {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("memo_cli_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_build_command() {
        let dir = scratch_dir("build");
        std::fs::write(
            dir.join("quant.csv"),
            "row ID,row m/z,qc Peak area,blank Peak area\n1,100.0,10,0\n2,200.0,5,7\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("spectra.ndjson"),
            concat!(
                r#"{"scans": "1", "precursor_mz": 100.0, "peaks": [[41.0, 1.0]]}"#,
                "\n",
                r#"{"scans": "2", "precursor_mz": 200.0, "losses": [[18.0106, 1.0]]}"#,
                "\n"
            ),
        )
        .unwrap();
        let mut config = Config::template();
        config.input = None;
        config.output = None;
        std::fs::write(
            dir.join("config.in.json"),
            serde_json::to_string(&config).unwrap(),
        )
        .unwrap();

        main_build(BuildArgs {
            config: dir.join("config.in.json"),
            feature_table: Some(dir.join("quant.csv")),
            spectra: Some(dir.join("spectra.ndjson")),
            software: None,
            output_dir: Some(dir.join("out")),
        })
        .unwrap();

        let matrix = MemoMatrix::from_path(dir.join("out/memo_matrix.csv"), b',').unwrap();
        // The template filter drops blanks and every token seen in them.
        assert_eq!(matrix.samples(), &["qc".to_string()]);
        assert_eq!(matrix.tokens(), &["peak@41.00".to_string()]);
        assert!(dir.join("out/documents.ndjson").exists());
        assert!(dir.join("out/config.json").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_build_without_input_fails() {
        let dir = scratch_dir("build_no_input");
        let mut config = Config::template();
        config.input = None;
        std::fs::write(
            dir.join("config.json"),
            serde_json::to_string(&config).unwrap(),
        )
        .unwrap();
        let res = main_build(BuildArgs {
            config: dir.join("config.json"),
            feature_table: None,
            spectra: Some(dir.join("spectra.ndjson")),
            software: None,
            output_dir: None,
        });
        assert!(matches!(res, Err(CliError::Config(_))));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_merge_command() {
        let dir = scratch_dir("merge");
        std::fs::write(dir.join("a.csv"), "filename,t1,t2\na1,1,2\n").unwrap();
        std::fs::write(dir.join("b.csv"), "filename,t2,t3\nb1,3,4\n").unwrap();
        main_merge(MergeArgs {
            inputs: vec![dir.join("a.csv"), dir.join("b.csv")],
            drop_not_in_common: true,
            delimiter: ',',
            output_path: dir.join("merged/merged.csv"),
        })
        .unwrap();
        let text = std::fs::read_to_string(dir.join("merged/merged.csv")).unwrap();
        assert_eq!(text, "filename,t2\na1,2\nb1,3\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_template() {
        let dir = scratch_dir("template");
        main_write_template(WriteTemplateArgs {
            output_path: dir.clone(),
        })
        .unwrap();
        let config = Config::from_path(&dir.join("memo_config_template.json")).unwrap();
        assert!(config.output.is_some());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
