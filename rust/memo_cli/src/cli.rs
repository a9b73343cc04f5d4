use clap::{
    Parser,
    Subcommand,
};
use memo::Software;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a MEMO matrix from a feature table and the spectra of its features.
    Build(BuildArgs),
    /// Build a MEMO matrix from one spectra file per sample, no feature table needed.
    Unaligned(UnalignedArgs),
    /// Merge exported MEMO matrices into a single one.
    Merge(MergeArgs),
    /// Write a template configuration file.
    WriteTemplate(WriteTemplateArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct BuildArgs {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Path to the feature table (will over-write the config file)
    #[arg(short, long)]
    pub feature_table: Option<PathBuf>,

    /// Path to the processed spectra file (will over-write the config file)
    #[arg(short, long)]
    pub spectra: Option<PathBuf>,

    /// Software that produced the feature table (will over-write the config file)
    #[arg(long)]
    pub software: Option<Software>,

    /// Path to the output directory (will over-write the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct UnalignedArgs {
    /// Path to the JSON configuration file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Directory with one processed spectra file per sample (will over-write the config file)
    #[arg(short, long)]
    pub spectra_dir: Option<PathBuf>,

    /// Path to the output directory (will over-write the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct MergeArgs {
    /// Exported MEMO matrices, merged in the given order.
    #[arg(required = true, num_args = 2..)]
    pub inputs: Vec<PathBuf>,

    /// Only keep the tokens present in every matrix.
    #[arg(long, default_value_t = false)]
    pub drop_not_in_common: bool,

    /// Delimiter of the input and output files.
    #[arg(short, long, default_value_t = ',')]
    pub delimiter: char,

    /// Path to the merged matrix.
    #[arg(short, long)]
    pub output_path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct WriteTemplateArgs {
    /// The path to the output directory.
    #[arg(short, long)]
    pub output_path: PathBuf,
}
