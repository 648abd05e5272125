pub mod cli;
pub mod release_config;

#[cfg(feature = "cli")]
use crate::core::dataset::FileFormat;
#[cfg(feature = "cli")]
use crate::utils::error::{PsiDataError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::{validate_path, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// `name=expression` 形式的查詢參數
#[cfg(feature = "cli")]
pub fn parse_named_query(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, expr)) if !name.trim().is_empty() && !expr.trim().is_empty() => {
            Ok((name.trim().to_string(), expr.trim().to_string()))
        }
        _ => Err(format!("expected NAME=EXPRESSION, got '{}'", arg)),
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "psidata")]
#[command(about = "Query values stored in psiexperiment raw data archives")]
pub struct CliConfig {
    /// Folder scanned recursively for raw data zip files
    pub data_path: PathBuf,

    /// File inside each zip archive to query (e.g. io.json, final.preferences)
    #[arg(long, default_value = "io.json")]
    pub member: String,

    /// Named query, e.g. primary_output=output.starship_A_primary.channel
    #[arg(short, long = "query", value_parser = parse_named_query, required = true)]
    pub queries: Vec<(String, String)>,

    /// Only load archives whose name contains this experiment type
    #[arg(long)]
    pub etype: Option<String>,

    /// Experiment types recognized in filenames (defaults to --etype)
    #[arg(long, value_delimiter = ',')]
    pub experiments: Vec<String>,

    #[arg(long, help = "Keep the ear column parsed from filenames")]
    pub include_ear: bool,

    #[arg(long, help = "Add the folder each archive was found in")]
    pub include_dataset: bool,

    #[arg(long, help = "Write filename information as index columns")]
    pub info_as_index: bool,

    /// json or yaml; inferred from the member name when omitted
    #[arg(long)]
    pub format: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = "query.csv")]
    pub output_file: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn experiment_types(&self) -> Vec<String> {
        if self.experiments.is_empty() {
            self.etype.iter().cloned().collect()
        } else {
            self.experiments.clone()
        }
    }

    pub fn file_format(&self) -> Result<Option<FileFormat>> {
        self.format.as_deref().map(str::parse::<FileFormat>).transpose()
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("output_path", &self.output_path)?;
        validate_path("output_file", &self.output_file)?;
        self.file_format()?;

        if self.experiment_types().is_empty() {
            return Err(PsiDataError::ConfigValidationError {
                field: "experiments".to_string(),
                message: "At least one experiment type is required (--experiments or --etype)"
                    .to_string(),
            });
        }
        Ok(())
    }
}
