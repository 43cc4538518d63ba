pub mod tables;

pub use tables::ConfigTables;

#[cfg(feature = "cli")]
use crate::utils::error::PatternError;
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};
#[cfg(feature = "cli")]
use std::path::PathBuf;

/// Which rendering of the pattern goes to stdout.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Markdown,
    Text,
    Json,
    Summary,
    /// The whole composite artifact, every intermediate stage included.
    Artifact,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "knitgen")]
#[command(about = "Generate a dimensionally-consistent knitted blanket pattern")]
pub struct CliConfig {
    /// Free-form project request, e.g. "a cozy cable blanket"
    pub request: String,

    #[arg(long, value_enum, default_value = "markdown")]
    pub format: OutputFormat,

    #[arg(long, help = "TOML file overriding the built-in lookup tables")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, help = "Exit with status 4 when the pattern fails validation")]
    pub strict: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Built-in tables, or the `--config` file when given.
    pub fn load_tables(&self) -> Result<ConfigTables, PatternError> {
        let tables = match &self.config {
            Some(path) => {
                tracing::debug!("Loading tables from {}", path.display());
                ConfigTables::from_file(path)?
            }
            None => ConfigTables::default(),
        };
        tables.validate()?;
        Ok(tables)
    }
}

#[cfg(feature = "cli")]
/// Only checks the arguments themselves; the request text is checked by the
/// workflow so that a blank request reports as an input validation failure.
impl Validate for CliConfig {
    type Error = PatternError;

    fn validate(&self) -> Result<(), PatternError> {
        if let Some(path) = &self.config {
            if !path.is_file() {
                return Err(PatternError::config(
                    "config",
                    format!("tables file not found: {}", path.display()),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let config = CliConfig::parse_from(["knitgen", "cable blanket"]);

        assert_eq!(config.request, "cable blanket");
        assert_eq!(config.format, OutputFormat::Markdown);
        assert!(config.config.is_none());
        assert!(!config.strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_flags() {
        let config = CliConfig::parse_from([
            "knitgen",
            "lace blanket",
            "--format",
            "summary",
            "--verbose",
            "--strict",
        ]);

        assert_eq!(config.format, OutputFormat::Summary);
        assert!(config.verbose);
        assert!(config.strict);
    }

    #[test]
    fn test_missing_config_file_is_rejected() {
        let config = CliConfig::parse_from([
            "knitgen",
            "blanket",
            "--config",
            "/definitely/not/here.toml",
        ]);

        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
