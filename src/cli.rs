//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and log level selection. Flags keep their
//! underscore spelling; kebab-case aliases are accepted as well.

use clap::Parser;
use std::path::PathBuf;

/// MetricMerge - merge discovered metric descriptors into one metrics file
///
/// Reads every `metrics.discovered.*.yaml` file in a directory, groups the
/// descriptors by source, name, prepend tags and discovered metric name,
/// writes the unique ones (enabled) to metrics.yaml and the colliding ones
/// to collisions.yaml for manual disambiguation.
///
/// Examples:
///   metricmerge
///   metricmerge --discovery_dir ./discovery --prepend_tags region env
///   metricmerge --input_file metrics.discovered.web.yaml --dry_run
///   metricmerge --init_config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory searched (non-recursively) for discovery files
    ///
    /// Default: from config or the current directory.
    #[arg(
        long = "discovery_dir",
        alias = "discovery-dir",
        value_name = "DIR",
        env = "METRICMERGE_DISCOVERY_DIR"
    )]
    pub discovery_dir: Option<PathBuf>,

    /// Tags folded into the grouping key and prepended to the resource path
    ///
    /// Space or comma separated, applied in the given order.
    /// Example: --prepend_tags region env
    #[arg(
        long = "prepend_tags",
        alias = "prepend-tags",
        value_name = "TAG",
        num_args = 1..,
        value_delimiter = ','
    )]
    pub prepend_tags: Option<Vec<String>>,

    /// Read a single input file instead of searching the discovery directory
    #[arg(long = "input_file", alias = "input-file", value_name = "FILE")]
    pub input_file: Option<PathBuf>,

    /// Output file for unique metrics (default: metrics.yaml)
    #[arg(long = "metrics_file", alias = "metrics-file", value_name = "FILE")]
    pub metrics_file: Option<PathBuf>,

    /// Output file for colliding metrics (default: collisions.yaml)
    #[arg(long = "collisions_file", alias = "collisions-file", value_name = "FILE")]
    pub collisions_file: Option<PathBuf>,

    /// File-name pattern used for discovery
    ///
    /// Default: metrics.discovered.*.yaml
    #[arg(long, value_name = "GLOB", env = "METRICMERGE_PATTERN")]
    pub pattern: Option<String>,

    /// Also write a JSON collision report to this file
    #[arg(long = "report_file", alias = "report-file", value_name = "FILE")]
    pub report_file: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .metricmerge.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Load, group and report collisions without writing any file
    #[arg(long = "dry_run", alias = "dry-run")]
    pub dry_run: bool,

    /// Exit with code 2 when collisions are found
    ///
    /// Useful for CI pipelines. Output files are still written.
    #[arg(long = "fail_on_collisions", alias = "fail-on-collisions")]
    pub fail_on_collisions: bool,

    /// Generate a default .metricmerge.toml configuration file
    #[arg(long = "init_config", alias = "init-config")]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init_config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref tags) = self.prepend_tags {
            if tags.iter().any(|t| t.trim().is_empty()) {
                return Err("Prepend tags must not be empty".to_string());
            }
        }

        if let Some(ref input) = self.input_file {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        if let Some(ref pattern) = self.pattern {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(format!("Invalid discovery pattern '{}': {}", pattern, e));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("metricmerge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_are_unset() {
        let args = parse(&[]);
        assert!(args.prepend_tags.is_none());
        assert!(args.input_file.is_none());
        assert!(args.metrics_file.is_none());
        assert!(!args.dry_run);
    }

    #[test]
    fn test_prepend_tags_space_separated() {
        let args = parse(&["--prepend_tags", "region", "env"]);
        assert_eq!(
            args.prepend_tags,
            Some(vec!["region".to_string(), "env".to_string()])
        );
    }

    #[test]
    fn test_prepend_tags_comma_separated() {
        let args = parse(&["--prepend-tags", "region,env", "--dry_run"]);
        assert_eq!(
            args.prepend_tags,
            Some(vec!["region".to_string(), "env".to_string()])
        );
        assert!(args.dry_run);
    }

    #[test]
    fn test_output_flags() {
        let args = parse(&[
            "--metrics_file",
            "out/m.yaml",
            "--collisions-file",
            "out/c.yaml",
        ]);
        assert_eq!(args.metrics_file, Some(PathBuf::from("out/m.yaml")));
        assert_eq!(args.collisions_file, Some(PathBuf::from("out/c.yaml")));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = Args {
            verbose: true,
            quiet: true,
            ..Default::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_input_file() {
        let args = Args {
            input_file: Some(PathBuf::from("/nonexistent/metrics.discovered.x.yaml")),
            ..Default::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_bad_pattern() {
        let args = Args {
            pattern: Some("metrics.[".to_string()),
            ..Default::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = Args::default();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
