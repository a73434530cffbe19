//! Configuration file handling.
//!
//! This module handles loading `.metricmerge.toml` files and merging
//! them with command-line arguments.

use crate::error::MergeResult;
use crate::report::Indent;
use crate::scanner::{InputSource, DEFAULT_PATTERN};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".metricmerge.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where discovery files are read from.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Grouping key settings.
    #[serde(default)]
    pub grouping: GroupingConfig,

    /// Output files and layout.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Input discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Directory searched for discovery files.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// File-name pattern of discovery files.
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Single input file; bypasses the directory search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file: Option<PathBuf>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            pattern: default_pattern(),
            input_file: None,
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

/// Grouping settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Tags folded into the key and prepended to the resource path, in order.
    #[serde(default)]
    pub prepend_tags: Vec<String>,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Unique metrics output.
    #[serde(default = "default_metrics_file")]
    pub metrics_file: PathBuf,

    /// Colliding metrics output.
    #[serde(default = "default_collisions_file")]
    pub collisions_file: PathBuf,

    /// Optional JSON collision report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_file: Option<PathBuf>,

    /// Mapping indentation.
    #[serde(default = "default_mapping_indent")]
    pub mapping_indent: usize,

    /// Sequence item indentation.
    #[serde(default = "default_sequence_indent")]
    pub sequence_indent: usize,

    /// Dash offset inside the sequence indentation.
    #[serde(default = "default_sequence_offset")]
    pub sequence_offset: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            metrics_file: default_metrics_file(),
            collisions_file: default_collisions_file(),
            report_file: None,
            mapping_indent: default_mapping_indent(),
            sequence_indent: default_sequence_indent(),
            sequence_offset: default_sequence_offset(),
        }
    }
}

fn default_metrics_file() -> PathBuf {
    PathBuf::from("metrics.yaml")
}

fn default_collisions_file() -> PathBuf {
    PathBuf::from("collisions.yaml")
}

fn default_mapping_indent() -> usize {
    2
}

fn default_sequence_indent() -> usize {
    4
}

fn default_sequence_offset() -> usize {
    2
}

impl OutputConfig {
    /// Emitter indentation, validated.
    pub fn indent(&self) -> MergeResult<Indent> {
        Indent::new(
            self.mapping_indent,
            self.sequence_indent,
            self.sequence_offset,
        )
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.discovery_dir {
            self.discovery.dir = dir.clone();
        }
        if let Some(ref pattern) = args.pattern {
            self.discovery.pattern = pattern.clone();
        }
        if let Some(ref input) = args.input_file {
            self.discovery.input_file = Some(input.clone());
        }

        if let Some(ref tags) = args.prepend_tags {
            self.grouping.prepend_tags = tags.clone();
        }

        if let Some(ref path) = args.metrics_file {
            self.output.metrics_file = path.clone();
        }
        if let Some(ref path) = args.collisions_file {
            self.output.collisions_file = path.clone();
        }
        if let Some(ref path) = args.report_file {
            self.output.report_file = Some(path.clone());
        }
    }

    /// Where descriptors are read from.
    pub fn input_source(&self) -> InputSource {
        match self.discovery.input_file {
            Some(ref file) => InputSource::File(file.clone()),
            None => InputSource::Directory {
                dir: self.discovery.dir.clone(),
                pattern: self.discovery.pattern.clone(),
            },
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
