//! Discovery and loading of metric descriptor files.
//!
//! Input files are either found by matching a file-name pattern inside a
//! single directory (non-recursive) or given explicitly. Each file is read
//! and parsed on its own so that one malformed file does not abort the run.

use crate::error::LoadError;
use crate::models::{Descriptor, FailedFile};
use anyhow::{Context, Result};
use glob::Pattern;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Default file-name pattern for discovery output.
pub const DEFAULT_PATTERN: &str = "metrics.discovered.*.yaml";

/// Where descriptors are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// A single explicit file.
    File(PathBuf),
    /// Every file in `dir` whose name matches `pattern`.
    Directory { dir: PathBuf, pattern: String },
}

impl InputSource {
    /// Resolve the list of files to load.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        match self {
            InputSource::File(path) => Ok(vec![path.clone()]),
            InputSource::Directory { dir, pattern } => discover(dir, pattern),
        }
    }
}

/// List files in `dir` whose name matches `pattern`, sorted by name.
pub fn discover(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Discovery directory does not exist: {}", dir.display());
    }

    let pattern = Pattern::new(pattern)
        .with_context(|| format!("Invalid discovery pattern: {}", pattern))?;

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry =
            entry.with_context(|| format!("Failed to read directory {}", dir.display()))?;

        if !entry.file_type().is_file() {
            continue;
        }

        if pattern.matches(&entry.file_name().to_string_lossy()) {
            debug!("Discovered {}", entry.path().display());
            files.push(entry.into_path());
        }
    }

    info!(
        "Found {} discovery file(s) in {}",
        files.len(),
        dir.display()
    );
    Ok(files)
}

/// Descriptors combined from all input files.
#[derive(Debug, Default)]
pub struct LoadedInputs {
    /// All descriptors, in file order then document order.
    pub descriptors: Vec<Descriptor>,
    /// Files parsed successfully.
    pub loaded: Vec<PathBuf>,
    /// Files skipped because they could not be parsed.
    pub failed: Vec<FailedFile>,
}

/// Read and parse every file, skipping the ones that fail to parse.
///
/// Read errors are fatal; parse errors are reported and the file is skipped.
pub fn load_files(paths: &[PathBuf]) -> Result<LoadedInputs> {
    let mut inputs = LoadedInputs::default();

    for path in paths {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        match parse_descriptors(path, &content) {
            Ok(mut descriptors) => {
                debug!(
                    "Loaded {} descriptor(s) from {}",
                    descriptors.len(),
                    path.display()
                );
                inputs.descriptors.append(&mut descriptors);
                inputs.loaded.push(path.clone());
            }
            Err(e) => {
                println!("⚠️  Error reading {}: {}", path.display(), e);
                debug!("Skipping {}: {:?}", path.display(), e);
                inputs.failed.push(FailedFile::new(path, &e));
            }
        }
    }

    Ok(inputs)
}

/// Parse one file's content into descriptors.
///
/// An empty document yields no descriptors.
pub fn parse_descriptors(path: &Path, content: &str) -> Result<Vec<Descriptor>, LoadError> {
    let document: Value = serde_yaml::from_str(content)?;

    let items = match document {
        Value::Sequence(items) => items,
        Value::Null => {
            warn!("{} contains no descriptors", path.display());
            return Ok(Vec::new());
        }
        Value::Mapping(_) => return Err(LoadError::NotASequence("a mapping")),
        Value::Tagged(_) => return Err(LoadError::NotASequence("a tagged value")),
        _ => return Err(LoadError::NotASequence("a scalar")),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Mapping(body) => Ok(Descriptor::new(path, index, body)),
            _ => Err(LoadError::NotAMapping(index)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ONE: &str = r#"
- match:
    metric:
      match: cpu.load
  sampleTags:
    source: hostA
  metric:
    resource:
      - cpu
"#;

    #[test]
    fn test_discover_matches_pattern_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("metrics.discovered.b.yaml"), ONE).unwrap();
        fs::write(dir.path().join("metrics.discovered.a.yaml"), ONE).unwrap();
        fs::write(dir.path().join("metrics.yaml"), ONE).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("metrics.discovered.c.yaml"), ONE).unwrap();

        let files = discover(dir.path(), DEFAULT_PATTERN).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(
            names,
            vec!["metrics.discovered.a.yaml", "metrics.discovered.b.yaml"]
        );
    }

    #[test]
    fn test_discover_missing_directory() {
        let dir = TempDir::new().unwrap();
        assert!(discover(&dir.path().join("missing"), DEFAULT_PATTERN).is_err());
    }

    #[test]
    fn test_input_file_bypasses_discovery() {
        let source = InputSource::File(PathBuf::from("custom.yaml"));
        assert_eq!(source.files().unwrap(), vec![PathBuf::from("custom.yaml")]);
    }

    #[test]
    fn test_parse_descriptors() {
        let descriptors = parse_descriptors(Path::new("a.yaml"), ONE).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].discovered_name().unwrap(), "cpu.load");
        assert_eq!(descriptors[0].source, PathBuf::from("a.yaml"));
    }

    #[test]
    fn test_parse_empty_document() {
        assert!(parse_descriptors(Path::new("a.yaml"), "").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_sequence() {
        let err = parse_descriptors(Path::new("a.yaml"), "key: value\n").unwrap_err();
        assert!(matches!(err, LoadError::NotASequence(_)));

        let err = parse_descriptors(Path::new("a.yaml"), "- 1\n- 2\n").unwrap_err();
        assert!(matches!(err, LoadError::NotAMapping(0)));
    }

    #[test]
    fn test_malformed_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("metrics.discovered.good.yaml");
        let bad = dir.path().join("metrics.discovered.bad.yaml");
        fs::write(&good, ONE).unwrap();
        fs::write(&bad, "- match: [unclosed\n").unwrap();

        let inputs = load_files(&[bad.clone(), good.clone()]).unwrap();

        assert_eq!(inputs.descriptors.len(), 1);
        assert_eq!(inputs.loaded, vec![good]);
        assert_eq!(inputs.failed.len(), 1);
        assert_eq!(inputs.failed[0].path, bad.display().to_string());
    }

    #[test]
    fn test_unreadable_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("metrics.discovered.gone.yaml");
        assert!(load_files(&[missing]).is_err());
    }
}
