//! Data models for the metric merger.
//!
//! This module contains the descriptor wrapper read from discovery files,
//! the collision groups built from them, and the summary of a merge run.

use crate::error::{MergeError, MergeResult};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Value written into the `enabled` field of unique descriptors.
pub const ENABLED_VALUE: &str = "true";

/// One discovered-metric descriptor.
///
/// The YAML mapping is kept as-is so that fields this tool does not know
/// about survive the merge in their original order.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    /// File the descriptor was loaded from.
    pub source: PathBuf,
    /// Position of the descriptor inside its file (zero-based).
    pub index: usize,
    /// Raw descriptor body.
    pub body: Mapping,
}

impl Descriptor {
    /// Wrap a parsed mapping.
    pub fn new(source: impl Into<PathBuf>, index: usize, body: Mapping) -> Self {
        Self {
            source: source.into(),
            index,
            body,
        }
    }

    /// The discovered metric name at `match.metric.match`.
    pub fn discovered_name(&self) -> MergeResult<String> {
        let value = self
            .body
            .get("match")
            .and_then(|m| m.get("metric"))
            .and_then(|m| m.get("match"))
            .ok_or_else(|| self.missing("match.metric.match"))?;

        scalar_text(value).ok_or_else(|| self.invalid("match.metric.match", "a scalar"))
    }

    /// The `sampleTags` mapping.
    pub fn sample_tags(&self) -> MergeResult<&Mapping> {
        self.body
            .get("sampleTags")
            .ok_or_else(|| self.missing("sampleTags"))?
            .as_mapping()
            .ok_or_else(|| self.invalid("sampleTags", "a mapping"))
    }

    /// Raw value of a sample tag.
    ///
    /// Keys are matched by their text, so `42: a` is found under `"42"`.
    pub fn tag_value(&self, name: &str) -> MergeResult<Option<&Value>> {
        Ok(self
            .sample_tags()?
            .iter()
            .find(|(k, _)| scalar_text(k).as_deref() == Some(name))
            .map(|(_, v)| v))
    }

    /// Look up a single sample tag, rendered as text.
    pub fn tag(&self, name: &str) -> MergeResult<Option<String>> {
        match self.tag_value(name)? {
            Some(value) => scalar_text(value)
                .map(Some)
                .ok_or_else(|| self.invalid("sampleTags", "a mapping of scalar values")),
            None => Ok(None),
        }
    }

    /// Names of all sample tags.
    pub fn tag_names(&self) -> MergeResult<BTreeSet<String>> {
        Ok(self
            .sample_tags()?
            .keys()
            .filter_map(scalar_text)
            .collect())
    }

    /// Insert a segment at the front of `metric.resource`.
    pub fn prepend_resource(&mut self, segment: String) -> MergeResult<()> {
        let missing = self.missing("metric.resource");
        let invalid = self.invalid("metric.resource", "a sequence");

        let resource = self
            .body
            .get_mut("metric")
            .and_then(|m| m.get_mut("resource"))
            .ok_or(missing)?
            .as_sequence_mut()
            .ok_or(invalid)?;

        resource.insert(0, Value::String(segment));
        Ok(())
    }

    /// Segments of `metric.resource` that are plain strings.
    #[allow(dead_code)] // Used by tests and debug logging
    pub fn resource(&self) -> Vec<&str> {
        self.body
            .get("metric")
            .and_then(|m| m.get("resource"))
            .and_then(Value::as_sequence)
            .map(|seq| seq.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Mark the descriptor as enabled.
    pub fn enable(&mut self) {
        self.body.insert(
            Value::String("enabled".to_string()),
            Value::String(ENABLED_VALUE.to_string()),
        );
    }

    /// Whether the `enabled` field has been set.
    #[allow(dead_code)] // Used by tests
    pub fn is_enabled(&self) -> bool {
        self.body.get("enabled").and_then(Value::as_str) == Some(ENABLED_VALUE)
    }

    fn missing(&self, field: &'static str) -> MergeError {
        MergeError::MissingField {
            file: self.source.clone(),
            index: self.index,
            field,
        }
    }

    fn invalid(&self, field: &'static str, expected: &'static str) -> MergeError {
        MergeError::InvalidField {
            file: self.source.clone(),
            index: self.index,
            field,
            expected,
        }
    }
}

/// Render a scalar YAML value as plain text.
///
/// Returns `None` for sequences and mappings. `null` renders as an empty string.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Descriptors sharing one grouping key.
#[derive(Debug, Clone)]
pub struct CollisionGroup {
    /// The grouping key.
    pub key: String,
    /// Tag names present on every member.
    pub common_tags: BTreeSet<String>,
    /// Common tags whose value differs between members.
    pub disambiguating_tags: Vec<String>,
    /// Members in input order.
    pub members: Vec<Descriptor>,
}

/// Result of partitioning the combined descriptors.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    /// Descriptors with a unique key, already enabled.
    pub unique: Vec<Descriptor>,
    /// Groups with more than one member.
    pub collisions: Vec<CollisionGroup>,
}

impl MergeOutcome {
    /// All colliding descriptors, flattened in group order.
    pub fn collision_descriptors(&self) -> impl Iterator<Item = &Descriptor> {
        self.collisions.iter().flat_map(|g| g.members.iter())
    }

    /// Number of colliding descriptors.
    pub fn collision_count(&self) -> usize {
        self.collisions.iter().map(|g| g.members.len()).sum()
    }
}

/// A discovery file that could not be parsed.
#[derive(Debug, Clone, Serialize)]
pub struct FailedFile {
    pub path: String,
    pub error: String,
}

impl FailedFile {
    pub fn new(path: &Path, error: impl ToString) -> Self {
        Self {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Files parsed successfully.
    pub files_loaded: usize,
    /// Files skipped because of parse errors.
    pub files_failed: usize,
    /// Descriptors read across all files.
    pub descriptors: usize,
    /// Descriptors written to the metrics file.
    pub unique: usize,
    /// Descriptors written to the collisions file.
    pub collisions: usize,
    /// Distinct colliding keys.
    pub collision_groups: usize,
}

impl MergeSummary {
    pub fn new(files_loaded: usize, files_failed: usize, outcome: &MergeOutcome) -> Self {
        let unique = outcome.unique.len();
        let collisions = outcome.collision_count();
        Self {
            files_loaded,
            files_failed,
            descriptors: unique + collisions,
            unique,
            collisions,
            collision_groups: outcome.collisions.len(),
        }
    }
}
