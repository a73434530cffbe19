//! Block-style YAML writer with configurable indentation.
//!
//! Output follows the layout expected by the monitoring agent: mappings are
//! indented by `mapping` columns, sequence items by `sequence` columns with
//! the dash placed `offset` columns in. The root sequence is offset too.
//!
//! ```yaml
//!   - match:
//!       metric:
//!         match: cpu.load
//!     metric:
//!       resource:
//!         - cpu
//! ```

use crate::error::{MergeError, MergeResult};
use crate::models::Descriptor;
use anyhow::{Context, Result};
use serde_yaml::{Mapping, Sequence, Value};
use std::path::Path;
use tracing::info;

/// Indentation settings for the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indent {
    pub mapping: usize,
    pub sequence: usize,
    pub offset: usize,
}

impl Default for Indent {
    fn default() -> Self {
        Self {
            mapping: 2,
            sequence: 4,
            offset: 2,
        }
    }
}

impl Indent {
    /// Validate and build indentation settings.
    pub fn new(mapping: usize, sequence: usize, offset: usize) -> MergeResult<Self> {
        if sequence <= offset {
            return Err(MergeError::InvalidIndent { sequence, offset });
        }
        Ok(Self {
            mapping: mapping.max(1),
            sequence,
            offset,
        })
    }
}

/// Writes YAML values in block style.
#[derive(Debug, Clone, Default)]
pub struct YamlEmitter {
    indent: Indent,
}

impl YamlEmitter {
    pub fn new(indent: Indent) -> Self {
        Self { indent }
    }

    /// Render a whole document.
    pub fn emit(&self, value: &Value) -> MergeResult<String> {
        let lines = match value {
            Value::Sequence(seq) if !seq.is_empty() => self.sequence_lines(seq, 0)?,
            Value::Mapping(map) if !map.is_empty() => self.mapping_lines(map, 0)?,
            _ => vec![self.scalar(value)?],
        };

        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }

    /// Render descriptors as a root sequence.
    pub fn emit_descriptors<'a, I>(&self, descriptors: I) -> MergeResult<String>
    where
        I: IntoIterator<Item = &'a Descriptor>,
    {
        let seq: Sequence = descriptors
            .into_iter()
            .map(|d| Value::Mapping(d.body.clone()))
            .collect();
        self.emit(&Value::Sequence(seq))
    }

    /// Write descriptors to `path`, replacing any existing file.
    pub fn write_descriptors<'a, I>(&self, path: &Path, descriptors: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Descriptor>,
    {
        let content = self.emit_descriptors(descriptors)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
        Ok(())
    }

    fn mapping_lines(&self, map: &Mapping, col: usize) -> MergeResult<Vec<String>> {
        let pad = " ".repeat(col);
        let mut lines = Vec::new();

        for (key, value) in map {
            let key = self.key(key)?;
            let (tag, inner) = split_tag(value);
            let head = match tag {
                Some(tag) => format!("{}{}: {}", pad, key, tag),
                None => format!("{}{}:", pad, key),
            };

            match inner {
                Value::Mapping(child) if !child.is_empty() => {
                    lines.push(head);
                    lines.extend(self.mapping_lines(child, col + self.indent.mapping)?);
                }
                Value::Sequence(child) if !child.is_empty() => {
                    lines.push(head);
                    lines.extend(self.sequence_lines(child, col)?);
                }
                _ => {
                    let scalar = self.scalar(value)?;
                    if scalar.is_empty() {
                        lines.push(format!("{}{}:", pad, key));
                    } else {
                        lines.push(format!("{}{}: {}", pad, key, scalar));
                    }
                }
            }
        }

        Ok(lines)
    }

    /// Items of a sequence whose parent node sits at column `parent`.
    fn sequence_lines(&self, seq: &Sequence, parent: usize) -> MergeResult<Vec<String>> {
        let Indent {
            sequence, offset, ..
        } = self.indent;
        let content = parent + sequence;
        let dash = format!(
            "{}-{}",
            " ".repeat(parent + offset),
            " ".repeat(sequence - offset - 1)
        );

        let mut lines = Vec::new();
        for item in seq {
            let (tag, inner) = split_tag(item);
            let nested = match inner {
                Value::Mapping(map) if !map.is_empty() => Some(self.mapping_lines(map, content)?),
                Value::Sequence(child) if !child.is_empty() => {
                    Some(self.sequence_lines(child, content - offset)?)
                }
                _ => None,
            };

            match (nested, tag) {
                (Some(nested), None) => {
                    let mut nested = nested.into_iter();
                    if let Some(first) = nested.next() {
                        lines.push(format!("{}{}", dash, &first[content..]));
                    }
                    lines.extend(nested);
                }
                (Some(nested), Some(tag)) => {
                    lines.push(format!("{}{}", dash, tag));
                    lines.extend(nested);
                }
                (None, _) => {
                    let scalar = self.scalar(item)?;
                    lines.push(format!("{}{}", dash, scalar).trim_end().to_string());
                }
            }
        }

        Ok(lines)
    }

    fn key(&self, key: &Value) -> MergeResult<String> {
        match key {
            Value::Null => Ok("null".to_string()),
            Value::Sequence(_) | Value::Mapping(_) => Err(MergeError::UnsupportedKey),
            _ => self.scalar(key),
        }
    }

    /// Render a scalar (or empty collection) on a single line.
    fn scalar(&self, value: &Value) -> MergeResult<String> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Sequence(seq) if seq.is_empty() => Ok("[]".to_string()),
            Value::Mapping(map) if map.is_empty() => Ok("{}".to_string()),
            Value::Sequence(_) | Value::Mapping(_) => Err(MergeError::UnsupportedKey),
            Value::Tagged(tagged) => {
                let inner = self.scalar(&tagged.value)?;
                Ok(format!("{} {}", tagged.tag, inner).trim_end().to_string())
            }
            Value::String(s) if s.contains('\n') => Ok(serde_json::to_string(s)?),
            _ => {
                let rendered = serde_yaml::to_string(value)?;
                let rendered = rendered.trim_end_matches('\n');
                match value {
                    // long plain scalars may be folded over several lines
                    Value::String(s) if rendered.contains('\n') => Ok(serde_json::to_string(s)?),
                    _ => Ok(rendered.to_string()),
                }
            }
        }
    }
}

fn split_tag(value: &Value) -> (Option<String>, &Value) {
    match value {
        Value::Tagged(tagged) => (Some(tagged.tag.to_string()), &tagged.value),
        other => (None, other),
    }
}
