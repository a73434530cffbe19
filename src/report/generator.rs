//! Collision report generation.
//!
//! The console report lists every colliding key with the tags that tell
//! its members apart. The JSON report carries the same data plus the run
//! summary, for tooling that wants to act on collisions.

use crate::models::{scalar_text, CollisionGroup, FailedFile, MergeOutcome, MergeSummary};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_yaml::Mapping;
use std::path::Path;

const RULE: &str = "*************************************";

/// Render the console collision report.
pub fn generate_collision_report(outcome: &MergeOutcome) -> String {
    let mut output = String::new();

    output.push_str(RULE);
    output.push_str("\nCOLLISIONS\n");
    output.push_str(RULE);
    output.push('\n');

    for group in &outcome.collisions {
        output.push_str(&generate_group_block(group));
    }

    output.push_str(RULE);
    output.push('\n');
    output
}

/// Render one collision group.
fn generate_group_block(group: &CollisionGroup) -> String {
    let mut block = format!(
        "{}, disambiguating_tags: [{}]\n",
        group.key,
        group.disambiguating_tags.join(", ")
    );

    for member in &group.members {
        let tags = member
            .sample_tags()
            .map(flow_mapping)
            .unwrap_or_else(|_| "{}".to_string());
        block.push_str(&format!("\t tags : {}\n", tags));
    }

    block
}

/// Render a tag mapping on one line, e.g. `{source: hostA, port: 8080}`.
fn flow_mapping(tags: &Mapping) -> String {
    let pairs: Vec<String> = tags
        .iter()
        .map(|(k, v)| {
            format!(
                "{}: {}",
                scalar_text(k).unwrap_or_default(),
                scalar_text(v).unwrap_or_else(|| "...".to_string())
            )
        })
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

/// Render the closing summary lines.
pub fn generate_summary(summary: &MergeSummary, metrics_file: &Path, collisions_file: &Path) -> String {
    format!(
        "Found {} collisions and added to {}\nAdded {} discovered into {}\n",
        summary.collisions,
        collisions_file.display(),
        summary.unique,
        metrics_file.display()
    )
}

/// Machine-readable collision report.
#[derive(Debug, Serialize)]
pub struct CollisionReport {
    pub summary: MergeSummary,
    pub failed_files: Vec<FailedFile>,
    pub collisions: Vec<CollisionEntry>,
}

/// One colliding key in the JSON report.
#[derive(Debug, Serialize)]
pub struct CollisionEntry {
    pub key: String,
    pub disambiguating_tags: Vec<String>,
    pub common_tags: Vec<String>,
    pub members: Vec<CollisionMember>,
}

/// One descriptor of a colliding key.
#[derive(Debug, Serialize)]
pub struct CollisionMember {
    pub file: String,
    pub index: usize,
    pub sample_tags: Mapping,
}

impl CollisionReport {
    pub fn new(summary: MergeSummary, failed_files: Vec<FailedFile>, outcome: &MergeOutcome) -> Self {
        let collisions = outcome
            .collisions
            .iter()
            .map(|group| CollisionEntry {
                key: group.key.clone(),
                disambiguating_tags: group.disambiguating_tags.clone(),
                common_tags: group.common_tags.iter().cloned().collect(),
                members: group
                    .members
                    .iter()
                    .map(|d| CollisionMember {
                        file: d.source.display().to_string(),
                        index: d.index,
                        sample_tags: d.sample_tags().cloned().unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            summary,
            failed_files,
            collisions,
        }
    }
}

/// Generate a JSON report.
pub fn generate_json_report(report: &CollisionReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &CollisionReport, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
