//! MetricMerge - consolidate discovered metric descriptors
//!
//! A CLI tool that merges `metrics.discovered.*.yaml` fragments into a
//! single metrics file and sets colliding descriptors aside for manual
//! disambiguation.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing directory, unreadable file, bad descriptor, etc.)
//!   2 - Collisions found and --fail_on_collisions set

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scanner;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE};
use models::MergeSummary;
use report::{CollisionReport, YamlEmitter};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init_config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("MetricMerge v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(&args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Merge failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init_config: generate a default .metricmerge.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize discovery, prepend tags, and output files.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Options that only affect how a run ends, not what it computes.
#[derive(Debug, Clone, Copy, Default)]
struct RunOptions {
    dry_run: bool,
    fail_on_collisions: bool,
}

/// Load configuration and run the merge. Returns exit code (0 or 2).
fn run(args: &Args) -> Result<i32> {
    let mut config = load_config(args)?;
    config.merge_with_args(args);

    let options = RunOptions {
        dry_run: args.dry_run,
        fail_on_collisions: args.fail_on_collisions,
    };

    merge_metrics(&config, options)
}

/// Run the complete merge: load, group, report, write.
fn merge_metrics(config: &Config, options: RunOptions) -> Result<i32> {
    // Validate output layout before touching any input
    let emitter = YamlEmitter::new(config.output.indent()?);

    // Step 1: Load descriptors
    let source = config.input_source();
    debug!("Input source: {:?}", source);
    let files = source.files()?;
    if files.is_empty() {
        warn!("No discovery files found");
    }

    let inputs = scanner::load_files(&files)?;
    info!(
        "Loaded {} descriptor(s) from {} file(s), {} skipped",
        inputs.descriptors.len(),
        inputs.loaded.len(),
        inputs.failed.len()
    );

    // Step 2: Group and partition
    let outcome = analysis::merge(inputs.descriptors, &config.grouping.prepend_tags)?;
    let summary = MergeSummary::new(inputs.loaded.len(), inputs.failed.len(), &outcome);

    // Step 3: Report collisions
    print!("{}", report::generate_collision_report(&outcome));

    if let Some(ref report_path) = config.output.report_file {
        let collision_report = CollisionReport::new(summary.clone(), inputs.failed, &outcome);
        if options.dry_run {
            info!("Dry run: not writing {}", report_path.display());
        } else {
            report::write_json_report(&collision_report, report_path)?;
        }
    }

    // Step 4: Write outputs
    let metrics_file = &config.output.metrics_file;
    let collisions_file = &config.output.collisions_file;

    if options.dry_run {
        println!("\n🔍 Dry run: no files written.");
    } else {
        emitter.write_descriptors(metrics_file, &outcome.unique)?;
        emitter.write_descriptors(collisions_file, outcome.collision_descriptors())?;
    }

    print!(
        "{}",
        report::generate_summary(&summary, metrics_file, collisions_file)
    );

    // Check --fail_on_collisions
    if options.fail_on_collisions && summary.collision_groups > 0 {
        eprintln!(
            "\n⛔ {} colliding key(s) found. Failing (exit code 2).",
            summary.collision_groups
        );
        return Ok(2);
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn fragment(name: &str, tags: &str) -> String {
        format!(
            "- match:\n    metric:\n      match: {}\n  sampleTags:\n{}  metric:\n    resource:\n      - {}\n",
            name, tags, name
        )
    }

    fn config_for(dir: &Path) -> Config {
        let mut config = Config::default();
        config.discovery.dir = dir.to_path_buf();
        config.output.metrics_file = dir.join("metrics.yaml");
        config.output.collisions_file = dir.join("collisions.yaml");
        config
    }

    fn read_sequence(path: &Path) -> Vec<Value> {
        let content = fs::read_to_string(path).unwrap();
        match serde_yaml::from_str(&content).unwrap() {
            Value::Sequence(seq) => seq,
            other => panic!("expected sequence, got {:?}", other),
        }
    }

    #[test]
    fn test_end_to_end_distinct_sources() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("metrics.discovered.a.yaml"),
            fragment("cpu.load", "    source: hostA\n"),
        )
        .unwrap();
        fs::write(
            dir.path().join("metrics.discovered.b.yaml"),
            fragment("cpu.load", "    source: hostB\n"),
        )
        .unwrap();

        let config = config_for(dir.path());
        let code = merge_metrics(&config, RunOptions::default()).unwrap();
        assert_eq!(code, 0);

        let metrics = read_sequence(&config.output.metrics_file);
        assert_eq!(metrics.len(), 2);
        for m in &metrics {
            assert_eq!(m["enabled"], Value::String("true".to_string()));
        }
        assert_eq!(metrics[0]["sampleTags"]["source"].as_str(), Some("hostA"));

        let collisions = fs::read_to_string(&config.output.collisions_file).unwrap();
        assert_eq!(collisions, "[]\n");
    }

    #[test]
    fn test_end_to_end_collision_and_prepend() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("metrics.discovered.a.yaml"),
            fragment("cpu.load", "    source: s\n    region: us\n"),
        )
        .unwrap();
        fs::write(
            dir.path().join("metrics.discovered.b.yaml"),
            fragment("cpu.load", "    source: s\n    region: eu\n"),
        )
        .unwrap();

        let mut config = config_for(dir.path());
        let options = RunOptions {
            fail_on_collisions: true,
            ..Default::default()
        };
        assert_eq!(merge_metrics(&config, options).unwrap(), 2);
        assert!(read_sequence(&config.output.metrics_file).is_empty());

        let collisions = read_sequence(&config.output.collisions_file);
        assert_eq!(collisions.len(), 2);
        assert!(collisions.iter().all(|c| c.get("enabled").is_none()));

        config.grouping.prepend_tags = vec!["region".to_string()];
        assert_eq!(merge_metrics(&config, options).unwrap(), 0);

        let metrics = read_sequence(&config.output.metrics_file);
        assert_eq!(metrics.len(), 2);
        assert_eq!(
            metrics[0]["metric"]["resource"][0].as_str(),
            Some("${tag:region}")
        );
    }

    #[test]
    fn test_malformed_file_does_not_block_others() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("metrics.discovered.bad.yaml"),
            "- match: {metric: [\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("metrics.discovered.good.yaml"),
            fragment("mem.used", "    source: hostA\n"),
        )
        .unwrap();

        let mut config = config_for(dir.path());
        config.output.report_file = Some(dir.path().join("report.json"));
        assert_eq!(merge_metrics(&config, RunOptions::default()).unwrap(), 0);

        assert_eq!(read_sequence(&config.output.metrics_file).len(), 1);

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report["summary"]["files_failed"], 1);
        assert_eq!(report["summary"]["unique"], 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("metrics.discovered.a.yaml"),
            fragment("cpu.load", "    source: hostA\n"),
        )
        .unwrap();

        let config = config_for(dir.path());
        let options = RunOptions {
            dry_run: true,
            ..Default::default()
        };
        assert_eq!(merge_metrics(&config, options).unwrap(), 0);
        assert!(!config.output.metrics_file.exists());
        assert!(!config.output.collisions_file.exists());
    }

    #[test]
    fn test_missing_discovery_dir_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir.path().join("missing"));
        assert!(merge_metrics(&config, RunOptions::default()).is_err());
    }

    #[test]
    fn test_missing_required_field_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("metrics.discovered.a.yaml"),
            "- sampleTags: {source: x}\n  metric: {resource: []}\n",
        )
        .unwrap();

        let config = config_for(dir.path());
        let err = merge_metrics(&config, RunOptions::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("match.metric.match"));
    }
}
