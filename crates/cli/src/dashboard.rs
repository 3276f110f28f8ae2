//! `negdash run | validate | report | config`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use negdash_io::artifact::read_artifact;
use negdash_io::loader::load_all;
use negdash_io::{run_pipeline, PipelineError};
use negdash_recon::model::ReconResult;
use negdash_recon::{DashboardConfig, Status};

use crate::exit_codes::{pipeline_exit_code, recon_exit_code, EXIT_ERROR, EXIT_INVALID_CONFIG};
use crate::CliError;

pub const DEFAULT_CONFIG_FILE: &str = "negdash.toml";

/// Resolve the effective config.
///
/// An explicit path must exist. Without one, `./negdash.toml` is used when
/// present and built-in defaults otherwise. Relative directories are taken
/// from the config file's directory.
pub fn load_config(path: Option<&Path>) -> Result<DashboardConfig, CliError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    if !path.is_file() {
        if explicit {
            return Err(CliError::new(
                EXIT_INVALID_CONFIG,
                format!("config file not found: {}", path.display()),
            ));
        }
        log::info!("no {DEFAULT_CONFIG_FILE} in working directory, using built-in defaults");
        return Ok(DashboardConfig::default());
    }

    let text = std::fs::read_to_string(&path).map_err(|e| {
        CliError::new(EXIT_INVALID_CONFIG, format!("cannot read {}: {e}", path.display()))
    })?;
    let mut config = DashboardConfig::from_toml(&text).map_err(|e| {
        CliError::new(recon_exit_code(&e), format!("{}: {e}", path.display()))
    })?;
    config
        .validate()
        .map_err(|e| CliError::new(recon_exit_code(&e), format!("{}: {e}", path.display())))?;

    let base = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    config.rebase(base);
    log::debug!("loaded config from {}", path.display());
    Ok(config)
}

fn pipeline_err(err: PipelineError) -> CliError {
    let code = pipeline_exit_code(&err);
    let hint = match &err {
        PipelineError::MissingInputFile { .. } => {
            Some("check input_dir in the config, or mark the extract optional")
        }
        PipelineError::UndersizedOrCorruptInput { .. } => {
            Some("the download may still be in progress; retry once it completes")
        }
        PipelineError::MissingExpectedColumn { .. } => {
            Some("check the [*.columns] section of the config against the file header")
        }
        _ => None,
    };
    let cli = CliError::new(code, err.to_string());
    match hint {
        Some(h) => cli.with_hint(h),
        None => cli,
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;
    println!("{json}");
    Ok(())
}

fn status_line(counts: &BTreeMap<Status, usize>) -> String {
    Status::ALL
        .iter()
        .map(|s| format!("{} {}", counts.get(s).copied().unwrap_or(0), s))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(config: Option<&Path>, json: bool, quiet: bool) -> Result<(), CliError> {
    let config = load_config(config)?;
    let run = run_pipeline(&config).map_err(pipeline_err)?;

    if json {
        print_json(&run.result)?;
    }
    if !quiet {
        print_summary(&run.result);
        eprintln!("wrote {}", run.output.artifact.display());
        eprintln!("wrote {}", run.output.presentation.display());
    }
    Ok(())
}

fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    let counts: BTreeMap<Status, usize> = Status::ALL.iter().map(|&st| (st, s.count(st))).collect();
    eprintln!(
        "{}: {} documents from {} - {}",
        result.meta.name,
        s.total_records,
        result.meta.sources.join(" | "),
        status_line(&counts),
    );
    if s.ambiguous_matches > 0 || s.blank_keys > 0 || s.movement_conflicts > 0 {
        eprintln!(
            "data quality: {} ambiguous keys, {} blank keys, {} movement conflicts",
            s.ambiguous_matches, s.blank_keys, s.movement_conflicts,
        );
    }
}

// ============================================================================
// validate
// ============================================================================

pub fn cmd_validate(config: Option<&Path>, json: bool, quiet: bool) -> Result<(), CliError> {
    let config = load_config(config)?;
    let input = load_all(&config).map_err(pipeline_err)?;

    if json {
        print_json(&input.inputs)?;
    }
    if !quiet {
        for relation in &input.relations {
            eprintln!("{:<8} {:>7} rows  ({} columns)", relation.name, relation.len(), relation.headers.len());
        }
        eprintln!("ok: {} input files passed", input.inputs.len());
    }
    Ok(())
}

// ============================================================================
// report
// ============================================================================

#[derive(serde::Serialize)]
struct Report<'a> {
    artifact: String,
    total: usize,
    counts: BTreeMap<Status, usize>,
    rows: &'a [negdash_io::artifact::ArtifactRow],
}

pub fn cmd_report(artifact: &Path, json: bool, quiet: bool) -> Result<(), CliError> {
    let rows = read_artifact(artifact).map_err(pipeline_err)?;
    let mut counts: BTreeMap<Status, usize> = Status::ALL.iter().map(|&s| (s, 0)).collect();
    for row in &rows {
        *counts.entry(row.status).or_insert(0) += 1;
    }

    if json {
        print_json(&Report {
            artifact: artifact.display().to_string(),
            total: rows.len(),
            counts: counts.clone(),
            rows: &rows,
        })?;
    }
    if !quiet {
        eprintln!("{}: {} documents - {}", artifact.display(), rows.len(), status_line(&counts));
    }
    Ok(())
}

// ============================================================================
// config
// ============================================================================

pub fn cmd_config(config: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config)?;
    let text = config
        .to_toml()
        .map_err(|e| CliError::new(EXIT_ERROR, e.to_string()))?;
    print!("{text}");
    Ok(())
}
