// Source loaders: turn the configured input files into engine relations

use std::collections::HashMap;

use negdash_recon::config::{canonical, DashboardConfig, ExtractColumns, SheetSourceConfig};
use negdash_recon::model::{Cell, InputFingerprint, ReconInput, Relation, SourceRole};

use crate::csv::{read_extract, ExtractTable};
use crate::error::PipelineError;
use crate::sheet::read_sheet;
use crate::validate::{check_spreadsheet, fingerprint, require_file};

/// A loaded relation plus fingerprints of the files it came from.
#[derive(Debug)]
pub struct LoadedSource {
    pub relation: Relation,
    pub inputs: Vec<InputFingerprint>,
}

/// Load every source in presence-column order: ledger, extracts, registry.
///
/// Any gate failure (missing file, undersized or corrupt workbook, missing
/// identity column) aborts before the engine runs.
pub fn load_all(config: &DashboardConfig) -> Result<ReconInput, PipelineError> {
    config.validate()?;

    let ledger = load_sheet_source(config, &config.ledger, SourceRole::Ledger)?;
    let extracts = load_extracts(config)?;
    let registry = load_sheet_source(config, &config.registry, SourceRole::Registry)?;

    let mut input = ReconInput {
        name: config.name.clone(),
        ..Default::default()
    };
    for source in [ledger, extracts, registry] {
        input.inputs.extend(source.inputs);
        input.relations.push(source.relation);
    }
    Ok(input)
}

/// Load the ledger or registry workbook.
pub fn load_sheet_source(
    config: &DashboardConfig,
    source: &SheetSourceConfig,
    role: SourceRole,
) -> Result<LoadedSource, PipelineError> {
    let path = config.input_path(&source.file);
    check_spreadsheet(&source.name, &path, config.min_spreadsheet_bytes)?;
    let fp = fingerprint(&source.name, &path)?;

    let table = read_sheet(&path, source.sheet.as_deref(), source.skip_rows)?;
    let relation = Relation::new(
        source.name.clone(),
        role,
        table.headers,
        table.rows,
        &source.columns.to_spec(),
    )
    .map_err(|e| PipelineError::from_recon_at(e, &path))?;

    log::info!(
        "{}: {} rows from {} (sheet '{}')",
        source.name,
        relation.len(),
        path.display(),
        table.sheet
    );
    Ok(LoadedSource {
        relation,
        inputs: vec![fp],
    })
}

/// Load and concatenate the labeled CSV extracts into one relation.
pub fn load_extracts(config: &DashboardConfig) -> Result<LoadedSource, PipelineError> {
    let extracts = &config.extracts;
    let mut tables: Vec<ExtractTable> = Vec::new();
    let mut inputs = Vec::new();

    for file in &extracts.files {
        let path = config.input_path(&file.file);
        if file.optional && !path.is_file() {
            log::warn!("{}: optional extract '{}' not found at {}, skipping", extracts.name, file.label, path.display());
            continue;
        }
        require_file(&extracts.name, &path)?;
        inputs.push(fingerprint(&extracts.name, &path)?);

        let delimiter = extracts.delimiter_for(file);
        let table = read_extract(&path, &file.label, delimiter, &extracts.columns)?;
        if !table.has_column(canonical::IDENTITY) {
            return Err(PipelineError::MissingExpectedColumn {
                source_name: extracts.name.clone(),
                path,
                column: expected_identity(&extracts.columns),
            });
        }
        log::info!("{} [{}]: {} rows from {}", extracts.name, file.label, table.rows.len(), path.display());
        tables.push(table);
    }

    if tables.is_empty() {
        log::warn!("{}: no extract files were loaded", extracts.name);
    }

    let (headers, rows) = concat_tables(tables);
    let relation = Relation::new(
        extracts.name.clone(),
        SourceRole::Extract,
        headers,
        rows,
        &ExtractColumns::canonical_spec(),
    )
    .map_err(|e| PipelineError::from_recon_at(e, &config.input_dir))?
    .with_requires_companion(extracts.requires_companion);

    Ok(LoadedSource { relation, inputs })
}

fn expected_identity(columns: &ExtractColumns) -> String {
    columns
        .identity
        .first()
        .cloned()
        .unwrap_or_else(|| canonical::IDENTITY.to_string())
}

/// Union of headers in first-seen order; every row re-aligned to it.
/// With no tables the canonical headers are used so the relation stays valid.
fn concat_tables(tables: Vec<ExtractTable>) -> (Vec<String>, Vec<Vec<Cell>>) {
    if tables.is_empty() {
        let headers = [
            canonical::IDENTITY,
            canonical::NAME,
            canonical::RECORD_ID,
            canonical::DATE,
            canonical::LABEL,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        return (headers, Vec::new());
    }

    let mut headers: Vec<String> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    for table in &tables {
        for header in &table.headers {
            if !position.contains_key(header) {
                position.insert(header.clone(), headers.len());
                headers.push(header.clone());
            }
        }
    }

    let mut rows = Vec::new();
    for table in tables {
        let targets: Vec<usize> = table.headers.iter().map(|h| position[h]).collect();
        for row in table.rows {
            let mut aligned = vec![Cell::Empty; headers.len()];
            for (cell, &target) in row.into_iter().zip(&targets) {
                aligned[target] = cell;
            }
            rows.push(aligned);
        }
    }
    (headers, rows)
}

/// Check every gate without building relations. Returns the fingerprints
/// of the inputs that would be read.
pub fn check_inputs(config: &DashboardConfig) -> Result<Vec<InputFingerprint>, PipelineError> {
    config.validate()?;
    let mut inputs = Vec::new();
    for source in [&config.ledger, &config.registry] {
        let path = config.input_path(&source.file);
        check_spreadsheet(&source.name, &path, config.min_spreadsheet_bytes)?;
        inputs.push(fingerprint(&source.name, &path)?);
    }
    for file in &config.extracts.files {
        let path = config.input_path(&file.file);
        if file.optional && !path.is_file() {
            continue;
        }
        require_file(&config.extracts.name, &path)?;
        inputs.push(fingerprint(&config.extracts.name, &path)?);
    }
    Ok(inputs)
}
