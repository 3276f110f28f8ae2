use std::collections::{BTreeSet, HashSet};

use crate::classify::{derive_status, resolve_movement, Presence};
use crate::display::{display_text, format_timestamp, PLACEHOLDER};
use crate::error::ReconError;
use crate::evidence::compute_summary;
use crate::index::{index_relation, KeyIndex};
use crate::model::{
    Cell, Movement, ReconInput, ReconMeta, ReconResult, ReconWarning, ReconciledRecord, Relation,
    SourcePresence, SourceRole, Status,
};

/// Run reconciliation over pre-loaded relations. Returns one record per
/// distinct document plus summary counts.
pub fn run(input: &ReconInput) -> Result<ReconResult, ReconError> {
    validate_input(input)?;

    let indexes: Vec<KeyIndex> = input.relations.iter().map(index_relation).collect();

    let mut warnings = Vec::new();
    for (relation, index) in input.relations.iter().zip(&indexes) {
        let mut duplicated: Vec<(&str, usize)> = index.duplicated().collect();
        duplicated.sort_unstable();
        for (document, rows) in duplicated {
            log::debug!("{}: document {document} appears in {rows} rows, using the first", relation.name);
            warnings.push(ReconWarning::AmbiguousKeyMatch {
                source: relation.name.clone(),
                document: document.to_string(),
                rows,
            });
        }
    }

    let universe: BTreeSet<&str> = indexes.iter().flat_map(KeyIndex::keys).collect();
    log::info!(
        "reconciling {} document(s) across {} source(s)",
        universe.len(),
        input.relations.len()
    );

    let mut records = Vec::with_capacity(universe.len());
    for key in universe {
        let (record, conflict) = build_record(key, &input.relations, &indexes);
        if let Some(ledger_movement) = conflict {
            warnings.push(ReconWarning::MovementConflict {
                document: record.document.clone(),
                movement: ledger_movement,
                status: record.status,
            });
        }
        records.push(record);
    }

    let summary = compute_summary(&records, &input.relations, &indexes, &warnings);

    if summary.ambiguous_matches > 0 {
        log::warn!(
            "{} document(s) matched more than one row in a source; the first row was used",
            summary.ambiguous_matches
        );
    }
    if summary.movement_conflicts > 0 {
        log::warn!(
            "{} document(s) carry a ledger movement that contradicts their status",
            summary.movement_conflicts
        );
    }
    for status in Status::ALL {
        log::info!("{status}: {}", summary.count(status));
    }

    Ok(ReconResult {
        meta: ReconMeta {
            name: input.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            sources: input.relations.iter().map(|r| r.name.clone()).collect(),
            inputs: input.inputs.clone(),
        },
        summary,
        records,
        warnings,
    })
}

/// Exactly one registry, at least one other source, unique source names.
fn validate_input(input: &ReconInput) -> Result<(), ReconError> {
    let mut seen = HashSet::new();
    for relation in &input.relations {
        if !seen.insert(relation.name.as_str()) {
            return Err(ReconError::InvalidInput(format!(
                "source '{}' appears more than once",
                relation.name
            )));
        }
    }

    let registries = input
        .relations
        .iter()
        .filter(|r| r.role == SourceRole::Registry)
        .count();
    if registries != 1 {
        return Err(ReconError::InvalidInput(format!(
            "exactly one registry source is required, found {registries}"
        )));
    }

    if input.relations.len() < 2 {
        return Err(ReconError::InvalidInput(
            "at least one source besides the registry is required".into(),
        ));
    }

    Ok(())
}

/// First matching row of a source, if the source holds `key`.
struct Hit<'a> {
    relation: &'a Relation,
    index: &'a KeyIndex,
    row: usize,
}

/// Build the record for one key. The second value is the ledger movement
/// when it contradicts the derived status.
fn build_record(
    key: &str,
    relations: &[Relation],
    indexes: &[KeyIndex],
) -> (ReconciledRecord, Option<Movement>) {
    let hits: Vec<Option<Hit<'_>>> = relations
        .iter()
        .zip(indexes)
        .map(|(relation, index)| index.first(key).map(|row| Hit { relation, index, row }))
        .collect();

    let mut presence = Presence::default();
    let mut flags = Vec::with_capacity(relations.len());
    for (relation, hit) in relations.iter().zip(&hits) {
        let present = hit.is_some();
        match relation.role {
            SourceRole::Registry => presence.registry |= present,
            _ => {
                presence.other |= present;
                presence.standalone_other |= present && !relation.requires_companion;
            }
        }
        flags.push(SourcePresence {
            source: relation.name.clone(),
            role: relation.role,
            present,
        });
    }

    let status = derive_status(presence);

    let extract_hits: Vec<&Hit<'_>> = hits
        .iter()
        .flatten()
        .filter(|h| h.relation.role == SourceRole::Extract)
        .collect();
    let ledger_hit = hits
        .iter()
        .flatten()
        .find(|h| h.relation.role == SourceRole::Ledger);

    let ledger_movement = ledger_hit.and_then(|h| {
        h.relation
            .field(h.row, h.relation.columns.movement)
            .and_then(|cell| Movement::parse(&cell.to_string()))
    });
    let (movement, conflict) = resolve_movement(ledger_movement, status);

    // Display fields: extract rows first, then the ledger, then the placeholder.
    let from_extracts = |pick: fn(&Relation) -> Option<usize>| {
        extract_hits
            .iter()
            .find_map(|h| h.relation.field(h.row, pick(h.relation)))
            .map(display_text)
    };
    let from_ledger = |pick: fn(&Relation) -> Option<usize>, render: fn(&Cell) -> String| {
        ledger_hit.and_then(|h| h.relation.field(h.row, pick(h.relation)).map(render))
    };

    let record_id = from_extracts(|r| r.columns.record_id)
        .or_else(|| from_ledger(|r| r.columns.record_id, display_text))
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let name = from_extracts(|r| r.columns.name)
        .or_else(|| from_ledger(|r| r.columns.name, display_text))
        .unwrap_or_else(|| PLACEHOLDER.to_string());
    let date = from_extracts(|r| r.columns.date)
        .or_else(|| from_ledger(|r| r.columns.date, format_timestamp))
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let mut labels: Vec<String> = Vec::new();
    for hit in &extract_hits {
        for &row in hit.index.matches(key) {
            if let Some(label) = hit.relation.field(row, hit.relation.columns.label) {
                let label = display_text(label);
                if !labels.contains(&label) {
                    labels.push(label);
                }
            }
        }
    }

    let record = ReconciledRecord {
        document: key.to_string(),
        record_id,
        name,
        date,
        presence: flags,
        labels,
        movement,
        status,
    };

    (record, ledger_movement.filter(|_| conflict))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnSpec;

    fn ledger(rows: &[(&str, &str)]) -> Relation {
        let spec = ColumnSpec {
            identity: "Documento".into(),
            record_id: Some("Id".into()),
            date: Some("Data / Hora".into()),
            movement: Some("Tipo".into()),
            ..Default::default()
        };
        let headers = ["Id", "Documento", "Data / Hora", "Tipo"].map(String::from).to_vec();
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, (doc, tipo))| {
                vec![
                    Cell::Number((i + 1) as f64),
                    Cell::text(*doc),
                    Cell::text("05/02/2025 09:15:00"),
                    Cell::text(*tipo),
                ]
            })
            .collect();
        Relation::new("CNM", SourceRole::Ledger, headers, rows, &spec).unwrap()
    }

    fn registry(docs: &[&str]) -> Relation {
        let spec = ColumnSpec {
            identity: "CPF/CNPJ".into(),
            ..Default::default()
        };
        let rows = docs.iter().map(|d| vec![Cell::text(*d)]).collect();
        Relation::new("SGP", SourceRole::Registry, vec!["CPF/CNPJ".into()], rows, &spec).unwrap()
    }

    fn extract(rows: &[(&str, &str, &str)]) -> Relation {
        let spec = ColumnSpec {
            identity: "documento".into(),
            name: Some("devedor".into()),
            record_id: Some("Unique ID".into()),
            date: Some("data".into()),
            label: Some("fonte".into()),
            ..Default::default()
        };
        let headers = ["documento", "devedor", "Unique ID", "data", "fonte"].map(String::from).to_vec();
        let rows = rows
            .iter()
            .map(|(doc, name, label)| {
                vec![
                    Cell::text(*doc),
                    Cell::text(*name),
                    Cell::text(format!("uid-{doc}")),
                    Cell::text("10/01/2025"),
                    Cell::text(*label),
                ]
            })
            .collect();
        Relation::new("SOA", SourceRole::Extract, headers, rows, &spec).unwrap()
    }

    fn input(relations: Vec<Relation>) -> ReconInput {
        ReconInput {
            name: "test".into(),
            relations,
            inputs: vec![],
        }
    }

    fn record<'a>(result: &'a ReconResult, doc: &str) -> &'a ReconciledRecord {
        result.records.iter().find(|r| r.document == doc).unwrap()
    }

    #[test]
    fn ledger_fields_used_when_no_extract() {
        let result = run(&input(vec![ledger(&[("111", "INCLUSAO")]), extract(&[]), registry(&["111"])])).unwrap();
        let r = record(&result, "111");
        assert_eq!(r.status, Status::Negativado);
        assert_eq!(r.movement, Movement::Inclusion);
        assert_eq!(r.record_id, "1");
        assert_eq!(r.date, "05/02/2025 09:15");
        assert_eq!(r.name, "-");
    }

    #[test]
    fn extract_fields_preferred() {
        let result = run(&input(vec![
            ledger(&[("111", "INCLUSAO")]),
            extract(&[("111", "Maria", "Ativas")]),
            registry(&["111"]),
        ]))
        .unwrap();
        let r = record(&result, "111");
        assert_eq!(r.name, "Maria");
        assert_eq!(r.record_id, "uid-111");
        assert_eq!(r.date, "10/01/2025");
        assert_eq!(r.labels, vec!["Ativas"]);
        assert_eq!(
            r.presence.iter().map(|p| p.present).collect::<Vec<_>>(),
            vec![true, true, true]
        );
    }

    #[test]
    fn extract_only_without_registry_is_baixado() {
        let result = run(&input(vec![ledger(&[]), extract(&[("444", "Ana", "Baixadas")]), registry(&[])])).unwrap();
        let r = record(&result, "444");
        assert_eq!(r.status, Status::Baixado);
        assert_eq!(r.movement, Movement::Exclusion);
    }

    #[test]
    fn companion_only_source_is_erro() {
        let soa = extract(&[("444", "Ana", "Pendentes")]).with_requires_companion(true);
        let result = run(&input(vec![ledger(&[]), soa, registry(&[])])).unwrap();
        assert_eq!(record(&result, "444").status, Status::Erro);
    }

    #[test]
    fn duplicates_flagged_first_row_used() {
        let result = run(&input(vec![
            ledger(&[]),
            extract(&[("555", "Primeiro", "Ativas"), ("555", "Segundo", "Erros")]),
            registry(&["555"]),
        ]))
        .unwrap();
        let r = record(&result, "555");
        assert_eq!(r.name, "Primeiro");
        assert_eq!(r.labels, vec!["Ativas", "Erros"]);
        assert_eq!(result.summary.ambiguous_matches, 1);
        assert!(result.warnings.contains(&ReconWarning::AmbiguousKeyMatch {
            source: "SOA".into(),
            document: "555".into(),
            rows: 2,
        }));
    }

    #[test]
    fn ledger_exclusion_still_in_registry_is_conflict() {
        let result = run(&input(vec![ledger(&[("666", "EXCLUSAO")]), extract(&[]), registry(&["666"])])).unwrap();
        let r = record(&result, "666");
        assert_eq!(r.status, Status::Negativado);
        assert_eq!(r.movement, Movement::Exclusion);
        assert_eq!(result.summary.movement_conflicts, 1);
    }

    #[test]
    fn rejects_missing_registry() {
        let err = run(&input(vec![ledger(&[]), extract(&[])])).unwrap_err();
        assert!(err.to_string().contains("registry"));
    }

    #[test]
    fn rejects_registry_alone() {
        let err = run(&input(vec![registry(&["1"])])).unwrap_err();
        assert!(err.to_string().contains("besides the registry"));
    }

    #[test]
    fn rejects_duplicate_source_names() {
        let mut other = extract(&[]);
        other.name = "CNM".into();
        let err = run(&input(vec![ledger(&[]), other, registry(&[])])).unwrap_err();
        assert!(err.to_string().contains("'CNM'"));
    }
}
