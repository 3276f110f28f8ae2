use std::collections::BTreeSet;

use negdash_recon::model::{Cell, ColumnSpec, ReconInput, Relation, SourceRole};
use negdash_recon::{run, Movement, ReconResult, Status};

fn spec(identity: &str) -> ColumnSpec {
    ColumnSpec {
        identity: identity.into(),
        name: Some("nome".into()),
        record_id: Some("id".into()),
        date: Some("data".into()),
        movement: Some("Tipo".into()),
        label: Some("fonte".into()),
    }
}

/// Ledger rows: (document, movement).
fn cnm(rows: &[(&str, &str)]) -> Relation {
    let headers = ["Documento", "nome", "id", "data", "Tipo"].map(String::from).to_vec();
    let rows = rows
        .iter()
        .map(|(doc, tipo)| {
            vec![
                Cell::text(*doc),
                Cell::text("Cliente CNM"),
                Cell::Number(7.0),
                Cell::text("01/03/2025 10:20:30"),
                Cell::text(*tipo),
            ]
        })
        .collect();
    Relation::new("CNM", SourceRole::Ledger, headers, rows, &spec("Documento")).unwrap()
}

fn sgp(docs: &[&str]) -> Relation {
    let rows = docs.iter().map(|d| vec![Cell::text(*d)]).collect();
    let spec = ColumnSpec {
        identity: "CPF/CNPJ".into(),
        ..Default::default()
    };
    Relation::new("SGP", SourceRole::Registry, vec!["CPF/CNPJ".into()], rows, &spec).unwrap()
}

/// Extract rows: (document, label).
fn soa(rows: &[(&str, &str)]) -> Relation {
    let headers = ["documento", "nome", "id", "data", "fonte"].map(String::from).to_vec();
    let rows = rows
        .iter()
        .map(|(doc, label)| {
            vec![
                Cell::text(*doc),
                Cell::text("Cliente SOA"),
                Cell::text("abc-1"),
                Cell::text("02/03/2025"),
                Cell::text(*label),
            ]
        })
        .collect();
    Relation::new("SOA", SourceRole::Extract, headers, rows, &spec("documento")).unwrap()
}

fn reconcile(relations: Vec<Relation>) -> ReconResult {
    run(&ReconInput {
        name: "integration".into(),
        relations,
        inputs: vec![],
    })
    .unwrap()
}

fn status_of(result: &ReconResult, doc: &str) -> Status {
    result
        .records
        .iter()
        .find(|r| r.document == doc)
        .unwrap_or_else(|| panic!("no record for {doc}"))
        .status
}

#[test]
fn scenario_a_registry_and_ledger_inclusion() {
    let result = reconcile(vec![cnm(&[("111", "INCLUSAO")]), soa(&[]), sgp(&["111"])]);
    assert_eq!(status_of(&result, "111"), Status::Negativado);
    assert_eq!(result.records[0].movement, Movement::Inclusion);
}

#[test]
fn scenario_b_ledger_exclusion_missing_from_registry() {
    let result = reconcile(vec![cnm(&[("222", "EXCLUSAO")]), soa(&[]), sgp(&[])]);
    assert_eq!(status_of(&result, "222"), Status::Baixado);
    assert_eq!(result.records[0].movement, Movement::Exclusion);
}

#[test]
fn scenario_c_registry_alone() {
    let result = reconcile(vec![cnm(&[]), soa(&[]), sgp(&["333"])]);
    assert_eq!(status_of(&result, "333"), Status::Erro);
    assert_eq!(result.records[0].movement, Movement::Unknown);
}

#[test]
fn three_way_presence_is_negativado() {
    let result = reconcile(vec![
        cnm(&[("123.456.789-00", "INCLUSAO")]),
        soa(&[("12345678900", "Ativas")]),
        sgp(&["12345678900.0"]),
    ]);
    assert_eq!(result.records.len(), 1);
    let record = &result.records[0];
    assert_eq!(record.document, "12345678900");
    assert_eq!(record.status, Status::Negativado);
    assert!(record.presence.iter().all(|p| p.present));
    // Extract display fields win over the ledger's.
    assert_eq!(record.name, "Cliente SOA");
    assert_eq!(record.date, "02/03/2025");
}

#[test]
fn keys_normalized_uniformly_across_sources() {
    // The same CPF spelled three ways must collapse into one record.
    let result = reconcile(vec![
        cnm(&[("987.654.321-00", "INCLUSAO")]),
        soa(&[("98765432100", "Ativas")]),
        sgp(&["98765432100.0"]),
    ]);
    assert_eq!(result.summary.total_records, 1);
}

#[test]
fn universe_is_union_of_sources() {
    let result = reconcile(vec![
        cnm(&[("1", "INCLUSAO"), ("2", "EXCLUSAO")]),
        soa(&[("2", "Baixadas"), ("3", "Ativas")]),
        sgp(&["1", "4"]),
    ]);
    let docs: BTreeSet<&str> = result.records.iter().map(|r| r.document.as_str()).collect();
    assert_eq!(docs, BTreeSet::from(["1", "2", "3", "4"]));
    assert_eq!(status_of(&result, "1"), Status::Negativado);
    assert_eq!(status_of(&result, "2"), Status::Baixado);
    assert_eq!(status_of(&result, "3"), Status::Baixado);
    assert_eq!(status_of(&result, "4"), Status::Erro);
    assert_eq!(result.summary.negativado, 1);
    assert_eq!(result.summary.baixado, 2);
    assert_eq!(result.summary.erro, 1);
}

#[test]
fn summary_reports_per_source_stats() {
    let result = reconcile(vec![
        cnm(&[("1", "INCLUSAO"), ("", "INCLUSAO")]),
        soa(&[("1", "Ativas"), ("1", "Erros")]),
        sgp(&["1"]),
    ]);
    let cnm_stats = &result.summary.sources[0];
    assert_eq!(cnm_stats.source, "CNM");
    assert_eq!(cnm_stats.rows, 2);
    assert_eq!(cnm_stats.keys, 1);
    assert_eq!(cnm_stats.blank_keys, 1);
    assert_eq!(result.summary.blank_keys, 1);
    assert_eq!(result.summary.ambiguous_matches, 1);
    assert_eq!(result.meta.sources, vec!["CNM", "SOA", "SGP"]);
}

#[test]
fn result_serializes_with_uppercase_enums() {
    let result = reconcile(vec![cnm(&[("222", "EXCLUSAO")]), soa(&[]), sgp(&[])]);
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["records"][0]["status"], "BAIXADO");
    assert_eq!(json["records"][0]["movement"], "EXCLUSAO");
    assert_eq!(json["records"][0]["presence"][0]["present"], true);
}
