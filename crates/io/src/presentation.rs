// Presentation structure handed to the dashboard renderer

use std::collections::{BTreeMap, BTreeSet};

use negdash_recon::display::PLACEHOLDER;
use negdash_recon::model::{Movement, ReconResult, ReconciledRecord, SourcePresence, SourceRole, Status};
use serde::Serialize;

/// Column titles of the tabular artifact, in order.
pub const ARTIFACT_COLUMNS: [&str; 7] = ["ID", "Documento", "Nome", "Data", "Tipo", "Local", "Status"];

const PRESENT_MARK: &str = "✔";
const ABSENT_MARK: &str = "✘";

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub title: String,
    pub generated_at: String,
    pub engine_version: String,
    pub sources: Vec<String>,
    pub columns: Vec<String>,
    pub captions: BTreeMap<Status, String>,
    pub counts: BTreeMap<Status, usize>,
    pub filters: Filters,
    pub legend: String,
    pub rows: Vec<DashboardRow>,
}

/// Distinct values offered by the dashboard filters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Filters {
    pub dates: Vec<String>,
    pub movements: Vec<Movement>,
    pub statuses: Vec<Status>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardRow {
    pub id: String,
    pub document: String,
    pub name: String,
    pub date: String,
    pub movement: Movement,
    pub presence: Vec<SourcePresence>,
    /// Same text as the artifact's `Local` column.
    pub location: String,
    pub labels: Vec<String>,
    pub status: Status,
}

/// `CNM ✔ | SOA ✘ | SGP ✔`
pub fn presence_summary(record: &ReconciledRecord) -> String {
    record
        .presence
        .iter()
        .map(|p| format!("{} {}", p.source, if p.present { PRESENT_MARK } else { ABSENT_MARK }))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Build the presentation from a result whose records are already in output order.
pub fn build_dashboard(result: &ReconResult, records: &[&ReconciledRecord]) -> Dashboard {
    let sources = result.meta.sources.clone();
    let registry: Vec<&str> = sources_with_role(result, |role| role == SourceRole::Registry);
    let others: Vec<&str> = sources_with_role(result, |role| role != SourceRole::Registry);

    let mut dates = BTreeSet::new();
    let mut movements = BTreeSet::new();
    let mut statuses = BTreeSet::new();
    let rows: Vec<DashboardRow> = records
        .iter()
        .map(|record| {
            if record.date != PLACEHOLDER && !record.date.is_empty() {
                dates.insert(record.date.clone());
            }
            movements.insert(record.movement);
            statuses.insert(record.status);
            DashboardRow {
                id: record.record_id.clone(),
                document: record.document.clone(),
                name: record.name.clone(),
                date: record.date.clone(),
                movement: record.movement,
                presence: record.presence.clone(),
                location: presence_summary(record),
                labels: record.labels.clone(),
                status: record.status,
            }
        })
        .collect();

    let counts = Status::ALL
        .into_iter()
        .map(|status| (status, result.summary.count(status)))
        .collect();

    Dashboard {
        title: result.meta.name.clone(),
        generated_at: result.meta.run_at.clone(),
        engine_version: result.meta.engine_version.clone(),
        columns: ARTIFACT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        captions: captions(&registry, &others, &sources),
        counts,
        filters: Filters {
            dates: dates.into_iter().collect(),
            movements: movements.into_iter().collect(),
            statuses: statuses.into_iter().collect(),
        },
        legend: format!("{PRESENT_MARK} presente   {ABSENT_MARK} ausente"),
        sources,
        rows,
    }
}

fn sources_with_role(result: &ReconResult, keep: impl Fn(SourceRole) -> bool) -> Vec<&str> {
    result
        .summary
        .sources
        .iter()
        .filter(|s| keep(s.role))
        .map(|s| s.source.as_str())
        .collect()
}

/// One caption per status, phrased with the configured source names.
pub fn captions(registry: &[&str], others: &[&str], all: &[String]) -> BTreeMap<Status, String> {
    let registry = registry.join(" ou ");
    let others = others.join(" ou ");
    let all: Vec<&str> = all.iter().map(String::as_str).collect();
    let all = match all.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} e {last}", rest.join(", ")),
        Some((last, _)) => last.to_string(),
        None => String::new(),
    };

    BTreeMap::from([
        (
            Status::Negativado,
            format!("Clientes negativados em {others} e presentes no {registry}."),
        ),
        (
            Status::Baixado,
            format!("Clientes excluídos em {others} e ausentes no {registry}."),
        ),
        (Status::Erro, format!("Clientes com inconsistência entre {all}.")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captions_name_the_sources() {
        let all = vec!["CNM".to_string(), "SOA".to_string(), "SGP".to_string()];
        let captions = captions(&["SGP"], &["CNM", "SOA"], &all);
        assert_eq!(
            captions[&Status::Negativado],
            "Clientes negativados em CNM ou SOA e presentes no SGP."
        );
        assert_eq!(captions[&Status::Baixado], "Clientes excluídos em CNM ou SOA e ausentes no SGP.");
        assert_eq!(captions[&Status::Erro], "Clientes com inconsistência entre CNM, SOA e SGP.");
    }

    #[test]
    fn presence_summary_marks_each_source() {
        let record = ReconciledRecord {
            document: "1".into(),
            record_id: "-".into(),
            name: "-".into(),
            date: "-".into(),
            presence: vec![
                SourcePresence { source: "CNM".into(), role: SourceRole::Ledger, present: true },
                SourcePresence { source: "SOA".into(), role: SourceRole::Extract, present: false },
                SourcePresence { source: "SGP".into(), role: SourceRole::Registry, present: true },
            ],
            labels: Vec::new(),
            movement: Movement::Inclusion,
            status: Status::Negativado,
        };
        assert_eq!(presence_summary(&record), "CNM ✔ | SOA ✘ | SGP ✔");
    }
}
