use crate::index::KeyIndex;
use crate::model::{ReconSummary, ReconWarning, ReconciledRecord, Relation, SourceStats, Status};

/// Compute summary statistics from reconciled records.
pub fn compute_summary(
    records: &[ReconciledRecord],
    relations: &[Relation],
    indexes: &[KeyIndex],
    warnings: &[ReconWarning],
) -> ReconSummary {
    let mut negativado = 0;
    let mut baixado = 0;
    let mut erro = 0;

    for r in records {
        match r.status {
            Status::Negativado => negativado += 1,
            Status::Baixado => baixado += 1,
            Status::Erro => erro += 1,
        }
    }

    let mut ambiguous_matches = 0;
    let mut movement_conflicts = 0;
    for w in warnings {
        match w {
            ReconWarning::AmbiguousKeyMatch { .. } => ambiguous_matches += 1,
            ReconWarning::MovementConflict { .. } => movement_conflicts += 1,
        }
    }

    let sources: Vec<SourceStats> = relations
        .iter()
        .zip(indexes)
        .map(|(relation, index)| SourceStats {
            source: relation.name.clone(),
            role: relation.role,
            rows: index.rows,
            keys: index.key_count(),
            blank_keys: index.blank_keys,
        })
        .collect();

    ReconSummary {
        total_records: records.len(),
        negativado,
        baixado,
        erro,
        ambiguous_matches,
        blank_keys: sources.iter().map(|s| s.blank_keys).sum(),
        movement_conflicts,
        sources,
    }
}
