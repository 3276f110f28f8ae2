//! The status rule. Pure functions of per-source presence.

use crate::model::{Movement, Status};

/// Presence of one key across the sources of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Presence {
    /// The registry holds the key.
    pub registry: bool,
    /// Any non-registry source holds the key.
    pub other: bool,
    /// A non-registry source that does not require a companion holds the key.
    pub standalone_other: bool,
}

/// Derive the status of one key.
///
/// - registry and any other source: NEGATIVADO
/// - no registry, some standalone other source: BAIXADO
/// - anything else: ERRO
pub fn derive_status(presence: Presence) -> Status {
    if presence.registry && presence.other {
        Status::Negativado
    } else if !presence.registry && presence.standalone_other {
        Status::Baixado
    } else {
        Status::Erro
    }
}

/// Movement implied by a status when no ledger label is available.
pub fn infer_movement(status: Status) -> Movement {
    match status {
        Status::Negativado => Movement::Inclusion,
        Status::Baixado => Movement::Exclusion,
        Status::Erro => Movement::Unknown,
    }
}

/// Pick the movement for a record. Returns the movement and whether the
/// ledger label contradicts the status.
pub fn resolve_movement(ledger: Option<Movement>, status: Status) -> (Movement, bool) {
    match ledger {
        Some(movement) => {
            let conflict = matches!(
                (movement, status),
                (Movement::Exclusion, Status::Negativado) | (Movement::Inclusion, Status::Baixado)
            );
            (movement, conflict)
        }
        None => (infer_movement(status), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presence(registry: bool, other: bool, standalone_other: bool) -> Presence {
        Presence { registry, other, standalone_other }
    }

    #[test]
    fn rule_table() {
        assert_eq!(derive_status(presence(true, true, true)), Status::Negativado);
        assert_eq!(derive_status(presence(true, true, false)), Status::Negativado);
        assert_eq!(derive_status(presence(false, true, true)), Status::Baixado);
        assert_eq!(derive_status(presence(true, false, false)), Status::Erro);
        // Only a companion-requiring source holds the key.
        assert_eq!(derive_status(presence(false, true, false)), Status::Erro);
    }

    #[test]
    fn movement_inferred_from_status() {
        assert_eq!(resolve_movement(None, Status::Negativado), (Movement::Inclusion, false));
        assert_eq!(resolve_movement(None, Status::Baixado), (Movement::Exclusion, false));
        assert_eq!(resolve_movement(None, Status::Erro), (Movement::Unknown, false));
    }

    #[test]
    fn ledger_label_wins_and_flags_conflicts() {
        assert_eq!(
            resolve_movement(Some(Movement::Exclusion), Status::Negativado),
            (Movement::Exclusion, true)
        );
        assert_eq!(
            resolve_movement(Some(Movement::Inclusion), Status::Negativado),
            (Movement::Inclusion, false)
        );
        assert_eq!(
            resolve_movement(Some(Movement::Inclusion), Status::Erro),
            (Movement::Inclusion, false)
        );
    }
}
