use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One value of a source row, as the loader read it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// True for empty cells and for text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
            Self::DateTime(_) => false,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => write!(f, "{s}"),
            // Integral values print without a fractional part, the way a
            // spreadsheet shows a document number stored as a number.
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Which part a source plays in the status rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    /// Primary ledger: carries an upstream INCLUSAO/EXCLUSAO label.
    Ledger,
    /// Registry of currently negativated documents.
    Registry,
    /// Labeled CSV extracts.
    Extract,
}

impl fmt::Display for SourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ledger => write!(f, "ledger"),
            Self::Registry => write!(f, "registry"),
            Self::Extract => write!(f, "extract"),
        }
    }
}

/// Column names a relation is built with. Only `identity` is mandatory.
#[derive(Debug, Clone, Default)]
pub struct ColumnSpec {
    pub identity: String,
    pub name: Option<String>,
    pub record_id: Option<String>,
    pub date: Option<String>,
    pub movement: Option<String>,
    pub label: Option<String>,
}

/// Resolved positions of the canonical columns inside a relation's headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    pub identity: usize,
    pub name: Option<usize>,
    pub record_id: Option<usize>,
    pub date: Option<usize>,
    pub movement: Option<usize>,
    pub label: Option<usize>,
}

/// Rows of one source system, aligned with `headers`.
#[derive(Debug, Clone)]
pub struct Relation {
    pub name: String,
    pub role: SourceRole,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub columns: ColumnIndex,
    /// When set, presence in this source alone never yields BAIXADO.
    pub requires_companion: bool,
}

impl Relation {
    /// Build a relation, resolving `spec` against `headers`.
    ///
    /// A missing identity column is an error; missing optional columns are
    /// logged and left unresolved.
    pub fn new(
        name: impl Into<String>,
        role: SourceRole,
        headers: Vec<String>,
        rows: Vec<Vec<Cell>>,
        spec: &ColumnSpec,
    ) -> Result<Self, ReconError> {
        let name = name.into();
        let find = |column: &str| headers.iter().position(|h| h.trim() == column.trim());

        let identity = find(&spec.identity).ok_or_else(|| ReconError::MissingColumn {
            source_name: name.clone(),
            column: spec.identity.clone(),
        })?;

        let optional = |column: &Option<String>, what: &str| -> Option<usize> {
            let column = column.as_deref()?;
            let idx = find(column);
            if idx.is_none() {
                log::warn!("{name}: {what} column '{column}' not found, display falls back");
            }
            idx
        };

        let columns = ColumnIndex {
            identity,
            name: optional(&spec.name, "name"),
            record_id: optional(&spec.record_id, "record id"),
            date: optional(&spec.date, "date"),
            movement: optional(&spec.movement, "movement"),
            label: optional(&spec.label, "label"),
        };

        Ok(Self {
            name,
            role,
            headers,
            rows,
            columns,
            requires_companion: false,
        })
    }

    pub fn with_requires_companion(mut self, requires_companion: bool) -> Self {
        self.requires_companion = requires_companion;
        self
    }

    /// Cell at `(row, col)`, treating short rows as padded with `Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    /// Non-blank cell of an optional canonical column.
    pub fn field(&self, row: usize, col: Option<usize>) -> Option<&Cell> {
        let cell = self.cell(row, col?);
        (!cell.is_blank()).then_some(cell)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Size and content hash of one input file, recorded in the run metadata.
#[derive(Debug, Clone, Serialize)]
pub struct InputFingerprint {
    pub source: String,
    pub path: String,
    pub bytes: u64,
    pub blake3: String,
}

/// Pre-loaded relations in source order. Order fixes the presence columns.
#[derive(Debug, Clone, Default)]
pub struct ReconInput {
    pub name: String,
    pub relations: Vec<Relation>,
    pub inputs: Vec<InputFingerprint>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Movement {
    #[serde(rename = "INCLUSAO")]
    Inclusion,
    #[serde(rename = "EXCLUSAO")]
    Exclusion,
    #[serde(rename = "ERRO")]
    Unknown,
}

impl Movement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inclusion => "INCLUSAO",
            Self::Exclusion => "EXCLUSAO",
            Self::Unknown => "ERRO",
        }
    }

    /// Parse an upstream movement label. Accent and case insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        let folded: String = raw
            .trim()
            .to_uppercase()
            .chars()
            .map(|c| match c {
                'Ã' | 'Á' | 'À' | 'Â' => 'A',
                other => other,
            })
            .collect();
        match folded.as_str() {
            "INCLUSAO" | "INCLUSION" => Some(Self::Inclusion),
            "EXCLUSAO" | "EXCLUSION" => Some(Self::Exclusion),
            _ => None,
        }
    }
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Negativado,
    Baixado,
    Erro,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Negativado, Status::Baixado, Status::Erro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Negativado => "NEGATIVADO",
            Self::Baixado => "BAIXADO",
            Self::Erro => "ERRO",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcePresence {
    pub source: String,
    pub role: SourceRole,
    pub present: bool,
}

/// One row of the unified result, keyed by normalized document.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciledRecord {
    pub document: String,
    pub record_id: String,
    pub name: String,
    pub date: String,
    pub presence: Vec<SourcePresence>,
    /// Distinct extract labels of the matching extract rows, in file order.
    pub labels: Vec<String>,
    pub movement: Movement,
    pub status: Status,
}

impl ReconciledRecord {
    pub fn is_present_in(&self, source: &str) -> bool {
        self.presence.iter().any(|p| p.source == source && p.present)
    }
}

/// Data-quality conditions that never abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconWarning {
    /// More than one row of a source carries the same key; the first was used.
    AmbiguousKeyMatch { source: String, document: String, rows: usize },
    /// The ledger label disagrees with the presence-derived status.
    MovementConflict { document: String, movement: Movement, status: Status },
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub source: String,
    pub role: SourceRole,
    pub rows: usize,
    pub keys: usize,
    pub blank_keys: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub total_records: usize,
    pub negativado: usize,
    pub baixado: usize,
    pub erro: usize,
    pub ambiguous_matches: usize,
    pub blank_keys: usize,
    pub movement_conflicts: usize,
    pub sources: Vec<SourceStats>,
}

impl ReconSummary {
    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Negativado => self.negativado,
            Status::Baixado => self.baixado,
            Status::Erro => self.erro,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub name: String,
    pub engine_version: String,
    pub run_at: String,
    pub sources: Vec<String>,
    pub inputs: Vec<InputFingerprint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub records: Vec<ReconciledRecord>,
    pub warnings: Vec<ReconWarning>,
}
