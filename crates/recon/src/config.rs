use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::ColumnSpec;

/// Spreadsheets smaller than this are treated as truncated downloads.
pub const DEFAULT_MIN_SPREADSHEET_BYTES: u64 = 10 * 1024;

/// Leading rows of the registry report before its header row.
pub const DEFAULT_REGISTRY_SKIP_ROWS: usize = 8;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Where the extracts live, how to read them and where results go.
///
/// Every field has a default, so an empty TOML document describes the
/// standard `download/` + `output/` layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub name: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub min_spreadsheet_bytes: u64,
    pub ledger: SheetSourceConfig,
    pub registry: SheetSourceConfig,
    pub extracts: ExtractsConfig,
    pub output: OutputConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            name: "Dashboard Unificado".into(),
            input_dir: PathBuf::from("download"),
            output_dir: PathBuf::from("output"),
            min_spreadsheet_bytes: DEFAULT_MIN_SPREADSHEET_BYTES,
            ledger: SheetSourceConfig::ledger(),
            registry: SheetSourceConfig::registry(),
            extracts: ExtractsConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet sources (ledger + registry)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SheetSourceConfig {
    pub name: String,
    pub file: PathBuf,
    /// Rows above the header row, counted from the top of the sheet.
    #[serde(default)]
    pub skip_rows: usize,
    /// Worksheet to read. Defaults to the first one.
    #[serde(default)]
    pub sheet: Option<String>,
    pub columns: SheetColumns,
}

impl SheetSourceConfig {
    fn ledger() -> Self {
        Self {
            name: "CNM".into(),
            file: PathBuf::from("Relatorio_CNM.xlsx"),
            skip_rows: 0,
            sheet: None,
            columns: SheetColumns {
                identity: "Documento".into(),
                name: Some("Nome".into()),
                record_id: Some("Id".into()),
                date: Some("Data / Hora".into()),
                movement: Some("Tipo".into()),
            },
        }
    }

    fn registry() -> Self {
        Self {
            name: "SGP".into(),
            file: PathBuf::from("Relatorio_SGP.xlsx"),
            skip_rows: DEFAULT_REGISTRY_SKIP_ROWS,
            sheet: None,
            columns: SheetColumns {
                identity: "CPF/CNPJ".into(),
                name: None,
                record_id: None,
                date: None,
                movement: None,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SheetColumns {
    pub identity: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub record_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub movement: Option<String>,
}

impl SheetColumns {
    pub fn to_spec(&self) -> ColumnSpec {
        ColumnSpec {
            identity: self.identity.clone(),
            name: self.name.clone(),
            record_id: self.record_id.clone(),
            date: self.date.clone(),
            movement: self.movement.clone(),
            label: None,
        }
    }
}

// ---------------------------------------------------------------------------
// CSV extracts
// ---------------------------------------------------------------------------

/// Canonical column names the CSV loader renames extract headers to.
pub mod canonical {
    pub const IDENTITY: &str = "documento";
    pub const NAME: &str = "devedor";
    pub const RECORD_ID: &str = "Unique ID";
    pub const DATE: &str = "data";
    pub const LABEL: &str = "fonte";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractsConfig {
    pub name: String,
    /// Presence in the extracts alone is not enough to call a key BAIXADO.
    pub requires_companion: bool,
    /// Field separator for every file that does not set its own.
    pub delimiter: char,
    pub files: Vec<ExtractFile>,
    pub columns: ExtractColumns,
}

impl Default for ExtractsConfig {
    fn default() -> Self {
        let files = ["Ativas", "Baixadas", "Pendentes", "Determinacao", "Erros"]
            .into_iter()
            .map(|label| ExtractFile {
                label: label.into(),
                file: PathBuf::from(format!("{label}.csv")),
                optional: false,
                delimiter: None,
            })
            .collect();
        Self {
            name: "SOA".into(),
            requires_companion: false,
            delimiter: ',',
            files,
            columns: ExtractColumns::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractFile {
    pub label: String,
    pub file: PathBuf,
    /// Skip with a warning when absent instead of aborting the run.
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub delimiter: Option<char>,
}

impl ExtractsConfig {
    /// Byte separator to read `file` with.
    pub fn delimiter_for(&self, file: &ExtractFile) -> u8 {
        let c = file.delimiter.unwrap_or(self.delimiter);
        // validate() guarantees ASCII
        u8::try_from(c).unwrap_or(b',')
    }
}

fn check_delimiter(c: char, owner: &str) -> Result<(), ReconError> {
    if !c.is_ascii() || c.is_ascii_alphanumeric() || matches!(c, '"' | '\r' | '\n') {
        return Err(ReconError::ConfigValidation(format!(
            "{owner}: delimiter {c:?} must be a single ASCII punctuation or whitespace character"
        )));
    }
    Ok(())
}

/// Decoded header names accepted for each canonical column.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractColumns {
    pub identity: Vec<String>,
    pub name: Vec<String>,
    pub record_id: Vec<String>,
    pub date: Vec<String>,
}

impl Default for ExtractColumns {
    fn default() -> Self {
        let list = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            identity: list(&["Documento", "documento"]),
            name: list(&["Devedor", "devedor"]),
            record_id: list(&["Unique ID", "+//3//f/9-Unique ID"]),
            date: list(&["Data Inclusão", "Data Inclusao", "Data Exclusão", "Data Inclus+//3//Q-o", "data"]),
        }
    }
}

impl ExtractColumns {
    /// Canonical name for a decoded header, if it is a known alias.
    pub fn canonical_for(&self, header: &str) -> Option<&'static str> {
        let header = header.trim();
        let hit = |aliases: &[String]| aliases.iter().any(|a| a.trim() == header);
        if hit(&self.identity) {
            Some(canonical::IDENTITY)
        } else if hit(&self.name) {
            Some(canonical::NAME)
        } else if hit(&self.record_id) {
            Some(canonical::RECORD_ID)
        } else if hit(&self.date) {
            Some(canonical::DATE)
        } else {
            None
        }
    }

    /// Column spec of a relation whose headers were renamed to canonical names.
    pub fn canonical_spec() -> ColumnSpec {
        ColumnSpec {
            identity: canonical::IDENTITY.into(),
            name: Some(canonical::NAME.into()),
            record_id: Some(canonical::RECORD_ID.into()),
            date: Some(canonical::DATE.into()),
            movement: None,
            label: Some(canonical::LABEL.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub artifact: PathBuf,
    pub presentation: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            artifact: PathBuf::from("resultado_unificado.xlsx"),
            presentation: PathBuf::from("dashboard_unificado.json"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DashboardConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: DashboardConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ReconError> {
        toml::to_string_pretty(self).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let names = [&self.ledger.name, &self.registry.name, &self.extracts.name];
        if names.iter().any(|n| n.trim().is_empty()) {
            return Err(ReconError::ConfigValidation("source names must not be empty".into()));
        }
        let distinct: HashSet<&str> = names.iter().map(|n| n.as_str()).collect();
        if distinct.len() != names.len() {
            return Err(ReconError::ConfigValidation(format!(
                "source names must be distinct, got {}",
                names.map(|n| format!("'{n}'")).join(", ")
            )));
        }

        for (source, columns) in [(&self.ledger, &self.ledger.columns), (&self.registry, &self.registry.columns)] {
            if columns.identity.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "source '{}': identity column must not be empty",
                    source.name
                )));
            }
        }

        if self.extracts.files.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one extract file is required".into(),
            ));
        }
        if self.extracts.columns.identity.is_empty() {
            return Err(ReconError::ConfigValidation(
                "extract identity aliases must not be empty".into(),
            ));
        }
        check_delimiter(self.extracts.delimiter, "extracts")?;

        let mut labels = HashSet::new();
        for file in &self.extracts.files {
            if file.label.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "extract '{}' has an empty label",
                    file.file.display()
                )));
            }
            if !labels.insert(file.label.as_str()) {
                return Err(ReconError::ConfigValidation(format!(
                    "extract label '{}' is used twice",
                    file.label
                )));
            }
            if let Some(c) = file.delimiter {
                check_delimiter(c, &format!("extract '{}'", file.label))?;
            }
        }

        Ok(())
    }

    /// Rebase relative input/output directories onto `base`
    /// (normally the directory holding the config file).
    pub fn rebase(&mut self, base: &Path) {
        if self.input_dir.is_relative() {
            self.input_dir = base.join(&self.input_dir);
        }
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }
    }

    pub fn input_path(&self, file: &Path) -> PathBuf {
        self.input_dir.join(file)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.output_dir.join(&self.output.artifact)
    }

    pub fn presentation_path(&self) -> PathBuf {
        self.output_dir.join(&self.output.presentation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = DashboardConfig::from_toml("").unwrap();
        assert_eq!(config.ledger.name, "CNM");
        assert_eq!(config.registry.skip_rows, 8);
        assert_eq!(config.registry.columns.identity, "CPF/CNPJ");
        assert_eq!(config.extracts.files.len(), 5);
        assert_eq!(config.min_spreadsheet_bytes, 10240);
        assert_eq!(config.artifact_path(), PathBuf::from("output/resultado_unificado.xlsx"));
    }

    #[test]
    fn parse_custom_layout() {
        let input = r#"
name = "Teste"
input_dir = "/data/in"
output_dir = "out"
min_spreadsheet_bytes = 0

[ledger]
name = "CNM"
file = "cnm.xlsx"
[ledger.columns]
identity = "Doc"
movement = "Tipo"

[registry]
name = "SGP"
file = "sgp.xlsx"
skip_rows = 3
[registry.columns]
identity = "CPF/CNPJ"

[extracts]
name = "SOA"
requires_companion = true

[[extracts.files]]
label = "Ativas"
file = "a.csv"

[[extracts.files]]
label = "Erros"
file = "e.csv"
optional = true
"#;
        let mut config = DashboardConfig::from_toml(input).unwrap();
        assert_eq!(config.name, "Teste");
        assert_eq!(config.ledger.columns.identity, "Doc");
        assert_eq!(config.ledger.columns.name, None);
        assert_eq!(config.registry.skip_rows, 3);
        assert!(config.extracts.requires_companion);
        assert!(config.extracts.files[1].optional);
        // Aliases keep their defaults when the table is omitted.
        assert!(config.extracts.columns.record_id.contains(&"Unique ID".to_string()));

        config.rebase(Path::new("/etc/negdash"));
        assert_eq!(config.input_path(Path::new("cnm.xlsx")), PathBuf::from("/data/in/cnm.xlsx"));
        assert_eq!(config.presentation_path(), PathBuf::from("/etc/negdash/out/dashboard_unificado.json"));
    }

    #[test]
    fn reject_duplicate_source_names() {
        let input = r#"
[extracts]
name = "SGP"
"#;
        let err = DashboardConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn reject_duplicate_labels() {
        let input = r#"
[[extracts.files]]
label = "Ativas"
file = "a.csv"

[[extracts.files]]
label = "Ativas"
file = "b.csv"
"#;
        let err = DashboardConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("'Ativas'"));
    }

    #[test]
    fn extracts_default_to_comma_delimiter() {
        let config = DashboardConfig::from_toml("").unwrap();
        let file = &config.extracts.files[0];
        assert_eq!(config.extracts.delimiter, ',');
        assert_eq!(config.extracts.delimiter_for(file), b',');
    }

    #[test]
    fn per_file_delimiter_overrides_section() {
        let input = r#"
[extracts]
delimiter = "\t"

[[extracts.files]]
label = "Ativas"
file = "a.csv"

[[extracts.files]]
label = "Erros"
file = "e.csv"
delimiter = ";"
"#;
        let config = DashboardConfig::from_toml(input).unwrap();
        let files = &config.extracts.files;
        assert_eq!(config.extracts.delimiter_for(&files[0]), b'\t');
        assert_eq!(config.extracts.delimiter_for(&files[1]), b';');
    }

    #[test]
    fn reject_unusable_delimiters() {
        for bad in ["\"ab\"", "\"\\\"\"", "\"x\"", "\"ç\""] {
            let input = format!("[extracts]\ndelimiter = {bad}\n");
            assert!(DashboardConfig::from_toml(&input).is_err(), "{bad} accepted");
        }
        let input = r#"
[[extracts.files]]
label = "Ativas"
file = "a.csv"
delimiter = "1"
"#;
        let err = DashboardConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("'Ativas'"));
    }

    #[test]
    fn reject_unknown_field() {
        let err = DashboardConfig::from_toml("outptu_dir = \"x\"").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn alias_lookup() {
        let cols = ExtractColumns::default();
        assert_eq!(cols.canonical_for("Documento"), Some(canonical::IDENTITY));
        assert_eq!(cols.canonical_for("Data Exclusão"), Some(canonical::DATE));
        assert_eq!(cols.canonical_for("+//3//f/9-Unique ID"), Some(canonical::RECORD_ID));
        assert_eq!(cols.canonical_for("Valor"), None);
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let text = DashboardConfig::default().to_toml().unwrap();
        let back = DashboardConfig::from_toml(&text).unwrap();
        assert_eq!(back.extracts.files.len(), 5);
        assert_eq!(back.registry.skip_rows, 8);
    }
}
