use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty name, duplicate label, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// The set of relations handed to the engine cannot be reconciled.
    #[error("invalid recon input: {0}")]
    InvalidInput(String),
    /// A relation was built without its identity column.
    #[error("source '{source_name}': missing column '{column}'")]
    MissingColumn { source_name: String, column: String },
}
