//! `negdash-recon`: negativation status reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded relations, returns one reconciled
//! record per document. No file IO apart from parsing config text.

pub mod classify;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod index;
pub mod model;
pub mod normalize;

pub use config::DashboardConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{Cell, Movement, ReconInput, ReconResult, ReconciledRecord, Relation, SourceRole, Status};
pub use normalize::normalize;
