// Input gates: presence, size floor, container integrity, fingerprint

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use negdash_recon::model::InputFingerprint;
use zip::ZipArchive;

use crate::error::PipelineError;

/// Size of a required input, or `MissingInputFile` when it is not a regular file.
pub fn require_file(source_name: &str, path: &Path) -> Result<u64, PipelineError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        Ok(_) => Err(missing(source_name, path)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(missing(source_name, path)),
        Err(e) => Err(PipelineError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Check a spreadsheet input before it is parsed.
///
/// The file must exist, be at least `min_bytes` long, and be a zip container
/// whose every entry decompresses with a matching checksum. A half-synced or
/// truncated workbook fails here instead of producing partial data.
pub fn check_spreadsheet(source_name: &str, path: &Path, min_bytes: u64) -> Result<(), PipelineError> {
    let size = require_file(source_name, path)?;
    if size < min_bytes {
        return Err(corrupt(
            source_name,
            path,
            format!("{size} bytes, expected at least {min_bytes}"),
        ));
    }

    let file = File::open(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| corrupt(source_name, path, format!("not a valid zip container: {e}")))?;
    if archive.is_empty() {
        return Err(corrupt(source_name, path, "zip container has no entries"));
    }

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| corrupt(source_name, path, format!("entry {i} unreadable: {e}")))?;
        let name = entry.name().to_string();
        io::copy(&mut entry, &mut io::sink())
            .map_err(|e| corrupt(source_name, path, format!("entry '{name}' failed integrity check: {e}")))?;
    }

    log::debug!("{source_name}: {} passed integrity check ({size} bytes)", path.display());
    Ok(())
}

/// Byte length and blake3 digest of an input file.
pub fn fingerprint(source_name: &str, path: &Path) -> Result<InputFingerprint, PipelineError> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(InputFingerprint {
        source: source_name.to_string(),
        path: path.display().to_string(),
        bytes: bytes.len() as u64,
        blake3: blake3::hash(&bytes).to_hex().to_string(),
    })
}

fn missing(source_name: &str, path: &Path) -> PipelineError {
    PipelineError::MissingInputFile {
        source_name: source_name.to_string(),
        path: path.to_path_buf(),
    }
}

fn corrupt(source_name: &str, path: &Path, reason: impl Into<String>) -> PipelineError {
    PipelineError::UndersizedOrCorruptInput {
        source_name: source_name.to_string(),
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}
