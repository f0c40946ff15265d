use crate::errors::{FileOperation, IoError};
use miette::Diagnostic;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Fixtures produced by the contract test suite that the client package embeds.
pub const DEFAULT_WASMS: [&str; 7] = [
    "contract.wasm",
    "mint_call.wasm",
    "balance_of_call.wasm",
    "owner_of_call.wasm",
    "get_approved_call.wasm",
    "transfer_call.wasm",
    "updated_receipts.wasm",
];

#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("I/O error within manifest domain")]
    #[diagnostic(code(wasm2ts::manifest::io))]
    Io(#[from] IoError),

    #[error("source directory '{path}' does not exist")]
    #[diagnostic(
        code(wasm2ts::manifest::missing_source_dir),
        help("Build the wasm fixtures first, or point `source` at the directory holding them")
    )]
    MissingSourceDirectory { path: PathBuf },

    #[error("scan extension must not be empty")]
    #[diagnostic(
        code(wasm2ts::manifest::empty_extension),
        help("Use something like `scan = \"wasm\"`")
    )]
    EmptyScanExtension,
}

/// Which files to convert.
///
/// In TOML this is either `[manifest] files = [...]` or `[manifest] scan = "wasm"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Manifest {
    /// An explicit, ordered list of file names.
    Files(Vec<String>),
    /// Every file directly inside the source directory with this extension.
    Scan(String),
}
impl Default for Manifest {
    fn default() -> Self {
        Manifest::Files(DEFAULT_WASMS.iter().map(|name| name.to_string()).collect())
    }
}
impl Manifest {
    /// Produces the ordered list of names to convert.
    ///
    /// Listed names are returned untouched; whether they exist is the converter's concern.
    /// Scanned names are sorted so that processing order does not depend on the filesystem.
    pub fn resolve(&self, source_dir: &Path) -> Result<Vec<String>, ManifestError> {
        match self {
            Manifest::Files(names) => Ok(names.clone()),
            Manifest::Scan(extension) => scan(source_dir, extension),
        }
    }
}

fn scan(source_dir: &Path, extension: &str) -> Result<Vec<String>, ManifestError> {
    let extension = extension.trim_start_matches('.');

    if extension.is_empty() {
        return Err(ManifestError::EmptyScanExtension);
    }

    if !source_dir.is_dir() {
        return Err(ManifestError::MissingSourceDirectory {
            path: source_dir.to_path_buf(),
        });
    }

    let mut names = Vec::new();

    for entry in WalkDir::new(source_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(error) => {
                let path = error.path().unwrap_or(source_dir).to_path_buf();

                Err(IoError::new(FileOperation::Scan, path, error.into()))?
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .map(|ext| ext == extension)
            .unwrap_or(false);

        if !matches {
            continue;
        }

        match entry.file_name().to_str() {
            Some(name) => names.push(name.to_string()),
            None => log::warn!(
                "skipping {}: file name is not valid UTF-8",
                entry.path().display()
            ),
        }
    }

    log::debug!(
        "scanned {} '.{}' files in {}",
        names.len(),
        extension,
        source_dir.display()
    );

    Ok(names)
}
