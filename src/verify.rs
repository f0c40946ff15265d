use crate::{
    config::Config,
    errors::{FileOperation, IoError},
    manifest::ManifestError,
    module::{decode_module, TemplateError},
};
use miette::Diagnostic;
use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum VerifyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),

    #[error("I/O error within verify domain")]
    #[diagnostic(code(wasm2ts::verify::io))]
    Io(#[from] IoError),

    #[error("{} problem(s) found in '{}'", .problems.len(), .destination_dir.display())]
    #[diagnostic(
        code(wasm2ts::verify::out_of_date),
        help("Re-run `wasm2ts convert` to regenerate the modules")
    )]
    OutOfDate {
        destination_dir: PathBuf,
        #[related]
        problems: Vec<Problem>,
    },
}

/// Something wrong with one file in the destination directory.
#[derive(Debug, Error, Diagnostic)]
pub enum Problem {
    #[error("'{}' has no generated module", .name)]
    #[diagnostic(code(wasm2ts::verify::missing_module))]
    MissingModule { name: String, path: PathBuf },

    #[error("'{}' could not be decoded", .path.display())]
    #[diagnostic(code(wasm2ts::verify::malformed_module))]
    MalformedModule {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    #[error("'{}' does not match its source '{}'", .path.display(), .source_path.display())]
    #[diagnostic(code(wasm2ts::verify::mismatch))]
    Mismatch { path: PathBuf, source_path: PathBuf },

    #[error("'{}' does not belong to the manifest", .path.display())]
    #[diagnostic(code(wasm2ts::verify::stale))]
    Stale { path: PathBuf },
}

/// Outcome of a clean verification.
#[derive(Debug)]
pub struct VerificationReport {
    pub verified: usize,
}

/// Checks that the destination directory is exactly the image of the manifest:
/// every module decodes to its source bytes and nothing else is present.
///
/// Source files must be readable; an unreadable source is an I/O error rather than a problem.
pub fn verify(config: &Config) -> Result<VerificationReport, VerifyError> {
    let names = config.manifest.resolve(&config.source_dir)?;

    let mut problems = Vec::new();
    let mut expected = HashSet::new();

    for name in &names {
        let module_path = config.module_path(name);
        let source_path = config.source_dir.join(name);

        expected.insert(module_path.clone());

        let module = match fs::read_to_string(&module_path) {
            Ok(module) => module,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                problems.push(Problem::MissingModule {
                    name: name.clone(),
                    path: module_path,
                });
                continue;
            }
            Err(error) => Err(IoError::new(FileOperation::Read, module_path.clone(), error))?,
        };

        let embedded = match decode_module(&module) {
            Ok(bytes) => bytes,
            Err(error) => {
                problems.push(Problem::MalformedModule {
                    path: module_path,
                    source: error,
                });
                continue;
            }
        };

        let original = fs::read(&source_path)
            .map_err(|error| IoError::new(FileOperation::Read, source_path.clone(), error))?;

        if embedded != original {
            problems.push(Problem::Mismatch {
                path: module_path,
                source_path,
            });
        }
    }

    problems.extend(stale_entries(&config.destination_dir, &expected)?);

    if !problems.is_empty() {
        return Err(VerifyError::OutOfDate {
            destination_dir: config.destination_dir.clone(),
            problems,
        });
    }

    log::debug!("{} modules verified", names.len());

    Ok(VerificationReport {
        verified: names.len(),
    })
}

fn stale_entries(
    destination: &Path,
    expected: &HashSet<PathBuf>,
) -> Result<Vec<Problem>, IoError> {
    let entries = match fs::read_dir(destination) {
        Ok(entries) => entries,
        // every module is already reported missing
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(IoError::new(FileOperation::Scan, destination.into(), error)),
    };

    let mut stale = Vec::new();

    for entry in entries {
        let path = entry
            .map_err(|error| IoError::new(FileOperation::Scan, destination.into(), error))?
            .path();

        if !expected.contains(&path) {
            stale.push(path);
        }
    }

    stale.sort();

    Ok(stale.into_iter().map(|path| Problem::Stale { path }).collect())
}
