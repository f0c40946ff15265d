use crate::{
    config::{self, Config},
    converter::{self, ConversionReport},
    manifest,
    verify::{self, VerificationReport},
};
use std::path::Path;

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum Wasm2TsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] manifest::ManifestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Convert(#[from] converter::ConvertError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Verify(#[from] verify::VerifyError),
}

/// Regenerates the destination directory from the manifest.
///
/// `config_path` is an explicit configuration file; when `None`, `wasm2ts.toml` in
/// `working_dir` is used if present, and the built-in defaults otherwise.
///
/// # Errors
///
/// Returns a [`Wasm2TsError`] if:
///
/// - The configuration file cannot be read or parsed.
/// - The manifest cannot be resolved (e.g. scanning a missing source directory).
/// - The destination directory cannot be reset.
/// - Any manifest entry fails to convert. All entries are attempted first.
pub fn convert(
    config_path: Option<&Path>,
    working_dir: &Path,
) -> Result<ConversionReport, Wasm2TsError> {
    let config = Config::discover(config_path, working_dir)?;

    let report = converter::convert(&config)?;

    log::info!(
        "{} modules written to {}",
        report.modules.len(),
        report.destination_dir.display()
    );

    Ok(report)
}

/// Checks that generated modules are up to date with their sources.
///
/// # Errors
///
/// Returns a [`Wasm2TsError`] if the configuration or manifest cannot be loaded, a source
/// file cannot be read, or any module is missing, malformed, out of date or stale.
pub fn verify(
    config_path: Option<&Path>,
    working_dir: &Path,
) -> Result<VerificationReport, Wasm2TsError> {
    let config = Config::discover(config_path, working_dir)?;

    let report = verify::verify(&config)?;

    log::info!("{} modules up to date", report.verified);

    Ok(report)
}

/// Resolves the manifest without touching the destination.
///
/// # Errors
///
/// Returns a [`Wasm2TsError`] if:
///
/// - The configuration file cannot be read, parsed or validated.
/// - A scanned manifest's source directory is missing or cannot be read.
pub fn list_manifest(
    config_path: Option<&Path>,
    working_dir: &Path,
) -> Result<Vec<String>, Wasm2TsError> {
    let config = Config::discover(config_path, working_dir)?;

    Ok(config.manifest.resolve(&config.source_dir)?)
}
