use crate::{
    errors::{FileOperation, IoError},
    manifest::Manifest,
    module::DEFAULT_MODULE_EXTENSION,
    utils::{normalize_path, resolve_against},
};
use miette::Diagnostic;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "wasm2ts.toml";

const DEFAULT_SOURCE_DIR: &str = "tests/wasm";
const DEFAULT_DESTINATION_DIR: &str = "client-js/wasm";

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("I/O error within config domain")]
    #[diagnostic(code(wasm2ts::config::io))]
    Io(#[from] IoError),

    #[error("Unable to parse toml file at '{path}': {source}")]
    #[diagnostic(code(wasm2ts::config::parse_toml), help("Review toml file"))]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("destination '{}' would delete the source directory '{}'", .destination.display(), .source_dir.display())]
    #[diagnostic(
        code(wasm2ts::config::destination_contains_source),
        help("The destination is wiped on every run; point it outside the wasm fixtures")
    )]
    DestinationContainsSource {
        destination: PathBuf,
        source_dir: PathBuf,
    },

    #[error("module extension must not be empty")]
    #[diagnostic(
        code(wasm2ts::config::empty_module_extension),
        help("Set `module_extension` to something like \"ts\" or \"js\"")
    )]
    EmptyModuleExtension,
}

/// On-disk shape of `wasm2ts.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    module_extension: Option<String>,
    manifest: Option<Manifest>,
}

/// Fully resolved settings for a conversion run.
#[derive(Debug, Clone)]
pub struct Config {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub module_extension: String,
    pub manifest: Manifest,
}
impl Config {
    /// Built-in settings with directories resolved against `base_dir`.
    pub fn defaults_in(base_dir: &Path) -> Self {
        Self::from_raw(RawConfig::default(), base_dir)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::Read, path.to_path_buf(), error))?;

        let raw: RawConfig = toml::from_str(&content).map_err(|err| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source: err,
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let config = Self::from_raw(raw, base_dir);

        config.validate()?;

        Ok(config)
    }

    /// Rejects settings that cannot be run: an empty module extension, or a destination that
    /// is, or contains, the source directory (the reset would delete the fixtures).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.module_extension.is_empty() {
            return Err(ConfigError::EmptyModuleExtension);
        }

        let source_dir = normalize_path(&self.source_dir);
        let destination = normalize_path(&self.destination_dir);

        if source_dir.starts_with(&destination) {
            return Err(ConfigError::DestinationContainsSource {
                destination,
                source_dir,
            });
        }

        Ok(())
    }

    /// Loads `explicit` if given, otherwise `wasm2ts.toml` from `working_dir` when present,
    /// otherwise the built-in defaults relative to `working_dir`.
    pub fn discover(explicit: Option<&Path>, working_dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            log::debug!("loading config from {}", path.display());
            return Self::from_file(working_dir.join(path));
        }

        let implicit = working_dir.join(DEFAULT_CONFIG_FILE);

        if implicit.is_file() {
            log::debug!("loading config from {}", implicit.display());
            Self::from_file(implicit)
        } else {
            log::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
            Ok(Self::defaults_in(working_dir))
        }
    }

    fn from_raw(raw: RawConfig, base_dir: &Path) -> Self {
        let source = raw
            .source
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR));
        let destination = raw
            .destination
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DESTINATION_DIR));
        let module_extension = raw
            .module_extension
            .unwrap_or_else(|| DEFAULT_MODULE_EXTENSION.to_string())
            .trim_start_matches('.')
            .to_string();

        Self {
            source_dir: resolve_against(base_dir, &source),
            destination_dir: resolve_against(base_dir, &destination),
            module_extension,
            manifest: raw.manifest.unwrap_or_default(),
        }
    }

    /// Where the module for `file_name` is written, e.g. `contract.wasm` -> `contract.wasm.ts`.
    pub fn module_path(&self, file_name: &str) -> PathBuf {
        self.destination_dir
            .join(format!("{}.{}", file_name, self.module_extension))
    }
}
