use crate::{
    config::{Config, ConfigError},
    errors::{FileOperation, IoError},
    manifest::ManifestError,
    module::{render_module, TemplateError},
};
use colored::Colorize;
use miette::Diagnostic;
use rayon::prelude::*;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Failure of a single manifest entry.
#[derive(Debug, Error, Diagnostic)]
pub enum EntryError {
    #[error("source file for '{name}' could not be read")]
    #[diagnostic(
        code(wasm2ts::convert::missing_source_file),
        help("Build the wasm fixtures first, or remove the entry from the manifest")
    )]
    MissingSourceFile {
        name: String,
        #[source]
        source: IoError,
    },

    #[error("generated module for '{name}' could not be written")]
    #[diagnostic(code(wasm2ts::convert::permission_denied))]
    PermissionDenied {
        name: String,
        #[source]
        source: IoError,
    },

    #[error("'{name}' could not be encoded")]
    #[diagnostic(code(wasm2ts::convert::encoding_failure))]
    EncodingFailure {
        name: String,
        #[source]
        source: TemplateError,
    },
}
impl EntryError {
    pub fn name(&self) -> &str {
        match self {
            Self::MissingSourceFile { name, .. }
            | Self::PermissionDenied { name, .. }
            | Self::EncodingFailure { name, .. } => name,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConvertError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),

    #[error("destination directory '{}' could not be reset", .source.path.display())]
    #[diagnostic(
        code(wasm2ts::convert::permission_denied),
        help("Check that the destination is writable and not held open by another process")
    )]
    PermissionDenied {
        #[source]
        source: IoError,
    },

    #[error("{} of {total} entries failed to convert", .failures.len())]
    #[diagnostic(code(wasm2ts::convert::failed))]
    Conversion {
        total: usize,
        #[related]
        failures: Vec<EntryError>,
    },
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct ConversionReport {
    pub destination_dir: PathBuf,
    /// Generated module paths, in manifest order.
    pub modules: Vec<PathBuf>,
}

/// Regenerates `config.destination_dir` from the manifest.
///
/// The destination is wiped before anything is written, so it never keeps modules from a
/// previous manifest. Entries are then converted in parallel and every one of them runs to
/// completion before this returns; all failures are collected into
/// [`ConvertError::Conversion`]. Modules written before a failure are left in place.
pub fn convert(config: &Config) -> Result<ConversionReport, ConvertError> {
    config.validate()?;

    let names = config.manifest.resolve(&config.source_dir)?;

    log::debug!(
        "converting {} entries from {} into {}",
        names.len(),
        config.source_dir.display(),
        config.destination_dir.display()
    );

    reset_directory(&config.destination_dir)
        .map_err(|source| ConvertError::PermissionDenied { source })?;

    let results: Vec<Result<PathBuf, EntryError>> = names
        .par_iter()
        .map(|name| convert_entry(config, name))
        .collect();

    let total = results.len();
    let mut modules = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for result in results {
        match result {
            Ok(path) => modules.push(path),
            Err(error) => failures.push(error),
        }
    }

    if !failures.is_empty() {
        log::debug!(
            "{} entries converted before failure: {:?}",
            modules.len(),
            modules
        );
        return Err(ConvertError::Conversion { total, failures });
    }

    Ok(ConversionReport {
        destination_dir: config.destination_dir.clone(),
        modules,
    })
}

/// Removes whatever is at `path` (directory tree, file or symlink), then creates it as an
/// empty directory.
fn reset_directory(path: &Path) -> Result<(), IoError> {
    let removed = match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(error) => Err(error),
    };

    match removed {
        Ok(()) => log::debug!("removed {}", path.display()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => Err(IoError::new(FileOperation::Remove, path.into(), error))?,
    }

    fs::create_dir_all(path)
        .map_err(|error| IoError::new(FileOperation::Mkdir, path.into(), error))
}

fn convert_entry(config: &Config, name: &str) -> Result<PathBuf, EntryError> {
    let source_path = config.source_dir.join(name);

    let bytes = fs::read(&source_path).map_err(|error| EntryError::MissingSourceFile {
        name: name.to_string(),
        source: IoError::new(FileOperation::Read, source_path.clone(), error),
    })?;

    let module = render_module(&bytes).map_err(|error| EntryError::EncodingFailure {
        name: name.to_string(),
        source: error,
    })?;

    let module_path = config.module_path(name);

    write_file(&module_path, module).map_err(|error| EntryError::PermissionDenied {
        name: name.to_string(),
        source: error,
    })?;

    log::debug!("{}: {} bytes embedded", name, bytes.len());

    Ok(module_path)
}

/// Writes `contents` to `path` and announces the file on stdout.
fn write_file(path: &Path, contents: String) -> Result<(), IoError> {
    fs::write(path, contents)
        .map_err(|error| IoError::new(FileOperation::Write, path.into(), error))?;

    let msg = format!("{} {}", "create".green(), path.display());

    println!("{}", &msg);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{manifest::Manifest, module::decode_module};
    use tempfile::TempDir;

    const WASM_MAGIC: &[u8] = &[0x00, 0x61, 0x73, 0x6D];

    fn setup(files: &[(&str, &[u8])], manifest: Manifest) -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            source_dir: dir.path().join("tests").join("wasm"),
            destination_dir: dir.path().join("client-js").join("wasm"),
            module_extension: "ts".into(),
            manifest,
        };
        fs::create_dir_all(&config.source_dir).unwrap();
        for (name, bytes) in files {
            fs::write(config.source_dir.join(name), bytes).unwrap();
        }
        (dir, config)
    }

    fn files(names: &[&str]) -> Manifest {
        Manifest::Files(names.iter().map(|n| n.to_string()).collect())
    }

    fn list_dir(path: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(path)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_convert_wasm_magic() {
        let (_dir, config) = setup(&[("a.wasm", WASM_MAGIC)], files(&["a.wasm"]));

        let report = convert(&config).unwrap();

        let module_path = config.destination_dir.join("a.wasm.ts");
        assert_eq!(report.modules, vec![module_path.clone()]);
        let module = fs::read_to_string(&module_path).unwrap();
        assert!(module.contains("\"AGFzbQ==\""));
        assert_eq!(decode_module(&module).unwrap(), WASM_MAGIC);
    }

    #[test]
    fn test_convert_round_trips_every_entry_in_order() {
        let big: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let (_dir, config) = setup(
            &[
                ("one.wasm", WASM_MAGIC),
                ("two.wasm", big.as_slice()),
                ("three.wasm", b"".as_slice()),
            ],
            files(&["two.wasm", "one.wasm", "three.wasm"]),
        );

        let report = convert(&config).unwrap();

        let expected: Vec<PathBuf> = ["two.wasm", "one.wasm", "three.wasm"]
            .iter()
            .map(|name| config.module_path(name))
            .collect();
        assert_eq!(report.modules, expected);

        for (name, bytes) in [
            ("one.wasm", WASM_MAGIC),
            ("two.wasm", big.as_slice()),
            ("three.wasm", b"".as_slice()),
        ] {
            let module = fs::read_to_string(config.module_path(name)).unwrap();
            assert_eq!(decode_module(&module).unwrap(), bytes, "{}", name);
        }
    }

    #[test]
    fn test_convert_is_idempotent() {
        let (_dir, config) = setup(&[("a.wasm", WASM_MAGIC)], files(&["a.wasm"]));

        convert(&config).unwrap();
        let first = fs::read(config.module_path("a.wasm")).unwrap();
        convert(&config).unwrap();
        let second = fs::read(config.module_path("a.wasm")).unwrap();

        assert_eq!(first, second);
        assert_eq!(list_dir(&config.destination_dir), vec!["a.wasm.ts"]);
    }

    #[test]
    fn test_convert_removes_stale_files() {
        let (_dir, config) = setup(&[("a.wasm", WASM_MAGIC)], files(&["a.wasm"]));
        fs::create_dir_all(config.destination_dir.join("old")).unwrap();
        fs::write(config.destination_dir.join("stale.wasm.ts"), "stale").unwrap();
        fs::write(config.destination_dir.join("old").join("x.ts"), "stale").unwrap();

        convert(&config).unwrap();

        assert_eq!(list_dir(&config.destination_dir), vec!["a.wasm.ts"]);
    }

    #[test]
    fn test_convert_missing_source_file_is_not_skipped() {
        let (_dir, config) = setup(
            &[("a.wasm", WASM_MAGIC)],
            files(&["a.wasm", "missing.wasm"]),
        );

        let Err(ConvertError::Conversion { total, failures }) = convert(&config) else {
            panic!("expected a conversion failure");
        };

        assert_eq!(total, 2);
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            EntryError::MissingSourceFile { name, .. } if name == "missing.wasm"
        ));
        assert_eq!(failures[0].name(), "missing.wasm");
        // partial output is kept
        assert!(config.module_path("a.wasm").is_file());
    }

    #[test]
    fn test_convert_empty_manifest_creates_empty_destination() {
        let (_dir, config) = setup(&[], files(&[]));

        let report = convert(&config).unwrap();

        assert!(report.modules.is_empty());
        assert!(config.destination_dir.is_dir());
        assert!(list_dir(&config.destination_dir).is_empty());
    }

    #[test]
    fn test_convert_with_scanned_manifest() {
        let (_dir, config) = setup(
            &[
                ("b.wasm", WASM_MAGIC),
                ("a.wasm", WASM_MAGIC),
                ("readme.md", b"#".as_slice()),
            ],
            Manifest::Scan("wasm".into()),
        );

        let report = convert(&config).unwrap();

        assert_eq!(
            report.modules,
            vec![config.module_path("a.wasm"), config.module_path("b.wasm")]
        );
    }

    #[test]
    fn test_convert_destination_blocked_by_file() {
        let (_dir, mut config) = setup(&[("a.wasm", WASM_MAGIC)], files(&["a.wasm"]));
        let blocker = config.destination_dir.parent().unwrap().join("blocker");
        fs::create_dir_all(blocker.parent().unwrap()).unwrap();
        fs::write(&blocker, "not a directory").unwrap();
        config.destination_dir = blocker.join("wasm");

        let result = convert(&config);

        assert!(matches!(result, Err(ConvertError::PermissionDenied { .. })));
    }

    #[test]
    fn test_convert_replaces_destination_file() {
        let (_dir, config) = setup(&[("a.wasm", WASM_MAGIC)], files(&["a.wasm"]));
        fs::create_dir_all(config.destination_dir.parent().unwrap()).unwrap();
        fs::write(&config.destination_dir, "left over").unwrap();

        convert(&config).unwrap();

        assert!(config.destination_dir.is_dir());
        assert_eq!(list_dir(&config.destination_dir), vec!["a.wasm.ts"]);
    }

    #[test]
    fn test_convert_refuses_destination_containing_source() {
        let (dir, mut config) = setup(&[("a.wasm", WASM_MAGIC)], files(&["a.wasm"]));
        config.destination_dir = dir.path().to_path_buf();

        let result = convert(&config);

        assert!(matches!(
            result,
            Err(ConvertError::Config(ConfigError::DestinationContainsSource { .. }))
        ));
        assert!(config.source_dir.join("a.wasm").is_file());
    }
}
