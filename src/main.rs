use clap::{
    crate_description, crate_name, crate_version, value_parser, Arg, ArgAction, Command,
};
use miette::IntoDiagnostic;
use std::path::{Path, PathBuf};

// The CLI layer should only parse inputs and forward them to library code.
fn main() -> miette::Result<()> {
    let matches = Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to a wasm2ts.toml file (defaults to ./wasm2ts.toml when present)")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Regenerates the TypeScript modules for every wasm in the manifest"),
        )
        .subcommand(
            Command::new("verify")
                .about("Checks that generated modules match their wasm sources"),
        )
        .subcommand(Command::new("manifest").about("Prints the files that would be converted"))
        .get_matches();

    init_logging(matches.get_flag("verbose"));

    let config_path = matches.get_one::<PathBuf>("config").map(PathBuf::as_path);

    let working_dir = std::env::current_dir().into_diagnostic()?;

    match matches.subcommand() {
        None | Some(("convert", _)) => handle_convert(config_path, &working_dir),
        Some(("verify", _)) => handle_verify(config_path, &working_dir),
        Some(("manifest", _)) => handle_manifest(config_path, &working_dir),
        _ => unreachable!(),
    }
}

fn init_logging(is_verbose: bool) {
    let level = if is_verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    log::debug!("executing in verbose mode");
}

fn handle_convert(config_path: Option<&Path>, working_dir: &Path) -> miette::Result<()> {
    wasm2ts::api::convert(config_path, working_dir)?;

    Ok(())
}

fn handle_verify(config_path: Option<&Path>, working_dir: &Path) -> miette::Result<()> {
    wasm2ts::api::verify(config_path, working_dir)?;

    Ok(())
}

fn handle_manifest(config_path: Option<&Path>, working_dir: &Path) -> miette::Result<()> {
    for name in wasm2ts::api::list_manifest(config_path, working_dir)? {
        println!("{}", name);
    }

    Ok(())
}
