//! Tunable CLI - hashes its inputs with a selectable digest
//!
//! Demonstrates both registries: `--Hasher`/`--Filter` choose
//! implementations, `-t Encoding=base64` and friends set tunables.

use std::ffi::OsString;
use std::io::{IsTerminal, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use base64::Engine;
use clap::{CommandFactory, FromArgMatches};
use tracing_subscriber::EnvFilter;

use tunable::cli::{Integration, Outcome};
use tunable::core::ValueRange;
use tunable::select::InventoryLoader;
use tunable::util::config::{global_config_path, load_config, project_config_path};
use tunable::util::diagnostic;
use tunable::{ParameterRegistry, SelectionRegistry, TunableError};

mod cli;
mod hasher;

use cli::Cli;
use hasher::{FILTER, HASHER};

tunable::declare_tunable!(
    Encoding,
    with_default("hex"),
    with_range(ValueRange::one_of(["hex", "base64"])),
    with_documentation("Digest encoding: hex or base64.")
);

tunable::declare_tunable!(
    Preview,
    with_default(false),
    with_hash(false),
    with_documentation("Print the hasher name before each digest.")
);

fn main() {
    if let Err(e) = run() {
        match e.downcast_ref::<TunableError>() {
            Some(err) if e.chain().count() == 1 => {
                diagnostic::emit(&err.to_diagnostic(), std::io::stderr().is_terminal());
            }
            _ => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<OsString> = std::env::args_os().collect();

    // Set up logging before discovery so registration is visible with -v
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    let filter = if verbose {
        EnvFilter::new("tunable=debug")
    } else {
        EnvFilter::new("tunable=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let config = load_config(global_config_path().as_deref(), &project_config_path(&cwd));

    let mut tunables = ParameterRegistry::discover()?.with_entry_namespace(module_path!());
    let mut selection = SelectionRegistry::discover()?.with_loader(Arc::new(InventoryLoader));
    for prefix in &config.loader.prefixes {
        selection.add_prefix(prefix.clone());
    }
    selection.set_auto_load(config.auto_load());
    selection.set_load_error_mode(config.load_error_mode());

    // Apply the command line
    let mut integration =
        Integration::new(&mut tunables, &mut selection).with_settings(config.cli_settings());
    integration.preparse(&args)?;
    let matches = integration.register(Cli::command()).get_matches_from(&args);
    if let Outcome::Exit(code) = integration.apply(&matches)? {
        std::process::exit(code);
    }
    let cli = Cli::from_arg_matches(&matches)?;

    if cli.fingerprint {
        let snapshot = tunables.snapshot();
        println!("{}", tunable::serial::fingerprint(&snapshot, cli.everything));
        return Ok(());
    }

    let hasher = selection.get(&HASHER)?;
    let filters = selection.get_all(&FILTER)?;
    let salt: String = tunables.value_as("Salt")?;
    let encoding: String = tunables.value_as("Encoding")?;
    let preview: bool = tunables.value_as("Preview")?;

    let mut inputs = Vec::new();
    if cli.inputs.is_empty() {
        let mut data = Vec::new();
        std::io::stdin()
            .read_to_end(&mut data)
            .context("failed to read standard input")?;
        inputs.push(("-".to_string(), data));
    } else {
        for path in &cli.inputs {
            let data = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            inputs.push((path.display().to_string(), data));
        }
    }

    for (label, data) in inputs {
        let mut salted = salt.as_bytes().to_vec();
        salted.extend_from_slice(&data);

        let digest = hasher.digest(&salted);
        let mut encoded = match encoding.as_str() {
            "base64" => base64::engine::general_purpose::STANDARD.encode(&digest),
            _ => hex::encode(&digest),
        };
        for filter in &filters {
            encoded = filter.apply(encoded);
        }

        if preview {
            println!("{}  {}  {}", hasher.name(), encoded, label);
        } else {
            println!("{}  {}", encoded, label);
        }
    }

    Ok(())
}
