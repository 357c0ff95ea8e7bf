use std::env;
use std::fs;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::bail;
use anyhow::Context;
use tidyup_core::config::Config;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

mod input;
mod ui;

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    root: Option<PathBuf>,
    debug: bool,
    dry_run: bool,
}

enum Command {
    Run(CliArgs),
    Help,
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = match parse_args(env::args().skip(1))? {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("tidyup {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Command::Run(args) => args,
    };

    let _ = dotenvy::dotenv();
    if args.debug || env::var_os("DEBUG").is_some() {
        init_tracing();
    }

    let config = load_config()?;
    let root = args
        .root
        .unwrap_or_else(|| PathBuf::from("."))
        .canonicalize()
        .context("cannot open the directory to tidy")?;
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }

    tracing::info!(
        root = %root.display(),
        model = %config.advisor.model,
        dry_run = args.dry_run,
        "starting review"
    );
    ui::run(config, root, args.dry_run).await
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Command> {
    let mut parsed = CliArgs::default();
    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--debug" => parsed.debug = true,
            "--dry-run" => parsed.dry_run = true,
            flag if flag.starts_with('-') => bail!("unsupported argument: {flag}"),
            path => {
                if parsed.root.is_some() {
                    bail!("only one directory can be tidied at a time");
                }
                parsed.root = Some(PathBuf::from(path));
            }
        }
    }
    Ok(Command::Run(parsed))
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tidyup").join("config.toml"))
}

fn load_config() -> anyhow::Result<Config> {
    let Some(path) = config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("invalid config at {}", path.display()))
}

fn parse_config(raw: &str) -> anyhow::Result<Config> {
    Ok(toml::from_str(raw)?)
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let Some(path) = dirs::cache_dir().map(|dir| dir.join("tidyup").join("debug.log")) else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }

    // Writing to stdout/stderr would corrupt the TUI, so no file means no logs.
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(env_filter)
        .init();
    tracing::info!(path = %path.display(), "logging initialized");
}

fn print_help() {
    println!("tidyup {}", env!("CARGO_PKG_VERSION"));
    println!("Usage:");
    println!("  tidyup [PATH] [--dry-run] [--debug]");
    println!("  tidyup --help");
    println!("  tidyup --version");
    println!();
    println!("PATH defaults to the current directory.");
    println!("The advisor key is read from GEMINI_API_KEY unless the config names another variable.");
}
