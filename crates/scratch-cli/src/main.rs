use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use scratch_config::{init_tracing, ScratchConfig};
use scratch_fs::{DeleteEngine, DeleteReport, InputFingerprint, WalkOptions};
use scratch_temp::TempWorkspace;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "scratch",
    version,
    about = "Scratch storage tools (hashing, tree walks, deletion, fingerprints, temp dirs)"
)]
struct Cli {
    /// Path to a `scratch.toml` (defaults to discovery in the current directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the SHA-256 digest of a file or a string
    Hash(HashArgs),
    /// List the files and post-ordered directories below a directory
    Walk(WalkArgs),
    /// Delete a directory tree (or a single file)
    Delete(DeleteArgs),
    /// Delete everything inside a directory, keeping the directory
    Clear(ClearArgs),
    /// Print the timestamp fingerprint of a set of inputs
    Fingerprint(FingerprintArgs),
    /// Create temp directories and files under a fresh temp root
    Temp(TempArgs),
}

#[derive(Args)]
struct HashArgs {
    /// File to hash
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    path: Option<PathBuf>,
    /// Hash this string instead of a file
    #[arg(long)]
    text: Option<String>,
}

#[derive(Args)]
struct WalkArgs {
    /// Directory to walk
    dir: PathBuf,
    /// Report symbolic links as leaves instead of following them
    #[arg(long)]
    no_follow: bool,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DeleteArgs {
    /// Directory, file or symbolic link to delete
    path: PathBuf,
    /// Keep the directory itself and delete only its contents
    #[arg(long)]
    keep_root: bool,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ClearArgs {
    /// Directory to empty
    dir: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct FingerprintArgs {
    /// Input files and directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TempArgs {
    #[command(subcommand)]
    command: TempCommand,
    /// Leave the created path (and its temp root) in place on exit
    #[arg(long, global = true)]
    keep: bool,
}

#[derive(Subcommand)]
enum TempCommand {
    /// Create a uniquely named directory
    Dir {
        #[arg(long, default_value = "scratch-dir-")]
        prefix: String,
    },
    /// Create a uniquely named empty file
    File {
        #[arg(long, default_value = ".tmp")]
        suffix: String,
    },
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Command::Hash(args) => {
            let digest = match (&args.path, &args.text) {
                (_, Some(text)) => scratch_fs::hash_str(text),
                (Some(path), None) => scratch_fs::hash_file(path)
                    .with_context(|| format!("failed to hash {}", path.display()))?,
                (None, None) => anyhow::bail!("nothing to hash: pass a file or --text"),
            };
            println!("{digest}");
            Ok(0)
        }
        Command::Walk(args) => {
            let options = WalkOptions {
                follow_links: !args.no_follow,
            };
            let walk = scratch_fs::walk_tree_with(&args.dir, options)
                .with_context(|| format!("failed to walk {}", args.dir.display()))?;
            if args.json {
                print_json(&walk)?;
            } else {
                for file in walk.files() {
                    println!("file {}", file.display());
                }
                for dir in walk.dirs() {
                    println!("dir  {}", dir.display());
                }
            }
            Ok(0)
        }
        Command::Delete(args) => {
            let engine = DeleteEngine::new(&config.delete);
            // A link to a directory is unlinked, not emptied.
            let is_real_dir = std::fs::symlink_metadata(&args.path)
                .map(|meta| meta.is_dir())
                .unwrap_or(false);
            let report = if is_real_dir {
                engine
                    .delete_tree(&args.path, args.keep_root)
                    .with_context(|| format!("failed to delete {}", args.path.display()))?
            } else {
                engine.delete_if_exists(&args.path)
            };
            print_report("delete", &args.path, &report, args.json)?;
            Ok(0)
        }
        Command::Clear(args) => {
            let engine = DeleteEngine::new(&config.delete);
            let report = engine
                .clear_dir(&args.dir)
                .with_context(|| format!("failed to clear {}", args.dir.display()))?;
            print_report("clear", &args.dir, &report, args.json)?;
            Ok(0)
        }
        Command::Fingerprint(args) => {
            let fingerprint = InputFingerprint::for_inputs(&args.paths)
                .context("failed to fingerprint inputs")?;
            if args.json {
                let files = scratch_fs::expand_inputs(&args.paths)?.len();
                print_json(&FingerprintOutput {
                    fingerprint: fingerprint.as_str(),
                    inputs: args.paths.len(),
                    files,
                })?;
            } else {
                println!("{fingerprint}");
            }
            Ok(0)
        }
        Command::Temp(args) => {
            let engine = Arc::new(DeleteEngine::new(&config.delete));
            let workspace = TempWorkspace::with_engine(&config.temp, engine)
                .context("failed to create temp root")?;
            // Dropped at the end of this arm, before `main` exits the process.
            let _guard = (!args.keep).then(|| workspace.teardown_guard());

            let created = match &args.command {
                TempCommand::Dir { prefix } => workspace.create_instance_dir(prefix)?,
                TempCommand::File { suffix } => workspace.create_temp_file(suffix)?,
            };
            tracing::debug!(
                target: "scratch.cli",
                path = %created.display(),
                keep = args.keep,
                "created temp path"
            );
            println!("{}", created.display());
            Ok(0)
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<ScratchConfig> {
    match explicit {
        Some(path) => {
            let mut config = ScratchConfig::load_from_path(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            config.apply_env_overrides()?;
            Ok(config)
        }
        None => {
            let cwd = std::env::current_dir().context("failed to read current directory")?;
            let (config, _) = scratch_config::load_for_dir(&cwd)?;
            Ok(config)
        }
    }
}

#[derive(Serialize)]
struct FingerprintOutput<'a> {
    fingerprint: &'a str,
    inputs: usize,
    files: usize,
}

fn print_report(action: &str, path: &Path, report: &DeleteReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }

    println!(
        "{action}: {} ({} files, {} directories removed)",
        path.display(),
        report.files_deleted,
        report.dirs_deleted
    );
    for failure in &report.failures {
        println!(
            "  failed {:?} {}: {}",
            failure.kind,
            failure.path.display(),
            failure.error
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value)?;
    println!("{out}");
    Ok(())
}
