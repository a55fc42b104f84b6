//! Stratus - Main entry point.
//!
//! Command-line client for the Stratus deployment platform.
//!
//! Usage: stratus [OPTIONS] <command> [args...]
//!
//! Options:
//!   --version, -V    Show version
//!   --help, -h       Show usage
//!   --debug, -d      Enable debug logging
//!   --cwd <dir>      Run as if invoked from <dir>
//!
//! Commands the CLI does not recognize are delegated to `stratus-<command>`
//! executables found in the project or on the PATH; everything after the
//! command name is passed to the extension verbatim.

use std::env;
use std::path::PathBuf;

use stratus_cli::extension::invoke_extension;
use stratus_cli::{ApiClient, Config, auth, logging};

/// Current version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit code for usage errors, before any command runs.
const USAGE_EXIT_CODE: i32 = 2;

fn main() {
    // Parse command-line arguments
    let args: Vec<String> = env::args().skip(1).collect();

    let mut debug = false;
    let mut cwd_override: Option<PathBuf> = None;
    let mut index = 0;

    while index < args.len() {
        match args[index].as_str() {
            "--version" | "-V" => {
                println!("stratus v{}", VERSION);
                return;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--debug" | "-d" => {
                debug = true;
                index += 1;
            }
            "--cwd" => {
                let Some(dir) = args.get(index + 1) else {
                    eprintln!("stratus: --cwd requires a directory argument");
                    std::process::exit(USAGE_EXIT_CODE);
                };
                cwd_override = Some(PathBuf::from(dir));
                index += 2;
            }
            arg if arg.starts_with('-') => {
                eprintln!("stratus: unknown option '{}'", arg);
                std::process::exit(USAGE_EXIT_CODE);
            }
            _ => break,
        }
    }

    // First non-flag argument is the command; the rest belongs to it.
    let Some(name) = args.get(index).cloned() else {
        print_usage();
        std::process::exit(USAGE_EXIT_CODE);
    };
    let command_args: Vec<String> = args[index + 1..].to_vec();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("stratus: {}", e);
            std::process::exit(1);
        }
    };

    let mut log_config = config.log.clone();
    if debug {
        log_config.level = "debug".to_string();
    }
    if let Err(e) = logging::init(&log_config) {
        // Diagnostics are lost but the command can still run.
        eprintln!("stratus: failed to initialize logging: {}", e);
    }

    let credentials = auth::load_credentials();
    let client = match ApiClient::new(&config, &credentials) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("stratus: {}", e);
            std::process::exit(1);
        }
    };

    let cwd = match resolve_cwd(cwd_override) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("stratus: cannot determine working directory: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("stratus: failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(invoke_extension(&client, &name, &command_args, &cwd));

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("stratus: {}", e);
            std::process::exit(1);
        }
    }
}

/// Working directory for the invocation: the `--cwd` override made
/// absolute, or the process working directory.
fn resolve_cwd(override_dir: Option<PathBuf>) -> std::io::Result<PathBuf> {
    let current = env::current_dir()?;
    Ok(match override_dir {
        Some(dir) => current.join(dir),
        None => current,
    })
}

/// Prints usage to stdout.
fn print_usage() {
    println!("stratus v{}", VERSION);
    println!();
    println!("Usage: stratus [OPTIONS] <command> [args...]");
    println!();
    println!("Options:");
    println!("  --version, -V    Show version");
    println!("  --help, -h       Show usage");
    println!("  --debug, -d      Enable debug logging");
    println!("  --cwd <dir>      Run as if invoked from <dir>");
    println!();
    println!("Commands are provided by extensions: `stratus <name>` runs the");
    println!("`stratus-<name>` executable from the project's node_modules/.bin");
    println!("or the PATH, with authenticated API access via STRATUS_API.");
}
