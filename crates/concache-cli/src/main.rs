//! concache - command-line front end for the offline convention data cache.
//!
//! Loads the configuration, opens the cache for the configured convention
//! and runs one command against it.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use concache_core::Config;

// ============================================================================
// Constants
// ============================================================================

const USAGE: &str = "\
Usage: concache [--log-file <dir>] <command>

Commands:
  sync                     Fetch all collections from the API
  status                   Show the cache state
  show <field>             Print the stored value of a field
  events                   List upcoming events
  search <field> <query>   Search events, dealers, announcements, knowledgeEntries or artistAlley
  hide <event-id>          Hide an event
  remind <event-id>        Add a reminder for an event
  forget <event-id>        Remove the reminder for an event
  token set [<token>]      Store the API access token (read from stdin if omitted)
  token clear              Remove the stored access token
  reset                    Clear all cached data";

/// Log file name inside the `--log-file` directory
const LOG_FILE_NAME: &str = "concache.log";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file on drop and must be held until
/// exit.
fn init_tracing(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

/// Pull `--log-file <dir>` out of the argument list.
fn take_log_dir(args: &mut Vec<String>) -> Result<Option<PathBuf>> {
    let Some(pos) = args.iter().position(|a| a == "--log-file") else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("--log-file needs a directory");
    }
    let dir = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(PathBuf::from(dir)))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let log_dir = take_log_dir(&mut args)?;
    let _guard = init_tracing(log_dir.as_ref());

    let Some(command) = args.first().cloned() else {
        eprintln!("{USAGE}");
        return Ok(());
    };
    let rest = &args[1..];

    let mut config = Config::load()?;
    config.apply_env();
    info!(command = %command, "concache starting");

    match (command.as_str(), rest) {
        ("-h" | "--help" | "help", _) => println!("{USAGE}"),
        ("token", [action, token @ ..]) => commands::token(action, token.first().map(String::as_str))?,
        (name, rest) => {
            let cache = commands::open_cache(&config).await?;
            let result = commands::run(&cache, name, rest).await;
            cache.dispose().await;
            result?;
        }
    }
    Ok(())
}
