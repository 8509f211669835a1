//! geotrace-ctl — command-line interface for the geotrace daemon.

use anyhow::{Context, Result};

mod cmd;

use cmd::status::{cmd_cache, cmd_cache_clear, cmd_status};
use cmd::watch::cmd_watch;

const DEFAULT_PORT: u16 = 8080;

fn print_usage() {
    eprintln!("Usage: geotrace-ctl [--port PORT] <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status          Subscriber count, cache size and pipeline counters");
    eprintln!("  cache           Cached record count and capacity");
    eprintln!("  cache clear     Drop every cached record");
    eprintln!("  watch           Print live events as they are published");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --port PORT     Daemon port (default {})", DEFAULT_PORT);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | [] => cmd_status(port).await,
        ["cache"] => cmd_cache(port).await,
        ["cache", "clear"] => cmd_cache_clear(port).await,
        ["watch"] => cmd_watch(port).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
