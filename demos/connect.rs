//! Interactive terminal on a remote sandbox.
//!
//! Demonstrates:
//! - Building a terminal from tunnel URL, token and sandbox ID
//! - Sending an initial size
//! - Forwarding stdin/stdout until the remote shell exits
//! - Closing the connection on every exit path
//!
//! The local terminal is not switched to raw mode, so input is line-buffered.
//!
//! Usage:
//!   cargo run --example connect -- <url> <token> <sandbox-id>
//!   cargo run --example connect -- <url> <token> <sandbox-id> --json
//!   cargo run --example connect -- <url> <token> <sandbox-id> --debug

// ============================================================================
// Imports
// ============================================================================

use sandbox_terminal::{Error, PendingResize, Protocol, Result, Terminal, TerminalBuilder};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const INITIAL_COLS: u16 = 80;
const INITIAL_ROWS: u16 = 24;

// ============================================================================
// Args
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    url: String,
    token: String,
    sandbox_id: String,
    json: bool,
    debug: bool,
}

impl Args {
    /// Parse command-line arguments.
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();

        let [url, token, sandbox_id] = positional.as_slice() else {
            return Err(Error::config(
                "usage: connect <url> <token> <sandbox-id> [--json] [--debug]",
            ));
        };

        Ok(Self {
            url: url.to_string(),
            token: token.to_string(),
            sandbox_id: sandbox_id.to_string(),
            json: args.iter().any(|a| a == "--json"),
            debug: args.iter().any(|a| a == "--debug"),
        })
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let protocol = if args.json {
        Protocol::Json
    } else {
        Protocol::SocketIo
    };

    let terminal = TerminalBuilder::new()
        .url(args.url)
        .token(args.token)
        .sandbox_id(args.sandbox_id)
        .protocol(protocol)
        .pending_resize(PendingResize::Deferred)
        .connect()
        .await?;

    let result = session(terminal.as_ref()).await;
    terminal.close().await?;
    result
}

async fn session(terminal: &dyn Terminal) -> Result<()> {
    terminal.resize(INITIAL_COLS, INITIAL_ROWS).await?;
    terminal
        .run(Box::new(tokio::io::stdin()), Box::new(tokio::io::stdout()))
        .await
}

// ============================================================================
// Logging
// ============================================================================

/// Logs go to stderr; stdout carries terminal output.
fn init_logging(debug: bool) {
    let filter = if debug {
        "sandbox_terminal=debug"
    } else {
        "sandbox_terminal=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
