//! craqkv CLI Client
//!
//! Command-line interface for talking to a chain node.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use craqkv::network::Client;
use craqkv::CraqError;

/// craqkv CLI
#[derive(Parser, Debug)]
#[command(name = "craqkv-cli")]
#[command(about = "CLI for the craqkv chain-replicated store")]
struct Args {
    /// Node address (writes must go to the head)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Request timeout in milliseconds
    #[arg(short, long, default_value = "5000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair (head only)
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Show the committed version of a key (tail only)
    Version {
        /// The key to query
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server, Duration::from_millis(args.timeout_ms)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: cannot connect to {}: {}", args.server, e);
            return ExitCode::FAILURE;
        }
    };

    let result = match args.command {
        Commands::Get { key } => client.get(&key).map(|value| format!("{}={}", key, value)),
        Commands::Set { key, value } => client.set(&key, &value),
        Commands::Version { key } => client.query_version(&key).map(|v| format!("{} v{}", key, v)),
        Commands::Ping => client.ping().map(|_| "PONG".to_string()),
    };

    match result {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(CraqError::KeyNotFound) => {
            eprintln!("(not found)");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
