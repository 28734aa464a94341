//! # CLI - BitcaskDB Interactive Shell
//!
//! A REPL-style command-line interface for the BitcaskDB storage engine.
//! Reads commands from stdin, executes them against the engine, and prints
//! results to stdout. Designed for both interactive use and scripted
//! testing (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! SET key value [version]  Insert or update a key (CAS when version given)
//! GET key                  Look up a key (prints value or "(nil)")
//! DEL key [version]        Delete a key (writes a tombstone)
//! STATS                    Print engine counters and debug info
//! EXIT / QUIT              Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! BITCASK_DIR      data directory        (default: "data")
//! BITCASK_FILE_MB  file cap in MiB       (default: 10)
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! BitcaskDB started (dir=data, keys=0, live=0, file_cap=10MiB)
//! > SET name alice
//! OK
//! > GET name
//! alice (version 1)
//! > SET name bob 1
//! OK
//! > DEL name 2
//! OK
//! > GET name
//! (nil)
//! > EXIT
//! bye
//! ```

use anyhow::Result;
use engine::{Engine, ANY_VERSION};
use std::io::{self, BufRead, Write};

/// Reads a configuration value from the environment, falling back to `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parses an optional trailing CAS version token, defaulting to the wildcard.
fn version_arg(token: Option<&str>) -> i64 {
    token.and_then(|s| s.parse().ok()).unwrap_or(ANY_VERSION)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Configuration via environment variables with sensible defaults.
    //
    //  BITCASK_DIR     - data directory   (default: "data")
    //  BITCASK_FILE_MB - file cap in MiB  (default: 10)
    let dir = env_or("BITCASK_DIR", "data");
    let file_mb: u64 = env_or("BITCASK_FILE_MB", "10").parse().unwrap_or(10);

    let mut engine = Engine::new(&dir)?;
    engine.set_max_file_size(file_mb * 1024 * 1024);

    println!(
        "BitcaskDB started (dir={}, keys={}, live={}, file_cap={}MiB)",
        dir,
        engine.key_count(),
        engine.live_key_count(),
        file_mb
    );
    println!("Commands: SET key value [version] | GET key | DEL key [version]");
    println!("          STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "SET" => match (parts.next(), parts.next()) {
                    (Some(key), Some(value)) => {
                        let version = version_arg(parts.next());
                        match engine.put(
                            key.as_bytes().to_vec(),
                            value.as_bytes().to_vec(),
                            version,
                        ) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR {e}"),
                        }
                    }
                    _ => println!("ERR usage: SET key value [version]"),
                },
                "GET" => match parts.next() {
                    Some(key) => match engine.get(key.as_bytes()) {
                        Ok((value, version)) => {
                            println!("{} (version {})", String::from_utf8_lossy(&value), version)
                        }
                        Err(engine::EngineError::NotFound) => println!("(nil)"),
                        Err(e) => println!("ERR {e}"),
                    },
                    None => println!("ERR usage: GET key"),
                },
                "DEL" => match parts.next() {
                    Some(key) => {
                        let version = version_arg(parts.next());
                        match engine.del(key.as_bytes().to_vec(), version) {
                            Ok(()) => println!("OK"),
                            Err(engine::EngineError::NotFound) => println!("(nil)"),
                            Err(e) => println!("ERR {e}"),
                        }
                    }
                    None => println!("ERR usage: DEL key [version]"),
                },
                "STATS" => {
                    let status = engine.status();
                    println!(
                        "max_num={} used_cnt={} trx_id={}",
                        status.max_num, status.used_cnt, status.trx_id
                    );
                    println!("{engine:?}");
                }
                "EXIT" | "QUIT" => {
                    println!("bye");
                    break;
                }
                other => println!("ERR unknown command: {other}"),
            }
        }
        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
