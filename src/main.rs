//! TTL LRU - interactive shell
//!
//! Reads commands from stdin and runs them against one cache instance.
//! Useful for poking at eviction and expiry behavior by hand.

use std::future;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_lru::cache::LruCacheBuilder;
use ttl_lru::{CacheConfig, CacheError, LruCache};

const HELP: &str = "\
commands:
  set <key> <value>     store a value (resets its TTL)
  get <key>             load a value and mark it most recently used
  peek <key>            load a value without touching recency
  update <key> <value>  replace an existing value, keeping its TTL
  del <key>             delete a key
  oldest                evict the least recently used entry
  keys | len | clear | purge | stats
  help | quit";

// == Commands ==
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Set(String, String),
    Get(String),
    Peek(String),
    Update(String, String),
    Delete(String),
    Oldest,
    Keys,
    Len,
    Clear,
    Purge,
    Stats,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let mut parts = line.split_whitespace();
        let name = parts.next().ok_or_else(|| anyhow!("empty command"))?;
        let mut arg = |what: &str| {
            parts
                .next()
                .map(str::to_owned)
                .ok_or_else(|| anyhow!("{} requires a {}", name, what))
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "set" => Command::Set(arg("key")?, arg("value")?),
            "get" => Command::Get(arg("key")?),
            "peek" => Command::Peek(arg("key")?),
            "update" => Command::Update(arg("key")?, arg("value")?),
            "del" | "delete" => Command::Delete(arg("key")?),
            "oldest" => Command::Oldest,
            "keys" => Command::Keys,
            "len" => Command::Len,
            "clear" => Command::Clear,
            "purge" => Command::Purge,
            "stats" => Command::Stats,
            "help" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command: {}", other),
        };

        Ok(command)
    }
}

/// Runs one command and renders its outcome for the terminal.
fn execute(cache: &LruCache<String>, command: Command) -> anyhow::Result<String> {
    let output = match command {
        Command::Set(key, value) => {
            cache.store(key, value);
            "OK".to_string()
        }
        Command::Get(key) => render_lookup(cache.load(&key)),
        Command::Peek(key) => render_lookup(cache.peek(&key)),
        Command::Update(key, value) => {
            if cache.update(&key, value) {
                "OK".to_string()
            } else {
                "(not found)".to_string()
            }
        }
        Command::Delete(key) => u8::from(cache.delete(&key)).to_string(),
        Command::Oldest => cache.remove_oldest().unwrap_or_else(|| "(empty)".to_string()),
        Command::Keys => {
            let mut keys = cache.keys();
            keys.sort();
            keys.join("\n")
        }
        Command::Len => cache.len().to_string(),
        Command::Clear => {
            cache.clear();
            "OK".to_string()
        }
        Command::Purge => cache.purge_expired().to_string(),
        Command::Stats => serde_json::to_string_pretty(&cache.stats())?,
        Command::Help | Command::Quit => HELP.to_string(),
    };

    Ok(output)
}

fn render_lookup(result: ttl_lru::Result<String>) -> String {
    match result {
        Ok(value) => value,
        Err(CacheError::Expired(_)) => "(expired)".to_string(),
        Err(_) => "(nil)".to_string(),
    }
}

/// Main entry point for the cache shell.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache with a logging eviction callback
/// 4. Read commands until EOF, `quit`, Ctrl+C or SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_lru=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = CacheConfig::from_env();
    info!(capacity = ?config.capacity, ttl = ?config.ttl, "Configuration loaded");

    let cache: LruCache<String> = LruCacheBuilder::<String>::from_config(&config)
        .on_evicted(|key, value| info!(key = %key, value = %value, "Entry evicted"))
        .build();

    let mut lines = BufReader::new(io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(command) => match execute(&cache, command) {
                Ok(output) => println!("{}", output),
                Err(err) => println!("(error) {}", err),
            },
            Err(err) => println!("(error) {}", err),
        }
    }

    info!(entries = cache.len(), "Shell closed");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(%err, "Failed to install Ctrl+C handler");
            future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(%err, "Failed to install SIGTERM handler");
                future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
