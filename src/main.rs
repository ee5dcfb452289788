//! JSON-lines driver
//!
//! Reads one command per line from stdin and writes one response per line to
//! stdout. State lives in memory for the lifetime of the process.

use std::error::Error;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use todo_forest::{execute_json, init_logging, Config, MemoryBackend, TodoService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    if !init_logging(&config)? {
        eprintln!("TODO_FOREST_LOG_DIR not set, file logging disabled");
    }

    let service = TodoService::load(Arc::new(MemoryBackend::new())).await?;
    log::info!("Ready for commands on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = execute_json(&service, &line).await;
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        stdout.write_all(out.as_bytes()).await?;
        stdout.flush().await?;
    }

    log::info!("Input closed, shutting down");
    Ok(())
}
