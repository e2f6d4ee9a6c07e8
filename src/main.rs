mod access;
mod config;
mod db;
mod ipc;
mod model;
mod rotation;
mod stats;
mod store;

use std::io::{self, BufRead, Write};

fn main() {
    let config = match config::Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("focusd: {}", e);
            std::process::exit(2);
        }
    };
    config.logging.init();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        timezone = config.timezone.name(),
        "focusd starting"
    );

    let mut state = ipc::AppState::new(config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => {
                tracing::trace!(id = %req.id, method = %req.method, "request");
                ipc::handle_request(&mut state, req)
            }
            Err(e) => {
                tracing::debug!(error = %e, "unparseable request line");
                ipc::bad_json(e.to_string())
            }
        };
        let _ = writeln!(stdout, "{}", resp);
        let _ = stdout.flush();
    }
    tracing::info!("stdin closed, exiting");
}
