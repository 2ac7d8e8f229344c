mod cache;
mod config;
mod db;
mod export;
mod ipc;
mod migration;
mod model;
mod queue;
mod repo;
mod report;
mod session;
mod store;

use std::io::{self, BufRead, Write};

fn main() {
    // stdout carries responses; logs go to stderr.
    env_logger::init();

    let config = config::Config::from_env();
    log::info!(
        "transportd {} starting, {} admin emails, alert window {} days",
        env!("CARGO_PKG_VERSION"),
        config.admin_emails.len(),
        config.alert_window_days
    );
    let mut state = ipc::AppState::new(config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                log::error!("stdin closed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                log::warn!("unparseable request: {}", e);
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        log::debug!("request {} {}", req.id, req.method);
        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
