mod attendance;
mod backup;
mod config;
mod db;
mod ipc;
mod logging;

use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};

fn main() {
    let config = match config::DaemonConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("attendanced: {e:#}");
            std::process::exit(2);
        }
    };
    logging::init(&config.log_filter);
    info!(version = env!("CARGO_PKG_VERSION"), clock = ?config.clock, "attendanced starting");

    let mut state = ipc::AppState::new(config.clock);
    if let Some(path) = config.workspace.as_deref() {
        if let Err(e) = ipc::open_workspace(&mut state, path) {
            error!(workspace = %path.display(), error = %format!("{e:#}"), "failed to open workspace");
        }
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "failed to read stdin");
                break;
            }
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "request line is not UTF-8");
                reply_unparsed(&mut stdout, format!("request is not UTF-8: {e}"));
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(line.trim()) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparseable request line");
                reply_unparsed(&mut stdout, e.to_string());
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed, shutting down");
}

/// Replies to a line that never became a request; there is no id to echo.
fn reply_unparsed(stdout: &mut io::Stdout, message: String) {
    let resp = serde_json::json!({
        "ok": false,
        "error": { "code": "bad_json", "message": message },
    });
    let _ = writeln!(stdout, "{}", resp);
    let _ = stdout.flush();
}
