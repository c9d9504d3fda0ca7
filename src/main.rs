use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use triple_helix::config::Config;
use triple_helix::helix::{CompletionEvent, HelixError, Scheduler};
use triple_helix::{logging, store};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level, config.log_dir.as_deref());

    let Some(state_path) = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or(config.state_path.clone())
    else {
        tracing::error!("usage: triple-helix <state.json> < events.jsonl (or set HELIX_STATE_PATH)");
        return ExitCode::from(2);
    };

    match replay(&config, &state_path) {
        Ok(turns) => {
            tracing::info!(turns, path = %state_path.display(), "replay finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "replay aborted");
            ExitCode::FAILURE
        }
    }
}

/// Applies one JSON event per stdin line, echoing each decision as a JSON line.
fn replay(config: &Config, state_path: &Path) -> Result<usize, HelixError> {
    let scheduler = Scheduler::new(config.helix.clone());
    let mut state = store::load_state(&scheduler, state_path)?.state;
    let presenting = scheduler.present(&state)?;
    tracing::info!(
        track = %presenting.track_number,
        unit = %presenting.unit_id,
        "state loaded"
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut turns = 0;

    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event: CompletionEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(line = line_no + 1, error = %err, "skipping unparsable event");
                continue;
            }
        };

        match scheduler.complete_turn(&mut state, &event) {
            Ok(decision) => {
                serde_json::to_writer(&mut out, &decision)?;
                writeln!(out)?;
                turns += 1;
            }
            Err(err) if err.requires_reset() => return Err(err),
            Err(err) => {
                tracing::warn!(line = line_no + 1, error = %err, "event rejected");
            }
        }
    }
    out.flush()?;

    store::save_state(&scheduler, state_path, &state)?;
    Ok(turns)
}
