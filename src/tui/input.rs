//! TUI keyboard input handling.

use std::sync::mpsc;
use std::time::Instant;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::benchmark_runner::BenchmarkKind;
use crate::controller::{Action, DisplayController};
use crate::export::ExportFormat;

use super::state::{TerminalView, WorkerState};

/// Handle one key press. Returns `true` when the user asked to quit.
pub(crate) fn handle_key(
    controller: &mut DisplayController<TerminalView>,
    worker: &mut Option<WorkerState>,
    key: KeyEvent,
) -> Result<bool> {
    // Windows reports both press and release.
    if key.kind == KeyEventKind::Release {
        return Ok(false);
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Ok(true);
    }

    let view = controller.display_mut();
    if view.notice.is_some() {
        match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => view.dismiss_notice(),
            KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(true),
            _ => {}
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(true),
        KeyCode::Right | KeyCode::Tab => view.select_next(),
        KeyCode::Left | KeyCode::BackTab => view.select_prev(),
        KeyCode::Down => view.scroll = view.scroll.saturating_add(1),
        KeyCode::Up => view.scroll = view.scroll.saturating_sub(1),
        KeyCode::Char('r') | KeyCode::Char('R') => start_action(controller, worker, Action::Refresh),
        KeyCode::Char('c') | KeyCode::Char('C') => {
            start_action(controller, worker, Action::Benchmark(BenchmarkKind::Cpu))
        }
        KeyCode::Char('m') | KeyCode::Char('M') => {
            start_action(controller, worker, Action::Benchmark(BenchmarkKind::Memory))
        }
        KeyCode::Char('d') | KeyCode::Char('D') => {
            start_action(controller, worker, Action::Benchmark(BenchmarkKind::Disk))
        }
        KeyCode::Char('j') | KeyCode::Char('J') => export_default(controller, ExportFormat::Json),
        KeyCode::Char('v') | KeyCode::Char('V') => export_default(controller, ExportFormat::Csv),
        _ => {}
    }
    Ok(false)
}

/// Hand a slow action to a worker thread; the result comes back over `rx`.
pub(crate) fn start_action(
    controller: &mut DisplayController<TerminalView>,
    worker: &mut Option<WorkerState>,
    action: Action,
) {
    // Rejections are already shown to the user by the controller.
    let Ok(job) = controller.begin(action) else {
        return;
    };

    let (tx, rx) = mpsc::channel();
    *worker = Some(WorkerState {
        started_at: Instant::now(),
        rx,
    });

    std::thread::spawn(move || {
        let _ = tx.send(job.run());
    });
}

/// Exports are quick, so they run on the UI thread.
fn export_default(controller: &mut DisplayController<TerminalView>, format: ExportFormat) {
    if let Err(e) = controller.on_export(format, None) {
        tracing::debug!(error = %e, "Export not completed");
    }
}
