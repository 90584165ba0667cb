//! Fullscreen terminal UI (TUI).
//!
//! The window is a [`TerminalView`] driven by a [`DisplayController`]. Slow
//! actions run on a worker thread; the loop polls their channel each frame so
//! the UI keeps drawing while hardware is probed or a benchmark runs.

pub(crate) mod input;
pub(crate) mod screens;
pub(crate) mod state;
pub(crate) mod theme;
pub(crate) mod widgets;

use std::io;
use std::panic::{self, PanicHookInfo};
use std::sync::mpsc::TryRecvError;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::Terminal;

use crate::controller::{Action, AppContext, DisplayController};
use crate::hardware::{Category, FieldValue};

use state::{TerminalView, WorkerState};
use theme::Theme;

const FRAME_TIME: Duration = Duration::from_millis(16);

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Routes panic messages away from stderr while installed; the default hook
/// comes back on drop.
///
/// Panicking hardware queries are shown as "N/A", but the default hook would
/// still print them over the alternate screen.
struct PanicHookGuard;

impl PanicHookGuard {
    fn install<F>(sink: F) -> Self
    where
        F: Fn(&PanicHookInfo<'_>) + Send + Sync + 'static,
    {
        panic::set_hook(Box::new(sink));
        Self
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        let _ = panic::take_hook();
    }
}

fn log_panic(info: &PanicHookInfo<'_>) {
    tracing::error!(panic = %info, "Panicked while the terminal UI was up");
}

pub(crate) fn run_tui(ctx: AppContext) -> Result<()> {
    let _guard = TerminalGuard::enter()?;
    let _panic_hook = PanicHookGuard::install(log_panic);

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut controller = DisplayController::new(ctx, TerminalView::new());
    let mut worker: Option<WorkerState> = None;
    let mut last_tick = Instant::now();

    input::start_action(&mut controller, &mut worker, Action::Open);

    loop {
        terminal.draw(|f| draw(f.area(), f, &controller, worker.as_ref()))?;

        if let Some(state) = worker.as_ref() {
            match state.rx.try_recv() {
                Ok(outcome) => {
                    worker = None;
                    if let Err(e) = controller.finish(outcome) {
                        tracing::debug!(error = %e, "Action finished with an error");
                    }
                    continue;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    worker = None;
                    controller.abort("Worker stopped unexpectedly.");
                    continue;
                }
            }
        }

        let timeout = FRAME_TIME.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if input::handle_key(&mut controller, &mut worker, key)? {
                    break;
                }
            }
        }

        if last_tick.elapsed() >= FRAME_TIME {
            last_tick = Instant::now();
            controller.display_mut().animation.advance();
        }
    }

    Ok(())
}

fn draw(
    area: Rect,
    f: &mut ratatui::Frame,
    controller: &DisplayController<TerminalView>,
    worker: Option<&WorkerState>,
) {
    let theme = Theme::default();
    let view = controller.display();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Min(0),    // content
            Constraint::Length(1), // footer
        ])
        .split(area);

    let host = view
        .snapshot
        .as_ref()
        .and_then(|s| s.get(Category::System))
        .and_then(|fields| match fields.get("host_name") {
            Some(FieldValue::Text(name)) => Some(name.as_str()),
            _ => None,
        });
    let activity = controller.in_flight().zip(worker).map(|(action, w)| {
        format!(
            "{} {}  {:.1}s",
            view.animation.spinner_char(),
            action,
            w.started_at.elapsed().as_secs_f64()
        )
    });
    widgets::header::draw_header(layout[0], f, &theme, host, activity.as_deref());

    screens::report::draw_report(layout[1], f, view, worker, theme);

    match view.notice.as_ref() {
        Some(notice) => {
            screens::notice::draw_notice_modal(layout[1], f, notice, theme);
            widgets::footer::draw_footer(
                layout[2],
                f,
                &theme,
                widgets::footer::NOTICE_HINTS,
                true,
            );
        }
        None => widgets::footer::draw_footer(
            layout[2],
            f,
            &theme,
            widgets::footer::REPORT_HINTS,
            view.controls_enabled,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn panic_hook_captures_messages_until_dropped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let guard = PanicHookGuard::install(move |info| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(info.to_string());
            }
        });
        let caught = panic::catch_unwind(|| panic!("sensor exploded"));
        drop(guard);

        assert!(caught.is_err());
        let captured = seen.lock().unwrap().len();
        assert!(seen
            .lock()
            .unwrap()
            .iter()
            .any(|msg| msg.contains("sensor exploded")));

        let _ = panic::catch_unwind(|| panic!("default hook again"));
        assert_eq!(seen.lock().unwrap().len(), captured);
    }
}
