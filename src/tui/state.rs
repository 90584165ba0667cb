//! TUI application state types.

use std::sync::mpsc;
use std::time::Instant;

use crate::controller::{Display, JobOutcome, Notice};
use crate::hardware::Category;
use crate::snapshot::Snapshot;

/// What the window currently shows. This is the controller's `Display`.
pub(crate) struct TerminalView {
    pub snapshot: Option<Snapshot>,
    pub selected: usize,
    pub scroll: u16,
    pub controls_enabled: bool,
    pub notice: Option<Notice>,
    pub animation: AnimationState,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            selected: 0,
            scroll: 0,
            controls_enabled: true,
            notice: None,
            animation: AnimationState::new(),
        }
    }

    pub fn selected_category(&self) -> Category {
        Category::ALL[self.selected % Category::ALL.len()]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % Category::ALL.len();
        self.scroll = 0;
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + Category::ALL.len() - 1) % Category::ALL.len();
        self.scroll = 0;
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}

impl Display for TerminalView {
    fn render(&mut self, snapshot: &Snapshot) {
        self.snapshot = Some(snapshot.clone());
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
    }

    fn show_message(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }
}

/// A controller job running on a worker thread.
#[derive(Debug)]
pub(crate) struct WorkerState {
    pub started_at: Instant,
    pub rx: mpsc::Receiver<JobOutcome>,
}

pub(crate) struct AnimationState {
    pub tick: u64,
}

impl AnimationState {
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    pub fn advance(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    pub fn spinner_char(&self) -> char {
        const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
        FRAMES[(self.tick as usize / 6) % FRAMES.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_selection_wraps() {
        let mut view = TerminalView::new();
        assert_eq!(view.selected_category(), Category::System);

        view.select_prev();
        assert_eq!(view.selected_category(), Category::Benchmark);
        view.select_next();
        view.select_next();
        assert_eq!(view.selected_category(), Category::Cpu);
    }

    #[test]
    fn view_records_controller_calls() {
        let mut view = TerminalView::new();
        view.set_controls_enabled(false);
        view.show_message(Notice::info("Export complete", "saved"));

        assert!(!view.controls_enabled);
        assert_eq!(view.notice.as_ref().map(|n| n.title.as_str()), Some("Export complete"));
        view.dismiss_notice();
        assert!(view.notice.is_none());
    }
}
