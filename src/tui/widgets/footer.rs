//! Keybind footer bar. Action hints are dimmed while a job is running.

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::theme::Theme;

/// A key hint; `gated` hints are unavailable while controls are disabled.
pub(crate) struct Hint<'a> {
    pub key: &'a str,
    pub action: &'a str,
    pub gated: bool,
}

impl<'a> Hint<'a> {
    pub const fn always(key: &'a str, action: &'a str) -> Self {
        Self {
            key,
            action,
            gated: false,
        }
    }

    pub const fn gated(key: &'a str, action: &'a str) -> Self {
        Self {
            key,
            action,
            gated: true,
        }
    }
}

pub(crate) const REPORT_HINTS: &[Hint<'static>] = &[
    Hint::always("←/→", "Category"),
    Hint::always("↑/↓", "Scroll"),
    Hint::gated("R", "Refresh"),
    Hint::gated("C/M/D", "Benchmark"),
    Hint::gated("J/V", "Export JSON/CSV"),
    Hint::always("Esc", "Quit"),
];

pub(crate) const NOTICE_HINTS: &[Hint<'static>] = &[
    Hint::always("Enter", "Dismiss"),
    Hint::always("q", "Quit"),
];

pub(crate) fn draw_footer(
    area: Rect,
    f: &mut ratatui::Frame,
    theme: &Theme,
    hints: &[Hint<'_>],
    controls_enabled: bool,
) {
    let mut spans = Vec::new();
    for (i, hint) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" │ ", Style::default().fg(theme.muted)));
        }
        let disabled = hint.gated && !controls_enabled;
        let key_style = if disabled {
            Style::default()
                .fg(theme.muted)
                .add_modifier(Modifier::CROSSED_OUT)
        } else {
            Style::default().fg(theme.oracle)
        };
        spans.push(Span::styled(hint.key, key_style));
        spans.push(Span::styled(
            format!(" {}", hint.action),
            Style::default().fg(theme.muted),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
