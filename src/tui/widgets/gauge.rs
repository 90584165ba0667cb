//! Horizontal usage gauge bar.

use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::theme::Theme;

/// Draw `label [████░░░░] 42.0%`, or a dimmed `N/A` bar when `percent` is unknown.
pub(crate) fn draw_usage_gauge(
    area: Rect,
    f: &mut ratatui::Frame,
    theme: &Theme,
    label: &str,
    percent: Option<f64>,
) {
    let label_width = 8;
    let suffix_str = match percent {
        Some(p) => format!(" {p:>6.1}%"),
        None => format!(" {:>7}", crate::hardware::NOT_AVAILABLE),
    };
    let bar_width = (area.width as usize)
        .saturating_sub(label_width)
        .saturating_sub(suffix_str.chars().count());

    let ratio = percent.map_or(0.0, |p| (p / 100.0).clamp(0.0, 1.0));
    let filled = (bar_width as f64 * ratio) as usize;
    let empty = bar_width.saturating_sub(filled);
    let fill_color = percent.map_or(theme.muted, |p| theme.usage_color(p));

    let line = Line::from(vec![
        Span::styled(
            format!("{label:<label_width$}"),
            Style::default().fg(theme.text),
        ),
        Span::styled("█".repeat(filled), Style::default().fg(fill_color)),
        Span::styled("░".repeat(empty), Style::default().fg(theme.muted)),
        Span::styled(suffix_str, Style::default().fg(theme.text)),
    ]);

    f.render_widget(Paragraph::new(line), area);
}
