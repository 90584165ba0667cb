//! Category strip across the top of the report.

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::hardware::Category;
use crate::tui::theme::Theme;

pub(crate) fn draw_tabs(area: Rect, f: &mut ratatui::Frame, theme: &Theme, selected: Category) {
    let mut spans = Vec::new();

    for (i, category) in Category::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("─", Style::default().fg(theme.muted)));
        }
        if *category == selected {
            spans.push(Span::styled(
                format!("[ {} ]", category.label()),
                Style::default()
                    .fg(theme.oracle)
                    .add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(
                format!(" {} ", category.label()),
                Style::default().fg(theme.text_dim),
            ));
        }
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
