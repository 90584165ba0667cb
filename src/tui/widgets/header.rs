//! Top header bar with title, host and activity indicator.

use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::theme::Theme;

pub(crate) fn draw_header(
    area: Rect,
    f: &mut ratatui::Frame,
    theme: &Theme,
    host: Option<&str>,
    activity: Option<&str>,
) {
    let mut spans = vec![Span::styled(
        "HARDWAREHOUSE",
        Style::default()
            .fg(theme.oracle)
            .add_modifier(Modifier::BOLD),
    )];

    if let Some(host) = host {
        spans.push(Span::styled(
            format!("  //  {host}"),
            Style::default().fg(theme.text_dim),
        ));
    }

    if let Some(activity) = activity {
        spans.push(Span::styled(
            format!("  {activity}"),
            Style::default().fg(theme.caution),
        ));
    }

    let header_line = Line::from(spans);
    let rule = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(theme.border),
    ));

    f.render_widget(Paragraph::new(vec![header_line, rule]), area);
}
