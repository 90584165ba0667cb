//! Main report screen: category strip, usage gauges and the selected category's fields.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::hardware::{Category, CategoryFields, FieldValue};
use crate::snapshot::Snapshot;
use crate::tui::state::{TerminalView, WorkerState};
use crate::tui::theme::Theme;
use crate::tui::widgets::card::CardWidget;
use crate::tui::widgets::{gauge, tabs};

/// Gauges shown above the field list, when their category has a percentage.
const GAUGES: [(Category, &str, &str); 3] = [
    (Category::Cpu, "CPU", "usage_percent"),
    (Category::Ram, "RAM", "usage_percent"),
    (Category::Disks, "Disks", "usage_percent"),
];

pub(crate) fn draw_report(
    area: Rect,
    f: &mut ratatui::Frame,
    view: &TerminalView,
    worker: Option<&WorkerState>,
    theme: Theme,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),                   // category strip
            Constraint::Length(GAUGES.len() as u16), // gauges
            Constraint::Min(0),                      // fields
        ])
        .split(area);

    let selected = view.selected_category();
    tabs::draw_tabs(layout[0], f, &theme, selected);

    let Some(snapshot) = view.snapshot.as_ref() else {
        draw_loading(layout[2], f, view, worker, theme);
        return;
    };

    let gauge_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); GAUGES.len()])
        .split(layout[1]);
    for ((category, label, field), row) in GAUGES.iter().zip(gauge_rows.iter()) {
        gauge::draw_usage_gauge(*row, f, &theme, label, percent_of(snapshot, *category, field));
    }

    let Some(fields) = snapshot.get(selected).filter(|fields| !fields.is_empty()) else {
        return;
    };
    let (available, total) = coverage(fields);
    let badge_color = if available == total {
        theme.optimal
    } else if available == 0 {
        theme.critical
    } else {
        theme.caution
    };

    CardWidget::new(selected.label())
        .badge(format!("{available}/{total} fields"), badge_color)
        .border_color(if view.controls_enabled {
            theme.border
        } else {
            theme.muted
        })
        .lines(field_lines(fields, theme))
        .scroll(view.scroll)
        .render(layout[2], f, &theme);
}

fn draw_loading(
    area: Rect,
    f: &mut ratatui::Frame,
    view: &TerminalView,
    worker: Option<&WorkerState>,
    theme: Theme,
) {
    let spinner = view.animation.spinner_char();
    let elapsed = worker
        .map(|w| w.started_at.elapsed())
        .unwrap_or_default();

    CardWidget::new("Detecting Hardware")
        .border_color(theme.oracle)
        .line(Line::from(""))
        .line(Line::from(vec![
            Span::styled(format!("  {spinner}  "), Style::default().fg(theme.oracle)),
            Span::styled(
                format!("Scanning system... ({:.1}s)", elapsed.as_secs_f64()),
                Style::default().fg(theme.text),
            ),
        ]))
        .line(Line::from(""))
        .line(Line::from(Span::styled(
            "  This may take a few seconds.",
            Style::default().fg(theme.muted),
        )))
        .render(area, f, &theme);
}

fn field_lines(fields: &CategoryFields, theme: Theme) -> Vec<Line<'static>> {
    let width = fields.names().map(str::len).max().unwrap_or(0);
    fields
        .iter()
        .map(|(name, value)| {
            Line::from(vec![
                Span::styled(
                    format!("  {name:<width$}  "),
                    Style::default()
                        .fg(theme.text_dim)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(value.to_string(), Style::default().fg(theme.value_color(value))),
            ])
        })
        .collect()
}

fn percent_of(snapshot: &Snapshot, category: Category, field: &str) -> Option<f64> {
    match snapshot.get(category)?.get(field)? {
        FieldValue::Float(v) => Some(*v),
        FieldValue::Integer(n) => Some(*n as f64),
        _ => None,
    }
}

/// (available, declared) field counts.
fn coverage(fields: &CategoryFields) -> (usize, usize) {
    let available = fields.iter().filter(|(_, v)| v.is_available()).count();
    (available, fields.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_counts_placeholders() {
        let fields: CategoryFields = [
            ("name", FieldValue::Text("X".to_string())),
            ("usage_percent", FieldValue::Unavailable),
        ]
        .into_iter()
        .collect();
        assert_eq!(coverage(&fields), (1, 2));
    }

    #[test]
    fn field_lines_align_values() {
        let fields: CategoryFields = [
            ("name", FieldValue::Text("X".to_string())),
            ("frequency_mhz", FieldValue::Integer(3200)),
        ]
        .into_iter()
        .collect();
        let lines = field_lines(&fields, Theme::default());

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[0].content, format!("  {:<13}  ", "name"));
        assert_eq!(lines[1].spans[1].content, "3200");
    }
}
