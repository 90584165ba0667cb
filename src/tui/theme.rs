//! TUI color theme.

use ratatui::style::Color;

use crate::controller::NoticeKind;
use crate::hardware::FieldValue;

#[derive(Clone, Copy)]
pub(crate) struct Theme {
    // Primary palette
    pub oracle: Color,
    pub optimal: Color,
    pub caution: Color,
    pub critical: Color,

    // UI chrome
    pub border: Color,
    pub muted: Color,
    pub text: Color,
    pub text_dim: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            oracle: Color::Rgb(0, 212, 255),
            optimal: Color::Rgb(163, 230, 53),
            caution: Color::Rgb(251, 191, 36),
            critical: Color::Rgb(255, 68, 85),
            border: Color::Gray,
            muted: Color::DarkGray,
            text: Color::White,
            text_dim: Color::Gray,
        }
    }
}

impl Theme {
    /// Placeholders are dimmed so real readings stand out.
    pub fn value_color(&self, value: &FieldValue) -> Color {
        match value {
            FieldValue::Unavailable => self.muted,
            FieldValue::Bool(true) => self.optimal,
            FieldValue::Bool(false) => self.text_dim,
            _ => self.text,
        }
    }

    pub fn usage_color(&self, percent: f64) -> Color {
        if percent >= 90.0 {
            self.critical
        } else if percent >= 70.0 {
            self.caution
        } else {
            self.optimal
        }
    }

    pub fn notice_color(&self, kind: NoticeKind) -> Color {
        match kind {
            NoticeKind::Info => self.oracle,
            NoticeKind::Busy => self.caution,
            NoticeKind::Error => self.critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_thresholds() {
        let theme = Theme::default();
        assert_eq!(theme.usage_color(12.0), theme.optimal);
        assert_eq!(theme.usage_color(75.0), theme.caution);
        assert_eq!(theme.usage_color(99.5), theme.critical);
        assert_eq!(theme.value_color(&FieldValue::Unavailable), theme.muted);
    }
}
