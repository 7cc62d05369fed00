//! Greyscale theme for orgpulse
//! A high-contrast monochrome palette with a few accents for status

use ratatui::style::{Color, Modifier, Style};

/// The greyscale color palette
pub struct Theme;

impl Theme {
    // ─────────────────────────────────────────────────────────────────────
    // Core greyscale palette - from brightest to darkest
    // ─────────────────────────────────────────────────────────────────────

    /// Pure white - maximum emphasis, critical alerts
    pub const WHITE: Color = Color::Rgb(255, 255, 255);

    /// Near white - headers, selected items, primary focus
    pub const GREY_50: Color = Color::Rgb(250, 250, 250);

    /// Bright grey - primary text, important content
    pub const GREY_100: Color = Color::Rgb(220, 220, 220);

    /// Light grey - secondary text, active elements
    pub const GREY_200: Color = Color::Rgb(180, 180, 180);

    /// Medium grey - muted text, less important info
    pub const GREY_300: Color = Color::Rgb(140, 140, 140);

    /// Dark grey - subtle elements, inactive tabs
    pub const GREY_400: Color = Color::Rgb(100, 100, 100);

    /// Darker grey - borders, separators
    pub const GREY_500: Color = Color::Rgb(70, 70, 70);

    /// Dark grey - overlay backgrounds
    pub const GREY_700: Color = Color::Rgb(35, 35, 35);

    /// Near black - panel background
    pub const GREY_800: Color = Color::Rgb(28, 28, 28);

    /// True black - deepest background
    pub const GREY_900: Color = Color::Rgb(18, 18, 18);

    /// Background color alias
    pub const BG: Color = Self::GREY_900;

    // ─────────────────────────────────────────────────────────────────────
    // Accents
    // ─────────────────────────────────────────────────────────────────────

    pub const GREEN: Color = Color::Rgb(100, 200, 100);
    pub const RED: Color = Color::Rgb(200, 100, 100);
    pub const YELLOW: Color = Color::Rgb(220, 190, 90);

    pub const LOGO: &'static str = "o r g p u l s e";

    // ─────────────────────────────────────────────────────────────────────
    // Pre-built styles for common UI elements
    // ─────────────────────────────────────────────────────────────────────

    pub fn text() -> Style {
        Style::default().fg(Self::GREY_100)
    }

    pub fn text_muted() -> Style {
        Style::default().fg(Self::GREY_300)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::GREY_400)
    }

    pub fn selected() -> Style {
        Style::default()
            .fg(Self::WHITE)
            .bg(Self::GREY_700)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::GREY_500)
    }

    pub fn border_active() -> Style {
        Style::default().fg(Self::GREY_300)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::GREY_50)
            .add_modifier(Modifier::BOLD)
    }

    pub fn key() -> Style {
        Style::default()
            .fg(Self::WHITE)
            .add_modifier(Modifier::BOLD)
    }

    /// Inline notice for a tab that failed or fell back to raw text
    pub fn notice() -> Style {
        Style::default().fg(Self::YELLOW)
    }

    pub fn error() -> Style {
        Style::default().fg(Self::RED)
    }

    pub const BAR_FILLED: char = '█';
    pub const BAR_EMPTY: char = '░';
    pub const BULLET: char = '•';
    pub const DOT_SEPARATOR: char = '·';
    pub const ARROW_RIGHT: char = '▸';
    pub const CHECK_MARK: char = '✓';
    pub const CROSS_MARK: char = '✗';
    pub const WARNING_MARK: char = '⚠';

    /// Spinner frames - braille pattern (smooth)
    pub const SPINNER_BRAILLE: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
}

/// Horizontal bar gauge for a 0.0..=1.0 ratio
pub fn bar_gauge(ratio: f64, width: usize) -> String {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    let filled = (ratio * width as f64).round() as usize;
    (0..width)
        .map(|i| {
            if i < filled {
                Theme::BAR_FILLED
            } else {
                Theme::BAR_EMPTY
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_gauge() {
        assert_eq!(bar_gauge(0.5, 10).chars().filter(|c| *c == Theme::BAR_FILLED).count(), 5);
        assert_eq!(bar_gauge(3.0, 4), "████");
        assert_eq!(bar_gauge(f64::NAN, 2), "░░");
    }
}
