mod analyzers;
mod detail;
mod footer;
mod header;
mod organizations;
mod overlays;
mod toast;

use crate::ui::theme::Theme;
use crate::ui::{App, InputMode, Overlay, Screen};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Frame,
};

pub use analyzers::result_lines;

use analyzers::render_analyzers;
use detail::render_detail;
use footer::render_footer;
use header::render_header;
use organizations::render_organizations;
use overlays::{render_confirm, render_help, render_input};
use toast::render_toast;

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Clear with dark background
    frame.render_widget(Block::default().style(Style::default().bg(Theme::BG)), area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header (logo + screens)
            Constraint::Min(8),    // Main content
            Constraint::Length(2), // Footer
        ])
        .split(area);

    render_header(frame, layout[0], app);
    match app.screen {
        Screen::Organizations => render_organizations(frame, layout[1], app),
        Screen::Detail => render_detail(frame, layout[1], app),
        Screen::Analyzers => render_analyzers(frame, layout[1], app),
    }
    render_footer(frame, layout[2], app);

    if let InputMode::Editing(purpose) = app.input_mode {
        render_input(frame, app, purpose);
    }

    match &app.overlay {
        Overlay::Help => render_help(frame),
        Overlay::Confirm(action) => render_confirm(frame, action),
        Overlay::None => {}
    }

    if let Some(toast) = &app.toast {
        render_toast(frame, toast);
    }
}

/// Spinner glyph for the current frame
pub(super) fn spinner(app: &App) -> char {
    Theme::SPINNER_BRAILLE[app.loading_frame % Theme::SPINNER_BRAILLE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TabLoader;
    use crate::reconcile::NormalizedResult;
    use crate::session::{MemoryStore, SessionContext};
    use crate::ui::{DetailData, ResultSlotKind};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use serde_json::json;

    fn app() -> App {
        let loader = TabLoader::new("")
            .with_tab("Projects", |_org: &str| async {
                Ok::<_, String>(DetailData::Projects(Vec::new()))
            })
            .with_tab("Members", |_org: &str| async {
                Ok::<_, String>(DetailData::Members(Vec::new()))
            });
        App::new(
            loader,
            SessionContext::default(),
            Box::new(MemoryStore::new()),
            "api.test",
        )
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        screen_text(&terminal)
    }

    #[test]
    fn test_render_every_screen() {
        let mut app = app();
        for screen in Screen::ALL {
            app.screen = screen;
            let text = draw(&app);
            assert!(text.contains("o r g p u l s e"));
        }
        app.overlay = Overlay::Help;
        assert!(draw(&app).contains("Help"));
    }

    #[test]
    fn test_render_fallback_shows_raw_text_notice() {
        let mut app = app();
        app.screen = Screen::Analyzers;
        app.set_analyzer_target("acme".to_string());
        let job = app.start_analysis(ResultSlotKind::Analysis).unwrap();
        app.apply_analysis(
            0,
            job.slot,
            job.request_id,
            Ok(NormalizedResult::Fallback {
                value: json!({"raw_analysis": "plain words"}),
                raw_text: Some("plain words".to_string()),
                error: Some("parse_failed".to_string()),
            }),
        );
        let text = draw(&app);
        assert!(text.contains("plain words"));
        assert!(text.contains("raw text"));
    }
}
