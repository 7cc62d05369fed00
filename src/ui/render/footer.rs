use crate::ui::theme::Theme;
use crate::ui::{App, InputMode, Screen};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

pub(super) fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled("  ", Style::default())];

    let org_label = match (app.current_organization(), &app.session.organization_id) {
        (Some(org), _) => org.name.clone(),
        (None, Some(id)) => id.clone(),
        (None, None) => "no organization".to_string(),
    };
    spans.push(Span::styled(
        crate::util::truncate(&org_label, 28),
        Style::default().fg(Theme::GREY_100),
    ));
    spans.push(Span::styled(
        format!(" {} ", Theme::DOT_SEPARATOR),
        Style::default().fg(Theme::GREY_500),
    ));
    spans.push(Span::styled(
        crate::util::truncate(&app.api_label, 32),
        Style::default().fg(Theme::GREY_400),
    ));

    if app.is_busy() {
        spans.push(Span::styled(
            format!("  {} loading", super::spinner(app)),
            Style::default().fg(Theme::GREY_300),
        ));
    }

    let hints = hints(app);
    let status_width: usize = spans.iter().map(|s| s.content.width()).sum();
    let hints_width: usize = hints
        .iter()
        .map(|(key, desc)| key.width() + desc.width() + 4)
        .sum();
    let spacer = (area.width as usize).saturating_sub(status_width + hints_width + 2);
    spans.push(Span::raw(" ".repeat(spacer)));

    for (key, desc) in hints {
        spans.push(Span::styled(
            format!(" {} ", key),
            Style::default().fg(Theme::GREY_900).bg(Theme::GREY_400),
        ));
        spans.push(Span::styled(
            format!(" {} ", desc),
            Style::default().fg(Theme::GREY_400),
        ));
    }

    let footer = Paragraph::new(vec![Line::from(""), Line::from(spans)])
        .style(Style::default().bg(Theme::BG));
    frame.render_widget(footer, area);
}

fn hints(app: &App) -> Vec<(&'static str, &'static str)> {
    if matches!(app.input_mode, InputMode::Editing(_)) {
        return vec![("↵", "submit"), ("Esc", "cancel")];
    }
    let mut hints = match app.screen {
        Screen::Organizations => vec![("↵", "open"), ("n", "new"), ("d", "delete")],
        Screen::Detail => vec![("⇥", "tab"), ("r", "retry"), ("n", "add"), ("d", "remove")],
        Screen::Analyzers => vec![("⇥", "tab"), ("↵", "target"), ("s", "strategy")],
    };
    hints.push(("?", "help"));
    hints.push(("q", "quit"));
    hints
}
