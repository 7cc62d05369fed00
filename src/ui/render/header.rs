use crate::ui::theme::Theme;
use crate::ui::{App, Screen};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
    Frame,
};

pub(super) fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(10)])
        .split(area);

    let logo = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("   {}", Theme::LOGO),
            Style::default()
                .fg(Theme::WHITE)
                .add_modifier(Modifier::BOLD),
        )),
    ])
    .style(Style::default().bg(Theme::BG));
    frame.render_widget(logo, columns[0]);

    let titles: Vec<Line> = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, screen)| Line::from(format!("{} {}", i + 1, screen.label())))
        .collect();
    let selected = Screen::ALL
        .iter()
        .position(|s| *s == app.screen)
        .unwrap_or(0);

    let tab_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(columns[1]);
    let tabs = Tabs::new(titles)
        .select(selected)
        .style(Theme::text_dim())
        .highlight_style(Theme::title())
        .divider(Span::styled(" │ ", Theme::border()));
    frame.render_widget(tabs, tab_rows[1]);
}
