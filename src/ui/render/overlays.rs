use crate::ui::helpers::centered_rect;
use crate::ui::theme::Theme;
use crate::ui::{App, EditPurpose, PendingAction};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

pub(super) fn render_help(frame: &mut Frame) {
    let area = centered_rect(55, 80, frame.area());
    frame.render_widget(Clear, area);

    fn section(title: &str) -> Vec<Line<'static>> {
        vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("    ╭─ ".to_string(), Theme::border()),
                Span::styled(
                    title.to_string(),
                    Style::default()
                        .fg(Theme::WHITE)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
        ]
    }

    fn key_row(key: &str, desc: &str) -> Line<'static> {
        Line::from(vec![
            Span::styled("    │  ".to_string(), Theme::border()),
            Span::styled(
                format!(" {} ", key),
                Style::default().fg(Theme::GREY_900).bg(Theme::GREY_300),
            ),
            Span::styled(format!("  {}", desc), Style::default().fg(Theme::GREY_200)),
        ])
    }

    let mut lines: Vec<Line<'static>> = Vec::new();

    lines.extend(section("Navigation"));
    lines.push(key_row("1 2 3", "Organizations, detail, analyzers"));
    lines.push(key_row("⇥ ⇤", "Next / previous tab"));
    lines.push(key_row("↑↓ jk", "Move selection / scroll"));
    lines.push(key_row("Esc", "Close / cancel"));

    lines.extend(section("Organizations & detail"));
    lines.push(key_row("↵", "Open organization"));
    lines.push(key_row("n", "New organization, project or invite"));
    lines.push(key_row("d", "Delete or remove selected"));
    lines.push(key_row("r", "Reload the current tab"));

    lines.extend(section("Analyzers"));
    lines.push(key_row("↵", "Set target and analyze"));
    lines.push(key_row("a", "Analyze the current target again"));
    lines.push(key_row("s", "Growth strategy for the target"));

    lines.extend(section("General"));
    lines.push(key_row("?", "Toggle help"));
    lines.push(key_row("q", "Quit"));

    let block = Paragraph::new(lines).block(
        Block::default()
            .title(" Help ")
            .title_style(Style::default().fg(Theme::GREY_100))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Theme::GREY_400))
            .style(Style::default().bg(Theme::GREY_900)),
    );
    frame.render_widget(block, area);
}

pub(super) fn render_confirm(frame: &mut Frame, action: &PendingAction) {
    let area = popup(frame.area(), 60, 7);
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", action.prompt()), Theme::text())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  ", Style::default()),
            Span::styled(" y ", Style::default().fg(Theme::GREY_900).bg(Theme::RED)),
            Span::styled(" confirm   ", Theme::text_muted()),
            Span::styled(" n ", Style::default().fg(Theme::GREY_900).bg(Theme::GREY_300)),
            Span::styled(" cancel", Theme::text_muted()),
        ]),
    ];

    let block = Paragraph::new(lines).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" Confirm ")
            .title_style(Theme::title())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Theme::RED))
            .style(Style::default().bg(Theme::GREY_900)),
    );
    frame.render_widget(block, area);
}

pub(super) fn render_input(frame: &mut Frame, app: &App, purpose: EditPurpose) {
    let area = popup(frame.area(), 64, 8);
    frame.render_widget(Clear, area);

    let hint = match purpose {
        EditPurpose::AnalyzerTarget => app
            .active_panel()
            .map(|p| p.kind.target_hint())
            .unwrap_or_default(),
        EditPurpose::NewOrganization => "Organization name",
        EditPurpose::NewProject => "Project name",
        EditPurpose::InviteMember => "email [owner|admin|member]",
    };

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!("  {}", hint), Theme::text_muted())),
        Line::from(vec![
            Span::styled(format!("  {} ", Theme::ARROW_RIGHT), Theme::key()),
            Span::styled(app.input_buffer.clone(), Theme::text()),
            Span::styled("▏", Style::default().fg(Theme::GREY_300)),
        ]),
    ];
    if let Some(err) = &app.input_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {} {}", Theme::WARNING_MARK, err),
            Theme::error(),
        )));
    }

    let block = Paragraph::new(lines).block(
        Block::default()
            .title(format!(" {} ", purpose.title()))
            .title_style(Theme::title())
            .borders(Borders::ALL)
            .border_style(Theme::border_active())
            .style(Style::default().bg(Theme::GREY_800)),
    );
    frame.render_widget(block, area);
}

/// Fixed-height popup centered horizontally by percentage
fn popup(area: Rect, percent_x: u16, height: u16) -> Rect {
    let width = (area.width as u32 * percent_x as u32 / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}
