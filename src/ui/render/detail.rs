use crate::api::{Member, Project, UsageStats};
use crate::loader::TabStatus;
use crate::ui::helpers::format_date;
use crate::ui::theme::{bar_gauge, Theme};
use crate::ui::{App, DetailData};
use crate::util::fit_width;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Frame,
};

pub(super) fn render_detail(frame: &mut Frame, area: Rect, app: &App) {
    let title = match app.current_organization() {
        Some(org) => format!(" {} ", org.name),
        None => " Organization ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .style(Style::default().bg(Theme::BG));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.session.organization_id.is_none() {
        let hint = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Select an organization first (press 1)",
                Theme::text_muted(),
            )),
        ]);
        frame.render_widget(hint, inner);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);

    let loader = &app.detail;
    let titles: Vec<Line> = loader
        .labels()
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let mark = match loader.status(i) {
                TabStatus::Loading => format!(" {}", super::spinner(app)),
                TabStatus::Failed => format!(" {}", Theme::CROSS_MARK),
                TabStatus::Idle | TabStatus::Loaded => String::new(),
            };
            Line::from(format!("{}{}", label, mark))
        })
        .collect();
    let tabs = Tabs::new(titles)
        .select(loader.active_tab())
        .style(Theme::text_dim())
        .highlight_style(Theme::title())
        .divider(Span::styled(" │ ", Theme::border()));
    frame.render_widget(tabs, rows[0]);

    let active = loader.active_tab();
    let state = loader.get_state(active);
    let mut lines: Vec<Line> = Vec::new();

    if let Some(err) = &state.last_error {
        lines.push(Line::from(Span::styled(
            format!(" {} {}", Theme::WARNING_MARK, err),
            Theme::error(),
        )));
        lines.push(Line::from(Span::styled(" Press r to retry", Theme::text_dim())));
        lines.push(Line::from(""));
    }

    match loader.data(active) {
        Some(DetailData::Projects(projects)) => {
            project_lines(&mut lines, projects, app.detail_selected, inner.width)
        }
        Some(DetailData::Members(members)) => {
            member_lines(&mut lines, members, app.detail_selected, inner.width)
        }
        Some(DetailData::Usage(usage)) => usage_lines(&mut lines, usage),
        None => match state.status {
            TabStatus::Loading => lines.push(Line::from(Span::styled(
                format!(" {} Loading", super::spinner(app)),
                Theme::text_muted(),
            ))),
            TabStatus::Idle => {
                lines.push(Line::from(Span::styled(" Not loaded", Theme::text_dim())))
            }
            TabStatus::Failed | TabStatus::Loaded => {}
        },
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), rows[1]);
}

fn row_style(selected: bool) -> Style {
    if selected {
        Theme::selected()
    } else {
        Theme::text()
    }
}

fn project_lines(lines: &mut Vec<Line<'static>>, projects: &[Project], selected: usize, width: u16) {
    if projects.is_empty() {
        lines.push(Line::from(Span::styled(
            " No projects. Press n to create one.",
            Theme::text_muted(),
        )));
        return;
    }
    let name_width = (width as usize).saturating_sub(20).clamp(12, 40);
    for (i, project) in projects.iter().enumerate() {
        let style = row_style(i == selected);
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", Theme::BULLET), style),
            Span::styled(fit_width(&project.name, name_width), style),
            Span::styled(
                format!("  {}", format_date(project.created_at.as_ref())),
                Theme::text_dim(),
            ),
        ]));
        if let Some(description) = project.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(Line::from(Span::styled(
                format!("   {}", crate::util::truncate(description, 80)),
                Theme::text_muted(),
            )));
        }
    }
}

fn member_lines(lines: &mut Vec<Line<'static>>, members: &[Member], selected: usize, width: u16) {
    if members.is_empty() {
        lines.push(Line::from(Span::styled(
            " No members. Press n to invite someone.",
            Theme::text_muted(),
        )));
        return;
    }
    let name_width = (width as usize).saturating_sub(50).clamp(12, 30);
    for (i, member) in members.iter().enumerate() {
        let style = row_style(i == selected);
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", Theme::BULLET), style),
            Span::styled(fit_width(member.display_name(), name_width), style),
            Span::styled(format!("  {}", fit_width(&member.email, 28)), Theme::text_muted()),
            Span::styled(format!("  {:<6}", member.role.label()), Theme::text_dim()),
        ]));
    }
}

fn usage_lines(lines: &mut Vec<Line<'static>>, usage: &UsageStats) {
    let row = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!(" {:<14}", label), Theme::text_muted()),
            Span::styled(value, Theme::text()),
        ])
    };
    if let Some(period) = &usage.period {
        lines.push(row("Period", period.clone()));
    }
    let analyses = match usage.analyses_limit {
        Some(limit) => format!("{} / {}", usage.analyses_run, limit),
        None => usage.analyses_run.to_string(),
    };
    lines.push(row("Analyses", analyses));
    if let Some(ratio) = usage.quota_ratio() {
        let style = if ratio >= 0.9 {
            Theme::error()
        } else {
            Theme::text_muted()
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {:<14}", ""), Theme::text_muted()),
            Span::styled(bar_gauge(ratio, 24), style),
            Span::styled(format!(" {:>3.0}%", ratio * 100.0), style),
        ]));
    }
    lines.push(row("Tokens", usage.tokens_used.to_string()));
    lines.push(row("Projects", usage.projects.to_string()));
    lines.push(row("Members", usage.members.to_string()));
}
