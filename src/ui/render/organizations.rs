use crate::ui::helpers::format_date;
use crate::ui::theme::Theme;
use crate::ui::App;
use crate::util::fit_width;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

pub(super) fn render_organizations(frame: &mut Frame, area: Rect, app: &App) {
    let list = &app.organizations;
    let block = Block::default()
        .title(" Organizations ")
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .style(Style::default().bg(Theme::BG));

    let mut lines: Vec<Line> = vec![Line::from("")];

    if list.loading && list.items.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  {} Loading organizations", super::spinner(app)),
            Theme::text_muted(),
        )));
    } else if let Some(err) = &list.error {
        lines.push(Line::from(Span::styled(
            format!("  {} {}", Theme::WARNING_MARK, err),
            Theme::error(),
        )));
        lines.push(Line::from(Span::styled("  Press r to retry", Theme::text_dim())));
    } else if list.items.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No organizations yet. Press n to create one.",
            Theme::text_muted(),
        )));
    }

    let inner_height = area.height.saturating_sub(3) as usize;
    let skip = list.selected.saturating_sub(inner_height.saturating_sub(1));
    let name_width = (area.width as usize).saturating_sub(40).max(12);
    let current = app.session.organization_id.as_deref();

    for (i, org) in list.items.iter().enumerate().skip(skip).take(inner_height) {
        let is_selected = i == list.selected;
        let marker = if current == Some(org.id.as_str()) {
            Theme::CHECK_MARK
        } else {
            ' '
        };
        let row_style = if is_selected {
            Theme::selected()
        } else {
            Theme::text()
        };
        let pointer = if is_selected { Theme::ARROW_RIGHT } else { ' ' };
        lines.push(Line::from(vec![
            Span::styled(format!("  {} {} ", pointer, marker), row_style),
            Span::styled(fit_width(&org.name, name_width), row_style),
            Span::styled(
                format!("  {:<12}", fit_width(&org.slug, 12)),
                Theme::text_muted(),
            ),
            Span::styled(
                format!("  {:<10}", org.plan.as_deref().unwrap_or("-")),
                Theme::text_dim(),
            ),
            Span::styled(
                format!("  {}", format_date(org.created_at.as_ref())),
                Theme::text_dim(),
            ),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
