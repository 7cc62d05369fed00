use crate::api::AnalysisKind;
use crate::reconcile::{NormalizedResult, Shape};
use crate::ui::helpers::{humanize_field, wrap_text};
use crate::ui::theme::Theme;
use crate::ui::{AnalyzerPanel, App, ResultSlot, ResultSlotKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame,
};
use serde_json::Value;

pub(super) fn render_analyzers(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Analyzers ")
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_style(Theme::border())
        .style(Style::default().bg(Theme::BG));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);

    let titles: Vec<Line> = app
        .analyzers
        .iter()
        .map(|p| {
            let mark = if p.is_pending() {
                format!(" {}", super::spinner(app))
            } else {
                String::new()
            };
            Line::from(format!("{}{}", p.kind.label(), mark))
        })
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.active_analyzer)
        .style(Theme::text_dim())
        .highlight_style(Theme::title())
        .divider(Span::styled(" │ ", Theme::border()));
    frame.render_widget(tabs, rows[0]);

    let Some(panel) = app.active_panel() else {
        return;
    };
    let width = rows[1].width.saturating_sub(2) as usize;
    let lines = panel_lines(app, panel, width);
    let paragraph = Paragraph::new(lines).scroll((panel.scroll.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(paragraph, rows[1]);
}

fn panel_lines(app: &App, panel: &AnalyzerPanel, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match &panel.target {
        Some(target) => lines.push(Line::from(vec![
            Span::styled(" Target  ", Theme::text_muted()),
            Span::styled(target.clone(), Theme::text().add_modifier(Modifier::BOLD)),
        ])),
        None => {
            lines.push(Line::from(Span::styled(
                format!(" Press ↵ to enter a {}", panel.kind.target_hint()),
                Theme::text_muted(),
            )));
            return lines;
        }
    }

    for (slot_kind, shape) in [
        (ResultSlotKind::Analysis, panel.kind.shape()),
        (ResultSlotKind::Strategy, AnalysisKind::Strategy.shape()),
    ] {
        let slot = panel.slot(slot_kind);
        let untouched = !slot.is_pending() && slot.result.is_none() && slot.error.is_none();
        if slot_kind == ResultSlotKind::Strategy && untouched {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                " Press s for a growth strategy",
                Theme::text_dim(),
            )));
            continue;
        }
        lines.push(Line::from(""));
        let heading = match slot_kind {
            ResultSlotKind::Analysis => format!("{} analysis", panel.kind.label()),
            ResultSlotKind::Strategy => "Growth strategy".to_string(),
        };
        lines.push(Line::from(Span::styled(format!(" {}", heading), Theme::title())));
        slot_lines(&mut lines, app, slot, shape, width);
    }
    lines
}

fn slot_lines(
    lines: &mut Vec<Line<'static>>,
    app: &App,
    slot: &ResultSlot,
    shape: &Shape,
    width: usize,
) {
    if slot.is_pending() {
        lines.push(Line::from(Span::styled(
            format!(" {} Working", super::spinner(app)),
            Theme::text_muted(),
        )));
    }
    if let Some(err) = &slot.error {
        lines.push(Line::from(Span::styled(
            format!(" {} {}", Theme::WARNING_MARK, err),
            Theme::error(),
        )));
    }
    if let Some(result) = &slot.result {
        lines.extend(result_lines(result, shape, width));
    }
}

/// Render a reconciled response: its known fields, or the raw text with a
/// notice when nothing could be structured.
pub fn result_lines(result: &NormalizedResult, shape: &Shape, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let text_width = width.saturating_sub(4).max(10);

    match result {
        NormalizedResult::Fallback { raw_text, error, .. } => {
            lines.push(Line::from(Span::styled(
                format!(
                    " {} Response could not be structured; showing raw text",
                    Theme::WARNING_MARK
                ),
                Theme::notice(),
            )));
            if let Some(error) = error {
                lines.push(Line::from(Span::styled(
                    format!("   reason: {}", error),
                    Theme::text_dim(),
                )));
            }
            lines.push(Line::from(""));
            match raw_text.as_deref().filter(|t| !t.trim().is_empty()) {
                Some(text) => {
                    for line in wrap_text(text, text_width) {
                        lines.push(Line::from(Span::styled(format!("   {}", line), Theme::text())));
                    }
                }
                None => lines.push(Line::from(Span::styled(
                    "   The response contained no text",
                    Theme::text_dim(),
                ))),
            }
            return lines;
        }
        NormalizedResult::Recovered { source_field, .. } => {
            let note = if source_field.is_empty() {
                format!(" {} recovered", Theme::DOT_SEPARATOR)
            } else {
                format!(" {} recovered from {}", Theme::DOT_SEPARATOR, source_field)
            };
            lines.push(Line::from(Span::styled(note, Theme::text_dim())));
        }
        NormalizedResult::Direct(_) => {}
    }

    let mut rendered = 0;
    for field in shape.fields {
        let Some(value) = result.field(field).filter(|v| !v.is_null()) else {
            continue;
        };
        rendered += 1;
        lines.push(Line::from(Span::styled(
            format!(" {}", humanize_field(field)),
            Style::default()
                .fg(Theme::GREY_200)
                .add_modifier(Modifier::BOLD),
        )));
        value_lines(&mut lines, value, text_width);
    }
    if rendered == 0 {
        lines.push(Line::from(Span::styled(
            "   No fields returned",
            Theme::text_dim(),
        )));
    }
    lines
}

fn value_lines(lines: &mut Vec<Line<'static>>, value: &Value, width: usize) {
    match value {
        Value::String(text) => {
            for line in wrap_text(text, width) {
                lines.push(Line::from(Span::styled(format!("   {}", line), Theme::text())));
            }
        }
        Value::Array(items) => {
            for item in items {
                let text = inline(item);
                for (i, line) in wrap_text(&text, width.saturating_sub(2)).into_iter().enumerate() {
                    let lead = if i == 0 {
                        format!("   {} ", Theme::BULLET)
                    } else {
                        "     ".to_string()
                    };
                    lines.push(Line::from(vec![
                        Span::styled(lead, Theme::text_dim()),
                        Span::styled(line, Theme::text()),
                    ]));
                }
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                lines.push(Line::from(vec![
                    Span::styled(format!("   {}: ", humanize_field(key)), Theme::text_muted()),
                    Span::styled(inline(item), Theme::text()),
                ]));
            }
        }
        other => lines.push(Line::from(Span::styled(format!("   {}", inline(other)), Theme::text()))),
    }
}

/// One-line rendering of a nested value
fn inline(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items.iter().map(inline).collect::<Vec<_>>().join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, inline(v)))
            .collect::<Vec<_>>()
            .join(" · "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::STRATEGY;
    use crate::reconcile::reconcile;
    use serde_json::json;

    fn text(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_recovered_result_lists_known_fields() {
        let result = NormalizedResult::Recovered {
            value: json!({
                "title": "Grow",
                "goals": ["reach", "retention"],
                "timeline": {"q1": "launch"},
                "error": "parse_failed"
            }),
            source_field: "raw_strategy".to_string(),
        };
        let out = text(&result_lines(&result, &STRATEGY, 60));
        assert!(out.contains("recovered from raw_strategy"));
        assert!(out.contains("Title"));
        assert!(out.contains("• reach"));
        assert!(out.contains("Q1: launch"));
        assert!(!out.contains("parse_failed"));
    }

    #[test]
    fn test_recovered_bare_string_names_response() {
        let result = reconcile(json!("```json\n{\"title\": \"Grow\"}\n```"), &STRATEGY);
        let out = text(&result_lines(&result, &STRATEGY, 60));
        assert!(out.contains("recovered from response"));

        let unnamed = NormalizedResult::Recovered {
            value: json!({"title": "Grow"}),
            source_field: String::new(),
        };
        let out = text(&result_lines(&unnamed, &STRATEGY, 60));
        assert!(out.contains("recovered"));
        assert!(!out.contains("recovered from"));
    }

    #[test]
    fn test_fallback_without_text() {
        let result = NormalizedResult::Fallback {
            value: json!({"error": "timeout"}),
            raw_text: None,
            error: Some("timeout".to_string()),
        };
        let out = text(&result_lines(&result, &STRATEGY, 60));
        assert!(out.contains("showing raw text"));
        assert!(out.contains("reason: timeout"));
        assert!(out.contains("no text"));
    }

    #[test]
    fn test_inline_nested_values() {
        assert_eq!(inline(&json!({"name": "a", "n": 2})), "n: 2 · name: a");
        assert_eq!(inline(&json!([1, "x", null])), "1, x, -");
    }
}
