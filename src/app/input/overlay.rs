use crate::app::background;
use crate::app::RuntimeContext;
use crate::ui::{App, Overlay, PendingAction};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

pub(super) fn handle_overlay_input(app: &mut App, key: KeyEvent, ctx: &RuntimeContext) -> Result<()> {
    match &app.overlay {
        Overlay::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                app.overlay = Overlay::None;
            }
        }
        Overlay::Confirm(action) => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let action = action.clone();
                app.overlay = Overlay::None;
                confirm(app, action, ctx);
            }
            KeyCode::Char('n') | KeyCode::Esc => app.overlay = Overlay::None,
            _ => {}
        },
        Overlay::None => {}
    }
    Ok(())
}

fn confirm(app: &mut App, action: PendingAction, ctx: &RuntimeContext) {
    tracing::info!(?action, "confirmed");
    match action {
        PendingAction::DeleteOrganization { id, .. } => background::delete_organization(ctx, id),
        PendingAction::DeleteProject { id, .. } => {
            if let Some(org) = app.session.organization_id.clone() {
                if app.session.project_id.as_deref() == Some(id.as_str()) {
                    app.session.switch_project(None);
                    app.persist_session();
                }
                background::delete_project(ctx, org, id);
            }
        }
        PendingAction::RemoveMember { id, .. } => {
            if let Some(org) = app.session.organization_id.clone() {
                background::remove_member(ctx, org, id);
            }
        }
    }
}
