use crate::api::{Invitation, MemberRole, OrganizationDraft, ProjectDraft};
use crate::app::background;
use crate::app::RuntimeContext;
use crate::ui::{App, EditPurpose, ResultSlotKind};
use crate::validate::{self, ValidationError};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

const MAX_INPUT_CHARS: usize = 256;

pub(super) fn handle_editing_input(
    app: &mut App,
    key: KeyEvent,
    purpose: EditPurpose,
    ctx: &RuntimeContext,
) -> Result<()> {
    match key.code {
        KeyCode::Esc => app.cancel_edit(),
        KeyCode::Enter => submit(app, purpose, ctx),
        KeyCode::Backspace => {
            app.input_buffer.pop();
            app.input_error = None;
        }
        KeyCode::Char(c) if !c.is_control() => {
            if app.input_buffer.chars().count() < MAX_INPUT_CHARS {
                app.input_buffer.push(c);
            }
            app.input_error = None;
        }
        _ => {}
    }
    Ok(())
}

fn submit(app: &mut App, purpose: EditPurpose, ctx: &RuntimeContext) {
    let input = app.input_buffer.clone();
    let outcome = match purpose {
        EditPurpose::AnalyzerTarget => submit_target(app, &input, ctx),
        EditPurpose::NewOrganization => submit_organization(app, &input, ctx),
        EditPurpose::NewProject => submit_project(app, &input, ctx),
        EditPurpose::InviteMember => submit_invitation(app, &input, ctx),
    };
    if let Err(err) = outcome {
        app.input_error = Some(err.to_string());
    }
}

fn submit_target(app: &mut App, input: &str, ctx: &RuntimeContext) -> Result<(), ValidationError> {
    let Some(kind) = app.active_panel().map(|p| p.kind) else {
        app.cancel_edit();
        return Ok(());
    };
    let target = validate::analysis_target(kind, input)?;
    app.finish_edit();
    app.set_analyzer_target(target);
    if let Some(job) = app.start_analysis(ResultSlotKind::Analysis) {
        background::spawn_analysis(ctx, job);
    }
    Ok(())
}

fn submit_organization(
    app: &mut App,
    input: &str,
    ctx: &RuntimeContext,
) -> Result<(), ValidationError> {
    let name = validate::organization_name(input)?;
    let slug = validate::slug(&validate::slugify(&name))?;
    app.finish_edit();
    background::create_organization(ctx, OrganizationDraft { name, slug });
    Ok(())
}

fn submit_project(app: &mut App, input: &str, ctx: &RuntimeContext) -> Result<(), ValidationError> {
    let name = validate::project_name(input)?;
    let Some(organization_id) = app.session.organization_id.clone() else {
        app.cancel_edit();
        return Ok(());
    };
    app.finish_edit();
    background::create_project(
        ctx,
        organization_id,
        ProjectDraft {
            name,
            description: None,
        },
    );
    Ok(())
}

/// `email [role]`, role defaulting to member
fn submit_invitation(app: &mut App, input: &str, ctx: &RuntimeContext) -> Result<(), ValidationError> {
    let mut parts = input.split_whitespace();
    let email = validate::email(parts.next().unwrap_or_default())?;
    let role = match parts.next() {
        Some(raw) => validate::role(raw)?,
        None => MemberRole::Member,
    };
    let Some(organization_id) = app.session.organization_id.clone() else {
        app.cancel_edit();
        return Ok(());
    };
    app.finish_edit();
    background::invite_member(ctx, organization_id, Invitation { email, role });
    Ok(())
}
