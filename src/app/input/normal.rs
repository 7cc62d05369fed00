use crate::app::background;
use crate::app::RuntimeContext;
use crate::ui::{App, EditPurpose, Overlay, ResultSlotKind, Screen, MEMBERS_TAB, PROJECTS_TAB};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

pub(super) fn handle_normal_mode(app: &mut App, key: KeyEvent, ctx: &RuntimeContext) -> Result<()> {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.overlay = Overlay::Help,
        KeyCode::Char('1') => switch_screen(app, Screen::Organizations, ctx),
        KeyCode::Char('2') => switch_screen(app, Screen::Detail, ctx),
        KeyCode::Char('3') => switch_screen(app, Screen::Analyzers, ctx),
        KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
            let fetch = app.next_tab();
            background::spawn_tab_fetch(ctx, fetch);
        }
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
            let fetch = app.prev_tab();
            background::spawn_tab_fetch(ctx, fetch);
        }
        KeyCode::Down | KeyCode::Char('j') => app.navigate_down(),
        KeyCode::Up | KeyCode::Char('k') => app.navigate_up(),
        KeyCode::Enter => handle_enter(app, ctx),
        KeyCode::Char('r') => handle_reload(app, ctx),
        KeyCode::Char('n') => handle_new(app),
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Char('a') if app.screen == Screen::Analyzers => {
            start_analysis(app, ResultSlotKind::Analysis, ctx)
        }
        KeyCode::Char('s') if app.screen == Screen::Analyzers => {
            start_analysis(app, ResultSlotKind::Strategy, ctx)
        }
        _ => {}
    }
    Ok(())
}

fn switch_screen(app: &mut App, screen: Screen, ctx: &RuntimeContext) {
    let fetch = app.set_screen(screen);
    background::spawn_tab_fetch(ctx, fetch);
}

fn handle_enter(app: &mut App, ctx: &RuntimeContext) {
    match app.screen {
        Screen::Organizations => {
            let fetch = app.select_organization();
            background::spawn_tab_fetch(ctx, fetch);
        }
        Screen::Detail => {
            let Some(project) = app.selected_project() else {
                return;
            };
            let (id, name) = (project.id.clone(), project.name.clone());
            if app.session.switch_project(Some(&id)) {
                app.persist_session();
                app.show_toast(&format!("+ Working in {}", name));
            }
        }
        Screen::Analyzers => app.begin_edit(EditPurpose::AnalyzerTarget),
    }
}

fn handle_reload(app: &mut App, ctx: &RuntimeContext) {
    match app.screen {
        Screen::Organizations => background::load_organizations(app, ctx),
        Screen::Detail => {
            let fetch = app.retry_active_tab();
            background::spawn_tab_fetch(ctx, fetch);
        }
        Screen::Analyzers => start_analysis(app, ResultSlotKind::Analysis, ctx),
    }
}

fn handle_new(app: &mut App) {
    match app.screen {
        Screen::Organizations => app.begin_edit(EditPurpose::NewOrganization),
        Screen::Detail if app.session.organization_id.is_some() => {
            match app.detail.active_tab() {
                PROJECTS_TAB => app.begin_edit(EditPurpose::NewProject),
                MEMBERS_TAB => app.begin_edit(EditPurpose::InviteMember),
                _ => {}
            }
        }
        Screen::Detail | Screen::Analyzers => {}
    }
}

fn start_analysis(app: &mut App, slot: ResultSlotKind, ctx: &RuntimeContext) {
    match app.start_analysis(slot) {
        Some(job) => background::spawn_analysis(ctx, job),
        None => app.begin_edit(EditPurpose::AnalyzerTarget),
    }
}
