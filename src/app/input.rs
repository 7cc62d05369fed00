//! Input handling for the orgpulse TUI

use crate::app::RuntimeContext;
use crate::ui::{App, InputMode, Overlay};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

mod editing;
mod normal;
mod overlay;

use editing::handle_editing_input;
use normal::handle_normal_mode;
use overlay::handle_overlay_input;

/// Main key event handler - dispatches to mode-specific handlers
pub fn handle_key_event(app: &mut App, key: KeyEvent, ctx: &RuntimeContext) -> Result<()> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Ok(());
    }

    if let InputMode::Editing(purpose) = app.input_mode {
        return handle_editing_input(app, key, purpose, ctx);
    }

    if app.overlay != Overlay::None {
        return handle_overlay_input(app, key, ctx);
    }

    handle_normal_mode(app, key, ctx)
}
