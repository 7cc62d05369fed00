//! TUI runtime for orgpulse

use crate::api::ApiClient;
use crate::app::messages::BackgroundMessage;
use crate::app::{background, detail_loader, input, RuntimeContext};
use crate::config::Config;
use crate::session::{FileStore, KeyValueStore, MemoryStore, SessionContext};
use crate::ui::{self, App, Screen};
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::sync::mpsc;
use std::time::Duration;

/// Run the console until the user quits. `initial_org` switches the
/// session before anything loads.
pub async fn run_tui(config: Config, client: ApiClient, initial_org: Option<String>) -> Result<()> {
    let mut store: Box<dyn KeyValueStore> = match FileStore::in_config_dir() {
        Some(store) => Box::new(store),
        None => {
            tracing::warn!("no config directory; session will not be saved");
            Box::new(MemoryStore::new())
        }
    };
    let mut session = SessionContext::restore(store.as_ref());
    if let Some(org) = initial_org.as_deref() {
        if session.switch_organization(org) {
            if let Err(e) = session.persist(store.as_mut()) {
                tracing::warn!("failed to persist session: {}", e);
            }
        }
    }

    let detail = detail_loader(
        &client,
        session.organization_id.as_deref().unwrap_or_default(),
        config.tab_max_age(),
    );
    let api_label = client
        .base_url()
        .host_str()
        .unwrap_or("backend")
        .to_string();
    let mut app = App::new(detail, session, store, api_label);
    if !client.has_token() {
        app.show_toast("No API token configured; run orgpulse --setup");
    }

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let result = run_loop(&mut terminal, &mut app, rx, tx, &client);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.persist_session();
    result
}

/// Main event loop with background message handling
fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<BackgroundMessage>,
    tx: mpsc::Sender<BackgroundMessage>,
    client: &ApiClient,
) -> Result<()> {
    let ctx = RuntimeContext { client, tx: &tx };

    background::load_organizations(app, &ctx);
    if app.screen == Screen::Detail {
        let fetch = app.set_screen(Screen::Detail);
        background::spawn_tab_fetch(&ctx, fetch);
    }

    loop {
        app.clear_expired_toast();
        app.tick_loading();

        background::drain_messages(app, &rx, &ctx);

        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                input::handle_key_event(app, key, &ctx)?;
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
