//! orgpulse UI state
//!
//! Layout:
//! ╔══════════════════════════════════════════════════════════════╗
//! ║   o r g p u l s e          1 Organizations  2 Detail  3 Analyze ║
//! ╠══════════════════════════════════════════════════════════════╣
//! ║   Projects │ Members │ Usage                                 ║
//! ║   ▸ Website relaunch                                         ║
//! ║     Q3 campaign                                              ║
//! ╠══════════════════════════════════════════════════════════════╣
//! ║   acme · api.example.com    ⇥ tab  r retry  ? help  q quit   ║
//! ╚══════════════════════════════════════════════════════════════╝
//!
//! [`App`] only holds state. Anything that needs the network returns a
//! [`TabFetch`] or an [`AnalysisJob`] that the `app` layer spawns.

pub mod helpers;
pub mod render;
pub mod theme;

pub use render::render;

use crate::api::{AnalysisKind, AnalysisRequest, Member, Organization, Project, UsageStats};
use crate::loader::{TabCompletion, TabFetch, TabLoader, TabStatus};
use crate::reconcile::NormalizedResult;
use crate::session::{KeyValueStore, SessionContext};
use crate::util::truncate;
use std::time::Instant;
use uuid::Uuid;

/// Tabs of the organization detail screen, in loader order.
pub const PROJECTS_TAB: usize = 0;
pub const MEMBERS_TAB: usize = 1;
pub const USAGE_TAB: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Organizations,
    Detail,
    Analyzers,
}

impl Screen {
    pub const ALL: [Screen; 3] = [Screen::Organizations, Screen::Detail, Screen::Analyzers];

    pub fn label(&self) -> &'static str {
        match self {
            Screen::Organizations => "Organizations",
            Screen::Detail => "Detail",
            Screen::Analyzers => "Analyze",
        }
    }
}

/// What the text input is collecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPurpose {
    AnalyzerTarget,
    NewOrganization,
    NewProject,
    InviteMember,
}

impl EditPurpose {
    pub fn title(&self) -> &'static str {
        match self {
            EditPurpose::AnalyzerTarget => "Analyze",
            EditPurpose::NewOrganization => "New organization",
            EditPurpose::NewProject => "New project",
            EditPurpose::InviteMember => "Invite member",
        }
    }
}

/// Input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Editing(EditPurpose),
}

/// Destructive action waiting for confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    DeleteProject { id: String, name: String },
    RemoveMember { id: String, name: String },
    DeleteOrganization { id: String, name: String },
}

impl PendingAction {
    pub fn prompt(&self) -> String {
        match self {
            PendingAction::DeleteProject { name, .. } => format!("Delete project \"{}\"?", name),
            PendingAction::RemoveMember { name, .. } => format!("Remove {} from the organization?", name),
            PendingAction::DeleteOrganization { name, .. } => {
                format!("Delete organization \"{}\" and all its projects?", name)
            }
        }
    }
}

/// Overlay state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    None,
    Help,
    Confirm(PendingAction),
}

/// Data behind one detail tab
#[derive(Debug, Clone, PartialEq)]
pub enum DetailData {
    Projects(Vec<Project>),
    Members(Vec<Member>),
    Usage(UsageStats),
}

impl DetailData {
    /// Selectable rows
    pub fn rows(&self) -> usize {
        match self {
            DetailData::Projects(projects) => projects.len(),
            DetailData::Members(members) => members.len(),
            DetailData::Usage(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Error,
}

impl ToastKind {
    /// Duration in seconds before toast expires
    pub fn duration_secs(&self) -> u64 {
        match self {
            ToastKind::Info => 3,
            ToastKind::Success => 3,
            ToastKind::Error => 8,
        }
    }
}

/// Toast notification
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub created_at: Instant,
    pub kind: ToastKind,
}

impl Toast {
    pub fn new(message: &str) -> Self {
        // Success prefix wins over error keywords ("+ Removed failed job")
        let kind = if message.starts_with('+') {
            ToastKind::Success
        } else if message.contains("failed")
            || message.contains("error")
            || message.contains("Error")
        {
            ToastKind::Error
        } else {
            ToastKind::Info
        };

        Self {
            message: message.to_string(),
            created_at: Instant::now(),
            kind,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed().as_secs() >= self.kind.duration_secs()
    }
}

#[derive(Debug, Clone, Default)]
pub struct OrganizationList {
    pub items: Vec<Organization>,
    pub loading: bool,
    pub error: Option<String>,
    pub selected: usize,
}

/// Which result of an analyzer panel a request fills
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSlotKind {
    Analysis,
    Strategy,
}

/// Latest result of one kind of request. Only the most recent request id is
/// accepted; anything older that arrives late is dropped.
#[derive(Debug, Clone, Default)]
pub struct ResultSlot {
    pending: Option<Uuid>,
    pub result: Option<NormalizedResult>,
    pub error: Option<String>,
}

impl ResultSlot {
    pub fn begin(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.pending = Some(id);
        self.error = None;
        id
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn finish(&mut self, request_id: Uuid, outcome: Result<NormalizedResult, String>) -> bool {
        if self.pending != Some(request_id) {
            return false;
        }
        self.pending = None;
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.error = None;
            }
            Err(err) => self.error = Some(err),
        }
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One analyzer tab (Instagram, Mobile, X)
#[derive(Debug, Clone)]
pub struct AnalyzerPanel {
    pub kind: AnalysisKind,
    pub target: Option<String>,
    pub analysis: ResultSlot,
    pub strategy: ResultSlot,
    pub scroll: usize,
}

impl AnalyzerPanel {
    pub fn new(kind: AnalysisKind) -> Self {
        Self {
            kind,
            target: None,
            analysis: ResultSlot::default(),
            strategy: ResultSlot::default(),
            scroll: 0,
        }
    }

    pub fn slot(&self, slot: ResultSlotKind) -> &ResultSlot {
        match slot {
            ResultSlotKind::Analysis => &self.analysis,
            ResultSlotKind::Strategy => &self.strategy,
        }
    }

    pub fn slot_mut(&mut self, slot: ResultSlotKind) -> &mut ResultSlot {
        match slot {
            ResultSlotKind::Analysis => &mut self.analysis,
            ResultSlotKind::Strategy => &mut self.strategy,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.analysis.is_pending() || self.strategy.is_pending()
    }
}

/// An analysis request ready to be sent
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub panel: usize,
    pub slot: ResultSlotKind,
    pub kind: AnalysisKind,
    pub request: AnalysisRequest,
    pub request_id: Uuid,
}

/// Main application state
pub struct App {
    pub screen: Screen,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub input_error: Option<String>,
    pub overlay: Overlay,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    pub loading_frame: usize,
    /// Backend host shown in the footer
    pub api_label: String,

    pub organizations: OrganizationList,
    pub detail: TabLoader<DetailData>,
    pub detail_selected: usize,
    pub analyzers: Vec<AnalyzerPanel>,
    pub active_analyzer: usize,

    pub session: SessionContext,
    store: Box<dyn KeyValueStore>,
}

impl App {
    /// `detail` must already be scoped to `session.organization_id`.
    pub fn new(
        detail: TabLoader<DetailData>,
        session: SessionContext,
        store: Box<dyn KeyValueStore>,
        api_label: impl Into<String>,
    ) -> Self {
        let screen = if session.organization_id.is_some() {
            Screen::Detail
        } else {
            Screen::Organizations
        };
        Self {
            screen,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            input_error: None,
            overlay: Overlay::None,
            toast: None,
            should_quit: false,
            loading_frame: 0,
            api_label: api_label.into(),
            organizations: OrganizationList::default(),
            detail,
            detail_selected: 0,
            analyzers: AnalysisKind::ANALYZERS
                .iter()
                .map(|kind| AnalyzerPanel::new(*kind))
                .collect(),
            active_analyzer: 0,
            session,
            store,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  STATUS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn is_busy(&self) -> bool {
        self.organizations.loading
            || (0..self.detail.tab_count()).any(|i| self.detail.status(i) == TabStatus::Loading)
            || self.analyzers.iter().any(AnalyzerPanel::is_pending)
    }

    /// Advance the spinner while anything is in flight
    pub fn tick_loading(&mut self) {
        if self.is_busy() {
            self.loading_frame = self.loading_frame.wrapping_add(1);
        }
    }

    pub fn clear_expired_toast(&mut self) {
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    pub fn show_toast(&mut self, message: &str) {
        self.toast = Some(Toast::new(message));
    }

    /// The organization the session points at, once the list is loaded
    pub fn current_organization(&self) -> Option<&Organization> {
        let id = self.session.organization_id.as_deref()?;
        self.organizations.items.iter().find(|o| o.id == id)
    }

    pub fn selected_organization(&self) -> Option<&Organization> {
        self.organizations.items.get(self.organizations.selected)
    }

    pub fn active_panel(&self) -> Option<&AnalyzerPanel> {
        self.analyzers.get(self.active_analyzer)
    }

    fn detail_rows(&self) -> usize {
        self.detail
            .data(self.detail.active_tab())
            .map(DetailData::rows)
            .unwrap_or(0)
    }

    pub fn selected_project(&self) -> Option<&Project> {
        match self.detail.data(PROJECTS_TAB) {
            Some(DetailData::Projects(projects)) if self.detail.active_tab() == PROJECTS_TAB => {
                projects.get(self.detail_selected)
            }
            _ => None,
        }
    }

    pub fn selected_member(&self) -> Option<&Member> {
        match self.detail.data(MEMBERS_TAB) {
            Some(DetailData::Members(members)) if self.detail.active_tab() == MEMBERS_TAB => {
                members.get(self.detail_selected)
            }
            _ => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  NAVIGATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Switch screens. Entering the detail screen activates its current tab.
    pub fn set_screen(&mut self, screen: Screen) -> Option<TabFetch<DetailData>> {
        self.screen = screen;
        if screen == Screen::Detail {
            return self.activate_detail_tab(self.detail.active_tab());
        }
        None
    }

    /// Activate a detail tab. Nothing loads until an organization is chosen.
    pub fn activate_detail_tab(&mut self, index: usize) -> Option<TabFetch<DetailData>> {
        self.session.organization_id.as_ref()?;
        if index != self.detail.active_tab() {
            self.detail_selected = 0;
        }
        self.detail.on_tab_activated(index)
    }

    pub fn next_tab(&mut self) -> Option<TabFetch<DetailData>> {
        self.cycle_tab(1)
    }

    pub fn prev_tab(&mut self) -> Option<TabFetch<DetailData>> {
        self.cycle_tab(-1)
    }

    fn cycle_tab(&mut self, step: isize) -> Option<TabFetch<DetailData>> {
        let wrap = |current: usize, len: usize| -> usize {
            if len == 0 {
                return 0;
            }
            (current as isize + step).rem_euclid(len as isize) as usize
        };
        match self.screen {
            Screen::Detail => {
                let next = wrap(self.detail.active_tab(), self.detail.tab_count());
                self.activate_detail_tab(next)
            }
            Screen::Analyzers => {
                self.active_analyzer = wrap(self.active_analyzer, self.analyzers.len());
                None
            }
            Screen::Organizations => None,
        }
    }

    /// Refetch the active detail tab. Does nothing while it is loading.
    pub fn retry_active_tab(&mut self) -> Option<TabFetch<DetailData>> {
        let active = self.detail.active_tab();
        if self.detail.status(active) == TabStatus::Loading {
            return None;
        }
        self.detail.invalidate(active);
        self.activate_detail_tab(active)
    }

    /// Restart the visible tab when it went idle under us, e.g. a mutation
    /// invalidated it while its previous fetch was still running.
    pub fn refetch_visible_tab(&mut self) -> Option<TabFetch<DetailData>> {
        let active = self.detail.active_tab();
        if self.screen != Screen::Detail || self.detail.status(active) != TabStatus::Idle {
            return None;
        }
        self.activate_detail_tab(active)
    }

    pub fn navigate_down(&mut self) {
        match self.screen {
            Screen::Organizations => {
                let max = self.organizations.items.len().saturating_sub(1);
                self.organizations.selected = (self.organizations.selected + 1).min(max);
            }
            Screen::Detail => {
                let max = self.detail_rows().saturating_sub(1);
                self.detail_selected = (self.detail_selected + 1).min(max);
            }
            Screen::Analyzers => {
                if let Some(panel) = self.analyzers.get_mut(self.active_analyzer) {
                    panel.scroll = panel.scroll.saturating_add(1);
                }
            }
        }
    }

    pub fn navigate_up(&mut self) {
        match self.screen {
            Screen::Organizations => {
                self.organizations.selected = self.organizations.selected.saturating_sub(1);
            }
            Screen::Detail => {
                self.detail_selected = self.detail_selected.saturating_sub(1);
            }
            Screen::Analyzers => {
                if let Some(panel) = self.analyzers.get_mut(self.active_analyzer) {
                    panel.scroll = panel.scroll.saturating_sub(1);
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  SESSION
    // ═══════════════════════════════════════════════════════════════════════

    /// Make the highlighted organization current and open its detail screen.
    pub fn select_organization(&mut self) -> Option<TabFetch<DetailData>> {
        let id = self.selected_organization()?.id.clone();
        if self.session.switch_organization(&id) {
            self.detail.on_parent_context_changed(id.as_str());
            self.detail_selected = 0;
            self.reset_analyzer_results();
            self.persist_session();
            tracing::info!(organization = id.as_str(), "switched organization");
        }
        self.set_screen(Screen::Detail)
    }

    /// Results belong to the organization they were requested under;
    /// pending requests are forgotten so their late responses are dropped.
    fn reset_analyzer_results(&mut self) {
        for panel in &mut self.analyzers {
            panel.analysis.reset();
            panel.strategy.reset();
            panel.scroll = 0;
        }
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Write the session to its store. Failures are reported, not fatal.
    pub fn persist_session(&mut self) {
        if let Err(err) = self.session.persist(self.store.as_mut()) {
            tracing::warn!("failed to persist session: {}", err);
            self.show_toast(&format!("Session save failed: {}", err));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  RESULTS
    // ═══════════════════════════════════════════════════════════════════════

    pub fn apply_organizations(&mut self, result: Result<Vec<Organization>, String>) {
        self.organizations.loading = false;
        match result {
            Ok(items) => {
                self.organizations.error = None;
                let current = self.session.organization_id.as_deref();
                self.organizations.selected = current
                    .and_then(|id| items.iter().position(|o| o.id == id))
                    .unwrap_or(0);
                self.organizations.items = items;
            }
            Err(err) => {
                self.show_toast(&format!("Loading organizations failed: {}", truncate(&err, 60)));
                self.organizations.error = Some(err);
            }
        }
    }

    /// Apply a finished tab fetch. Stale completions are dropped silently.
    pub fn apply_detail(&mut self, completion: TabCompletion<DetailData>) -> bool {
        let tab = completion.ticket.tab_index;
        if !self.detail.complete(completion) {
            return false;
        }
        if let Some(err) = self.detail.get_active_error(tab) {
            let label = self.detail.labels().get(tab).copied().unwrap_or("Tab");
            let message = format!("{} failed to load: {}", label, truncate(err, 60));
            self.show_toast(&message);
        }
        if tab == self.detail.active_tab() {
            let max = self.detail_rows().saturating_sub(1);
            self.detail_selected = self.detail_selected.min(max);
        }
        true
    }

    pub fn apply_analysis(
        &mut self,
        panel: usize,
        slot: ResultSlotKind,
        request_id: Uuid,
        outcome: Result<NormalizedResult, String>,
    ) -> bool {
        let Some(analyzer) = self.analyzers.get_mut(panel) else {
            return false;
        };
        let failure = outcome.as_ref().err().cloned();
        let fallback = outcome.as_ref().is_ok_and(NormalizedResult::is_fallback);
        let kind = analyzer.kind;
        if !analyzer.slot_mut(slot).finish(request_id, outcome) {
            tracing::debug!(analyzer = kind.label(), "discarding superseded analysis result");
            return false;
        }
        if let Some(err) = failure {
            self.show_toast(&format!("{} analysis failed: {}", kind.label(), truncate(&err, 60)));
        } else if fallback {
            self.show_toast("Response could not be structured; showing raw text");
        }
        true
    }

    /// A project or member mutation finished. Only the affected tab is
    /// invalidated, and refetched right away when it is on screen.
    pub fn apply_mutation(
        &mut self,
        organization_id: &str,
        tab: usize,
        outcome: Result<String, String>,
    ) -> Option<TabFetch<DetailData>> {
        match outcome {
            Ok(message) => {
                self.show_toast(&format!("+ {}", message));
                if organization_id != self.detail.context_id() {
                    return None;
                }
                self.detail.invalidate(tab);
                if self.screen == Screen::Detail && self.detail.active_tab() == tab {
                    return self.activate_detail_tab(tab);
                }
                None
            }
            Err(err) => {
                self.show_toast(&format!("Update failed: {}", truncate(&err, 60)));
                None
            }
        }
    }

    /// The organization was deleted on the backend
    pub fn apply_organization_removed(&mut self, organization_id: &str) {
        self.organizations.items.retain(|o| o.id != organization_id);
        let max = self.organizations.items.len().saturating_sub(1);
        self.organizations.selected = self.organizations.selected.min(max);
        if self.session.organization_id.as_deref() == Some(organization_id) {
            self.session.clear();
            self.detail.on_parent_context_changed("");
            self.detail_selected = 0;
            self.reset_analyzer_results();
            self.persist_session();
            self.screen = Screen::Organizations;
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    //  INPUT & CONFIRMATION
    // ═══════════════════════════════════════════════════════════════════════

    pub fn begin_edit(&mut self, purpose: EditPurpose) {
        self.input_buffer = match purpose {
            EditPurpose::AnalyzerTarget => self
                .active_panel()
                .and_then(|p| p.target.clone())
                .unwrap_or_default(),
            _ => String::new(),
        };
        self.input_error = None;
        self.input_mode = InputMode::Editing(purpose);
    }

    pub fn cancel_edit(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        self.input_error = None;
    }

    /// Leave edit mode and hand back what was typed
    pub fn finish_edit(&mut self) -> String {
        self.input_mode = InputMode::Normal;
        self.input_error = None;
        std::mem::take(&mut self.input_buffer)
    }

    /// Ask before deleting whatever is selected on the current screen
    pub fn request_delete(&mut self) {
        let action = match self.screen {
            Screen::Organizations => self.selected_organization().map(|o| {
                PendingAction::DeleteOrganization {
                    id: o.id.clone(),
                    name: o.name.clone(),
                }
            }),
            Screen::Detail => match self.detail.active_tab() {
                PROJECTS_TAB => self.selected_project().map(|p| PendingAction::DeleteProject {
                    id: p.id.clone(),
                    name: p.name.clone(),
                }),
                MEMBERS_TAB => self.selected_member().map(|m| PendingAction::RemoveMember {
                    id: m.id.clone(),
                    name: m.display_name().to_string(),
                }),
                _ => None,
            },
            Screen::Analyzers => None,
        };
        if let Some(action) = action {
            self.overlay = Overlay::Confirm(action);
        }
    }

    /// Set the target of the active analyzer. A new target drops old results.
    pub fn set_analyzer_target(&mut self, target: String) {
        if let Some(panel) = self.analyzers.get_mut(self.active_analyzer) {
            if panel.target.as_deref() != Some(target.as_str()) {
                panel.analysis.reset();
                panel.strategy.reset();
                panel.scroll = 0;
            }
            panel.target = Some(target);
        }
    }

    /// Start a request on the active analyzer. A pending request in the same
    /// slot is superseded.
    pub fn start_analysis(&mut self, slot: ResultSlotKind) -> Option<AnalysisJob> {
        let project_id = self.session.project_id.clone();
        let organization_id = self.session.organization_id.clone();
        let panel_index = self.active_analyzer;
        let panel = self.analyzers.get_mut(panel_index)?;
        let target = panel.target.clone()?;
        let kind = match slot {
            ResultSlotKind::Analysis => panel.kind,
            ResultSlotKind::Strategy => AnalysisKind::Strategy,
        };
        let context = match slot {
            ResultSlotKind::Strategy => Some(serde_json::json!({
                "organization_id": organization_id,
                "source": panel.kind.label().to_lowercase(),
                "analysis": panel.analysis.result.as_ref().map(|r| r.value().clone()),
            })),
            ResultSlotKind::Analysis => organization_id
                .map(|id| serde_json::json!({ "organization_id": id })),
        };
        let request_id = panel.slot_mut(slot).begin();
        Some(AnalysisJob {
            panel: panel_index,
            slot,
            kind,
            request: AnalysisRequest {
                target,
                project_id,
                context,
            },
            request_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStore;
    use futures::executor::block_on;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn org(id: &str) -> Organization {
        serde_json::from_value(json!({"id": id, "name": format!("Org {}", id)})).unwrap()
    }

    fn project(id: &str) -> Project {
        serde_json::from_value(json!({"id": id, "name": format!("Project {}", id)})).unwrap()
    }

    fn loader(context: &str) -> TabLoader<DetailData> {
        TabLoader::new(context)
            .with_tab("Projects", |org: &str| {
                let org = org.to_string();
                async move { Ok::<_, String>(DetailData::Projects(vec![project(&org)])) }
            })
            .with_tab("Members", |_org: &str| async {
                Err::<DetailData, _>("members unavailable".to_string())
            })
            .with_tab("Usage", |_org: &str| async {
                Ok::<_, String>(DetailData::Usage(UsageStats::default()))
            })
    }

    fn app() -> App {
        let mut app = App::new(
            loader(""),
            SessionContext::default(),
            Box::new(MemoryStore::new()),
            "api.test",
        );
        app.apply_organizations(Ok(vec![org("org-1"), org("org-2")]));
        app
    }

    #[test]
    fn test_detail_tab_waits_for_organization() {
        let mut app = app();
        assert!(app.set_screen(Screen::Detail).is_none());
        assert_eq!(app.detail.status(PROJECTS_TAB), TabStatus::Idle);
    }

    #[test]
    fn test_select_organization_loads_active_tab_only() {
        let mut app = app();
        let fetch = app.select_organization().expect("projects fetch");
        assert_eq!(app.screen, Screen::Detail);
        assert_eq!(app.session.organization_id.as_deref(), Some("org-1"));
        assert_eq!(app.detail.context_id(), "org-1");

        assert!(app.apply_detail(block_on(fetch.run())));
        assert_eq!(app.detail.status(PROJECTS_TAB), TabStatus::Loaded);
        assert_eq!(app.detail.status(MEMBERS_TAB), TabStatus::Idle);
        assert_eq!(app.selected_project().map(|p| p.id.as_str()), Some("org-1"));

        // Returning to an already loaded tab does not refetch
        app.set_screen(Screen::Organizations);
        assert!(app.set_screen(Screen::Detail).is_none());
    }

    #[test]
    fn test_switching_organization_discards_late_result() {
        let mut app = app();
        let stale = app.select_organization().expect("org-1 fetch");

        app.screen = Screen::Organizations;
        app.navigate_down();
        let fresh = app.select_organization().expect("org-2 fetch");

        assert!(!app.apply_detail(block_on(stale.run())));
        assert!(app.apply_detail(block_on(fresh.run())));
        assert_eq!(app.selected_project().map(|p| p.id.as_str()), Some("org-2"));
    }

    #[test]
    fn test_failed_tab_is_isolated() {
        let mut app = app();
        let projects = app.select_organization().expect("projects fetch");
        app.apply_detail(block_on(projects.run()));

        let members = app.next_tab().expect("members fetch");
        assert!(app.apply_detail(block_on(members.run())));
        assert_eq!(app.detail.status(MEMBERS_TAB), TabStatus::Failed);
        assert_eq!(app.detail.get_active_error(MEMBERS_TAB), Some("members unavailable"));
        assert_eq!(app.detail.get_active_error(PROJECTS_TAB), None);
        assert_eq!(app.toast.as_ref().map(|t| t.kind), Some(ToastKind::Error));

        // A failed tab is retried when shown again
        assert!(app.retry_active_tab().is_some());
    }

    #[test]
    fn test_mutation_invalidates_only_affected_tab() {
        let mut app = app();
        let projects = app.select_organization().expect("projects fetch");
        app.apply_detail(block_on(projects.run()));
        let usage = app.activate_detail_tab(USAGE_TAB).expect("usage fetch");
        app.apply_detail(block_on(usage.run()));
        app.activate_detail_tab(PROJECTS_TAB);

        let refetch = app.apply_mutation("org-1", PROJECTS_TAB, Ok("Project created".into()));
        assert!(refetch.is_some());
        assert_eq!(app.detail.status(USAGE_TAB), TabStatus::Loaded);

        // Mutations for another organization leave this loader alone
        assert!(app
            .apply_mutation("org-9", PROJECTS_TAB, Ok("Project created".into()))
            .is_none());
    }

    fn pending_loader(calls: Arc<AtomicUsize>) -> TabLoader<DetailData> {
        TabLoader::new("").with_tab("Projects", move |_org: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            futures::future::pending::<Result<DetailData, String>>()
        })
    }

    #[test]
    fn test_retry_while_loading_starts_no_second_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut app = App::new(
            pending_loader(calls.clone()),
            SessionContext::default(),
            Box::new(MemoryStore::new()),
            "api.test",
        );
        app.apply_organizations(Ok(vec![org("org-1")]));

        let _in_flight = app.select_organization().expect("projects fetch");
        assert!(app.retry_active_tab().is_none());
        assert!(app.retry_active_tab().is_none());
        assert_eq!(app.detail.status(PROJECTS_TAB), TabStatus::Loading);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mutation_during_fetch_refetches_after_it_lands() {
        let mut app = app();
        let in_flight = app.select_organization().expect("projects fetch");

        let refetch = app.apply_mutation("org-1", PROJECTS_TAB, Ok("Project created".into()));
        assert!(refetch.is_none());
        assert_eq!(app.detail.status(PROJECTS_TAB), TabStatus::Loading);
        assert!(app.refetch_visible_tab().is_none());

        assert!(app.apply_detail(block_on(in_flight.run())));
        let refetch = app.refetch_visible_tab().expect("invalidated tab refetches");
        assert!(app.apply_detail(block_on(refetch.run())));
        assert_eq!(app.detail.status(PROJECTS_TAB), TabStatus::Loaded);
        assert!(app.refetch_visible_tab().is_none());
    }

    #[test]
    fn test_failed_tab_is_not_refetched_automatically() {
        let mut app = app();
        let projects = app.select_organization().expect("projects fetch");
        app.apply_detail(block_on(projects.run()));
        let members = app.next_tab().expect("members fetch");
        app.apply_detail(block_on(members.run()));
        assert!(app.refetch_visible_tab().is_none());
    }

    #[test]
    fn test_analysis_from_previous_organization_is_dropped() {
        let mut app = app();
        app.select_organization();
        app.session.switch_project(Some("p-of-org-1"));
        app.set_analyzer_target("acme".to_string());
        let job = app.start_analysis(ResultSlotKind::Analysis).unwrap();
        assert_eq!(
            job.request.context,
            Some(json!({"organization_id": "org-1"}))
        );
        assert_eq!(job.request.project_id.as_deref(), Some("p-of-org-1"));

        app.screen = Screen::Organizations;
        app.navigate_down();
        app.select_organization();
        assert_eq!(app.session.organization_id.as_deref(), Some("org-2"));
        assert!(!app.analyzers[0].is_pending());

        let late = NormalizedResult::Direct(json!({"summary": "org-1 numbers"}));
        assert!(!app.apply_analysis(0, job.slot, job.request_id, Ok(late)));
        assert!(app.analyzers[0].analysis.result.is_none());
    }

    #[test]
    fn test_newer_analysis_supersedes_older() {
        let mut app = app();
        app.set_analyzer_target("acme".to_string());
        let first = app.start_analysis(ResultSlotKind::Analysis).unwrap();
        let second = app.start_analysis(ResultSlotKind::Analysis).unwrap();
        assert_eq!(second.kind, AnalysisKind::Instagram);

        let result = NormalizedResult::Direct(json!({"summary": "ok"}));
        assert!(!app.apply_analysis(0, first.slot, first.request_id, Ok(result.clone())));
        assert!(app.apply_analysis(0, second.slot, second.request_id, Ok(result)));
        assert!(!app.analyzers[0].is_pending());
        assert!(app.analyzers[0].analysis.result.is_some());
    }

    #[test]
    fn test_strategy_uses_same_target() {
        let mut app = app();
        assert!(app.start_analysis(ResultSlotKind::Strategy).is_none());
        app.set_analyzer_target("acme".to_string());
        let job = app.start_analysis(ResultSlotKind::Strategy).unwrap();
        assert_eq!(job.kind, AnalysisKind::Strategy);
        assert_eq!(job.request.target, "acme");
        assert!(app.analyzers[0].strategy.is_pending());
        assert!(!app.analyzers[0].analysis.is_pending());
    }

    #[test]
    fn test_session_persisted_on_switch() {
        let mut app = app();
        app.select_organization();
        let restored = SessionContext::restore(app.store());
        assert_eq!(restored.organization_id.as_deref(), Some("org-1"));
    }

    #[test]
    fn test_delete_current_organization_clears_session() {
        let mut app = app();
        app.select_organization();
        app.apply_organization_removed("org-1");
        assert!(app.session.organization_id.is_none());
        assert_eq!(app.screen, Screen::Organizations);
        assert_eq!(app.organizations.items.len(), 1);
    }

    #[test]
    fn test_request_delete_opens_confirm() {
        let mut app = app();
        app.request_delete();
        assert_eq!(
            app.overlay,
            Overlay::Confirm(PendingAction::DeleteOrganization {
                id: "org-1".into(),
                name: "Org org-1".into()
            })
        );
    }

    #[test]
    fn test_toast_kinds() {
        assert_eq!(Toast::new("+ Project created").kind, ToastKind::Success);
        assert_eq!(Toast::new("Update failed: 403").kind, ToastKind::Error);
        assert_eq!(Toast::new("Loading").kind, ToastKind::Info);
    }
}
