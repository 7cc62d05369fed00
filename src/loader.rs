//! Tab-scoped data loading
//!
//! A detail view with several tabs owns one [`TabLoader`]. Each tab has its
//! own fetch function and its own [`TabLoadState`]:
//!
//! - activating a tab fetches only that tab, and only when it has nothing
//!   usable yet (idle, failed, loaded under an older context, or too old)
//! - at most one fetch is in flight per tab
//! - a parent context change (another organization selected) resets every
//!   tab to idle; the refetch happens lazily on the next activation
//! - errors stay in the tab that produced them
//!
//! The loader never spawns anything itself. [`TabLoader::on_tab_activated`]
//! hands back a [`TabFetch`] for the caller to run on its runtime, and the
//! finished [`TabCompletion`] is fed back through [`TabLoader::complete`] on
//! the UI loop. Completions for an older context, an invalidated request or
//! a different loader are discarded there.

use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_LOADER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

impl TabStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TabStatus::Idle => "idle",
            TabStatus::Loading => "loading",
            TabStatus::Loaded => "loaded",
            TabStatus::Failed => "failed",
        }
    }
}

/// Load status of one tab.
#[derive(Debug, Clone, PartialEq)]
pub struct TabLoadState {
    pub tab_index: usize,
    pub status: TabStatus,
    pub last_error: Option<String>,
    pub last_loaded_at: Option<DateTime<Utc>>,
    /// Context generation the current data was loaded under.
    loaded_generation: u64,
}

impl TabLoadState {
    fn idle(tab_index: usize) -> Self {
        Self {
            tab_index,
            status: TabStatus::Idle,
            last_error: None,
            last_loaded_at: None,
            loaded_generation: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == TabStatus::Loading
    }
}

/// Identifies one fetch so its result can be matched to the right tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub loader_id: u64,
    pub tab_index: usize,
    generation: u64,
    request_seq: u64,
}

/// Result of a fetch, ready to be applied with [`TabLoader::complete`].
#[derive(Debug)]
pub struct TabCompletion<T> {
    pub ticket: FetchTicket,
    pub result: Result<T, String>,
}

/// A fetch the caller must run.
pub struct TabFetch<T> {
    ticket: FetchTicket,
    future: BoxFuture<'static, Result<T, String>>,
}

impl<T> TabFetch<T> {
    pub fn ticket(&self) -> FetchTicket {
        self.ticket
    }

    pub async fn run(self) -> TabCompletion<T> {
        let result = self.future.await;
        TabCompletion {
            ticket: self.ticket,
            result,
        }
    }
}

impl<T> fmt::Debug for TabFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabFetch").field("ticket", &self.ticket).finish()
    }
}

type FetchFn<T> = Box<dyn Fn(&str) -> BoxFuture<'static, Result<T, String>> + Send>;

struct Tab<T> {
    label: &'static str,
    fetch: FetchFn<T>,
    /// Created the first time the tab is activated.
    state: Option<TabLoadState>,
    data: Option<T>,
    request_seq: u64,
    /// Invalidated while a fetch was in flight; refetch once it lands.
    refetch_after: bool,
}

/// Per-tab loader for one multi-tab view.
pub struct TabLoader<T> {
    id: u64,
    context_id: String,
    generation: u64,
    active: usize,
    max_age: Option<Duration>,
    tabs: Vec<Tab<T>>,
}

impl<T: Send + 'static> TabLoader<T> {
    pub fn new(context_id: impl Into<String>) -> Self {
        Self {
            id: NEXT_LOADER_ID.fetch_add(1, Ordering::Relaxed),
            context_id: context_id.into(),
            generation: 1,
            active: 0,
            max_age: None,
            tabs: Vec::new(),
        }
    }

    /// Register a tab. `fetch` receives the current parent context id.
    pub fn with_tab<F, Fut, E>(mut self, label: &'static str, fetch: F) -> Self
    where
        F: Fn(&str) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let fetch: FetchFn<T> = Box::new(move |context_id: &str| {
            let fut = fetch(context_id);
            async move { fut.await.map_err(|e| e.to_string()) }.boxed()
        });
        self.tabs.push(Tab {
            label,
            fetch,
            state: None,
            data: None,
            request_seq: 0,
            refetch_after: false,
        });
        self
    }

    /// Loaded data older than `max_age` is refetched on the next activation.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

impl<T> TabLoader<T> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.tabs.iter().map(|t| t.label).collect()
    }

    pub fn active_tab(&self) -> usize {
        self.active
    }

    /// Make `index` the active tab and start its fetch if it needs one.
    ///
    /// Returns `None` when the tab is already loading, already has fresh
    /// data, or does not exist.
    pub fn on_tab_activated(&mut self, index: usize) -> Option<TabFetch<T>> {
        self.activate_at(index, Utc::now())
    }

    fn activate_at(&mut self, index: usize, now: DateTime<Utc>) -> Option<TabFetch<T>> {
        let generation = self.generation;
        let max_age = self.max_age;
        let loader_id = self.id;
        let tab = self.tabs.get_mut(index)?;
        self.active = index;

        let state = tab.state.get_or_insert_with(|| TabLoadState::idle(index));
        let needs_fetch = match state.status {
            TabStatus::Loading => false,
            TabStatus::Idle | TabStatus::Failed => true,
            TabStatus::Loaded => {
                let context_changed = state.loaded_generation != generation;
                let expired = match (max_age, state.last_loaded_at) {
                    (Some(max_age), Some(at)) => now - at >= max_age,
                    _ => false,
                };
                context_changed || expired
            }
        };
        if !needs_fetch {
            return None;
        }

        state.status = TabStatus::Loading;
        tab.request_seq += 1;
        let ticket = FetchTicket {
            loader_id,
            tab_index: index,
            generation,
            request_seq: tab.request_seq,
        };
        tracing::debug!(
            tab = tab.label,
            context = self.context_id.as_str(),
            "starting tab fetch"
        );
        Some(TabFetch {
            ticket,
            future: (tab.fetch)(&self.context_id),
        })
    }

    /// Switch to another parent context. Every tab goes back to idle and its
    /// data is dropped; nothing is fetched until a tab is activated again.
    pub fn on_parent_context_changed(&mut self, new_context_id: impl Into<String>) {
        self.context_id = new_context_id.into();
        self.generation += 1;
        for (index, tab) in self.tabs.iter_mut().enumerate() {
            if tab.state.is_some() {
                tab.state = Some(TabLoadState::idle(index));
            }
            tab.data = None;
            tab.refetch_after = false;
        }
        tracing::debug!(context = self.context_id.as_str(), "tab states reset");
    }

    /// Force one tab to refetch on its next activation, e.g. after a
    /// mutation touched its data. Sibling tabs are untouched.
    ///
    /// A tab that is loading keeps its in-flight fetch; it goes back to idle
    /// when that fetch completes, so there is never a second one running.
    pub fn invalidate(&mut self, index: usize) {
        let Some(tab) = self.tabs.get_mut(index) else {
            return;
        };
        match tab.state.as_mut() {
            Some(state) if state.status == TabStatus::Loading => tab.refetch_after = true,
            Some(state) => state.status = TabStatus::Idle,
            None => {}
        }
    }

    /// Apply a finished fetch. Returns false when the completion was
    /// discarded because it no longer matches this loader's state.
    pub fn complete(&mut self, completion: TabCompletion<T>) -> bool {
        self.complete_at(completion, Utc::now())
    }

    fn complete_at(&mut self, completion: TabCompletion<T>, now: DateTime<Utc>) -> bool {
        let ticket = completion.ticket;
        if ticket.loader_id != self.id || ticket.generation != self.generation {
            tracing::debug!(tab = ticket.tab_index, "discarding stale tab completion");
            return false;
        }
        let Some(tab) = self.tabs.get_mut(ticket.tab_index) else {
            return false;
        };
        if ticket.request_seq != tab.request_seq {
            tracing::debug!(tab = tab.label, "discarding superseded tab completion");
            return false;
        }
        let Some(state) = tab.state.as_mut() else {
            return false;
        };
        if state.status != TabStatus::Loading {
            return false;
        }

        match completion.result {
            Ok(data) => {
                state.status = TabStatus::Loaded;
                state.last_error = None;
                state.last_loaded_at = Some(now);
                state.loaded_generation = self.generation;
                tab.data = Some(data);
            }
            Err(error) => {
                tracing::warn!(tab = tab.label, "tab fetch failed: {}", error);
                state.status = TabStatus::Failed;
                state.last_error = Some(error);
            }
        }
        if std::mem::take(&mut tab.refetch_after) {
            state.status = TabStatus::Idle;
        }
        true
    }

    /// State of one tab; tabs never activated report idle.
    pub fn get_state(&self, index: usize) -> TabLoadState {
        self.tabs
            .get(index)
            .and_then(|t| t.state.clone())
            .unwrap_or_else(|| TabLoadState::idle(index))
    }

    pub fn status(&self, index: usize) -> TabStatus {
        self.tabs
            .get(index)
            .and_then(|t| t.state.as_ref())
            .map(|s| s.status)
            .unwrap_or_default()
    }

    pub fn data(&self, index: usize) -> Option<&T> {
        self.tabs.get(index).and_then(|t| t.data.as_ref())
    }

    /// Error of this tab only.
    pub fn get_active_error(&self, index: usize) -> Option<&str> {
        self.tabs
            .get(index)
            .and_then(|t| t.state.as_ref())
            .and_then(|s| s.last_error.as_deref())
    }
}

#[cfg(test)]
mod tests;
