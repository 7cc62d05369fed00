//! Background task handling for orgpulse
//!
//! Every network call runs in a spawned task and reports back over the
//! `BackgroundMessage` channel, which the UI loop drains once per frame.
//! Channel sends use `let _ =`: the receiver only disappears while the app
//! is shutting down, and then nobody wants the result.

use crate::api::{Invitation, OrganizationDraft, ProjectDraft};
use crate::app::messages::BackgroundMessage;
use crate::app::RuntimeContext;
use crate::loader::{TabCompletion, TabFetch};
use crate::reconcile::reconcile;
use crate::ui::{AnalysisJob, App, DetailData, MEMBERS_TAB, PROJECTS_TAB};
use crate::util::truncate;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc;

pub fn drain_messages(app: &mut App, rx: &mpsc::Receiver<BackgroundMessage>, ctx: &RuntimeContext) {
    while let Ok(msg) = rx.try_recv() {
        match msg {
            BackgroundMessage::OrganizationsLoaded(result) => {
                app.apply_organizations(result);
            }
            BackgroundMessage::DetailTab(completion) => {
                app.apply_detail(completion);
                let refetch = app.refetch_visible_tab();
                spawn_tab_fetch(ctx, refetch);
            }
            BackgroundMessage::AnalysisFinished {
                panel,
                slot,
                request_id,
                outcome,
            } => {
                app.apply_analysis(panel, slot, request_id, outcome);
            }
            BackgroundMessage::MutationFinished {
                organization_id,
                tab,
                outcome,
            } => {
                let refetch = app.apply_mutation(&organization_id, tab, outcome);
                spawn_tab_fetch(ctx, refetch);
            }
            BackgroundMessage::OrganizationCreated(result) => match result {
                Ok(org) => {
                    app.show_toast(&format!("+ Created {}", org.name));
                    load_organizations(app, ctx);
                }
                Err(e) => {
                    app.show_toast(&format!("Creating organization failed: {}", truncate(&e, 60)))
                }
            },
            BackgroundMessage::OrganizationDeleted(result) => match result {
                Ok(id) => {
                    app.apply_organization_removed(&id);
                    app.show_toast("+ Organization deleted");
                }
                Err(e) => {
                    app.show_toast(&format!("Deleting organization failed: {}", truncate(&e, 60)))
                }
            },
            BackgroundMessage::Error(e) => {
                tracing::error!("{}", e);
                app.show_toast(&format!("Error: {}", truncate(&e, 80)));
            }
        }
    }
}

pub fn spawn_background<F>(tx: mpsc::Sender<BackgroundMessage>, task_name: &'static str, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
            let _ = tx.send(BackgroundMessage::Error(format!(
                "Background task '{}' crashed unexpectedly: {}",
                task_name,
                panic_detail(&*panic)
            )));
        }
    });
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run a detail tab fetch handed out by the loader. A crashed fetch still
/// completes its ticket as a failure so the tab does not stay loading.
pub fn spawn_tab_fetch(ctx: &RuntimeContext, fetch: Option<TabFetch<DetailData>>) {
    let Some(fetch) = fetch else {
        return;
    };
    let ticket = fetch.ticket();
    let tx = ctx.tx.clone();
    spawn_background(ctx.tx.clone(), "tab_fetch", async move {
        let completion = match AssertUnwindSafe(fetch.run()).catch_unwind().await {
            Ok(completion) => completion,
            Err(panic) => {
                let detail = panic_detail(&*panic);
                tracing::error!(tab = ticket.tab_index, "tab fetch crashed: {}", detail);
                TabCompletion {
                    ticket,
                    result: Err(format!("fetch crashed: {}", detail)),
                }
            }
        };
        let _ = tx.send(BackgroundMessage::DetailTab(completion));
    });
}

pub fn load_organizations(app: &mut App, ctx: &RuntimeContext) {
    app.organizations.loading = true;
    let client = ctx.client.clone();
    let tx = ctx.tx.clone();
    spawn_background(ctx.tx.clone(), "organizations", async move {
        let result = client
            .list_organizations()
            .await
            .map_err(|e| e.user_message());
        let _ = tx.send(BackgroundMessage::OrganizationsLoaded(result));
    });
}

/// Send an analyzer request; the body is reconciled before it reaches the UI.
pub fn spawn_analysis(ctx: &RuntimeContext, job: AnalysisJob) {
    let client = ctx.client.clone();
    let tx = ctx.tx.clone();
    tracing::info!(
        analyzer = job.kind.label(),
        request = %job.request_id,
        "analysis requested"
    );
    spawn_background(ctx.tx.clone(), "analysis", async move {
        let outcome = match client.analyze(job.kind, &job.request).await {
            Ok(body) => {
                let result = reconcile(body, job.kind.shape());
                tracing::info!(
                    analyzer = job.kind.label(),
                    outcome = result.label(),
                    "analysis finished"
                );
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(analyzer = job.kind.label(), "analysis failed: {}", e);
                Err(e.user_message())
            }
        };
        let _ = tx.send(BackgroundMessage::AnalysisFinished {
            panel: job.panel,
            slot: job.slot,
            request_id: job.request_id,
            outcome,
        });
    });
}

pub fn create_project(ctx: &RuntimeContext, organization_id: String, draft: ProjectDraft) {
    let client = ctx.client.clone();
    let tx = ctx.tx.clone();
    spawn_background(ctx.tx.clone(), "create_project", async move {
        let outcome = client
            .create_project(&organization_id, &draft)
            .await
            .map(|p| format!("Created project {}", p.name))
            .map_err(|e| e.user_message());
        let _ = tx.send(BackgroundMessage::MutationFinished {
            organization_id,
            tab: PROJECTS_TAB,
            outcome,
        });
    });
}

pub fn delete_project(ctx: &RuntimeContext, organization_id: String, project_id: String) {
    let client = ctx.client.clone();
    let tx = ctx.tx.clone();
    spawn_background(ctx.tx.clone(), "delete_project", async move {
        let outcome = client
            .delete_project(&project_id)
            .await
            .map(|()| "Project deleted".to_string())
            .map_err(|e| e.user_message());
        let _ = tx.send(BackgroundMessage::MutationFinished {
            organization_id,
            tab: PROJECTS_TAB,
            outcome,
        });
    });
}

pub fn invite_member(ctx: &RuntimeContext, organization_id: String, invitation: Invitation) {
    let client = ctx.client.clone();
    let tx = ctx.tx.clone();
    spawn_background(ctx.tx.clone(), "invite_member", async move {
        let outcome = client
            .invite_member(&organization_id, &invitation)
            .await
            .map(|_| format!("Invited {}", invitation.email))
            .map_err(|e| e.user_message());
        let _ = tx.send(BackgroundMessage::MutationFinished {
            organization_id,
            tab: MEMBERS_TAB,
            outcome,
        });
    });
}

pub fn remove_member(ctx: &RuntimeContext, organization_id: String, member_id: String) {
    let client = ctx.client.clone();
    let tx = ctx.tx.clone();
    spawn_background(ctx.tx.clone(), "remove_member", async move {
        let outcome = client
            .remove_member(&organization_id, &member_id)
            .await
            .map(|()| "Member removed".to_string())
            .map_err(|e| e.user_message());
        let _ = tx.send(BackgroundMessage::MutationFinished {
            organization_id,
            tab: MEMBERS_TAB,
            outcome,
        });
    });
}

pub fn create_organization(ctx: &RuntimeContext, draft: OrganizationDraft) {
    let client = ctx.client.clone();
    let tx = ctx.tx.clone();
    spawn_background(ctx.tx.clone(), "create_organization", async move {
        let result = client
            .create_organization(&draft)
            .await
            .map_err(|e| e.user_message());
        let _ = tx.send(BackgroundMessage::OrganizationCreated(result));
    });
}

pub fn delete_organization(ctx: &RuntimeContext, organization_id: String) {
    let client = ctx.client.clone();
    let tx = ctx.tx.clone();
    spawn_background(ctx.tx.clone(), "delete_organization", async move {
        let deleted = client.delete_organization(&organization_id).await;
        let result = deleted
            .map(|()| organization_id)
            .map_err(|e| e.user_message());
        let _ = tx.send(BackgroundMessage::OrganizationDeleted(result));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::loader::{TabLoader, TabStatus};
    use std::time::Duration;

    async fn crashing_fetch() -> Result<DetailData, String> {
        panic!("projects exploded")
    }

    fn recv(rx: mpsc::Receiver<BackgroundMessage>) -> BackgroundMessage {
        rx.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_crashed_tab_fetch_fails_its_tab() {
        let client = ApiClient::new("http://localhost:9", None, Duration::from_secs(1)).unwrap();
        let (tx, rx) = mpsc::channel();
        let ctx = RuntimeContext {
            client: &client,
            tx: &tx,
        };
        let mut loader =
            TabLoader::new("org-1").with_tab("Projects", |_org: &str| crashing_fetch());

        spawn_tab_fetch(&ctx, loader.on_tab_activated(PROJECTS_TAB));
        let msg = tokio::task::spawn_blocking(move || recv(rx)).await.unwrap();

        let BackgroundMessage::DetailTab(completion) = msg else {
            panic!("expected a tab completion");
        };
        assert!(loader.complete(completion));
        assert_eq!(loader.status(PROJECTS_TAB), TabStatus::Failed);
        assert!(loader
            .get_active_error(PROJECTS_TAB)
            .is_some_and(|e| e.contains("projects exploded")));
    }

    #[tokio::test]
    async fn test_spawn_background_reports_panics() {
        let (tx, rx) = mpsc::channel();
        spawn_background(tx, "explode", async {
            panic!("boom");
        });
        let msg = tokio::task::spawn_blocking(move || {
            rx.recv_timeout(std::time::Duration::from_secs(5))
        })
        .await
        .unwrap()
        .unwrap();
        match msg {
            BackgroundMessage::Error(e) => {
                assert!(e.contains("explode"));
                assert!(e.contains("boom"));
            }
            _ => panic!("expected error message"),
        }
    }
}
