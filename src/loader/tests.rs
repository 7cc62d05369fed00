use super::*;
use futures::channel::oneshot;
use futures::executor::block_on;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};

/// Fetch that counts invocations and resolves immediately.
fn counting_loader(calls: Arc<AtomicUsize>) -> TabLoader<String> {
    let projects = calls.clone();
    let members = calls;
    TabLoader::new("org-1")
        .with_tab("Projects", move |ctx: &str| {
            projects.fetch_add(1, Ordering::SeqCst);
            let ctx = ctx.to_string();
            async move { Ok::<_, String>(format!("projects of {}", ctx)) }
        })
        .with_tab("Members", move |ctx: &str| {
            members.fetch_add(1, Ordering::SeqCst);
            let ctx = ctx.to_string();
            async move { Ok::<_, String>(format!("members of {}", ctx)) }
        })
}

fn run<T>(fetch: TabFetch<T>) -> TabCompletion<T> {
    block_on(fetch.run())
}

#[test]
fn test_first_activation_fetches_and_loads() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut loader = counting_loader(calls.clone());

    assert_eq!(loader.status(0), TabStatus::Idle);
    let fetch = loader.on_tab_activated(0).expect("fetch starts");
    assert_eq!(loader.status(0), TabStatus::Loading);

    assert!(loader.complete(run(fetch)));
    let state = loader.get_state(0);
    assert_eq!(state.status, TabStatus::Loaded);
    assert!(state.last_loaded_at.is_some());
    assert_eq!(loader.data(0).map(String::as_str), Some("projects of org-1"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reactivation_while_loading_is_a_noop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let pending: Arc<Mutex<Vec<oneshot::Sender<Result<u32, String>>>>> =
        Arc::new(Mutex::new(Vec::new()));

    let calls_in = calls.clone();
    let pending_in = pending.clone();
    let mut loader = TabLoader::new("org-1").with_tab("Usage", move |_ctx: &str| {
        calls_in.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        pending_in.lock().unwrap().push(tx);
        async move { rx.await.unwrap_or_else(|_| Err("dropped".to_string())) }
    });

    let first = loader.on_tab_activated(0).expect("first activation fetches");
    assert!(loader.on_tab_activated(0).is_none());
    assert!(loader.on_tab_activated(0).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let tx = pending.lock().unwrap().pop().unwrap();
    tx.send(Ok(42)).unwrap();
    assert!(loader.complete(run(first)));
    assert_eq!(loader.data(0), Some(&42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_loaded_tab_is_not_refetched() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut loader = counting_loader(calls.clone());

    let fetch = loader.on_tab_activated(1).unwrap();
    loader.complete(run(fetch));
    assert!(loader.on_tab_activated(1).is_none());
    assert!(loader.on_tab_activated(1).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_only_active_tab_is_fetched() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut loader = counting_loader(calls.clone());

    let fetch = loader.on_tab_activated(1).unwrap();
    loader.complete(run(fetch));
    assert_eq!(loader.status(0), TabStatus::Idle);
    assert_eq!(loader.active_tab(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_context_change_resets_all_tabs_and_refetches_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut loader = counting_loader(calls.clone());

    let fetch = loader.on_tab_activated(0).unwrap();
    loader.complete(run(fetch));
    let fetch = loader.on_tab_activated(1).unwrap();
    loader.complete(run(fetch));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    loader.on_parent_context_changed("org-2");
    assert_eq!(loader.context_id(), "org-2");
    assert_eq!(loader.status(0), TabStatus::Idle);
    assert_eq!(loader.status(1), TabStatus::Idle);
    assert!(loader.data(0).is_none());
    // Lazy: the reset itself fetches nothing.
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let fetch = loader.on_tab_activated(0).unwrap();
    assert!(loader.on_tab_activated(0).is_none());
    loader.complete(run(fetch));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(loader.data(0).map(String::as_str), Some("projects of org-2"));
}

#[test]
fn test_example_sequence_makes_two_calls() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut loader = counting_loader(calls.clone());

    let first = loader.on_tab_activated(1).unwrap();
    assert!(loader.on_tab_activated(1).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    loader.on_parent_context_changed("org-2");
    assert_eq!(loader.status(1), TabStatus::Idle);
    let second = loader.on_tab_activated(1).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The org-1 response arrives late and must not land in the org-2 view.
    assert!(!loader.complete(run(first)));
    assert_eq!(loader.status(1), TabStatus::Loading);
    assert!(loader.complete(run(second)));
    assert_eq!(loader.data(1).map(String::as_str), Some("members of org-2"));
}

#[test]
fn test_failure_is_tab_local_and_retryable() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_in = attempts.clone();
    let mut loader = TabLoader::new("org-1")
        .with_tab("Projects", |_ctx: &str| async { Ok::<_, String>(vec![1, 2]) })
        .with_tab("Usage", move |_ctx: &str| {
            let attempt = attempts_in.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err("usage service unavailable".to_string())
                } else {
                    Ok(vec![7])
                }
            }
        });

    let fetch = loader.on_tab_activated(0).unwrap();
    loader.complete(run(fetch));
    let before = loader.get_state(0);

    let fetch = loader.on_tab_activated(1).unwrap();
    loader.complete(run(fetch));
    assert_eq!(loader.status(1), TabStatus::Failed);
    assert_eq!(loader.get_active_error(1), Some("usage service unavailable"));

    // Sibling untouched.
    assert_eq!(loader.get_state(0), before);
    assert_eq!(loader.get_active_error(0), None);
    assert_eq!(loader.data(0), Some(&vec![1, 2]));

    // Re-activating the failed tab retries it.
    let retry = loader.on_tab_activated(1).expect("failed tab refetches");
    assert!(loader.complete(run(retry)));
    assert_eq!(loader.status(1), TabStatus::Loaded);
    assert_eq!(loader.get_active_error(1), None);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_invalidate_refetches_only_that_tab() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut loader = counting_loader(calls.clone());

    for tab in 0..2 {
        let fetch = loader.on_tab_activated(tab).unwrap();
        loader.complete(run(fetch));
    }
    loader.invalidate(0);
    assert_eq!(loader.status(0), TabStatus::Idle);
    assert_eq!(loader.status(1), TabStatus::Loaded);
    assert!(loader.on_tab_activated(1).is_none());
    assert!(loader.on_tab_activated(0).is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_invalidate_while_loading_keeps_single_fetch() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut loader = counting_loader(calls.clone());

    let in_flight = loader.on_tab_activated(0).unwrap();
    loader.invalidate(0);
    loader.invalidate(0);
    assert_eq!(loader.status(0), TabStatus::Loading);
    assert!(loader.on_tab_activated(0).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The in-flight result lands, then the tab asks for a fresh fetch.
    assert!(loader.complete(run(in_flight)));
    assert_eq!(loader.status(0), TabStatus::Idle);
    assert_eq!(loader.data(0).map(String::as_str), Some("projects of org-1"));

    let refetch = loader.on_tab_activated(0).expect("invalidated tab refetches");
    assert!(loader.complete(run(refetch)));
    assert_eq!(loader.status(0), TabStatus::Loaded);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_completion_from_other_loader_is_ignored() {
    let mut first = counting_loader(Arc::new(AtomicUsize::new(0)));
    let mut second = counting_loader(Arc::new(AtomicUsize::new(0)));

    let fetch = first.on_tab_activated(0).unwrap();
    second.on_tab_activated(0).unwrap();
    assert!(!second.complete(run(fetch)));
    assert_eq!(second.status(0), TabStatus::Loading);
}

#[test]
fn test_expired_data_is_refetched() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut loader = counting_loader(calls.clone()).with_max_age(Duration::minutes(5));

    let start = Utc::now();
    let fetch = loader.activate_at(0, start).unwrap();
    loader.complete_at(run(fetch), start);

    assert!(loader.activate_at(0, start + Duration::minutes(1)).is_none());
    assert!(loader.activate_at(0, start + Duration::minutes(6)).is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unknown_tab_is_ignored() {
    let mut loader = counting_loader(Arc::new(AtomicUsize::new(0)));
    assert!(loader.on_tab_activated(9).is_none());
    assert_eq!(loader.get_state(9).status, TabStatus::Idle);
    assert_eq!(loader.labels(), vec!["Projects", "Members"]);
}
