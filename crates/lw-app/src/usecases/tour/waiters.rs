//! Cancellable waiters for selectors, element events and store state.
//!
//! None of the waiters carry a timeout. Bounded waits go through
//! [`within`] / [`within_deadline`], which hand the operation a child of the
//! run token and race it against a deadline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lw_core::ports::{
    DocumentPort, DomEvent, DomEventKind, ElementRef, MutationObserverInit, StateStorePort,
    Subscription,
};
use lw_core::AppState;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WaitError {
    #[error("wait cancelled")]
    Cancelled,
    #[error("wait timed out")]
    TimedOut,
}

/// Resolve with the first element matching `selector`.
///
/// Watches child-list mutations on the whole document and re-queries once
/// per animation frame, so targets appear even when mutation records are
/// missed.
pub async fn wait_for_selector(
    document: &dyn DocumentPort,
    selector: &str,
    cancel: &CancellationToken,
) -> Result<ElementRef, WaitError> {
    if cancel.is_cancelled() {
        return Err(WaitError::Cancelled);
    }
    if let Some(element) = document.query_selector(selector) {
        return Ok(element);
    }

    let changed = Arc::new(Notify::new());
    let _observer = document.observe_mutations(
        None,
        MutationObserverInit::child_list_subtree(),
        wake(&changed),
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            _ = changed.notified() => {}
            _ = document.next_animation_frame() => {}
        }
        if let Some(element) = document.query_selector(selector) {
            return Ok(element);
        }
    }
}

/// Resolve on the first of `kinds` fired on `element`.
pub async fn wait_for_event(
    document: &dyn DocumentPort,
    element: ElementRef,
    kinds: &[DomEventKind],
    cancel: &CancellationToken,
) -> Result<(), WaitError> {
    if cancel.is_cancelled() {
        return Err(WaitError::Cancelled);
    }

    let fired = Arc::new(Notify::new());
    let _listeners: Vec<Subscription> = kinds
        .iter()
        .map(|kind| {
            let fired = fired.clone();
            document.add_event_listener(
                element,
                *kind,
                Arc::new(move |_event: &DomEvent| fired.notify_one()),
            )
        })
        .collect();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WaitError::Cancelled),
        _ = fired.notified() => Ok(()),
    }
}

/// Resolve once `predicate` holds for the store state.
pub async fn wait_for_state<P>(
    store: &dyn StateStorePort,
    predicate: P,
    cancel: &CancellationToken,
) -> Result<(), WaitError>
where
    P: Fn(&AppState) -> bool,
{
    if predicate(&store.get_state()) {
        return Ok(());
    }
    if cancel.is_cancelled() {
        return Err(WaitError::Cancelled);
    }

    let changed = Arc::new(Notify::new());
    let _subscription = store.subscribe(wake(&changed));

    // The state may have moved between the first check and subscribing.
    loop {
        if predicate(&store.get_state()) {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            _ = changed.notified() => {}
        }
    }
}

/// Run `op` with a child of `parent`, giving up after `limit`.
pub async fn within<T, F, Fut>(
    parent: &CancellationToken,
    limit: Duration,
    op: F,
) -> Result<T, WaitError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, WaitError>>,
{
    within_deadline(parent, Instant::now() + limit, op).await
}

/// Like [`within`] but against an absolute deadline, so several waits can
/// share one time limit.
///
/// The child token is cancelled when this returns, which releases whatever
/// `op` was still holding.
pub async fn within_deadline<T, F, Fut>(
    parent: &CancellationToken,
    deadline: Instant,
    op: F,
) -> Result<T, WaitError>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, WaitError>>,
{
    let local = parent.child_token();
    let _release = local.clone().drop_guard();

    tokio::select! {
        result = op(local.clone()) => result,
        _ = tokio::time::sleep_until(deadline) => Err(WaitError::TimedOut),
    }
}

fn wake(notify: &Arc<Notify>) -> Arc<dyn Fn() + Send + Sync> {
    let notify = notify.clone();
    Arc::new(move || notify.notify_one())
}
