//! Waits for an element's visible content to change.

use std::sync::Arc;

use lw_core::ports::{DocumentPort, ElementRef, MutationObserverInit};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::waiters::WaitError;

const ARIA_LABEL: &str = "aria-label";

/// What a reader sees: the `aria-label` when set, the text content
/// otherwise, trimmed.
pub fn visible_content(document: &dyn DocumentPort, element: ElementRef) -> String {
    document
        .attribute(element, ARIA_LABEL)
        .or_else(|| document.text_content(element))
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Resolve once [`visible_content`] differs from `snapshot`.
pub async fn wait_for_visible_content_change(
    document: &dyn DocumentPort,
    element: ElementRef,
    snapshot: &str,
    cancel: &CancellationToken,
) -> Result<(), WaitError> {
    if cancel.is_cancelled() {
        return Err(WaitError::Cancelled);
    }
    if visible_content(document, element) != snapshot {
        return Ok(());
    }

    let changed = Arc::new(Notify::new());
    let _observer = {
        let changed = changed.clone();
        document.observe_mutations(
            Some(element),
            MutationObserverInit {
                child_list: true,
                subtree: true,
                character_data: true,
                attributes: true,
                attribute_filter: Some(vec![ARIA_LABEL.to_string()]),
            },
            Arc::new(move || changed.notify_one()),
        )
    };

    loop {
        if visible_content(document, element) != snapshot {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WaitError::Cancelled),
            _ = changed.notified() => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_platform::document::HeadlessDocument;

    #[test]
    fn aria_label_wins_over_text() {
        let document = HeadlessDocument::new();
        let timer = document.append_element(None, "div", &[("aria-label", " Elapsed 00:03 ")]);
        document.set_text(timer, "00:03.21");

        assert_eq!(visible_content(&document, timer), "Elapsed 00:03");

        document.remove_attribute(timer, ARIA_LABEL);
        assert_eq!(visible_content(&document, timer), "00:03.21");
    }

    #[tokio::test]
    async fn resolves_immediately_when_already_different() {
        let document = HeadlessDocument::new();
        let timer = document.append_element(None, "div", &[]);
        document.set_text(timer, "00:01");
        let cancel = CancellationToken::new();

        let result = wait_for_visible_content_change(&document, timer, "00:00", &cancel).await;

        assert_eq!(result, Ok(()));
        assert_eq!(document.observer_count(), 0);
    }

    #[tokio::test]
    async fn resolves_on_aria_label_change() {
        let document = Arc::new(HeadlessDocument::new());
        let timer = document.append_element(None, "div", &[("aria-label", "Total time")]);
        let cancel = CancellationToken::new();

        let waiter = {
            let document = document.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                wait_for_visible_content_change(&*document, timer, "Total time", &cancel).await
            })
        };
        while document.observer_count() == 0 {
            tokio::task::yield_now().await;
        }
        document.set_attribute(timer, ARIA_LABEL, "Lap time");

        assert_eq!(waiter.await.unwrap(), Ok(()));
        assert_eq!(document.observer_count(), 0);
    }

    #[tokio::test]
    async fn ignores_unrelated_attributes_until_cancelled() {
        let document = Arc::new(HeadlessDocument::new());
        let timer = document.append_element(None, "div", &[]);
        document.set_text(timer, "00:00");
        let cancel = CancellationToken::new();

        let waiter = {
            let document = document.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                wait_for_visible_content_change(&*document, timer, "00:00", &cancel).await
            })
        };
        while document.observer_count() == 0 {
            tokio::task::yield_now().await;
        }
        document.set_attribute(timer, "class", "blink");
        tokio::task::yield_now().await;
        cancel.cancel();

        assert_eq!(waiter.await.unwrap(), Err(WaitError::Cancelled));
    }
}
