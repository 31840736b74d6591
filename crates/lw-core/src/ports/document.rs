//! Document port
//!
//! A minimal view of the host page: selector queries, mutation observation,
//! element events and animation-frame ticks. A browser binding implements it
//! over the DOM; `lw-platform` ships a headless implementation.

use std::sync::Arc;

use async_trait::async_trait;

use super::Subscription;

/// Opaque handle to an element owned by a [`DocumentPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementRef(u64);

impl ElementRef {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEventKind {
    Click,
    KeyDown,
}

impl DomEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DomEventKind::Click => "click",
            DomEventKind::KeyDown => "keydown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: DomEventKind,
    /// Key name for keyboard events.
    pub key: Option<String>,
}

impl DomEvent {
    pub fn click() -> Self {
        Self {
            kind: DomEventKind::Click,
            key: None,
        }
    }

    pub fn key_down(key: impl Into<String>) -> Self {
        Self {
            kind: DomEventKind::KeyDown,
            key: Some(key.into()),
        }
    }
}

/// Which mutations an observer wants to hear about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub subtree: bool,
    pub character_data: bool,
    pub attributes: bool,
    /// Restricts attribute records to these names when set.
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    /// Element insertions and removals anywhere below the target.
    pub fn child_list_subtree() -> Self {
        Self {
            child_list: true,
            subtree: true,
            ..Default::default()
        }
    }
}

/// Called once per batch of matching mutations.
pub type MutationListener = Arc<dyn Fn() + Send + Sync>;

pub type EventListener = Arc<dyn Fn(&DomEvent) + Send + Sync>;

#[async_trait]
pub trait DocumentPort: Send + Sync {
    /// First element in document order matching `selector`.
    fn query_selector(&self, selector: &str) -> Option<ElementRef>;

    /// Observe mutations below `target`, or below the document root when
    /// `target` is `None`.
    fn observe_mutations(
        &self,
        target: Option<ElementRef>,
        init: MutationObserverInit,
        listener: MutationListener,
    ) -> Subscription;

    fn add_event_listener(
        &self,
        element: ElementRef,
        kind: DomEventKind,
        listener: EventListener,
    ) -> Subscription;

    /// Listen on the document itself; receives events dispatched on any
    /// element.
    fn add_document_listener(&self, kind: DomEventKind, listener: EventListener) -> Subscription;

    fn attribute(&self, element: ElementRef, name: &str) -> Option<String>;

    fn text_content(&self, element: ElementRef) -> Option<String>;

    fn focus(&self, element: ElementRef);

    fn dispatch_event(&self, element: ElementRef, event: DomEvent);

    /// Resolves on the next animation frame.
    async fn next_animation_frame(&self);
}
