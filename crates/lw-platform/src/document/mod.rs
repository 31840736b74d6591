//! Headless document
//!
//! An in-process element tree implementing [`DocumentPort`]. Mutations are
//! reported synchronously to matching observers, events bubble from the
//! target through its ancestors to document listeners, and animation frames
//! are a fixed-interval tokio sleep.
//!
//! Listener and observer callbacks always run with the tree unlocked, so
//! they may query or mutate the document again.

mod selector;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use lw_core::ports::{
    DocumentPort, DomEvent, DomEventKind, ElementRef, EventListener, MutationListener,
    MutationObserverInit, Subscription,
};
use tracing::trace;

use selector::SelectorList;

const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

struct Node {
    tag: String,
    parent: Option<u64>,
    children: Vec<u64>,
    attributes: BTreeMap<String, String>,
    text: String,
}

impl Node {
    fn new(tag: &str, parent: Option<u64>) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            parent,
            children: Vec::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
        }
    }
}

enum Mutation<'a> {
    ChildList { parent: u64 },
    Attribute { element: u64, name: &'a str },
    Text { element: u64 },
}

struct Observer {
    id: u64,
    target: Option<u64>,
    init: MutationObserverInit,
    listener: MutationListener,
}

struct ElementListener {
    id: u64,
    element: u64,
    kind: DomEventKind,
    listener: EventListener,
}

struct DocumentListener {
    id: u64,
    kind: DomEventKind,
    listener: EventListener,
}

struct Tree {
    root: u64,
    next_node: u64,
    next_subscription: u64,
    nodes: HashMap<u64, Node>,
    focused: Option<u64>,
    observers: Vec<Observer>,
    element_listeners: Vec<ElementListener>,
    document_listeners: Vec<DocumentListener>,
    mutations_suppressed: bool,
}

impl Tree {
    fn new() -> Self {
        let root = 0;
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new("body", None));
        Self {
            root,
            next_node: root + 1,
            next_subscription: 0,
            nodes,
            focused: None,
            observers: Vec::new(),
            element_listeners: Vec::new(),
            document_listeners: Vec::new(),
            mutations_suppressed: false,
        }
    }

    fn subscription_id(&mut self) -> u64 {
        self.next_subscription += 1;
        self.next_subscription
    }

    /// Whether `node` is `ancestor` or lies below it.
    fn is_inclusive_descendant(&self, node: u64, ancestor: u64) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(&id).and_then(|node| node.parent);
        }
        false
    }

    /// Pre-order walk from the root.
    fn document_order(&self) -> Vec<u64> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.children.iter().rev());
            }
        }
        order
    }

    fn text_content(&self, id: u64) -> Option<String> {
        let node = self.nodes.get(&id)?;
        let mut text = node.text.clone();
        for child in &node.children {
            if let Some(child_text) = self.text_content(*child) {
                text.push_str(&child_text);
            }
        }
        Some(text)
    }

    fn observers_for(&self, mutation: &Mutation<'_>) -> Vec<MutationListener> {
        if self.mutations_suppressed {
            return Vec::new();
        }
        let subject = match mutation {
            Mutation::ChildList { parent } => *parent,
            Mutation::Attribute { element, .. } | Mutation::Text { element } => *element,
        };

        self.observers
            .iter()
            .filter(|observer| {
                let target = observer.target.unwrap_or(self.root);
                let in_scope = subject == target
                    || (observer.init.subtree && self.is_inclusive_descendant(subject, target));
                in_scope && observer_wants(&observer.init, mutation)
            })
            .map(|observer| observer.listener.clone())
            .collect()
    }

    fn remove_subtree(&mut self, id: u64) {
        if let Some(node) = self.nodes.remove(&id) {
            for child in node.children {
                self.remove_subtree(child);
            }
        }
        if self.focused == Some(id) {
            self.focused = None;
        }
        self.element_listeners.retain(|entry| entry.element != id);
    }
}

fn observer_wants(init: &MutationObserverInit, mutation: &Mutation<'_>) -> bool {
    match mutation {
        Mutation::ChildList { .. } => init.child_list,
        Mutation::Text { .. } => init.character_data || init.child_list,
        Mutation::Attribute { name, .. } => {
            init.attributes
                && init
                    .attribute_filter
                    .as_ref()
                    .map_or(true, |filter| filter.iter().any(|allowed| allowed == name))
        }
    }
}

/// In-process [`DocumentPort`] implementation.
pub struct HeadlessDocument {
    frame_interval: Duration,
    tree: Arc<Mutex<Tree>>,
}

impl Default for HeadlessDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDocument {
    pub fn new() -> Self {
        Self::with_frame_interval(DEFAULT_FRAME_INTERVAL)
    }

    pub fn with_frame_interval(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            tree: Arc::new(Mutex::new(Tree::new())),
        }
    }

    /// The `<body>` element.
    pub fn root(&self) -> ElementRef {
        ElementRef::new(self.lock().root)
    }

    /// Append a new element under `parent` (the body when `None`).
    pub fn append_element(
        &self,
        parent: Option<ElementRef>,
        tag: &str,
        attributes: &[(&str, &str)],
    ) -> ElementRef {
        let (element, listeners) = {
            let mut tree = self.lock();
            let parent = parent.map(ElementRef::raw).unwrap_or(tree.root);
            let parent = if tree.nodes.contains_key(&parent) {
                parent
            } else {
                trace!(parent, "append under a detached parent, using body");
                tree.root
            };

            let id = tree.next_node;
            tree.next_node += 1;
            let mut node = Node::new(tag, Some(parent));
            node.attributes = attributes
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            tree.nodes.insert(id, node);
            if let Some(parent) = tree.nodes.get_mut(&parent) {
                parent.children.push(id);
            }
            (id, tree.observers_for(&Mutation::ChildList { parent }))
        };
        notify(listeners);
        ElementRef::new(element)
    }

    /// Detach `element` and everything below it.
    pub fn remove_element(&self, element: ElementRef) {
        let listeners = {
            let mut tree = self.lock();
            let id = element.raw();
            if id == tree.root {
                return;
            }
            let Some(parent) = tree.nodes.get(&id).and_then(|node| node.parent) else {
                return;
            };
            // Observers are resolved before the node leaves the tree.
            let listeners = tree.observers_for(&Mutation::ChildList { parent });
            if let Some(parent) = tree.nodes.get_mut(&parent) {
                parent.children.retain(|child| *child != id);
            }
            tree.remove_subtree(id);
            listeners
        };
        notify(listeners);
    }

    pub fn set_attribute(&self, element: ElementRef, name: &str, value: &str) {
        let listeners = {
            let mut tree = self.lock();
            let Some(node) = tree.nodes.get_mut(&element.raw()) else {
                return;
            };
            if node.attributes.get(name).map(String::as_str) == Some(value) {
                return;
            }
            node.attributes.insert(name.to_string(), value.to_string());
            tree.observers_for(&Mutation::Attribute {
                element: element.raw(),
                name,
            })
        };
        notify(listeners);
    }

    pub fn remove_attribute(&self, element: ElementRef, name: &str) {
        let listeners = {
            let mut tree = self.lock();
            let removed = tree
                .nodes
                .get_mut(&element.raw())
                .and_then(|node| node.attributes.remove(name));
            if removed.is_none() {
                return;
            }
            tree.observers_for(&Mutation::Attribute {
                element: element.raw(),
                name,
            })
        };
        notify(listeners);
    }

    /// Replace the element's own text.
    pub fn set_text(&self, element: ElementRef, text: &str) {
        let listeners = {
            let mut tree = self.lock();
            let Some(node) = tree.nodes.get_mut(&element.raw()) else {
                return;
            };
            if node.text == text {
                return;
            }
            node.text = text.to_string();
            tree.observers_for(&Mutation::Text {
                element: element.raw(),
            })
        };
        notify(listeners);
    }

    pub fn contains(&self, element: ElementRef) -> bool {
        self.lock().nodes.contains_key(&element.raw())
    }

    pub fn focused(&self) -> Option<ElementRef> {
        self.lock().focused.map(ElementRef::new)
    }

    /// Simulated user click.
    pub fn click(&self, element: ElementRef) {
        self.dispatch_event(element, DomEvent::click());
    }

    /// Keydown on the focused element, or the body when nothing has focus.
    pub fn press_key(&self, key: &str) {
        let target = {
            let tree = self.lock();
            tree.focused.unwrap_or(tree.root)
        };
        self.dispatch_event(ElementRef::new(target), DomEvent::key_down(key));
    }

    /// Stop reporting mutations; waiters then only see changes through
    /// frame polling.
    pub fn set_mutations_suppressed(&self, suppressed: bool) {
        self.lock().mutations_suppressed = suppressed;
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    /// Listeners registered directly on `element`.
    pub fn listener_count(&self, element: ElementRef) -> usize {
        self.lock()
            .element_listeners
            .iter()
            .filter(|entry| entry.element == element.raw())
            .count()
    }

    pub fn document_listener_count(&self) -> usize {
        self.lock().document_listeners.len()
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        lock_tree(&self.tree)
    }

    fn release(&self, remove: impl FnOnce(&mut Tree) + Send + 'static) -> Subscription {
        let tree: Weak<Mutex<Tree>> = Arc::downgrade(&self.tree);
        Subscription::new(move || {
            if let Some(tree) = tree.upgrade() {
                remove(&mut lock_tree(&tree));
            }
        })
    }
}

#[async_trait]
impl DocumentPort for HeadlessDocument {
    fn query_selector(&self, selector: &str) -> Option<ElementRef> {
        let Some(selector) = SelectorList::parse(selector) else {
            trace!(selector, "unsupported selector");
            return None;
        };
        let tree = self.lock();
        tree.document_order()
            .into_iter()
            .find(|id| {
                tree.nodes
                    .get(id)
                    .is_some_and(|node| selector.matches(&node.tag, &node.attributes))
            })
            .map(ElementRef::new)
    }

    fn observe_mutations(
        &self,
        target: Option<ElementRef>,
        init: MutationObserverInit,
        listener: MutationListener,
    ) -> Subscription {
        let id = {
            let mut tree = self.lock();
            let id = tree.subscription_id();
            tree.observers.push(Observer {
                id,
                target: target.map(ElementRef::raw),
                init,
                listener,
            });
            id
        };
        self.release(move |tree| tree.observers.retain(|observer| observer.id != id))
    }

    fn add_event_listener(
        &self,
        element: ElementRef,
        kind: DomEventKind,
        listener: EventListener,
    ) -> Subscription {
        let id = {
            let mut tree = self.lock();
            let id = tree.subscription_id();
            tree.element_listeners.push(ElementListener {
                id,
                element: element.raw(),
                kind,
                listener,
            });
            id
        };
        self.release(move |tree| tree.element_listeners.retain(|entry| entry.id != id))
    }

    fn add_document_listener(&self, kind: DomEventKind, listener: EventListener) -> Subscription {
        let id = {
            let mut tree = self.lock();
            let id = tree.subscription_id();
            tree.document_listeners.push(DocumentListener { id, kind, listener });
            id
        };
        self.release(move |tree| tree.document_listeners.retain(|entry| entry.id != id))
    }

    fn attribute(&self, element: ElementRef, name: &str) -> Option<String> {
        self.lock()
            .nodes
            .get(&element.raw())
            .and_then(|node| node.attributes.get(name).cloned())
    }

    fn text_content(&self, element: ElementRef) -> Option<String> {
        self.lock().text_content(element.raw())
    }

    fn focus(&self, element: ElementRef) {
        let mut tree = self.lock();
        if tree.nodes.contains_key(&element.raw()) {
            tree.focused = Some(element.raw());
        }
    }

    fn dispatch_event(&self, element: ElementRef, event: DomEvent) {
        let listeners: Vec<EventListener> = {
            let tree = self.lock();
            if !tree.nodes.contains_key(&element.raw()) {
                return;
            }

            // Target first, then each ancestor, then the document.
            let mut path = Vec::new();
            let mut current = Some(element.raw());
            while let Some(id) = current {
                path.push(id);
                current = tree.nodes.get(&id).and_then(|node| node.parent);
            }

            let mut listeners = Vec::new();
            for id in path {
                listeners.extend(
                    tree.element_listeners
                        .iter()
                        .filter(|entry| entry.element == id && entry.kind == event.kind)
                        .map(|entry| entry.listener.clone()),
                );
            }
            listeners.extend(
                tree.document_listeners
                    .iter()
                    .filter(|entry| entry.kind == event.kind)
                    .map(|entry| entry.listener.clone()),
            );
            listeners
        };

        trace!(
            element = element.raw(),
            kind = event.kind.as_str(),
            listeners = listeners.len(),
            "dispatch event"
        );
        for listener in listeners {
            listener(&event);
        }
    }

    async fn next_animation_frame(&self) {
        tokio::time::sleep(self.frame_interval).await;
    }
}

fn lock_tree(tree: &Mutex<Tree>) -> MutexGuard<'_, Tree> {
    tree.lock().unwrap_or_else(PoisonError::into_inner)
}

fn notify(listeners: Vec<MutationListener>) {
    for listener in listeners {
        listener();
    }
}
