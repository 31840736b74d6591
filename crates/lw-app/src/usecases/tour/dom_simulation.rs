//! Synthetic user input.

use lw_core::ports::{DocumentPort, DomEvent, ElementRef};

/// Focus `element` and click it once.
pub fn click_once(document: &dyn DocumentPort, element: ElementRef) {
    document.focus(element);
    document.dispatch_event(element, DomEvent::click());
}

pub fn keydown(document: &dyn DocumentPort, element: ElementRef, key: &str) {
    document.dispatch_event(element, DomEvent::key_down(key));
}
