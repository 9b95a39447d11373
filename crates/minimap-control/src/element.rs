#![forbid(unsafe_code)]

//! Root presentation element of the control.
//!
//! The host mounts the element into one of its control corners and renders
//! it; the control only edits its class list and attaches the toggle
//! button. [`ControlElement::remove`] is the last step of detach.

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use crate::config::MinimapConfig;
use crate::style::{CONTAINER_CLASSES, MINIMIZED_CLASS, container_stylesheet};
use crate::toggle::ToggleButton;

/// The container element handed to the host by `attach`.
#[derive(Debug)]
pub struct ControlElement {
    id: String,
    stylesheet: String,
    classes: RefCell<BTreeSet<String>>,
    toggle: RefCell<Option<ToggleButton>>,
    mounted: Cell<bool>,
}

impl ControlElement {
    /// Build the container for `config`, collapsed if the config starts so.
    pub fn new(config: &MinimapConfig) -> Self {
        let mut classes: BTreeSet<String> =
            CONTAINER_CLASSES.iter().map(|c| (*c).to_owned()).collect();
        if config.starts_collapsed() {
            classes.insert(MINIMIZED_CLASS.to_owned());
        }
        Self {
            id: config.id.clone(),
            stylesheet: container_stylesheet(config),
            classes: RefCell::new(classes),
            toggle: RefCell::new(None),
            mounted: Cell::new(true),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stylesheet(&self) -> &str {
        &self.stylesheet
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.borrow().contains(class)
    }

    /// Class list in sorted order.
    pub fn classes(&self) -> Vec<String> {
        self.classes.borrow().iter().cloned().collect()
    }

    /// Force `class` on or off.
    pub fn set_class(&self, class: &str, on: bool) {
        let mut classes = self.classes.borrow_mut();
        if on {
            classes.insert(class.to_owned());
        } else {
            classes.remove(class);
        }
    }

    /// Stylesheet of the toggle button, once the button exists.
    pub fn toggle_stylesheet(&self) -> Option<String> {
        self.toggle.borrow().as_ref().map(ToggleButton::stylesheet)
    }

    pub fn toggle_button(&self) -> Option<ToggleButton> {
        self.toggle.borrow().clone()
    }

    pub(crate) fn set_toggle_button(&self, button: ToggleButton) {
        *self.toggle.borrow_mut() = Some(button);
    }

    /// Whether the element is still part of the document.
    pub fn is_mounted(&self) -> bool {
        self.mounted.get()
    }

    /// Remove the element and its children. Idempotent.
    pub fn remove(&self) {
        self.toggle.borrow_mut().take();
        self.mounted.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MinimapOptions;
    use crate::host::ControlPosition;

    fn config(initial_minimized: bool) -> MinimapConfig {
        MinimapConfig::from_options(&MinimapOptions {
            id: Some("mini".into()),
            initial_minimized: Some(initial_minimized),
            ..MinimapOptions::default()
        })
    }

    #[test]
    fn starts_with_container_classes() {
        let el = ControlElement::new(&config(false));
        assert_eq!(el.id(), "mini");
        assert!(el.has_class("custom-ctrl-minimap"));
        assert!(!el.has_class(MINIMIZED_CLASS));
        assert!(el.stylesheet().contains("#mini.minimized"));
    }

    #[test]
    fn initial_minimized_sets_class() {
        assert!(ControlElement::new(&config(true)).has_class(MINIMIZED_CLASS));
    }

    #[test]
    fn toggle_stylesheet_follows_button() {
        let el = ControlElement::new(&config(false));
        assert!(el.toggle_stylesheet().is_none());
        el.set_toggle_button(ToggleButton::new("mini", ControlPosition::BottomLeft));
        let css = el.toggle_stylesheet().unwrap();
        assert!(css.contains("button#mini-toggle"));
        assert!(css.contains("rotate: -90deg;"));
    }

    #[test]
    fn remove_drops_children() {
        let el = ControlElement::new(&config(false));
        el.set_toggle_button(ToggleButton::new("mini", ControlPosition::TopLeft));
        el.remove();
        el.remove();
        assert!(!el.is_mounted());
        assert!(el.toggle_button().is_none());
    }
}
