//! Form controls whose state a bound source can write back.
//!
//! A [`ValueControl`] holds one value that lives in its host node (an input's
//! `value`, a checkbox's `checked`, a button's text). Wrapped with
//! [`BoundComponent::with_value`](crate::BoundComponent::with_value), the
//! update closure returns the next value instead of mutating the control.

use std::rc::Rc;

use repose_core::{Component, NodeId, Result, VisualHost};

use crate::bound::BoundComponent;
use crate::text::Label;

pub trait ValueControl: Component {
    type Value;

    fn set_value(&mut self, value: Self::Value);
}

/// Text entry, for `input` and `textarea` nodes.
///
/// While rendered the value is read back from the host, so edits made there
/// are seen and kept across an unrender.
#[derive(Default)]
pub struct TextInput {
    value: String,
    target: Option<(Rc<dyn VisualHost>, NodeId)>,
}

impl TextInput {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            target: None,
        }
    }

    pub fn value(&self) -> String {
        match &self.target {
            Some((host, node)) => host.property(*node, "value").unwrap_or_default(),
            None => self.value.clone(),
        }
    }
}

impl Component for TextInput {
    fn render(&mut self, host: &Rc<dyn VisualHost>, node: NodeId) -> Result<()> {
        host.set_property(node, "value", Some(&self.value));
        self.target = Some((host.clone(), node));
        Ok(())
    }

    fn unrender(&mut self) {
        if let Some((host, node)) = self.target.take() {
            self.value = host.property(node, "value").unwrap_or_default();
        }
    }
}

impl ValueControl for TextInput {
    type Value = String;

    fn set_value(&mut self, value: String) {
        if let Some((host, node)) = &self.target {
            host.set_property(*node, "value", Some(&value));
        }
        self.value = value;
    }
}

/// Checkbox or radio button.
#[derive(Default)]
pub struct Toggle {
    checked: bool,
    target: Option<(Rc<dyn VisualHost>, NodeId)>,
}

impl Toggle {
    pub fn new(checked: bool) -> Self {
        Self {
            checked,
            target: None,
        }
    }

    pub fn is_checked(&self) -> bool {
        match &self.target {
            Some((host, node)) => host.property(*node, "checked").is_some(),
            None => self.checked,
        }
    }

    fn write(host: &Rc<dyn VisualHost>, node: NodeId, checked: bool) {
        host.set_property(node, "checked", checked.then_some("true"));
    }
}

impl Component for Toggle {
    fn render(&mut self, host: &Rc<dyn VisualHost>, node: NodeId) -> Result<()> {
        Self::write(host, node, self.checked);
        self.target = Some((host.clone(), node));
        Ok(())
    }

    fn unrender(&mut self) {
        self.checked = self.is_checked();
        self.target = None;
    }
}

impl ValueControl for Toggle {
    type Value = bool;

    fn set_value(&mut self, checked: bool) {
        if let Some((host, node)) = &self.target {
            Self::write(host, *node, checked);
        }
        self.checked = checked;
    }
}

/// Buttons and plain text take their label as value.
impl ValueControl for Label {
    type Value = String;

    fn set_value(&mut self, text: String) {
        self.set_text(text);
    }
}

pub type BoundInput<S> = BoundComponent<S, TextInput>;
pub type BoundToggle<S> = BoundComponent<S, Toggle>;
pub type BoundLabel<S> = BoundComponent<S, Label>;
