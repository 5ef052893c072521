use std::rc::Rc;

use repose_core::{Component, Events, NodeId, Observable, Result, VisualHost};

use crate::bound::{BoundComponent, BoundOptions};

/// Plain text written into its host node.
#[derive(Default)]
pub struct Label {
    text: String,
    target: Option<(Rc<dyn VisualHost>, NodeId)>,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        if let Some((host, node)) = &self.target {
            host.set_text(*node, &self.text);
        }
    }

    pub fn node(&self) -> Option<NodeId> {
        self.target.as_ref().map(|(_, node)| *node)
    }
}

impl Component for Label {
    fn render(&mut self, host: &Rc<dyn VisualHost>, node: NodeId) -> Result<()> {
        host.set_text(node, &self.text);
        self.target = Some((host.clone(), node));
        Ok(())
    }

    fn unrender(&mut self) {
        self.target = None;
    }
}

/// A [`Label`] whose text is recomputed from a source on every change.
pub struct BoundText<S: ?Sized + Observable + 'static>(BoundComponent<S, Label>);

impl<S: ?Sized + Observable + 'static> BoundText<S> {
    pub fn new(
        source: Option<Rc<S>>,
        events: Events,
        format: impl Fn(Option<&S>) -> String + 'static,
    ) -> Self {
        Self(BoundComponent::new(
            source,
            events,
            Label::default(),
            move |source, label: &mut Label, _event| {
                label.set_text(format(source));
                Ok(())
            },
            BoundOptions::default(),
        ))
    }

    pub fn text(&self) -> String {
        self.0.component().text().to_string()
    }

    pub fn set_source(&mut self, source: Option<Rc<S>>) -> Result<()> {
        self.0.set_source(source)
    }

    pub fn source(&self) -> Option<Rc<S>> {
        self.0.source()
    }
}

impl<S: ?Sized + Observable + 'static> Component for BoundText<S> {
    fn render(&mut self, host: &Rc<dyn VisualHost>, node: NodeId) -> Result<()> {
        self.0.render(host, node)
    }

    fn unrender(&mut self) {
        self.0.unrender();
    }
}
