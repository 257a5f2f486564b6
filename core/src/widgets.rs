//! Widget property storage
//!
//! Widgets are addressed by id. Each one has a handful of built-in properties
//! plus a bag of free-form attributes, which is all the widget keywords read
//! and write.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How a widget is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderType {
    #[default]
    Normal,
    Immediate,
    Open,
    Closed,
}

impl fmt::Display for RenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderType::Normal => "normal",
            RenderType::Immediate => "immediate",
            RenderType::Open => "open",
            RenderType::Closed => "closed",
        };
        f.write_str(name)
    }
}

impl FromStr for RenderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(RenderType::Normal),
            "immediate" => Ok(RenderType::Immediate),
            "open" => Ok(RenderType::Open),
            "closed" => Ok(RenderType::Closed),
            _ => Err(format!("unknown render type '{}'", s)),
        }
    }
}

/// Built-in property names; these can be read and set but never deleted
pub const BUILT_IN_PROPERTIES: &[&str] = &[
    "visible",
    "invisible-element",
    "element",
    "has-id",
    "has-name",
    "render-type",
];

/// One widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    id: String,
    pub visible: bool,
    pub element: String,
    pub invisible_element: String,
    pub has_id: bool,
    pub render_type: RenderType,
    attributes: Vec<(String, String)>,
}

impl Widget {
    pub fn new(id: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            visible: true,
            element: element.into(),
            invisible_element: "span".to_string(),
            has_id: true,
            render_type: RenderType::Normal,
            attributes: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|(key, _)| key != name);
        self.attributes.len() != before
    }

    /// Attributes in insertion order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Where the widget keywords find widgets
pub trait WidgetStore: Send {
    fn widget(&self, id: &str) -> Option<&Widget>;
    fn widget_mut(&mut self, id: &str) -> Option<&mut Widget>;

    /// Add a widget, replacing any widget with the same id
    fn insert(&mut self, widget: Widget);

    /// Change the id of a widget
    fn rename(&mut self, old_id: &str, new_id: &str) -> Result<(), String>;

    fn ids(&self) -> Vec<String>;
}

/// [`WidgetStore`] backed by a map
#[derive(Debug, Clone, Default)]
pub struct InMemoryWidgets {
    widgets: BTreeMap<String, Widget>,
}

impl InMemoryWidgets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, widget: Widget) -> Self {
        self.insert(widget);
        self
    }
}

impl WidgetStore for InMemoryWidgets {
    fn widget(&self, id: &str) -> Option<&Widget> {
        self.widgets.get(id)
    }

    fn widget_mut(&mut self, id: &str) -> Option<&mut Widget> {
        self.widgets.get_mut(id)
    }

    fn insert(&mut self, widget: Widget) {
        self.widgets.insert(widget.id.clone(), widget);
    }

    fn rename(&mut self, old_id: &str, new_id: &str) -> Result<(), String> {
        if old_id == new_id {
            return Ok(());
        }
        if self.widgets.contains_key(new_id) {
            return Err(format!("a widget with id '{}' already exists", new_id));
        }
        let mut widget = self
            .widgets
            .remove(old_id)
            .ok_or_else(|| format!("no widget with id '{}'", old_id))?;
        widget.id = new_id.to_string();
        self.widgets.insert(widget.id.clone(), widget);
        Ok(())
    }

    fn ids(&self) -> Vec<String> {
        self.widgets.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_keep_insertion_order() {
        let mut widget = Widget::new("w1", "div");
        widget.set_attribute("style", "color:red");
        widget.set_attribute("class", "big");
        widget.set_attribute("style", "color:blue");

        let attributes: Vec<_> = widget.attributes().collect();
        assert_eq!(attributes, vec![("style", "color:blue"), ("class", "big")]);
        assert!(widget.remove_attribute("style"));
        assert!(!widget.remove_attribute("style"));
    }

    #[test]
    fn test_rename() {
        let mut store = InMemoryWidgets::new()
            .with(Widget::new("a", "div"))
            .with(Widget::new("b", "p"));

        assert!(store.rename("a", "b").is_err());
        store.rename("a", "c").unwrap();
        assert!(store.widget("a").is_none());
        assert_eq!(store.widget("c").unwrap().id(), "c");
        assert_eq!(store.ids(), vec!["b", "c"]);
    }

    #[test]
    fn test_render_type_text() {
        assert_eq!("Immediate".parse::<RenderType>().unwrap(), RenderType::Immediate);
        assert_eq!(RenderType::Closed.to_string(), "closed");
        assert!("sideways".parse::<RenderType>().is_err());
    }
}
