//! Widget property keywords
//!
//! The value of the keyword node resolves to widget ids; its named children
//! are the properties to read, write or delete. A `\` in front of a name
//! escapes attribute names that would otherwise be taken as keywords.

use super::{arguments, remove_arguments};
use crate::convert::to_bool;
use crate::errors::{LambdaError, Result};
use crate::executor::context::Context;
use crate::expression;
use crate::tree::{NodeId, Tree, Value};
use crate::widgets::{RenderType, Widget, BUILT_IN_PROPERTIES};

/// `get-widget-property`
///
/// Results are added as `<widget-id>` children holding one child per
/// requested property. Attributes a widget does not have produce no node.
pub fn get_widget_property(ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let ids = expression::strings(tree, node)?;
    let args = arguments(tree, node);
    let requested: Vec<String> = property_names(tree, &args);

    let mut results = Vec::new();
    for id in &ids {
        let widget = find_widget(ctx, tree, node, id)?;
        for name in &requested {
            if let Some(value) = read_property(widget, name) {
                results.push((id.clone(), name.clone(), value));
            }
        }
    }

    remove_arguments(tree, node, args);
    for (id, name, value) in results {
        let holder = find_or_create(tree, node, &id);
        tree.add(holder, name, value);
    }
    Ok(())
}

/// `set-widget-property`
///
/// Child values are resolved as expressions. Setting `id` renames the widget.
pub fn set_widget_property(ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let ids = expression::strings(tree, node)?;

    let mut assignments = Vec::new();
    for child in arguments(tree, node) {
        let name = tree.name(child).to_string();
        if name.is_empty() {
            continue;
        }
        let value = expression::single_value(tree, child)?;
        assignments.push((child, name, value));
    }

    for id in ids {
        find_widget(ctx, tree, node, &id)?;
        let mut current_id = id;
        for (child, name, value) in &assignments {
            let text = value
                .as_ref()
                .map(|v| ctx.converter().to_display(tree, v, false))
                .unwrap_or_default();
            let flag = value.as_ref().map(to_bool).unwrap_or(false);

            if name == "id" {
                ctx.widgets_mut()
                    .rename(&current_id, &text)
                    .map_err(|message| LambdaError::execution(tree, *child, message))?;
                current_id = text;
                continue;
            }

            let render_type = if name == "render-type" {
                Some(
                    text.parse::<RenderType>()
                        .map_err(|message| LambdaError::execution(tree, *child, message))?,
                )
            } else {
                None
            };

            let Some(widget) = ctx.widgets_mut().widget_mut(&current_id) else {
                return Err(LambdaError::execution(
                    tree,
                    node,
                    format!("no widget with id '{}'", current_id),
                ));
            };
            match name.as_str() {
                "visible" => widget.visible = flag,
                "invisible-element" => widget.invisible_element = text,
                "element" => widget.element = text,
                "has-id" => widget.has_id = flag,
                "render-type" => {
                    if let Some(render_type) = render_type {
                        widget.render_type = render_type;
                    }
                }
                _ => widget.set_attribute(unescape(name), text),
            }
        }
    }
    Ok(())
}

/// `delete-widget-property`
///
/// Built-in properties cannot be deleted.
pub fn delete_widget_property(ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    if tree.value(node).is_none() || tree.child_count(node) == 0 {
        return Ok(());
    }

    let ids = expression::strings(tree, node)?;
    let args = arguments(tree, node);
    let names = property_names(tree, &args);

    if let Some(name) = names.iter().find(|n| BUILT_IN_PROPERTIES.contains(&n.as_str())) {
        return Err(LambdaError::execution(
            tree,
            node,
            format!("cannot remove property '{}' of widget", name),
        ));
    }

    for id in ids {
        find_widget(ctx, tree, node, &id)?;
        if let Some(widget) = ctx.widgets_mut().widget_mut(&id) {
            for name in &names {
                widget.remove_attribute(unescape(name));
            }
        }
    }
    Ok(())
}

/// `list-widget-properties`
///
/// Adds one `<widget-id>` child per widget listing the built-in properties
/// that differ from their defaults, the element, and every attribute.
pub fn list_widget_properties(ctx: &mut Context, tree: &mut Tree, node: NodeId) -> Result<()> {
    let ids = expression::strings(tree, node)?;
    let args = arguments(tree, node);

    let mut listings = Vec::new();
    for id in &ids {
        let widget = find_widget(ctx, tree, node, id)?;
        listings.push((id.clone(), list_properties(widget)));
    }

    remove_arguments(tree, node, args);
    for (id, properties) in listings {
        let holder = tree.add(node, id, None);
        for (name, value) in properties {
            tree.add(holder, name, value);
        }
    }
    Ok(())
}

/* ===================== Helpers ===================== */

fn find_widget<'a>(
    ctx: &'a Context,
    tree: &Tree,
    node: NodeId,
    id: &str,
) -> Result<&'a Widget> {
    ctx.widgets()
        .widget(id)
        .ok_or_else(|| LambdaError::execution(tree, node, format!("no widget with id '{}'", id)))
}

fn property_names(tree: &Tree, args: &[NodeId]) -> Vec<String> {
    args.iter()
        .map(|arg| tree.name(*arg))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn unescape(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

fn read_property(widget: &Widget, name: &str) -> Option<Value> {
    match name {
        "visible" => Some(Value::Bool(widget.visible)),
        "invisible-element" => Some(Value::Str(widget.invisible_element.clone())),
        "element" => Some(Value::Str(widget.element.clone())),
        "has-id" => Some(Value::Bool(widget.has_id)),
        "render-type" => Some(Value::Str(widget.render_type.to_string())),
        _ => widget
            .attribute(unescape(name))
            .map(|value| Value::Str(value.to_string())),
    }
}

fn list_properties(widget: &Widget) -> Vec<(String, Value)> {
    let mut properties = Vec::new();
    if !widget.visible {
        properties.push(("visible".to_string(), Value::Bool(false)));
    }
    properties.push(("element".to_string(), Value::Str(widget.element.clone())));
    if !widget.has_id {
        properties.push(("has-id".to_string(), Value::Bool(false)));
    }
    if widget.render_type != RenderType::Normal {
        properties.push((
            "render-type".to_string(),
            Value::Str(widget.render_type.to_string()),
        ));
    }
    for (name, value) in widget.attributes() {
        // server side event bindings are not properties
        let event = (name.starts_with("on") || name.starts_with("_on"))
            && value == "common_event_handler";
        if !event {
            properties.push((name.to_string(), Value::Str(value.to_string())));
        }
    }
    properties
}

fn find_or_create(tree: &mut Tree, parent: NodeId, name: &str) -> NodeId {
    match tree.child_named(parent, name) {
        Some(existing) => existing,
        None => tree.add(parent, name, None),
    }
}
