//! HTML serialization of expanded node trees.

use serde_json::{Map, Value};
use std::fmt::Write;

use crate::class_list::ClassList;
use crate::node::{expand, Element, Node, RenderContext};

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Numeric style values without an implied `px`
const UNITLESS: [&str; 16] = [
    "opacity",
    "zIndex",
    "flex",
    "flexGrow",
    "flexShrink",
    "fontWeight",
    "lineHeight",
    "order",
    "zoom",
    "columnCount",
    "gridRow",
    "gridColumn",
    "gridRowStart",
    "gridColumnStart",
    "tabSize",
    "orphans",
];

/// Expand `node` and serialize it on one line.
pub fn to_html(node: &Node, ctx: &RenderContext<'_>) -> String {
    let mut out = String::new();
    write_node(&expand(node, ctx), None, &mut out);
    out
}

/// Expand `node` and serialize it with one element or text per line,
/// indented by depth. Used for diffs.
pub fn to_html_pretty(node: &Node, ctx: &RenderContext<'_>) -> String {
    let mut out = String::new();
    write_node(&expand(node, ctx), Some(0), &mut out);
    out
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attr(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}

/// `fontSize` -> `font-size`; custom properties are kept as written
pub fn css_property(name: &str) -> String {
    if name.starts_with("--") {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Inline CSS for a style map
pub fn style_to_css(style: &Map<String, Value>) -> String {
    let mut parts = Vec::with_capacity(style.len());
    for (name, value) in style {
        let value = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) if n.as_f64() == Some(0.0) => "0".to_string(),
            Value::Number(n) if UNITLESS.contains(&name.as_str()) || name.starts_with("--") => n.to_string(),
            Value::Number(n) => format!("{n}px"),
            _ => continue,
        };
        parts.push(format!("{}: {}", css_property(name), value));
    }
    parts.join("; ")
}

fn attributes(element: &Element) -> String {
    let mut out = String::new();

    let mut classes = element.classes();
    if let Some(class_name) = element.props.get("className") {
        classes.extend(ClassList::from_value(class_name));
    }
    if !classes.is_empty() {
        let _ = write!(out, " class=\"{}\"", escape_attr(&classes.to_string()));
    }

    for (name, value) in &element.props {
        match name.as_str() {
            "classes" | "className" | "key" | "children" => continue,
            "style" => {
                if let Value::Object(style) = value {
                    let css = style_to_css(style);
                    if !css.is_empty() {
                        let _ = write!(out, " style=\"{}\"", escape_attr(&css));
                    }
                }
                continue;
            }
            _ => {}
        }
        match value {
            Value::Bool(true) => {
                let _ = write!(out, " {name}");
            }
            Value::String(s) => {
                let _ = write!(out, " {name}=\"{}\"", escape_attr(s));
            }
            Value::Number(n) => {
                let _ = write!(out, " {name}=\"{n}\"");
            }
            _ => {}
        }
    }
    out
}

fn newline(indent: Option<usize>, out: &mut String) {
    if let Some(depth) = indent {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&"  ".repeat(depth));
    }
}

fn write_node(node: &Node, indent: Option<usize>, out: &mut String) {
    match node {
        Node::Nothing => {}
        Node::Text(text) => {
            if text.value.is_empty() {
                return;
            }
            newline(indent, out);
            out.push_str(&escape_text(&text.value));
        }
        Node::Fragment(fragment) => {
            for child in &fragment.children {
                write_node(child, indent, out);
            }
        }
        Node::Element(element) => {
            let tag = element.tag();
            newline(indent, out);
            let _ = write!(out, "<{tag}{}", attributes(element));
            if VOID_ELEMENTS.contains(&tag) {
                out.push_str(" />");
                return;
            }
            out.push('>');
            let inner = indent.map(|d| d + 1);
            for child in &element.children {
                write_node(child, inner, out);
            }
            if !element.children.iter().all(Node::is_nothing) {
                newline(indent, out);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}
