//! Inline markup found in translated strings.
//!
//! Text such as `Read the <a href="/terms">terms</a>` is split into text and
//! tag nodes. The scanner is tolerant: closing tags without an opener are
//! dropped and unclosed tags are closed at the end of the input.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::class_list::ClassList;
use crate::node::{Element, Node, Props};

const VOID_TAGS: [&str; 8] = ["br", "hr", "img", "input", "meta", "link", "source", "wbr"];

#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Text(String),
    Tag {
        name: String,
        attrs: Props,
        children: Vec<Markup>,
    },
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(
            r#"<(/)?([A-Za-z][A-Za-z0-9:-]*)((?:\s+[^\s=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*(/)?>"#,
        )
        .expect("tag pattern is valid")
    })
}

fn attr_regex() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(r#"([^\s=/>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("attribute pattern is valid")
    })
}

/// Registry component standing in for a markup tag
pub fn component_for(tag: &str) -> Option<&'static str> {
    match tag.to_ascii_lowercase().as_str() {
        "a" => Some("Link"),
        "navlink" => Some("NavLink"),
        "icons" => Some("Icons"),
        "input" => Some("Field"),
        "select" => Some("SelectField"),
        "textarea" => Some("TextareaField"),
        _ => None,
    }
}

pub fn contains_markup(text: &str) -> bool {
    text.contains('<') && tag_regex().is_match(text)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

fn parse_attrs(source: &str) -> Props {
    let mut attrs = Props::new();
    for caps in attr_regex().captures_iter(source) {
        let name = caps[1].to_string();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| Value::String(decode_entities(m.as_str())))
            .unwrap_or(Value::Bool(true));
        attrs.insert(name, value);
    }
    attrs
}

struct Frame {
    name: String,
    attrs: Props,
    children: Vec<Markup>,
}

impl Frame {
    fn close(self) -> Markup {
        Markup::Tag {
            name: self.name,
            attrs: self.attrs,
            children: self.children,
        }
    }
}

fn push(stack: &mut [Frame], root: &mut Vec<Markup>, node: Markup) {
    match stack.last_mut() {
        Some(frame) => frame.children.push(node),
        None => root.push(node),
    }
}

/// Split `source` into text and tag nodes.
pub fn parse(source: &str) -> Vec<Markup> {
    let mut root = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut last = 0;

    for caps in tag_regex().captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            let text = decode_entities(&source[last..whole.start()]);
            push(&mut stack, &mut root, Markup::Text(text));
        }
        last = whole.end();

        let name = caps[2].to_string();
        if caps.get(1).is_some() {
            let Some(open) = stack.iter().rposition(|f| f.name.eq_ignore_ascii_case(&name)) else {
                continue;
            };
            while stack.len() > open {
                if let Some(frame) = stack.pop() {
                    let node = frame.close();
                    push(&mut stack, &mut root, node);
                }
            }
            continue;
        }

        let attrs = caps.get(3).map(|m| parse_attrs(m.as_str())).unwrap_or_default();
        let self_closing = caps.get(4).is_some() || VOID_TAGS.contains(&name.to_ascii_lowercase().as_str());
        if self_closing {
            push(&mut stack, &mut root, Markup::Tag { name, attrs, children: Vec::new() });
        } else {
            stack.push(Frame { name, attrs, children: Vec::new() });
        }
    }

    if last < source.len() {
        let text = decode_entities(&source[last..]);
        push(&mut stack, &mut root, Markup::Text(text));
    }
    while let Some(frame) = stack.pop() {
        let node = frame.close();
        push(&mut stack, &mut root, node);
    }
    root
}

/// Attributes as element props; `class` becomes `classes`
pub fn attrs_to_props(attrs: &Props) -> Props {
    let mut props = Props::new();
    for (key, value) in attrs {
        if key == "class" || key == "className" {
            props.insert("classes".into(), ClassList::from_value(value).to_value());
        } else {
            props.insert(key.clone(), value.clone());
        }
    }
    props
}

/// Convert markup to plain host elements, without registry lookups
pub fn to_host_node(markup: &Markup) -> Node {
    match markup {
        Markup::Text(text) => Node::text(text.clone()),
        Markup::Tag { name, attrs, children } => {
            let mut element = Element::host(name.clone()).children(children.iter().map(to_host_node));
            element.props = attrs_to_props(attrs);
            element.into()
        }
    }
}
