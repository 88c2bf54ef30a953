// Schema traversal in compile order. Used by the CLI `inspect` command.

use serde_json::{Map, Value};

use crate::compiler::{is_falsy, section_name};
use crate::registry::DEFAULT_COMPONENT;

/// Sub-schema fields visited besides `content`, in compile order
const NESTED_FIELDS: [&str; 4] = ["label", "placeholder", "message", "errorMessage"];

pub trait SchemaVisitor {
    fn visit_section(&mut self, path: &str, name: &str, section: &Map<String, Value>) {
        walk_section(self, path, name, section);
    }

    fn visit_text(&mut self, _path: &str, _value: &Value) {}
}

/// Visit every section and text leaf of `schema`.
pub fn walk<V: SchemaVisitor + ?Sized>(visitor: &mut V, schema: &Value) {
    walk_value(visitor, "", schema);
}

fn join(path: &str, part: &str) -> String {
    if path.is_empty() {
        part.to_string()
    } else {
        format!("{path}/{part}")
    }
}

fn walk_value<V: SchemaVisitor + ?Sized>(visitor: &mut V, path: &str, value: &Value) {
    if is_falsy(value) {
        return;
    }
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk_value(visitor, &join(path, &i.to_string()), item);
            }
        }
        Value::Object(map) => match section_name(map) {
            Some(name) => visitor.visit_section(path, &name, map),
            None => {
                for (key, item) in map {
                    let item_path = join(path, key);
                    match item {
                        Value::Object(fields) => {
                            let name = section_name(fields).unwrap_or_else(|| key.clone());
                            visitor.visit_section(&item_path, &name, fields)
                        }
                        other => {
                            let mut section = Map::new();
                            section.insert("name".into(), Value::String(key.clone()));
                            section.insert("content".into(), other.clone());
                            visitor.visit_section(&item_path, key, &section);
                        }
                    }
                }
            }
        },
        leaf => visitor.visit_text(path, leaf),
    }
}

/// Default traversal of a section's nested schemas
pub fn walk_section<V: SchemaVisitor + ?Sized>(visitor: &mut V, path: &str, _name: &str, section: &Map<String, Value>) {
    for field in NESTED_FIELDS {
        if let Some(value) = section.get(field) {
            walk_value(visitor, &join(path, field), value);
        }
    }
    if let Some(content) = section.get("content") {
        walk_value(visitor, &join(path, "content"), content);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionMatch {
    pub name: String,
    pub component: String,
    pub path: String,
    pub active: bool,
}

/// Collects sections, optionally only those of one component
#[derive(Debug, Default)]
pub struct SectionFinder {
    pub component: Option<String>,
    pub matches: Vec<SectionMatch>,
}

impl SectionFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_component(component: impl Into<String>) -> Self {
        Self {
            component: Some(component.into()),
            matches: Vec::new(),
        }
    }
}

impl SchemaVisitor for SectionFinder {
    fn visit_section(&mut self, path: &str, name: &str, section: &Map<String, Value>) {
        let component = section
            .get("component")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_COMPONENT);
        if self.component.as_deref().map_or(true, |c| c == component) {
            self.matches.push(SectionMatch {
                name: name.to_string(),
                component: component.to_string(),
                path: if path.is_empty() { "/".into() } else { path.to_string() },
                active: section.get("active") != Some(&Value::Bool(false)),
            });
        }
        walk_section(self, path, name, section);
    }
}

/// Counts text leaves
#[derive(Debug, Default)]
pub struct TextCounter {
    pub count: usize,
}

impl SchemaVisitor for TextCounter {
    fn visit_text(&mut self, _path: &str, _value: &Value) {
        self.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "name": "page",
            "content": [
                {"name": "title", "content": "Hello"},
                {"name": "nav", "component": "NavLink", "to": "/", "content": "Home"},
                {"name": "form", "component": "Form", "content": {
                    "email": {"component": "Field", "label": "Email"},
                    "note": "Plain"
                }}
            ]
        })
    }

    #[test]
    fn test_finder_collects_in_compile_order() {
        let mut finder = SectionFinder::new();
        walk(&mut finder, &schema());
        let names: Vec<&str> = finder.matches.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["page", "title", "nav", "form", "email", "note"]);
        assert_eq!(finder.matches[0].path, "/");
        assert_eq!(finder.matches[4].path, "content/2/content/email");
    }

    #[test]
    fn test_finder_filters_by_component() {
        let mut finder = SectionFinder::for_component("NavLink");
        walk(&mut finder, &schema());
        assert_eq!(finder.matches.len(), 1);
        assert_eq!(finder.matches[0].name, "nav");
    }

    #[test]
    fn test_text_counter() {
        let mut counter = TextCounter::default();
        walk(&mut counter, &schema());
        // Hello, Home, Email, Plain
        assert_eq!(counter.count, 4);
    }
}
