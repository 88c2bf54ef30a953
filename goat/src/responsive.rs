//! Breakpoint-keyed overrides.
//!
//! A section may carry overrides keyed by breakpoint name:
//!
//! ```json
//! {"name": "grid", "columns": 1, "md": {"columns": 2}, "xl": {"columns": 4}}
//! ```
//!
//! Overrides cascade mobile first: every breakpoint up to and including the
//! active one is applied in table order, using the mutation merge policy.

use serde_json::Value;

use crate::breakpoints::BreakpointTable;
use crate::compiler::{Content, Goat};
use crate::container::Container;
use crate::merge::apply_mutation;
use crate::node::{Node, Props};

/// Props of one section with the overrides for `breakpoint` applied and
/// every breakpoint key removed.
pub fn responsive_props(props: &Props, table: &BreakpointTable, breakpoint: &str) -> Props {
    let mut merged = props.clone();
    for name in table.names() {
        merged.remove(name);
    }
    for name in table.up_to(breakpoint) {
        if let Some(Value::Object(overrides)) = props.get(name) {
            merged = apply_mutation(&merged, Some(overrides));
        }
    }
    merged
}

/// Apply [`responsive_props`] to every section of a schema tree.
pub fn apply_breakpoint(schema: &Value, table: &BreakpointTable, breakpoint: &str) -> Value {
    match schema {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| apply_breakpoint(item, table, breakpoint))
                .collect(),
        ),
        Value::Object(map) => {
            let props = if map.contains_key("name") || map.contains_key("component") {
                responsive_props(map, table, breakpoint)
            } else {
                map.clone()
            };
            Value::Object(
                props
                    .into_iter()
                    .map(|(key, value)| {
                        let value = apply_breakpoint(&value, table, breakpoint);
                        (key, value)
                    })
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

/// A schema view rendered inside a [`Container`], recompiled for its breakpoint.
#[derive(Debug)]
pub struct ResponsiveView {
    container: Container,
    view: Value,
}

impl ResponsiveView {
    pub fn new(container: Container, view: Value) -> Self {
        Self { container, view }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn view(&self) -> &Value {
        &self.view
    }

    pub fn set_view(&mut self, view: Value) {
        self.view = view;
    }

    /// The loading placeholder until measured, then the compiled view.
    pub fn render(&self, goat: &Goat<'_>) -> Node {
        let Some(breakpoint) = self.container.breakpoint() else {
            return self.container.render(Node::Nothing);
        };
        let schema = apply_breakpoint(&self.view, self.container.breakpoints(), &breakpoint);
        self.container
            .render(goat.build_content(Content::Schema(schema), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoints::Size;
    use crate::bus::EventBus;
    use crate::compiler::GoatProps;
    use crate::container::ContainerOptions;
    use crate::registry::Registry;
    use serde_json::json;

    fn table() -> BreakpointTable {
        BreakpointTable::new([("xs", 0), ("md", 768), ("xl", 1200)])
    }

    #[test]
    fn test_cascade_up_to_active() {
        let props = json!({"name": "g", "columns": 1, "style": {"gap": 4, "color": "red"},
                           "md": {"columns": 2, "style": {"gap": 8}}, "xl": {"columns": 4}});
        let props = props.as_object().unwrap();

        let xs = responsive_props(props, &table(), "xs");
        assert_eq!(xs["columns"], json!(1));
        assert!(xs.get("md").is_none());

        let md = responsive_props(props, &table(), "md");
        assert_eq!(md["columns"], json!(2));
        assert_eq!(md["style"], json!({"gap": 8, "color": "red"}));

        let xl = responsive_props(props, &table(), "xl");
        assert_eq!(xl["columns"], json!(4));
    }

    #[test]
    fn test_apply_breakpoint_recurses_into_content() {
        let schema = json!({"name": "outer", "content": [
            {"name": "a", "content": "small", "md": {"content": "big"}}
        ]});
        let out = apply_breakpoint(&schema, &table(), "md");
        assert_eq!(out["content"][0]["content"], json!("big"));
        assert!(out["content"][0].get("md").is_none());
    }

    #[test]
    fn test_responsive_view_renders_after_mount() {
        let registry = Registry::with_builtins();
        let goat = Goat::new(&registry, GoatProps::new("app"));
        let container = Container::new(
            ContainerOptions::new("main").with_breakpoints(table()),
            EventBus::new(),
        );
        let view = ResponsiveView::new(container, json!({"name": "t", "content": "narrow", "xl": {"content": "wide"}}));

        assert_eq!(view.render(&goat).text_content(), "");
        view.container().mount(Size::new(1300, 800));
        assert_eq!(view.render(&goat).text_content(), "wide");
        view.container().mount(Size::new(500, 800));
        assert_eq!(view.render(&goat).text_content(), "narrow");
    }
}
