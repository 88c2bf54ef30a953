//! Schema to element compiler.
//!
//! [`Goat::build_content`] turns a schema value into a [`Node`] tree:
//!
//! - falsy leaves (`null`, `false`, `""`, `0`) become [`Node::Nothing`]
//! - strings, numbers and booleans are translated, formatted and keyed by a
//!   hash of their text; translated strings containing tags are parsed into
//!   elements
//! - arrays compile entry by entry
//! - objects without a `name` are maps of sections keyed by name
//! - objects with a `name` are sections, see [`Goat::build_section`]
//!
//! Nothing here returns an error. Unknown components fall back to the base
//! passthrough component and malformed props are handed to the component as is.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::class_list::ClassList;
use crate::components::value_text;
use crate::format::Formatter;
use crate::i18n::Translate;
use crate::markup::{self, Markup};
use crate::merge::{apply_mutation, deep_merge};
use crate::node::{Element, Node, Props, RenderContext, Text};
use crate::registry::{Registry, Wrapper};

/// Tag used when neither the instance nor the component names a wrapper
pub const DEFAULT_WRAPPER: &str = "section";

/// Marker class on wrappers in test mode
pub const TEST_CLASS: &str = "goat-test";

/// Style forced onto unwrapped sections in test mode
const TEST_BORDER: &str = "1px dashed #e83e8c";

/// Fields taken out of a section before the rest is passed on as props
const RESERVED_FIELDS: [&str; 12] = [
    "component",
    "content",
    "placeholder",
    "label",
    "message",
    "errorMessage",
    "managerName",
    "wrapper",
    "wrapperClasses",
    "wrapperStyle",
    "active",
    "name",
];

/// Compiled before the component sees them and passed as rendered props
const RENDERED_FIELDS: [&str; 4] = ["label", "placeholder", "message", "errorMessage"];

pub type Mutations<'a> = Box<dyn Fn(&str, &Props) -> Option<Props> + 'a>;

/// Constructor props of a compiler instance
#[derive(Debug, Clone, Default)]
pub struct GoatProps {
    /// Root name, the default `managerName` of every section
    pub name: String,
    /// Nodes appended to the section named by `children_in`
    pub children: Vec<Node>,
    pub children_in: Option<String>,
    /// Classes added to every wrapper
    pub wrapper_classes: ClassList,
    pub test: bool,
    pub location: Option<Value>,
    pub route_match: Option<Value>,
    pub navigate: Option<Value>,
}

impl GoatProps {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_children(mut self, children_in: impl Into<String>, children: Vec<Node>) -> Self {
        self.children_in = Some(children_in.into());
        self.children = children;
        self
    }

    pub fn with_wrapper_classes(mut self, classes: ClassList) -> Self {
        self.wrapper_classes = classes;
        self
    }

    pub fn test_mode(mut self, test: bool) -> Self {
        self.test = test;
        self
    }

    pub fn with_location(mut self, location: Value) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_route_match(mut self, route_match: Value) -> Self {
        self.route_match = Some(route_match);
        self
    }

    pub fn with_navigate(mut self, navigate: Value) -> Self {
        self.navigate = Some(navigate);
        self
    }
}

/// Input of [`Goat::build_content`]
#[derive(Debug, Clone)]
pub enum Content {
    Schema(Value),
    /// Already compiled; only keyed, never compiled again
    Rendered(Node),
}

impl From<Value> for Content {
    fn from(value: Value) -> Self {
        Content::Schema(value)
    }
}

impl From<&Value> for Content {
    fn from(value: &Value) -> Self {
        Content::Schema(value.clone())
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Schema(Value::String(text.to_string()))
    }
}

impl From<Node> for Content {
    fn from(node: Node) -> Self {
        Content::Rendered(node)
    }
}

impl From<Element> for Content {
    fn from(element: Element) -> Self {
        Content::Rendered(element.into())
    }
}

/// Enclosing sections of the value being compiled, innermost first.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'s> {
    pub name: &'s str,
    pub section: &'s Props,
    pub parent: Option<&'s Scope<'s>>,
}

impl<'s> Scope<'s> {
    pub fn names(&self) -> Vec<&'s str> {
        let mut names = vec![self.name];
        let mut current = self.parent;
        while let Some(scope) = current {
            names.push(scope.name);
            current = scope.parent;
        }
        names
    }

    pub fn depth(&self) -> usize {
        self.names().len()
    }
}

/// Outcome of the wrapper rules for one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WrapperDecision {
    Wrap(String),
    /// `false` at the instance or the component level
    Disabled,
    /// The component is in the wrapper-exclusion set
    Excluded,
    /// The section sets its own `tag`
    OwnTag,
}

impl WrapperDecision {
    pub fn tag(&self) -> Option<&str> {
        match self {
            WrapperDecision::Wrap(tag) => Some(tag),
            _ => None,
        }
    }
}

/// Wrapper rules, checked in this order: an explicit `false` at either level,
/// membership in the exclusion set, a `tag` on the section. Otherwise the
/// instance tag wins over the component tag, which wins over `section`.
pub fn decide_wrapper(instance: &Wrapper, component: &Wrapper, excluded: bool, own_tag: bool) -> WrapperDecision {
    if *instance == Wrapper::Disabled || *component == Wrapper::Disabled {
        return WrapperDecision::Disabled;
    }
    if excluded {
        return WrapperDecision::Excluded;
    }
    if own_tag {
        return WrapperDecision::OwnTag;
    }
    match (instance, component) {
        (Wrapper::Tag(tag), _) | (Wrapper::Unset, Wrapper::Tag(tag)) => WrapperDecision::Wrap(tag.clone()),
        _ => WrapperDecision::Wrap(DEFAULT_WRAPPER.to_string()),
    }
}

/// `name` of a section: a string, or an array of strings joined with `-`
pub fn section_name(section: &Map<String, Value>) -> Option<String> {
    joined_name(section.get("name")?)
}

fn joined_name(raw: &Value) -> Option<String> {
    match raw {
        Value::String(name) => Some(name.clone()),
        Value::Array(parts) => {
            let parts: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("-"))
            }
        }
        _ => None,
    }
}

/// Children go to the section whose full (joined) name is the target
fn name_matches(raw: Option<&Value>, target: &str) -> bool {
    raw.and_then(joined_name).is_some_and(|name| name == target)
}

pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

/// Stable key for a text node
pub fn text_key(text: &str) -> String {
    let hash = blake3::hash(text.as_bytes()).to_hex();
    format!("t-{}", &hash.as_str()[..12])
}

/// The compiler. Holds borrowed collaborators, so it is cheap to create per view.
pub struct Goat<'a> {
    registry: &'a Registry,
    props: GoatProps,
    mutations: Option<Mutations<'a>>,
    translator: Option<&'a dyn Translate>,
    formatter: Formatter,
}

impl<'a> Goat<'a> {
    pub fn new(registry: &'a Registry, props: GoatProps) -> Self {
        Self {
            registry,
            props,
            mutations: None,
            translator: None,
            formatter: Formatter::default(),
        }
    }

    /// Override hook called with the name and schema of every section
    pub fn with_mutations<F>(mut self, mutations: F) -> Self
    where
        F: Fn(&str, &Props) -> Option<Props> + 'a,
    {
        self.mutations = Some(Box::new(mutations));
        self
    }

    pub fn with_translator(mut self, translator: &'a dyn Translate) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn props(&self) -> &GoatProps {
        &self.props
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Render context matching this compiler's registry and test flag
    pub fn context(&self) -> RenderContext<'a> {
        RenderContext {
            registry: self.registry,
            viewport: None,
            test: self.props.test,
        }
    }

    pub fn build_content(&self, content: impl Into<Content>, index: Option<usize>) -> Node {
        match content.into() {
            Content::Schema(value) => self.build(&value, index, None),
            Content::Rendered(node) => keyed_rendered(node, index),
        }
    }

    /// Compile one named section outside any enclosing scope.
    pub fn build_section(&self, section: &Props, index: Option<usize>) -> Node {
        match section_name(section) {
            Some(name) => self.section(section, &name, index, None),
            None => self.build(&Value::Object(section.clone()), index, None),
        }
    }

    fn build(&self, value: &Value, index: Option<usize>, scope: Option<&Scope<'_>>) -> Node {
        if is_falsy(value) {
            return Node::Nothing;
        }
        match value {
            Value::Array(items) => Node::fragment(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.build(item, Some(i), scope))
                    .collect(),
            ),
            Value::Object(map) => match section_name(map) {
                Some(name) => self.section(map, &name, index, scope),
                None => self.sections_map(map, scope),
            },
            leaf => self.leaf(leaf, scope),
        }
    }

    fn sections_map(&self, map: &Map<String, Value>, scope: Option<&Scope<'_>>) -> Node {
        let children = map
            .iter()
            .enumerate()
            .map(|(i, (key, value))| {
                let section = match value {
                    Value::Object(fields) => {
                        let mut section = Map::new();
                        section.insert("name".into(), Value::String(key.clone()));
                        section.extend(fields.clone());
                        section
                    }
                    other => {
                        let mut fields = Map::new();
                        fields.insert("name".into(), Value::String(key.clone()));
                        fields.insert("content".into(), other.clone());
                        fields
                    }
                };
                let name = section_name(&section).unwrap_or_else(|| key.clone());
                self.section(&section, &name, Some(i), scope)
            })
            .collect();
        Node::fragment(children)
    }

    fn leaf(&self, value: &Value, scope: Option<&Scope<'_>>) -> Node {
        let translated = match value {
            Value::String(text) => self
                .translator
                .and_then(|t| t.translate(text))
                .map(Value::String),
            _ => None,
        };
        let value = translated.as_ref().unwrap_or(value);
        let text = self.formatter.format(value, scope.map(|s| s.section));

        if markup::contains_markup(&text) {
            let children = markup::parse(&text)
                .iter()
                .map(|m| self.markup_node(m))
                .collect();
            return Node::fragment(children).with_key_if_missing(text_key(&text));
        }
        Node::Text(Text {
            key: Some(text_key(&text)),
            value: text,
        })
    }

    fn markup_node(&self, markup: &Markup) -> Node {
        match markup {
            Markup::Text(text) => Node::text(text.clone()),
            Markup::Tag { name, attrs, children } => {
                let children: Vec<Node> = children.iter().map(|c| self.markup_node(c)).collect();
                let mut element = match markup::component_for(name) {
                    Some(component) => {
                        let descriptor = self.registry.resolve_or_default(Some(component)).into_descriptor();
                        let mut element = Element::component(descriptor);
                        element.props = markup::attrs_to_props(attrs);
                        self.add_ambient(&mut element.props);
                        element
                    }
                    None => {
                        let mut element = Element::host(name.clone());
                        element.props = markup::attrs_to_props(attrs);
                        element
                    }
                };
                element.children = children;
                element.into()
            }
        }
    }

    fn add_ambient(&self, props: &mut Props) {
        let ambient = [
            ("location", &self.props.location),
            ("match", &self.props.route_match),
            ("navigate", &self.props.navigate),
        ];
        for (key, value) in ambient {
            if let Some(value) = value {
                props.entry(key).or_insert_with(|| value.clone());
            }
        }
    }

    fn section(&self, node: &Props, name: &str, index: Option<usize>, parent: Option<&Scope<'_>>) -> Node {
        let overrides = self.mutations.as_ref().and_then(|mutate| mutate(name, node));
        let merged = apply_mutation(node, overrides.as_ref());
        if merged.get("active") == Some(&Value::Bool(false)) {
            debug!(section = name, "inactive, skipped");
            return Node::Nothing;
        }

        let mut section = merged;
        let raw_name = section.get("name").cloned();
        let requested = section.get("component").and_then(Value::as_str).map(str::to_string);
        let content = section.get("content").cloned();
        let instance_wrapper = Wrapper::from_value(section.get("wrapper"));
        let wrapper_classes = section.get("wrapperClasses").map(ClassList::from_value).unwrap_or_default();
        let wrapper_style = section.get("wrapperStyle").cloned();
        let manager_name = section
            .get("managerName")
            .cloned()
            .unwrap_or_else(|| Value::String(self.props.name.clone()));
        let sources: Vec<(&str, Value)> = RENDERED_FIELDS
            .iter()
            .filter_map(|field| section.get(*field).map(|v| (*field, v.clone())))
            .collect();
        for field in RESERVED_FIELDS {
            section.remove(field);
        }

        let resolution = self.registry.resolve_or_default(requested.as_deref());
        let descriptor = resolution.into_descriptor();
        let scope = Scope { name, section: &section, parent };

        let mut slots = Vec::new();
        for slot in &descriptor.slots {
            if let Some(raw) = section.get(slot.as_str()) {
                slots.push((slot.clone(), self.build(raw, None, Some(&scope))));
            }
        }
        let rendered_fields: Vec<(String, Node)> = sources
            .iter()
            .map(|(field, value)| (field.to_string(), self.build(value, None, Some(&scope))))
            .collect();

        let children: Vec<Node> = if descriptor.dont_build_content {
            Vec::new()
        } else {
            let receives_children = self
                .props
                .children_in
                .as_deref()
                .is_some_and(|target| name_matches(raw_name.as_ref(), target));
            let mut children = Vec::new();
            if let Some(content) = &content {
                children.push(self.build(content, None, Some(&scope)));
            }
            if receives_children {
                children.extend(self.props.children.iter().cloned());
            }
            children.retain(|c| !c.is_nothing());
            children
        };

        let own_tag = section.get("tag").is_some_and(|t| !t.is_null());
        let mut props = section;
        for (slot, _) in &slots {
            props.remove(slot);
        }
        props.insert("name".into(), Value::String(name.to_string()));
        props.insert("managerName".into(), manager_name);
        if descriptor.dont_build_content {
            if let Some(content) = content {
                props.insert("content".into(), content);
            }
        }
        self.add_ambient(&mut props);

        let excluded_name = requested.as_deref().unwrap_or(&descriptor.name);
        let decision = decide_wrapper(
            &instance_wrapper,
            &descriptor.wrapper,
            self.registry.is_wrapper_excluded(excluded_name),
            own_tag,
        );
        debug!(section = name, component = %descriptor.name, ?decision, "compiled section");

        if self.props.test && decision.tag().is_none() {
            let mut style = props.get("style").cloned().filter(Value::is_object).unwrap_or_else(|| json!({}));
            deep_merge(&mut style, &json!({ "border": TEST_BORDER }));
            props.insert("style".into(), style);
        }

        let mut element = Element::component(descriptor).key(name);
        element.props = props;
        element.rendered.extend(slots);
        element.rendered.extend(rendered_fields);
        element.children = children;

        let Some(tag) = decision.tag() else {
            return element.into();
        };

        let mut classes = ClassList::new();
        classes.add(&format!("{name}-section"));
        if self.props.test {
            classes.add(TEST_CLASS);
        }
        classes.extend(self.props.wrapper_classes.clone());
        classes.extend(wrapper_classes);

        let mut style = json!({ "--section-name": name });
        if let Some(extra) = wrapper_style.as_ref().filter(|s| s.is_object()) {
            deep_merge(&mut style, extra);
        }

        Element::host(tag)
            .key(format!("{name}-wrapper"))
            .class(&classes)
            .prop("style", style)
            .child(element.into())
            .into()
    }
}

/// Key an already rendered node by its `name` prop, else by its index.
fn keyed_rendered(node: Node, index: Option<usize>) -> Node {
    if node.key().is_some() {
        return node;
    }
    let key = node
        .as_element()
        .and_then(|e| e.props.get("name"))
        .map(value_text)
        .filter(|name| !name.is_empty())
        .or_else(|| index.map(|i| i.to_string()));
    match key {
        Some(key) => node.with_key_if_missing(key),
        None => node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{expand, find_element};

    fn goat(registry: &Registry) -> Goat<'_> {
        Goat::new(registry, GoatProps::new("root"))
    }

    #[test]
    fn test_falsy_values_build_nothing() {
        let registry = Registry::with_builtins();
        let g = goat(&registry);
        for value in [Value::Null, json!(false), json!(""), json!(0)] {
            assert!(g.build_content(value, None).is_nothing());
        }
        assert!(!g.build_content(json!(1), None).is_nothing());
    }

    #[test]
    fn test_text_keys_are_stable() {
        let registry = Registry::with_builtins();
        let g = goat(&registry);
        let a = g.build_content("Same", None);
        let b = g.build_content("Same", Some(4));
        assert_eq!(a.key(), b.key());
        assert!(a.key().unwrap().starts_with("t-"));
        assert_ne!(a.key(), g.build_content("Other", None).key());
    }

    #[test]
    fn test_decide_wrapper_precedence() {
        let tag = |t: &str| Wrapper::Tag(t.to_string());
        assert_eq!(decide_wrapper(&Wrapper::Unset, &Wrapper::Unset, false, false), WrapperDecision::Wrap("section".into()));
        assert_eq!(decide_wrapper(&tag("article"), &tag("div"), false, false), WrapperDecision::Wrap("article".into()));
        assert_eq!(decide_wrapper(&Wrapper::Unset, &tag("div"), false, false), WrapperDecision::Wrap("div".into()));
        assert_eq!(decide_wrapper(&Wrapper::Disabled, &tag("div"), false, false), WrapperDecision::Disabled);
        assert_eq!(decide_wrapper(&tag("div"), &Wrapper::Disabled, false, false), WrapperDecision::Disabled);
        assert_eq!(decide_wrapper(&Wrapper::Disabled, &Wrapper::Unset, true, true), WrapperDecision::Disabled);
        assert_eq!(decide_wrapper(&tag("div"), &Wrapper::Unset, true, true), WrapperDecision::Excluded);
        assert_eq!(decide_wrapper(&tag("div"), &Wrapper::Unset, false, true), WrapperDecision::OwnTag);
    }

    #[test]
    fn test_section_name_joins_arrays() {
        let map = json!({"name": ["card", "header"]});
        assert_eq!(section_name(map.as_object().unwrap()).as_deref(), Some("card-header"));
        let map = json!({"name": 3});
        assert_eq!(section_name(map.as_object().unwrap()), None);
    }

    #[test]
    fn test_map_of_sections() {
        let registry = Registry::with_builtins();
        let g = goat(&registry);
        let node = g.build_content(json!({"title": "Hi", "body": {"content": "There"}}), None);
        let Node::Fragment(fragment) = &node else { panic!("expected fragment") };
        assert_eq!(fragment.children.len(), 2);
        let first = fragment.children[0].as_element().unwrap();
        assert_eq!(first.tag(), "section");
        assert!(first.classes().contains("title-section"));
        assert_eq!(node.text_content(), "HiThere");
    }

    #[test]
    fn test_map_entry_keeps_its_own_name() {
        let registry = Registry::with_builtins();
        let g = goat(&registry);
        let node = g.build_content(json!({"slot": {"name": "hero", "content": "Hi"}}), None);
        let Node::Fragment(fragment) = &node else { panic!("expected fragment") };
        let wrapper = fragment.children[0].as_element().unwrap();
        assert!(wrapper.classes().contains("hero-section"));
        assert!(!wrapper.classes().contains("slot-section"));
    }

    #[test]
    fn test_wrapper_classes_and_style() {
        let registry = Registry::with_builtins();
        let g = Goat::new(
            &registry,
            GoatProps::new("root").with_wrapper_classes(ClassList::parse("root-w")).test_mode(true),
        );
        let node = g.build_content(
            json!({"name": "hero", "content": "x", "wrapper": "header",
                   "wrapperClasses": "own", "wrapperStyle": {"padding": 4}}),
            None,
        );
        let wrapper = node.as_element().unwrap();
        assert_eq!(wrapper.tag(), "header");
        assert_eq!(wrapper.classes().to_string(), "hero-section goat-test root-w own");
        assert_eq!(wrapper.props["style"], json!({"--section-name": "hero", "padding": 4}));
        let inner = wrapper.children[0].as_element().unwrap();
        assert!(inner.props.get("wrapperClasses").is_none());
        assert_eq!(inner.props["managerName"], json!("root"));
    }

    #[test]
    fn test_slots_and_rendered_fields() {
        let registry = Registry::with_builtins();
        let g = goat(&registry);
        let node = g.build_content(
            json!({"name": "c", "component": "Card", "header": "Top", "label": "Lbl", "content": "Mid"}),
            None,
        );
        let card = find_element(&node, "Card").unwrap();
        assert!(card.props.get("header").is_none());
        assert_eq!(card.rendered("header").unwrap().text_content(), "Top");
        assert_eq!(card.rendered("label").unwrap().text_content(), "Lbl");
        let expanded = expand(&node, &g.context());
        assert_eq!(expanded.text_content(), "TopMid");
    }

    #[test]
    fn test_dont_build_content_passes_raw() {
        let registry = Registry::with_builtins();
        let g = goat(&registry);
        let raw = json!({"columns": ["A"], "rows": [["1"]]});
        let node = g.build_content(json!({"name": "t", "component": "Table", "content": raw.clone()}), None);
        let table = find_element(&node, "Table").unwrap();
        assert_eq!(table.props["content"], raw);
        assert!(table.children.is_empty());
    }

    #[test]
    fn test_children_in_target() {
        let registry = Registry::with_builtins();
        let g = Goat::new(
            &registry,
            GoatProps::new("root").with_children("body", vec![Node::text("extra")]),
        );
        let node = g.build_content(
            json!([
                {"name": ["page", "body"], "content": "own"},
                {"name": "footer", "content": "foot"},
                {"name": "body"}
            ]),
            None,
        );
        let expanded = expand(&node, &g.context());
        assert_eq!(expanded.text_content(), "ownfootextra");

        let joined = Goat::new(
            &registry,
            GoatProps::new("root").with_children("page-body", vec![Node::text("extra")]),
        );
        let node = joined.build_content(json!({"name": ["page", "body"], "content": "own"}), None);
        assert_eq!(expand(&node, &joined.context()).text_content(), "ownextra");
    }

    #[test]
    fn test_rendered_content_is_keyed_not_rebuilt() {
        let registry = Registry::with_builtins();
        let g = goat(&registry);
        let element = Element::host("span").prop("name", "tag");
        assert_eq!(g.build_content(element, Some(2)).key(), Some("tag"));
        assert_eq!(g.build_content(Element::host("span"), Some(2)).key(), Some("2"));
    }

    #[test]
    fn test_translated_markup_becomes_components() {
        let registry = Registry::with_builtins();
        let translate = |text: &str| (text == "terms").then(|| r#"Read <a href="/t">these</a>"#.to_string());
        let g = goat(&registry).with_translator(&translate);
        let node = g.build_content("terms", None);
        let link = find_element(&node, "Link").unwrap();
        assert_eq!(link.str_prop("href"), Some("/t"));
        let expanded = expand(&node, &g.context());
        assert_eq!(find_element(&expanded, "a").unwrap().str_prop("href"), Some("/t"));
        assert_eq!(expanded.text_content(), "Read these");
    }

    #[test]
    fn test_nearest_section_formats_leaves() {
        let registry = Registry::with_builtins();
        let g = goat(&registry);
        let node = g.build_content(
            json!({"name": "price", "format": "currency", "content": {"name": "inner", "content": 1234}}),
            None,
        );
        assert_eq!(node.text_content(), "1234");
        let node = g.build_content(json!({"name": "price", "format": "currency", "content": 1234}), None);
        assert_eq!(node.text_content(), "$1,234.00");
    }

    #[test]
    fn test_ambient_routing_props() {
        let registry = Registry::with_builtins();
        let g = Goat::new(&registry, GoatProps::new("root").with_location(json!({"pathname": "/a"})));
        let node = g.build_content(json!({"name": "nav", "component": "NavLink", "to": "/a", "content": "A"}), None);
        let expanded = expand(&node, &g.context());
        assert!(find_element(&expanded, "a").unwrap().classes().contains("active"));
    }

    #[test]
    fn test_scope_names() {
        let outer_props = Props::new();
        let inner_props = Props::new();
        let outer = Scope { name: "outer", section: &outer_props, parent: None };
        let inner = Scope { name: "inner", section: &inner_props, parent: Some(&outer) };
        assert_eq!(inner.names(), vec!["inner", "outer"]);
        assert_eq!(inner.depth(), 2);
    }
}
