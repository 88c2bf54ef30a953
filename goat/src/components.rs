//! Built-in components.
//!
//! These are thin: they forward props onto host elements. Anything with real
//! behavior (breakpoints, compilation) lives in its own module.

use serde_json::{json, Value};

use crate::breakpoints::{BreakpointTable, Orientation};
use crate::class_list::ClassList;
use crate::markup;
use crate::node::{Element, Node, RenderContext};
use crate::registry::{ComponentDescriptor, Registry, Wrapper, DEFAULT_COMPONENT};

/// Components that never get an automatic section wrapper
pub const DEFAULT_WRAPPER_EXCLUSIONS: [&str; 6] = ["Action", "Icons", "Image", "Link", "NavLink", "Svg"];

/// Props that make the passthrough component render its own tag
const HOST_PROPS: [&str; 6] = ["tag", "classes", "className", "style", "id", "_props"];

const FIELD_ATTRS: [&str; 10] = [
    "value", "required", "disabled", "readOnly", "min", "max", "step", "pattern", "autoComplete", "multiple",
];

pub fn base_component() -> ComponentDescriptor {
    ComponentDescriptor::new(DEFAULT_COMPONENT, render_component)
}

/// Seed a registry with every built-in.
pub fn install(registry: &mut Registry) {
    registry.add_components([
        base_component(),
        ComponentDescriptor::new("Action", render_action),
        ComponentDescriptor::new("Card", render_card).with_slots(["header", "footer"]),
        ComponentDescriptor::new("Table", render_table).dont_build_content(),
        ComponentDescriptor::new("Icons", render_icons),
        ComponentDescriptor::new("ErrorView", render_error_view).with_wrapper(Wrapper::Disabled),
        ComponentDescriptor::new("Chart", render_chart),
    ]);
    registry.add_containers([
        ComponentDescriptor::new("Container", render_container),
        ComponentDescriptor::new("FlexContainer", render_flex_container),
        ComponentDescriptor::new("GridContainer", render_grid_container),
    ]);
    registry.add_controllers([ComponentDescriptor::new("Controller", render_controller)]);
    registry.add_fields([
        ComponentDescriptor::new("Form", render_form).with_wrapper(Wrapper::Tag("div".into())),
        ComponentDescriptor::new("Field", render_field),
        ComponentDescriptor::new("SelectField", render_select_field),
        ComponentDescriptor::new("TextareaField", render_textarea_field),
        ComponentDescriptor::new("CheckboxField", render_checkbox_field),
    ]);
    registry.add_media_components([
        ComponentDescriptor::new("Image", render_image),
        ComponentDescriptor::new("Svg", render_svg),
        ComponentDescriptor::new("Video", render_video),
    ]);
    registry.add_navigation_components([
        ComponentDescriptor::new("Link", render_link),
        ComponentDescriptor::new("NavLink", render_nav_link),
    ]);
    registry.add_wrapper_exclusions(DEFAULT_WRAPPER_EXCLUSIONS);
}

/// `name` plus `classes`/`className` of an element
pub fn element_classes(element: &Element) -> ClassList {
    let mut classes = ClassList::new();
    if let Some(name) = element.str_prop("name") {
        classes.add(name);
    }
    classes.extend(element.classes());
    if let Some(class_name) = element.props.get("className") {
        classes.extend(ClassList::from_value(class_name));
    }
    classes
}

/// Host element carrying the presentational props of `element`
fn host_from(element: &Element, tag: &str, extra_classes: &str) -> Element {
    let mut classes = element_classes(element);
    classes.add(extra_classes);
    let mut host = Element::host(tag).class(&classes);
    if let Some(style) = element.props.get("style").filter(|v| v.is_object()) {
        host.props.insert("style".into(), style.clone());
    }
    if let Some(id) = element.props.get("id") {
        host.props.insert("id".into(), id.clone());
    }
    if let Some(Value::Object(extra)) = element.props.get("_props") {
        for (key, value) in extra {
            host.props.insert(key.clone(), value.clone());
        }
    }
    host
}

fn copy_props(mut host: Element, element: &Element, keys: &[&str]) -> Element {
    for key in keys {
        if let Some(value) = element.props.get(*key) {
            host.props.insert((*key).to_string(), value.clone());
        }
    }
    host
}

/// Text of a JSON scalar as it would be displayed
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_component(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let carries_host = HOST_PROPS
        .iter()
        .any(|key| element.props.get(*key).is_some_and(|v| !v.is_null()));
    if !carries_host {
        return Node::fragment(element.children.clone());
    }
    let tag = element.str_prop("tag").unwrap_or("div");
    host_from(element, tag, "").children(element.children.clone()).into()
}

fn render_action(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let mut host = host_from(element, "button", "action");
    host = host.prop("type", element.str_prop("type").unwrap_or("button"));
    copy_props(host, element, &["disabled", "value", "title"])
        .children(element.children.clone())
        .into()
}

fn render_card(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let mut card = host_from(element, "div", "card");
    if let Some(header) = element.rendered("header") {
        card = card.child(Element::host("header").class(&"card-header".into()).child(header.clone()).into());
    }
    card = card.child(
        Element::host("div")
            .class(&"card-body".into())
            .children(element.children.clone())
            .into(),
    );
    if let Some(footer) = element.rendered("footer") {
        card = card.child(Element::host("footer").class(&"card-footer".into()).child(footer.clone()).into());
    }
    card.into()
}

/// Raw content: `{"columns": [..], "rows": [[..], ..]}`
fn render_table(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let content = element.props.get("content").cloned().unwrap_or(Value::Null);
    let columns = content.get("columns").and_then(Value::as_array).cloned().unwrap_or_default();
    let rows = content.get("rows").and_then(Value::as_array).cloned().unwrap_or_default();

    let head_row = Element::host("tr").children(columns.iter().map(|column| {
        let label = column.get("label").unwrap_or(column);
        Node::from(Element::host("th").child(Node::text(value_text(label))))
    }));
    let body = Element::host("tbody").children(rows.iter().map(|row| {
        let cells = row.as_array().cloned().unwrap_or_default();
        Node::from(
            Element::host("tr")
                .children(cells.iter().map(|cell| Node::from(Element::host("td").child(Node::text(value_text(cell)))))),
        )
    }));

    host_from(element, "table", "table")
        .child(Element::host("thead").child(head_row.into()).into())
        .child(body.into())
        .into()
}

fn render_icons(element: &Element, ctx: &RenderContext<'_>) -> Node {
    let icon = element.str_prop("icon").unwrap_or_default();
    let Some(definition) = ctx.registry.icon(icon) else {
        return host_from(element, "i", &format!("icon icon-{icon}")).into();
    };

    let (view_box, paths) = match definition {
        Value::String(d) => ("0 0 24 24".to_string(), vec![d.clone()]),
        other => {
            let view_box = other.get("viewBox").and_then(Value::as_str).unwrap_or("0 0 24 24").to_string();
            let paths = match other.get("paths").or_else(|| other.get("path")) {
                Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                Some(Value::String(d)) => vec![d.clone()],
                _ => Vec::new(),
            };
            (view_box, paths)
        }
    };

    let size = element.props.get("size").cloned().unwrap_or(json!(16));
    host_from(element, "svg", &format!("icon {icon}"))
        .prop("viewBox", view_box)
        .prop("width", size.clone())
        .prop("height", size)
        .children(paths.into_iter().map(|d| Node::from(Element::host("path").prop("d", d))))
        .into()
}

/// Inline error markup with the offending schema pretty-printed
pub fn error_node(message: &str, context: &Value) -> Node {
    let pretty = serde_json::to_string_pretty(context).unwrap_or_else(|_| context.to_string());
    Element::host("div")
        .class(&"goat-error".into())
        .prop("role", "alert")
        .child(Element::host("strong").child(Node::text(message)).into())
        .child(Element::host("pre").child(Node::text(pretty)).into())
        .into()
}

fn render_error_view(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let message = element.str_prop("message").unwrap_or("Invalid schema");
    let context = element.props.get("context").cloned().unwrap_or(Value::Null);
    error_node(message, &context)
}

fn render_chart(element: &Element, ctx: &RenderContext<'_>) -> Node {
    let graph = element.str_prop("graph").unwrap_or_default();
    if ctx.registry.graph(graph).is_none() {
        return host_from(element, "div", "chart chart-missing").into();
    }
    let data = element.props.get("data").map(|d| d.to_string()).unwrap_or_default();
    host_from(element, "canvas", "chart")
        .prop("data-chart", graph)
        .prop("data-chart-data", data)
        .into()
}

/// Placeholder shown by containers until a size is known
pub fn loading_placeholder(name: &str) -> Node {
    Element::host("div")
        .class(&ClassList::parse(&format!("{name}-loading loading")))
        .prop("role", "status")
        .into()
}

fn render_container(element: &Element, ctx: &RenderContext<'_>) -> Node {
    let name = element.str_prop("name").unwrap_or("container");
    let Some(viewport) = ctx.viewport else {
        return loading_placeholder(name);
    };

    let table = element
        .props
        .get("breakpoints")
        .and_then(BreakpointTable::from_value)
        .unwrap_or_default();
    let mut host = host_from(element, element.str_prop("tag").unwrap_or("div"), "container");
    let mut classes = host.classes();
    if let Some(breakpoint) = table.resolve_or_first(viewport.width) {
        classes.add(breakpoint);
        if let Some(extra) = element.props.get("breakpointClasses").and_then(|b| b.get(breakpoint)) {
            classes.extend(ClassList::from_value(extra));
        }
    }
    classes.add(Orientation::from_size(viewport).as_str());
    host.props.insert("classes".into(), classes.to_value());
    host.children(element.children.clone()).into()
}

fn render_flex_container(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let mut host = host_from(element, "div", "flex-container");
    let mut style = json!({"display": "flex"});
    if let Some(direction) = element.str_prop("direction") {
        style["flexDirection"] = json!(direction);
    }
    if let Some(gap) = element.props.get("gap") {
        style["gap"] = gap.clone();
    }
    if let Some(existing) = host.props.get("style") {
        crate::merge::deep_merge(&mut style, existing);
    }
    host.props.insert("style".into(), style);
    host.children(element.children.clone()).into()
}

/// Children with fragments opened up, empty nodes dropped
fn cells(children: &[Node]) -> Vec<Node> {
    let mut out = Vec::new();
    for child in children {
        match child {
            Node::Fragment(f) => out.extend(cells(&f.children)),
            node if node.is_nothing() => {}
            node => out.push(node.clone()),
        }
    }
    out
}

/// `colClasses` as it applies at the current viewport. A map keyed by
/// breakpoint cascades mobile first and is ignored until a viewport is known.
fn grid_col_classes(element: &Element, ctx: &RenderContext<'_>) -> Value {
    let Some(raw) = element.props.get("colClasses") else {
        return Value::Null;
    };
    let Value::Object(by_breakpoint) = raw else {
        return raw.clone();
    };
    let Some(viewport) = ctx.viewport else {
        return Value::Null;
    };
    let table = element
        .props
        .get("breakpoints")
        .and_then(BreakpointTable::from_value)
        .unwrap_or_default();
    let Some(active) = table.resolve_or_first(viewport.width) else {
        return Value::Null;
    };
    table
        .up_to(active)
        .filter_map(|name| by_breakpoint.get(name))
        .last()
        .cloned()
        .unwrap_or(Value::Null)
}

/// Classes for cell `index`: an array is indexed, its last entry repeating
fn cell_classes(col_classes: &Value, index: usize) -> ClassList {
    match col_classes {
        Value::Array(items) => items
            .get(index)
            .or(items.last())
            .map_or_else(ClassList::new, ClassList::from_value),
        other => ClassList::from_value(other),
    }
}

fn render_grid_container(element: &Element, ctx: &RenderContext<'_>) -> Node {
    let col_tag = element.str_prop("colTag").unwrap_or("div");
    let col_classes = grid_col_classes(element, ctx);
    let columns = cells(&element.children).into_iter().enumerate().map(|(i, child)| {
        let mut classes = ClassList::parse(if i % 2 == 1 { "even" } else { "odd" });
        classes.add(&format!("col-num-{i}"));
        classes.extend(cell_classes(&col_classes, i));
        Node::from(Element::host(col_tag).key(i.to_string()).class(&classes).child(child))
    });
    host_from(element, "div", "grid-container").children(columns).into()
}

fn render_controller(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    host_from(element, "div", "controller")
        .children(element.children.clone())
        .into()
}

fn render_form(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    copy_props(host_from(element, "form", "form"), element, &["action", "method", "noValidate"])
        .children(element.children.clone())
        .into()
}

fn field_shell(element: &Element, kind: &str, control: Element, label_after: bool) -> Node {
    let name = element.str_prop("name").unwrap_or_default().to_string();
    let label = element.rendered("label").map(|label| {
        Node::from(Element::host("label").prop("for", name.clone()).child(label.clone()))
    });

    let mut shell = Element::host("div").class(&ClassList::parse(&format!("field {kind}")));
    if !label_after {
        shell = shell.children(label.clone());
    }
    shell = shell.child(control.into());
    if label_after {
        shell = shell.children(label);
    }
    if let Some(message) = element.rendered("message") {
        shell = shell.child(Element::host("small").class(&"form-text".into()).child(message.clone()).into());
    }
    if let Some(error) = element.rendered("errorMessage") {
        shell = shell.child(Element::host("div").class(&"invalid-feedback".into()).child(error.clone()).into());
    }
    shell.children(element.children.clone()).into()
}

fn control(element: &Element, tag: &str) -> Element {
    let name = element.str_prop("name").unwrap_or_default().to_string();
    let mut host = host_from(element, tag, "form-control")
        .prop("name", name.clone())
        .prop("id", name);
    let placeholder = element
        .rendered("placeholder")
        .map(Node::text_content)
        .filter(|p| !p.is_empty());
    if let Some(placeholder) = placeholder {
        host = host.prop("placeholder", placeholder);
    }
    copy_props(host, element, &FIELD_ATTRS)
}

fn render_field(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let input = control(element, "input").prop("type", element.str_prop("type").unwrap_or("text"));
    field_shell(element, "input-field", input, false)
}

fn render_select_field(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let selected = element.props.get("value").map(value_text);
    let options = element.props.get("options").and_then(Value::as_array).cloned().unwrap_or_default();
    let mut select = control(element, "select");
    select.props.remove("value");
    let select = select.children(options.iter().map(|option| {
        let value = value_text(option.get("value").unwrap_or(option));
        let label = value_text(option.get("label").unwrap_or(option));
        let mut node = Element::host("option").prop("value", value.clone());
        if selected.as_deref() == Some(value.as_str()) {
            node = node.prop("selected", true);
        }
        Node::from(node.child(Node::text(label)))
    }));
    field_shell(element, "select-field", select, false)
}

fn render_textarea_field(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let mut textarea = control(element, "textarea");
    let value = textarea.props.remove("value").map(|v| value_text(&v)).unwrap_or_default();
    textarea = copy_props(textarea, element, &["rows", "cols"]).child(Node::text(value));
    field_shell(element, "textarea-field", textarea, false)
}

fn render_checkbox_field(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let mut input = control(element, "input").prop("type", "checkbox");
    let checked = element.props.get("value").or_else(|| element.props.get("checked"));
    input.props.remove("value");
    if checked.and_then(Value::as_bool) == Some(true) {
        input = input.prop("checked", true);
    }
    field_shell(element, "checkbox-field", input, true)
}

fn render_image(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let host = host_from(element, "img", "image").prop("alt", element.str_prop("alt").unwrap_or_default());
    copy_props(host, element, &["src", "width", "height", "loading"]).into()
}

/// Svg markup registered with `add_svgs`, parsed into host elements
fn render_svg(element: &Element, ctx: &RenderContext<'_>) -> Node {
    let name = element.str_prop("svg").unwrap_or_default();
    let Some(source) = ctx.registry.svg(name).and_then(Value::as_str) else {
        return host_from(element, "i", &format!("svg svg-{name}")).into();
    };
    let nodes: Vec<Node> = markup::parse(source).iter().map(markup::to_host_node).collect();
    host_from(element, "span", "svg").children(nodes).into()
}

fn render_video(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    copy_props(
        host_from(element, "video", "video"),
        element,
        &["src", "poster", "controls", "autoPlay", "muted", "loop", "width", "height"],
    )
    .children(element.children.clone())
    .into()
}

fn link_target(element: &Element) -> String {
    element
        .str_prop("to")
        .or_else(|| element.str_prop("href"))
        .unwrap_or("#")
        .to_string()
}

fn render_link(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    copy_props(host_from(element, "a", ""), element, &["target", "rel", "title"])
        .prop("href", link_target(element))
        .children(element.children.clone())
        .into()
}

fn render_nav_link(element: &Element, _ctx: &RenderContext<'_>) -> Node {
    let target = link_target(element);
    let pathname = element
        .props
        .get("location")
        .and_then(|location| location.get("pathname"))
        .and_then(Value::as_str);
    let extra = if pathname == Some(target.as_str()) { "nav-link active" } else { "nav-link" };
    copy_props(host_from(element, "a", extra), element, &["target", "title"])
        .prop("href", target)
        .children(element.children.clone())
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoints::Size;
    use crate::node::{expand, find_element};
    use serde_json::Map;
    use std::sync::Arc;

    fn component(registry: &Registry, name: &str, props: Value) -> Element {
        let mut element = Element::component(Arc::clone(registry.resolve(name).unwrap()));
        if let Value::Object(map) = props {
            element.props = map;
        }
        element
    }

    #[test]
    fn test_passthrough_without_host_props() {
        let registry = Registry::with_builtins();
        let ctx = RenderContext::new(&registry);
        let element = component(&registry, "Component", json!({"name": "plain"})).child(Node::text("hi"));
        let out = expand(&element.into(), &ctx);
        assert!(matches!(out, Node::Fragment(_)));
        assert_eq!(out.text_content(), "hi");
    }

    #[test]
    fn test_passthrough_with_style_renders_div() {
        let registry = Registry::with_builtins();
        let ctx = RenderContext::new(&registry);
        let element = component(&registry, "Component", json!({"name": "box", "style": {"color": "red"}}));
        let out = expand(&element.into(), &ctx);
        let div = find_element(&out, "div").unwrap();
        assert_eq!(div.props["style"], json!({"color": "red"}));
        assert_eq!(div.classes().to_string(), "box");
    }

    #[test]
    fn test_nav_link_active_from_location() {
        let registry = Registry::with_builtins();
        let ctx = RenderContext::new(&registry);
        let element = component(
            &registry,
            "NavLink",
            json!({"to": "/about", "location": {"pathname": "/about"}}),
        );
        let out = expand(&element.into(), &ctx);
        let a = find_element(&out, "a").unwrap();
        assert!(a.classes().contains("active"));
        assert_eq!(a.str_prop("href"), Some("/about"));
    }

    #[test]
    fn test_container_without_viewport_is_loading() {
        let registry = Registry::with_builtins();
        let ctx = RenderContext::new(&registry);
        let element = component(&registry, "Container", json!({"name": "main"})).child(Node::text("x"));
        let out = expand(&element.clone().into(), &ctx);
        assert!(out.as_element().unwrap().classes().contains("main-loading"));
        assert_eq!(out.text_content(), "");

        let ctx = ctx.with_viewport(Size::new(800, 600));
        let out = expand(&element.into(), &ctx);
        let classes = out.as_element().unwrap().classes();
        assert!(classes.contains("md"));
        assert!(classes.contains("landscape"));
        assert_eq!(out.text_content(), "x");
    }

    #[test]
    fn test_grid_wraps_each_child_in_a_cell() {
        let registry = Registry::with_builtins();
        let ctx = RenderContext::new(&registry);
        let element = component(
            &registry,
            "GridContainer",
            json!({"name": "cards", "colTag": "li", "colClasses": ["wide", "narrow"]}),
        )
        .child(Node::fragment(vec![Node::text("a"), Node::Nothing, Node::text("b")]))
        .child(Node::text("c"));
        let out = expand(&element.into(), &ctx);
        let grid = out.as_element().unwrap();
        assert!(grid.classes().contains("grid-container"));

        let cells: Vec<String> = grid
            .children
            .iter()
            .map(|c| c.as_element().unwrap().classes().to_string())
            .collect();
        assert_eq!(cells, ["odd col-num-0 wide", "even col-num-1 narrow", "odd col-num-2 narrow"]);
        assert_eq!(grid.children[0].as_element().unwrap().tag(), "li");
        assert_eq!(out.text_content(), "abc");
    }

    #[test]
    fn test_grid_col_classes_by_breakpoint() {
        let registry = Registry::with_builtins();
        let element = component(
            &registry,
            "GridContainer",
            json!({"colClasses": {"xs": "col-12", "md": ["col-6", "col-3"]}}),
        )
        .child(Node::text("a"))
        .child(Node::text("b"));

        let rendered_cells = |ctx: &RenderContext<'_>| {
            let out = expand(&element.clone().into(), ctx);
            let grid = out.as_element().unwrap().clone();
            grid.children
                .iter()
                .map(|c| c.as_element().unwrap().classes().to_string())
                .collect::<Vec<_>>()
        };

        let ctx = RenderContext::new(&registry);
        assert_eq!(rendered_cells(&ctx), ["odd col-num-0", "even col-num-1"]);
        let phone = ctx.with_viewport(Size::new(400, 800));
        assert_eq!(rendered_cells(&phone), ["odd col-num-0 col-12", "even col-num-1 col-12"]);
        let desktop = ctx.with_viewport(Size::new(1300, 800));
        assert_eq!(rendered_cells(&desktop), ["odd col-num-0 col-6", "even col-num-1 col-3"]);
    }

    #[test]
    fn test_icons_lookup() {
        let mut registry = Registry::with_builtins();
        let mut icons = Map::new();
        icons.insert("star".into(), json!("M1 1"));
        registry.add_icons(icons);
        let ctx = RenderContext::new(&registry);

        let out = expand(&component(&registry, "Icons", json!({"icon": "star"})).into(), &ctx);
        let path = find_element(&out, "path").unwrap();
        assert_eq!(path.str_prop("d"), Some("M1 1"));

        let missing = expand(&component(&registry, "Icons", json!({"icon": "moon"})).into(), &ctx);
        assert!(find_element(&missing, "i").unwrap().classes().contains("icon-moon"));
    }

    #[test]
    fn test_table_reads_raw_content() {
        let registry = Registry::with_builtins();
        let ctx = RenderContext::new(&registry);
        let element = component(
            &registry,
            "Table",
            json!({"content": {"columns": ["A", {"label": "B"}], "rows": [[1, "x"]]}}),
        );
        let out = expand(&element.into(), &ctx);
        assert_eq!(out.text_content(), "AB1x");
    }

    #[test]
    fn test_select_marks_selected_option() {
        let registry = Registry::with_builtins();
        let ctx = RenderContext::new(&registry);
        let element = component(
            &registry,
            "SelectField",
            json!({"name": "size", "value": "m", "options": ["s", {"value": "m", "label": "Medium"}]}),
        );
        let out = expand(&element.into(), &ctx);
        let select = find_element(&out, "select").unwrap();
        assert_eq!(select.children.len(), 2);
        let medium = select.children[1].as_element().unwrap();
        assert_eq!(medium.props.get("selected"), Some(&json!(true)));
    }
}
