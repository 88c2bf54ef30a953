//! Element tree produced by the compiler.
//!
//! A compiled schema is a tree of [`Node`]s. Component elements still refer to
//! their registry descriptor; [`expand`] runs the render functions until only
//! host elements, text and fragments are left.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::breakpoints::Size;
use crate::class_list::ClassList;
use crate::registry::{ComponentDescriptor, Registry};

pub type Props = Map<String, Value>;

#[derive(Debug, Clone, Default)]
pub enum Node {
    /// Renders as nothing
    #[default]
    Nothing,
    Text(Text),
    Fragment(Fragment),
    Element(Element),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub key: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct Fragment {
    pub key: Option<String>,
    pub children: Vec<Node>,
}

#[derive(Clone)]
pub enum ElementKind {
    /// A plain tag such as `section` or `a`
    Host(String),
    /// A registry component, rendered by its descriptor
    Component(Arc<ComponentDescriptor>),
}

impl fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Host(tag) => write!(f, "Host({tag})"),
            ElementKind::Component(desc) => write!(f, "Component({})", desc.name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub key: Option<String>,
    pub kind: ElementKind,
    pub props: Props,
    /// Pre-rendered props: `label`, `placeholder`, `message`, `errorMessage` and slots
    pub rendered: BTreeMap<String, Node>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn host(tag: impl Into<String>) -> Self {
        Self::with_kind(ElementKind::Host(tag.into()))
    }

    pub fn component(descriptor: Arc<ComponentDescriptor>) -> Self {
        Self::with_kind(ElementKind::Component(descriptor))
    }

    fn with_kind(kind: ElementKind) -> Self {
        Self {
            key: None,
            kind,
            props: Props::new(),
            rendered: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn prop(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.props.insert(name.to_string(), value.into());
        self
    }

    pub fn class(self, classes: &ClassList) -> Self {
        if classes.is_empty() {
            self
        } else {
            self.prop("classes", classes.to_value())
        }
    }

    pub fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }

    /// Tag name for host elements, component name otherwise
    pub fn tag(&self) -> &str {
        match &self.kind {
            ElementKind::Host(tag) => tag,
            ElementKind::Component(desc) => &desc.name,
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self.kind, ElementKind::Host(_))
    }

    pub fn str_prop(&self, name: &str) -> Option<&str> {
        self.props.get(name).and_then(Value::as_str)
    }

    /// Class list from the `classes` prop (string or array)
    pub fn classes(&self) -> ClassList {
        self.props.get("classes").map(ClassList::from_value).unwrap_or_default()
    }

    pub fn rendered(&self, name: &str) -> Option<&Node> {
        self.rendered.get(name)
    }

    /// Children as a single node
    pub fn children_node(&self) -> Node {
        match self.children.len() {
            0 => Node::Nothing,
            1 => self.children[0].clone(),
            _ => Node::fragment(self.children.clone()),
        }
    }
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(Text { key: None, value: value.into() })
    }

    pub fn fragment(children: Vec<Node>) -> Self {
        Node::Fragment(Fragment { key: None, children })
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Node::Nothing)
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Node::Nothing => None,
            Node::Text(t) => t.key.as_deref(),
            Node::Fragment(f) => f.key.as_deref(),
            Node::Element(e) => e.key.as_deref(),
        }
    }

    /// Assign `key` unless the node already carries one
    pub fn with_key_if_missing(mut self, key: impl Into<String>) -> Self {
        let slot = match &mut self {
            Node::Nothing => return self,
            Node::Text(t) => &mut t.key,
            Node::Fragment(f) => &mut f.key,
            Node::Element(e) => &mut e.key,
        };
        if slot.is_none() {
            *slot = Some(key.into());
        }
        self
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Concatenated text of the node and its descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Nothing => {}
            Node::Text(t) => out.push_str(&t.value),
            Node::Fragment(f) => f.children.iter().for_each(|c| c.collect_text(out)),
            Node::Element(e) => e.children.iter().for_each(|c| c.collect_text(out)),
        }
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

/// Everything a component render function can see besides its own element
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub registry: &'a Registry,
    /// Known viewport size, used by containers to measure synchronously
    pub viewport: Option<Size>,
    pub test: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry, viewport: None, test: false }
    }

    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = Some(viewport);
        self
    }
}

/// Run component render functions until only host elements remain.
pub fn expand(node: &Node, ctx: &RenderContext<'_>) -> Node {
    match node {
        Node::Nothing | Node::Text(_) => node.clone(),
        Node::Fragment(f) => Node::Fragment(Fragment {
            key: f.key.clone(),
            children: f.children.iter().map(|c| expand(c, ctx)).collect(),
        }),
        Node::Element(element) => match &element.kind {
            ElementKind::Host(_) => {
                let mut host = element.clone();
                host.children = element.children.iter().map(|c| expand(c, ctx)).collect();
                Node::Element(host)
            }
            ElementKind::Component(desc) => {
                let rendered = expand(&(desc.render)(element, ctx), ctx);
                match &element.key {
                    Some(key) => rendered.with_key_if_missing(key.clone()),
                    None => rendered,
                }
            }
        },
    }
}

/// Walk an expanded tree and return the chain of host tags enclosing the first
/// text node equal to `needle`, innermost first.
pub fn host_ancestors(node: &Node, needle: &str) -> Option<Vec<String>> {
    fn walk(node: &Node, needle: &str, path: &mut Vec<String>) -> bool {
        match node {
            Node::Nothing => false,
            Node::Text(t) => t.value == needle,
            Node::Fragment(f) => f.children.iter().any(|c| walk(c, needle, path)),
            Node::Element(e) => {
                path.push(e.tag().to_string());
                if e.children.iter().any(|c| walk(c, needle, path)) {
                    return true;
                }
                path.pop();
                false
            }
        }
    }

    let mut path = Vec::new();
    if walk(node, needle, &mut path) {
        path.reverse();
        Some(path)
    } else {
        None
    }
}

/// Find the first element (host or component) whose tag matches
pub fn find_element<'n>(node: &'n Node, tag: &str) -> Option<&'n Element> {
    match node {
        Node::Nothing | Node::Text(_) => None,
        Node::Fragment(f) => f.children.iter().find_map(|c| find_element(c, tag)),
        Node::Element(e) => {
            if e.tag() == tag {
                Some(e)
            } else {
                e.children.iter().find_map(|c| find_element(c, tag))
            }
        }
    }
}
