//! Component registries.
//!
//! A [`Registry`] owns one table per [`RegistryKind`] plus the icon, svg and
//! graph sets and the wrapper-exclusion set. All `add_*` calls are
//! last-write-wins merges; replacing an existing entry is logged, never
//! rejected. Lookups go through [`Registry::resolve_or_default`], which falls
//! back to the base `Component` for unknown names.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::components;
use crate::node::{Element, Node, RenderContext};

/// Name of the passthrough component used when a lookup misses
pub const DEFAULT_COMPONENT: &str = "Component";

pub type RenderFn = fn(&Element, &RenderContext<'_>) -> Node;

/// Component-level or instance-level wrapper setting
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Wrapper {
    /// Not specified at this level
    #[default]
    Unset,
    /// Explicit `false`: never wrap
    Disabled,
    /// Wrap in this tag
    Tag(String),
}

impl Wrapper {
    /// Read a schema `wrapper` value. `false` and `""` disable wrapping; a
    /// string names the tag; anything else counts as unset.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Bool(false)) => Wrapper::Disabled,
            Some(Value::String(s)) if s.is_empty() => Wrapper::Disabled,
            Some(Value::String(s)) => Wrapper::Tag(s.clone()),
            _ => Wrapper::Unset,
        }
    }
}

/// Static metadata plus the render function of a registered component
#[derive(Clone)]
pub struct ComponentDescriptor {
    pub name: String,
    /// Extra sub-schema fields the compiler builds and injects as rendered props
    pub slots: Vec<String>,
    pub wrapper: Wrapper,
    /// Pass raw `content` through instead of compiling it into children
    pub dont_build_content: bool,
    pub render: RenderFn,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>, render: RenderFn) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            wrapper: Wrapper::Unset,
            dont_build_content: false,
            render,
        }
    }

    pub fn with_slots<S: Into<String>>(mut self, slots: impl IntoIterator<Item = S>) -> Self {
        self.slots = slots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_wrapper(mut self, wrapper: Wrapper) -> Self {
        self.wrapper = wrapper;
        self
    }

    pub fn dont_build_content(mut self) -> Self {
        self.dont_build_content = true;
        self
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("slots", &self.slots)
            .field("wrapper", &self.wrapper)
            .field("dont_build_content", &self.dont_build_content)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegistryKind {
    Components,
    Controllers,
    Containers,
    Fields,
    Media,
    Navigation,
}

impl RegistryKind {
    /// Lookup order: specialized tables shadow the plain components table
    pub const LOOKUP_ORDER: [RegistryKind; 6] = [
        RegistryKind::Navigation,
        RegistryKind::Media,
        RegistryKind::Fields,
        RegistryKind::Containers,
        RegistryKind::Controllers,
        RegistryKind::Components,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistryKind::Components => "components",
            RegistryKind::Controllers => "controllers",
            RegistryKind::Containers => "containers",
            RegistryKind::Fields => "fields",
            RegistryKind::Media => "media",
            RegistryKind::Navigation => "navigation",
        }
    }
}

/// Single name -> descriptor table
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    entries: HashMap<String, Arc<ComponentDescriptor>>,
}

impl ComponentRegistry {
    /// Insert a descriptor under its own name, returning the replaced entry
    pub fn register(&mut self, descriptor: ComponentDescriptor) -> Option<Arc<ComponentDescriptor>> {
        self.entries.insert(descriptor.name.clone(), Arc::new(descriptor))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ComponentDescriptor>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of a name lookup
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(Arc<ComponentDescriptor>),
    /// Name was missing or unknown; the base component stands in
    Fallback(Arc<ComponentDescriptor>),
}

impl Resolution {
    pub fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        match self {
            Resolution::Found(d) | Resolution::Fallback(d) => d,
        }
    }

    pub fn into_descriptor(self) -> Arc<ComponentDescriptor> {
        match self {
            Resolution::Found(d) | Resolution::Fallback(d) => d,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback(_))
    }
}

pub struct Registry {
    tables: BTreeMap<RegistryKind, ComponentRegistry>,
    wrapper_exclusions: HashSet<String>,
    icons: Map<String, Value>,
    svgs: Map<String, Value>,
    graphs: Map<String, Value>,
    fallback: Arc<ComponentDescriptor>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .tables
            .iter()
            .map(|(kind, table)| (kind.as_str(), table.len()))
            .collect();
        f.debug_struct("Registry")
            .field("tables", &counts)
            .field("wrapper_exclusions", &self.wrapper_exclusions.len())
            .field("icons", &self.icons.len())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl Registry {
    /// Registry holding only the fallback component
    pub fn empty() -> Self {
        let fallback = Arc::new(components::base_component());
        let mut tables = BTreeMap::new();
        for kind in RegistryKind::LOOKUP_ORDER {
            tables.insert(kind, ComponentRegistry::default());
        }
        Self {
            tables,
            wrapper_exclusions: HashSet::new(),
            icons: Map::new(),
            svgs: Map::new(),
            graphs: Map::new(),
            fallback,
        }
    }

    /// Registry seeded with the built-in components and wrapper exclusions
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        components::install(&mut registry);
        registry
    }

    /// Register one descriptor in the given table. Last write wins.
    pub fn register(&mut self, kind: RegistryKind, descriptor: ComponentDescriptor) {
        let name = descriptor.name.clone();
        let table = self.tables.entry(kind).or_default();
        if table.register(descriptor).is_some() {
            warn!(component = %name, table = kind.as_str(), "component re-registered, last registration wins");
        } else {
            debug!(component = %name, table = kind.as_str(), "component registered");
        }
    }

    fn add_all(&mut self, kind: RegistryKind, descriptors: impl IntoIterator<Item = ComponentDescriptor>) {
        for descriptor in descriptors {
            self.register(kind, descriptor);
        }
    }

    pub fn add_components(&mut self, descriptors: impl IntoIterator<Item = ComponentDescriptor>) {
        self.add_all(RegistryKind::Components, descriptors);
    }

    pub fn add_controllers(&mut self, descriptors: impl IntoIterator<Item = ComponentDescriptor>) {
        self.add_all(RegistryKind::Controllers, descriptors);
    }

    pub fn add_containers(&mut self, descriptors: impl IntoIterator<Item = ComponentDescriptor>) {
        self.add_all(RegistryKind::Containers, descriptors);
    }

    pub fn add_fields(&mut self, descriptors: impl IntoIterator<Item = ComponentDescriptor>) {
        self.add_all(RegistryKind::Fields, descriptors);
    }

    pub fn add_media_components(&mut self, descriptors: impl IntoIterator<Item = ComponentDescriptor>) {
        self.add_all(RegistryKind::Media, descriptors);
    }

    pub fn add_navigation_components(&mut self, descriptors: impl IntoIterator<Item = ComponentDescriptor>) {
        self.add_all(RegistryKind::Navigation, descriptors);
    }

    pub fn add_wrapper_exclusions<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) {
        self.wrapper_exclusions.extend(names.into_iter().map(Into::into));
    }

    pub fn is_wrapper_excluded(&self, name: &str) -> bool {
        self.wrapper_exclusions.contains(name)
    }

    pub fn wrapper_exclusions(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.wrapper_exclusions.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn add_icons(&mut self, icons: Map<String, Value>) {
        merge_set(&mut self.icons, icons, "icon");
    }

    pub fn add_svgs(&mut self, svgs: Map<String, Value>) {
        merge_set(&mut self.svgs, svgs, "svg");
    }

    pub fn add_graphs(&mut self, graphs: Map<String, Value>) {
        merge_set(&mut self.graphs, graphs, "graph");
    }

    pub fn icon(&self, name: &str) -> Option<&Value> {
        self.icons.get(name)
    }

    pub fn svg(&self, name: &str) -> Option<&Value> {
        self.svgs.get(name)
    }

    pub fn graph(&self, name: &str) -> Option<&Value> {
        self.graphs.get(name)
    }

    pub fn table(&self, kind: RegistryKind) -> Option<&ComponentRegistry> {
        self.tables.get(&kind)
    }

    /// Look a name up across every table
    pub fn resolve(&self, name: &str) -> Option<&Arc<ComponentDescriptor>> {
        RegistryKind::LOOKUP_ORDER
            .iter()
            .filter_map(|kind| self.tables.get(kind))
            .find_map(|table| table.get(name))
    }

    /// Look a name up, standing in the base component for a missing or unknown name.
    pub fn resolve_or_default(&self, name: Option<&str>) -> Resolution {
        let Some(name) = name else {
            return Resolution::Fallback(self.default_component());
        };
        match self.resolve(name) {
            Some(descriptor) => Resolution::Found(Arc::clone(descriptor)),
            None => {
                match self.suggest(name) {
                    Some(similar) => debug!(component = name, suggestion = similar, "unknown component, using fallback"),
                    None => debug!(component = name, "unknown component, using fallback"),
                }
                Resolution::Fallback(self.default_component())
            }
        }
    }

    /// The base passthrough component (a registered override wins)
    pub fn default_component(&self) -> Arc<ComponentDescriptor> {
        self.resolve(DEFAULT_COMPONENT)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// Closest registered name, for diagnostics on lookup misses
    pub fn suggest(&self, name: &str) -> Option<&str> {
        self.tables
            .values()
            .flat_map(|table| table.names())
            .map(|candidate| (candidate, strsim::jaro_winkler(name, candidate)))
            .filter(|(_, score)| *score > 0.85)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate)
    }

    /// Every `(kind, name)` pair, in lookup order then by name
    pub fn entries(&self) -> Vec<(RegistryKind, &str)> {
        RegistryKind::LOOKUP_ORDER
            .iter()
            .filter_map(|kind| self.tables.get(kind).map(|table| (*kind, table)))
            .flat_map(|(kind, table)| table.names().into_iter().map(move |name| (kind, name)))
            .collect()
    }
}

fn merge_set(target: &mut Map<String, Value>, additions: Map<String, Value>, what: &str) {
    for (name, value) in additions {
        if target.insert(name.clone(), value).is_some() {
            warn!(name = %name, set = what, "entry replaced, last registration wins");
        }
    }
}
