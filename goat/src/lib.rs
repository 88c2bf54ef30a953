pub mod breakpoints;
pub mod bus;
pub mod class_list;
pub mod compiler;
pub mod components;
pub mod container;
pub mod diff;
pub mod error;
pub mod format;
pub mod html;
pub mod i18n;
pub mod markup;
pub mod merge;
pub mod node;
pub mod registry;
pub mod resolve;
pub mod responsive;
pub mod schema;
pub mod visitor;


pub use breakpoints::{BreakpointTable, Orientation, Size};
pub use bus::{event_name, Event, EventBus};
pub use class_list::ClassList;
pub use compiler::{decide_wrapper, Content, Goat, GoatProps, Scope, WrapperDecision};
pub use container::{Container, ContainerOptions, ResizeInfo};
pub use diff::{diff_schemas, DiffStats, SchemaDiff, SectionChange};
pub use error::GoatError;
pub use format::Formatter;
pub use html::{to_html, to_html_pretty};
pub use i18n::{Dictionary, Translate};
pub use node::{expand, Element, ElementKind, Node, Props, RenderContext};
pub use registry::{ComponentDescriptor, Registry, RegistryKind, Resolution, Wrapper};
pub use resolve::resolve_refs;
pub use responsive::ResponsiveView;
