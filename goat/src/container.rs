//! Responsive container: breakpoint state driven by size observations.
//!
//! A container starts unmeasured and renders a loading placeholder. The first
//! size comes from [`Container::mount`] and is applied synchronously; later
//! sizes go through [`Container::observe`] (or an attached `watch` channel)
//! and are debounced, so a burst of resizes is applied once with the last size.
//!
//! Every applied size recomputes the breakpoint and orientation, updates the
//! class list, runs the `on_resize` callback and publishes `resize.{name}`.
//! The first one also publishes `ready.{name}`.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::breakpoints::{BreakpointTable, Orientation, Size};
use crate::bus::{event_name, Event, EventBus};
use crate::class_list::ClassList;
use crate::components::loading_placeholder;
use crate::node::{Element, Node};

pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

/// Class added on every breakpoint change, for CSS transitions
pub const ANIMATE_CLASS: &str = "animate";

/// Payload of `resize.{name}` events and the `on_resize` callback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeInfo {
    pub name: String,
    pub breakpoint: String,
    pub orientation: Orientation,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ContainerOptions {
    pub name: String,
    pub breakpoints: BreakpointTable,
    pub classes: ClassList,
    /// Extra classes applied only while a breakpoint is active
    pub breakpoint_classes: HashMap<String, ClassList>,
    pub delay: Duration,
}

impl ContainerOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            breakpoints: BreakpointTable::default(),
            classes: ClassList::new(),
            breakpoint_classes: HashMap::new(),
            delay: DEFAULT_DELAY,
        }
    }

    pub fn with_breakpoints(mut self, breakpoints: BreakpointTable) -> Self {
        self.breakpoints = breakpoints;
        self
    }

    pub fn with_classes(mut self, classes: ClassList) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_breakpoint_classes(mut self, breakpoint: &str, classes: ClassList) -> Self {
        self.breakpoint_classes.insert(breakpoint.to_string(), classes);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type ResizeCallback = Arc<dyn Fn(&ResizeInfo) + Send + Sync>;

#[derive(Debug)]
struct State {
    info: Option<ResizeInfo>,
    classes: ClassList,
    ready_sent: bool,
    unmounted: bool,
    updates: u64,
}

#[derive(Default)]
struct Tasks {
    debounce: Option<JoinHandle<()>>,
    sensor: Option<JoinHandle<()>>,
}

struct Shared {
    options: ContainerOptions,
    bus: EventBus,
    state: Mutex<State>,
    on_resize: Mutex<Option<ResizeCallback>>,
    tasks: Mutex<Tasks>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Shared {
    fn apply(&self, size: Size) {
        let options = &self.options;
        let (info, first) = {
            let mut state = lock(&self.state);
            if state.unmounted {
                return;
            }

            let breakpoint = options
                .breakpoints
                .resolve_or_first(size.width)
                .unwrap_or_default()
                .to_string();
            let orientation = Orientation::from_size(size);

            for name in options.breakpoints.names() {
                state.classes.remove(name);
            }
            for extra in options.breakpoint_classes.values() {
                for token in extra.iter() {
                    state.classes.remove(token);
                }
            }
            state.classes.remove(Orientation::Landscape.as_str());
            state.classes.remove(Orientation::Portrait.as_str());

            if !breakpoint.is_empty() {
                state.classes.add(&breakpoint);
            }
            state.classes.add(ANIMATE_CLASS);
            state.classes.add(orientation.as_str());
            if let Some(extra) = options.breakpoint_classes.get(&breakpoint) {
                state.classes.extend(extra.clone());
            }

            let info = ResizeInfo {
                name: options.name.clone(),
                breakpoint,
                orientation,
                width: size.width,
                height: size.height,
            };
            state.info = Some(info.clone());
            state.updates += 1;
            let first = !state.ready_sent;
            state.ready_sent = true;
            (info, first)
        };
        debug!(container = %info.name, breakpoint = %info.breakpoint, width = info.width, "container resized");

        let callback = lock(&self.on_resize).clone();
        if let Some(callback) = callback {
            callback(&info);
        }
        self.bus
            .dispatch(&event_name("resize", &options.name), &Event::Resize(info.clone()));
        if first {
            self.bus.dispatch(
                &event_name("ready", &options.name),
                &Event::Ready { name: options.name.clone() },
            );
        }
    }

    /// Cancel any pending application and schedule `size` after the delay.
    fn observe(self: &Arc<Self>, size: Size) {
        if lock(&self.state).unmounted {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.apply(size);
            return;
        };

        let shared = Arc::clone(self);
        let delay = self.options.delay;
        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            shared.apply(size);
        });
        if let Some(previous) = lock(&self.tasks).debounce.replace(task) {
            previous.abort();
        }
    }
}

/// One responsive container instance.
pub struct Container {
    shared: Arc<Shared>,
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("options", &self.shared.options)
            .field("state", &*lock(&self.shared.state))
            .finish()
    }
}

impl Container {
    pub fn new(options: ContainerOptions, bus: EventBus) -> Self {
        let mut classes = ClassList::new();
        classes.add(&options.name);
        classes.extend(options.classes.clone());
        let state = State {
            info: None,
            classes,
            ready_sent: false,
            unmounted: false,
            updates: 0,
        };
        Self {
            shared: Arc::new(Shared {
                options,
                bus,
                state: Mutex::new(state),
                on_resize: Mutex::new(None),
                tasks: Mutex::new(Tasks::default()),
            }),
        }
    }

    pub fn on_resize<F>(&self, callback: F)
    where
        F: Fn(&ResizeInfo) + Send + Sync + 'static,
    {
        *lock(&self.shared.on_resize) = Some(Arc::new(callback));
    }

    pub fn name(&self) -> &str {
        &self.shared.options.name
    }

    pub fn breakpoints(&self) -> &BreakpointTable {
        &self.shared.options.breakpoints
    }

    /// First measurement, applied immediately.
    pub fn mount(&self, size: Size) {
        self.shared.apply(size);
    }

    /// Debounced measurement. Outside a tokio runtime it is applied immediately.
    pub fn observe(&self, size: Size) {
        self.shared.observe(size);
    }

    /// Follow a resize sensor until it closes or the container unmounts.
    pub fn attach(&self, mut sensor: watch::Receiver<Size>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(container = %self.name(), "no runtime, resize sensor not attached");
            return;
        };
        let shared = Arc::clone(&self.shared);
        let task = handle.spawn(async move {
            while sensor.changed().await.is_ok() {
                let size = *sensor.borrow_and_update();
                shared.observe(size);
            }
        });
        if let Some(previous) = lock(&self.shared.tasks).sensor.replace(task) {
            previous.abort();
        }
    }

    /// Cancel the pending debounce and detach the sensor. No events fire afterwards.
    pub fn unmount(&self) {
        lock(&self.shared.state).unmounted = true;
        let mut tasks = lock(&self.shared.tasks);
        if let Some(task) = tasks.debounce.take() {
            task.abort();
        }
        if let Some(task) = tasks.sensor.take() {
            task.abort();
        }
    }

    pub fn is_measured(&self) -> bool {
        lock(&self.shared.state).info.is_some()
    }

    pub fn breakpoint(&self) -> Option<String> {
        lock(&self.shared.state).info.as_ref().map(|i| i.breakpoint.clone())
    }

    pub fn info(&self) -> Option<ResizeInfo> {
        lock(&self.shared.state).info.clone()
    }

    pub fn classes(&self) -> ClassList {
        lock(&self.shared.state).classes.clone()
    }

    /// Number of applied measurements
    pub fn update_count(&self) -> u64 {
        lock(&self.shared.state).updates
    }

    /// Children inside the container element, or a loading placeholder while unmeasured.
    pub fn render(&self, children: Node) -> Node {
        let state = lock(&self.shared.state);
        let Some(info) = &state.info else {
            return loading_placeholder(&self.shared.options.name);
        };
        Element::host("div")
            .class(&state.classes)
            .prop("data-breakpoint", info.breakpoint.clone())
            .child(children)
            .into()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.unmount();
    }
}
