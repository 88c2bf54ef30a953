use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use goat::breakpoints::Size;
use goat::bus::{event_name, Event, EventBus};
use goat::components::error_node;
use goat::compiler::{Goat, GoatProps};
use goat::format::Formatter;
use goat::html::to_html;
use goat::i18n::{Dictionary, Translate};
use goat::node::{Node, RenderContext};
use goat::registry::Registry;
use goat::resolve::resolve_refs;

use crate::config::AppConfig;
use crate::error::Result;
use crate::fetch::{FetchOptions, FetchOutcome, Fetcher, ReqwestTransport, Transport};
use crate::routes::{RouteConfig, RouteMatch, RouteTable};
use crate::store::{GlobalStore, StorageKind, StoreOptions};

/// Store key holding the current language
pub const LANG_KEY: &str = "lang";

/// Dispatched on every navigation
pub const LOCATION_EVENT: &str = "location";

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Ties the registry, bus, translations, global store, fetcher and routes
/// of one application together.
#[derive(Debug)]
pub struct AppController {
    config: AppConfig,
    registry: Registry,
    bus: EventBus,
    dictionary: RwLock<Dictionary>,
    store: GlobalStore,
    fetcher: Fetcher,
    routes: RwLock<RouteTable>,
}

impl AppController {
    /// Controller over the production HTTP transport
    pub fn init(config: AppConfig) -> Result<Self> {
        let transport = ReqwestTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: AppConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let bus = EventBus::new();
        let store = GlobalStore::new(config.state_dir()?, bus.clone());
        store.seed(&config.initial_state)?;

        let error_bus = bus.clone();
        let error_event = event_name("error", &config.name);
        let mut fetcher = Fetcher::new(transport)
            .with_timeout(config.timeout())
            .with_min_latency(config.min_latency())
            .with_headers(config.headers.clone())
            .with_error_handler(move |value| error_bus.dispatch(&error_event, &Event::Custom(value.clone())));
        if let Some(api) = &config.api {
            fetcher = fetcher.with_base(api)?;
        }

        let lang = match store.get(LANG_KEY)? {
            Some(Value::String(stored)) => stored,
            _ => config.lang.clone(),
        };
        let mut dictionary = Dictionary::new(lang);
        if let Some(fallback) = &config.fallback_lang {
            dictionary = dictionary.with_fallback(fallback.clone());
        }
        dictionary.add_dictionaries(&Value::Object(config.dictionaries.clone()));

        let routes = RouteTable::new(&config.routes);
        info!(
            app = %config.name,
            routes = routes.routes().len(),
            state_dir = %store.state_dir().display(),
            "app controller ready"
        );

        Ok(Self {
            config,
            registry: Registry::with_builtins(),
            bus,
            dictionary: RwLock::new(dictionary),
            store,
            fetcher,
            routes: RwLock::new(routes),
        })
    }

    /// Rewrite the options of every request before it is sent
    pub fn with_fetch_before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, FetchOptions) -> FetchOptions + Send + Sync + 'static,
    {
        self.fetcher = self.fetcher.with_before(hook);
        self
    }

    /// Map the value of every settled request
    pub fn with_fetch_after<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.fetcher = self.fetcher.with_after(hook);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn store(&self) -> &GlobalStore {
        &self.store
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.store.get(key)
    }

    pub fn set(&self, key: &str, value: Value, storage: Option<StorageKind>) -> Result<()> {
        self.store.set(key, value, storage)
    }

    pub fn set_with(&self, key: &str, value: Value, options: StoreOptions) -> Result<()> {
        self.store.set_with(key, value, options)
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(key)
    }

    pub fn remove_with(&self, key: &str, options: StoreOptions) -> Result<()> {
        self.store.remove_with(key, options)
    }

    pub fn get_lang(&self) -> String {
        read(&self.dictionary).lang().to_string()
    }

    /// Switch language; persisted locally and announced as `global.lang`
    pub fn set_lang(&self, lang: &str) -> Result<()> {
        write(&self.dictionary).set_lang(lang);
        self.store.set(LANG_KEY, Value::String(lang.to_string()), Some(StorageKind::Local))
    }

    /// Translation of `text` in the current language, or the text itself
    pub fn translate(&self, text: &str) -> String {
        read(&self.dictionary)
            .translate(text)
            .unwrap_or_else(|| text.to_string())
    }

    pub fn add_dictionaries(&self, dictionaries: &Value) {
        write(&self.dictionary).add_dictionaries(dictionaries);
    }

    pub fn set_header(&self, name: &str, value: &str) {
        self.fetcher.set_header(name, value);
    }

    pub fn remove_header(&self, name: &str) -> Option<String> {
        self.fetcher.remove_header(name)
    }

    pub fn headers(&self) -> BTreeMap<String, String> {
        self.fetcher.headers()
    }

    /// Failed requests are also announced as `error.{app name}`
    pub async fn fetch(&self, url: &str, options: FetchOptions) -> FetchOutcome {
        self.fetcher.fetch(url, options).await
    }

    /// Replace the route schema. Returns false when it is unchanged.
    pub fn set_routes(&self, routes: &[RouteConfig]) -> bool {
        let changed = write(&self.routes).set_routes(routes);
        debug!(changed, "routes set");
        changed
    }

    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        read(&self.routes).match_path(path)
    }

    fn view_for(&self, matched: &RouteMatch) -> Option<Value> {
        matched
            .route
            .view
            .clone()
            .or_else(|| self.config.views.get(&matched.route.name).cloned())
    }

    /// Navigate to `path`: dispatch `location` and compile the
    /// matching route's view. Missing routes and views render an error view.
    pub fn render_path(&self, path: &str) -> Node {
        let (pathname, search) = match path.split_once('?') {
            Some((pathname, query)) => (pathname, format!("?{query}")),
            None => (path, String::new()),
        };
        let matched = self.match_path(path);
        let params = matched.as_ref().map(|m| m.params.clone()).unwrap_or_default();

        self.bus.dispatch(
            LOCATION_EVENT,
            &Event::Location {
                pathname: pathname.to_string(),
                params: params.clone(),
            },
        );

        let Some(matched) = matched else {
            return error_node(&format!("No route matches {pathname}"), &json!({ "path": path }));
        };
        let Some(view) = self.view_for(&matched) else {
            return error_node(
                &format!("No view for route {}", matched.route.name),
                &json!({ "route": matched.route.name, "path": matched.route.path }),
            );
        };

        let mut route_match = Map::new();
        route_match.insert("name".into(), Value::String(matched.route.name.clone()));
        route_match.insert("path".into(), Value::String(matched.route.path.clone()));
        route_match.insert("params".into(), Value::Object(params.clone()));

        let props = GoatProps::new(self.config.name.clone())
            .with_location(json!({ "pathname": pathname, "search": search }))
            .with_route_match(Value::Object(route_match));
        self.build(&view, ("params", Value::Object(params)), props)
    }

    /// Compile `view` with `data` reachable as `$data/...`
    pub fn compile(&self, view: &Value, data: &Value) -> Node {
        self.build(view, ("data", data.clone()), GoatProps::new(self.config.name.clone()))
    }

    /// Resolve references against definitions, state and one extra root, then compile
    fn build(&self, view: &Value, (root, value): (&str, Value), props: GoatProps) -> Node {
        let mut context = Map::new();
        context.insert("definitions".into(), Value::Object(self.config.definitions.clone()));
        context.insert("state".into(), self.store.snapshot());
        context.insert(root.to_string(), value);
        let schema = resolve_refs(view, &Value::Object(context));

        let dictionary = read(&self.dictionary);
        let goat = Goat::new(&self.registry, props)
            .with_translator(&*dictionary)
            .with_formatter(Formatter::new(dictionary.lang().to_string()));
        goat.build_content(schema, None)
    }

    /// HTML for `path`. Containers only lay out once a viewport is known;
    /// without one they render their loading placeholder.
    pub fn render_html(&self, path: &str, viewport: Option<Size>) -> String {
        let mut context = RenderContext::new(&self.registry);
        if let Some(size) = viewport {
            context = context.with_viewport(size);
        }
        to_html(&self.render_path(path), &context)
    }
}
