//! Route schemas.
//!
//! Routes nest: `{"path": "/users", "routes": [{"path": ":id"}]}` flattens to
//! `/users` and `/users/:id`. Routes with `active: false` are skipped along
//! with their children. Names default to the full path; a repeated name is
//! logged and the later route replaces the earlier one.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Inline view schema; otherwise the view is looked up by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RouteConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            component: None,
            active: true,
            view: None,
            routes: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_view(mut self, view: Value) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_routes(mut self, routes: Vec<RouteConfig>) -> Self {
        self.routes = routes;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// A flattened route with its full path
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub name: String,
    pub path: String,
    pub component: Option<String>,
    pub view: Option<Value>,
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub route: Route,
    pub params: Map<String, Value>,
}

fn join_path(parent: &str, path: &str) -> String {
    if path.starts_with('/') || parent.is_empty() {
        return normalize(path);
    }
    normalize(&format!("{}/{}", parent.trim_end_matches('/'), path))
}

fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Flatten nested route configs into full-path routes, in declaration order.
pub fn flatten_routes(routes: &[RouteConfig]) -> Vec<Route> {
    let mut flat: Vec<Route> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    flatten_into(routes, "", &mut flat, &mut by_name);
    flat
}

fn flatten_into(routes: &[RouteConfig], parent: &str, flat: &mut Vec<Route>, by_name: &mut HashMap<String, usize>) {
    for config in routes {
        if !config.active {
            debug!(path = %config.path, "inactive route skipped");
            continue;
        }
        let path = join_path(parent, &config.path);
        let route = Route {
            name: config.name.clone().unwrap_or_else(|| path.clone()),
            path: path.clone(),
            component: config.component.clone(),
            view: config.view.clone(),
            extra: config.extra.clone(),
        };
        match by_name.get(&route.name) {
            Some(&index) => {
                warn!(name = %route.name, previous = %flat[index].path, path = %route.path, "route name collision, last one wins");
                flat[index] = route;
            }
            None => {
                by_name.insert(route.name.clone(), flat.len());
                flat.push(route);
            }
        }
        flatten_into(&config.routes, &path, flat, by_name);
    }
}

/// Blake3 hash of the serialized route schema
pub fn fingerprint(routes: &[RouteConfig]) -> String {
    let bytes = serde_json::to_vec(routes).unwrap_or_default();
    blake3::hash(&bytes).to_hex().to_string()
}

/// Match `pattern` (with `:param` and trailing `*` segments) against `path`
pub fn match_pattern(pattern: &str, path: &str) -> Option<Map<String, Value>> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let mut params = Map::new();
    for (i, segment) in pattern_segments.iter().enumerate() {
        if *segment == "*" {
            params.insert("*".into(), Value::String(path_segments.get(i..)?.join("/")));
            return Some(params);
        }
        let actual = path_segments.get(i)?;
        match segment.strip_prefix(':') {
            Some(param) => {
                params.insert(param.to_string(), Value::String((*actual).to_string()));
            }
            None if segment == actual => {}
            None => return None,
        }
    }
    (pattern_segments.len() == path_segments.len()).then_some(params)
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    fingerprint: String,
}

impl RouteTable {
    pub fn new(routes: &[RouteConfig]) -> Self {
        Self {
            routes: flatten_routes(routes),
            fingerprint: fingerprint(routes),
        }
    }

    /// Replace the table. Returns false, keeping the table, when the schema is unchanged.
    pub fn set_routes(&mut self, routes: &[RouteConfig]) -> bool {
        let next = fingerprint(routes);
        if next == self.fingerprint {
            return false;
        }
        self.routes = flatten_routes(routes);
        self.fingerprint = next;
        true
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// First route, in declaration order, whose pattern matches `path`
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            match_pattern(&route.path, path).map(|params| RouteMatch {
                route: route.clone(),
                params,
            })
        })
    }
}
