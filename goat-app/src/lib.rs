//! Application layer for goat: global state with a persistent mirror, HTTP
//! requests, route tables and the controller that renders routes.

pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod fetch_container;
pub mod routes;
pub mod store;

pub use config::AppConfig;
pub use controller::AppController;
pub use error::{AppError, FetchError};
pub use fetch::{FetchOptions, FetchOutcome, Fetcher, ReqwestTransport, ResponseFormat, Transport};
pub use fetch_container::FetchContainer;
pub use routes::{RouteConfig, RouteMatch, RouteTable};
pub use store::{GlobalStore, StorageKind, StoreOptions};
