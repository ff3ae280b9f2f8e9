/// Screendiff - visual screenshot comparison service
///
/// Clients upload images, ask for two uploads to be compared, and fetch the
/// rendered diff image. Uploads and diff outputs live in two flat blob
/// namespaces addressed by generated keys.

pub mod api;
pub mod blob_store;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod metrics;
pub mod naming;
pub mod server;
pub mod service;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{ServiceError, ServiceResult};
pub use service::ScreendiffService;
