//! HTTP server for Daylist.
//! Wires configuration, logging, the task store, the reset sweeper and the
//! REST API into one process.

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod sweeper;

pub use api::router;
pub use app::{open_repository, run, serve, sweep_and_serve};
pub use config::{ConfigError, ServerConfig, StoreBackend};
pub use error::ServerError;
pub use sweeper::{ResetSweeper, SweeperHandle};
