//! promise-core — shared vocabulary between the HTTP adapter and the engine.
//!
//! Holds the durable promise, task, schedule, and callback records, the
//! closed set of canonical request/response messages, the engine error
//! taxonomy, and the `promised.toml` configuration.

pub mod config;
pub mod error;
pub mod message;
pub mod types;

pub use config::GatewayConfig;
pub use error::{EngineError, EngineResult};
pub use message::*;
pub use types::*;
