//! promise-engine — the engine boundary of the promise gateway.
//!
//! # Architecture
//!
//! - [`engine::Engine`] is the message-in / callback-out contract every
//!   engine implements.
//! - [`dispatch::send`] bridges that contract into a typed future, one
//!   request at a time.
//! - [`local::LocalEngine`] is the default in-process engine, backed by
//!   [redb](https://docs.rs/redb).

pub mod clock;
pub mod dispatch;
pub mod engine;
pub mod local;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{Callback, Engine};
pub use local::LocalEngine;
