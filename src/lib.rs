//! Field-device gateway.
//!
//! Polls a set of registers on a remote industrial controller over
//! Modbus/TCP, caches the latest complete reading, exposes it (and a small
//! operator message) over a local JSON status endpoint, and mirrors each
//! reading to two optional outbound sinks.
//!
//! # Components
//!
//! - [`poller`] - the poll loop: read, decode, publish, forward, sleep
//! - [`transport`] - the pluggable register transport and its Modbus/TCP impl
//! - [`decode`] - raw register words to typed values
//! - [`reading`] - the reading snapshot and the shared state cell
//! - [`forwarder`] - best-effort bulletin and cloud sinks
//! - [`http`] - the local status server
//! - [`config`] - JSON5 configuration
//! - [`error`] - error taxonomy

pub mod config;
pub mod decode;
pub mod error;
pub mod forwarder;
pub mod http;
pub mod poller;
pub mod reading;
pub mod transport;

// Re-export commonly used types at the crate root
pub use config::{GatewayConfig, LogFormat, LoggingConfig, RegisterMap, RegisterSpec};
pub use error::{CycleError, DecodeError, ForwarderError, ReadError, TransportError};
pub use forwarder::{BulletinForwarder, CloudForwarder, Forwarders};
pub use http::StatusServer;
pub use poller::Poller;
pub use reading::{Reading, SharedState};
pub use transport::{ModbusTransport, RegisterConnection, RegisterTransport};
