//! Line-delimited JSON front end over TCP
//!
//! Collectors post frames, dashboards query history, and live observers
//! subscribe, all on the same port. See [`request`] for the message set.

pub mod config;
pub mod listener;
pub mod request;
pub mod session;

pub use config::ServerConfig;
pub use listener::FrameServer;
pub use request::{ErrorKind, Reply, Request, Response};
pub use session::subscriber_id;
