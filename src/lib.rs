//! Infrared remote-control frame hub
//!
//! Field collectors capture infrared transmissions as timing pulses and post
//! them here. Each frame is classified against the known protocols, kept in
//! an in-memory history keyed by collector, protocol and value, and pushed
//! to every live subscriber.
//!
//! - [`protocol`]: pure decoding of pulses into a protocol and value
//! - [`store`]: the frame history, subscriber fan-out and access coordination
//! - [`server`]: a line-delimited JSON front end over TCP
//!
//! # Example
//!
//! ```no_run
//! use irhub::{FrameServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> irhub::Result<()> {
//!     let server = FrameServer::new(ServerConfig::default());
//!     server.run().await
//! }
//! ```

pub mod error;
pub mod frame;
pub mod protocol;
pub mod server;
pub mod store;

pub use error::{Error, Result};
pub use frame::{FrameRecord, NewFrameEvent, Pulse, RawFrame, TaggedFrame};
pub use protocol::{decode, Decoded, DecodeError, MarkPolicy, ProtocolId};
pub use server::{FrameServer, ServerConfig};
pub use store::{
    AccessCoordinator, DeliveryPolicy, FrameNotifier, FrameRepository, FrameStore, StoreConfig,
};
