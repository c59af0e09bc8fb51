//! Hermes Gateway
//!
//! Transport layer for the Hermes trading runtime. Provides:
//! - Transport abstraction (tokio channels, with traits for remote transports)
//! - Wire codec with pluggable payload compression
//! - Venue adapters (simulated execution client and data feed)
//!
//! ## Transport
//!
//! Commands flow strategy → gateway, events flow gateway → strategy; the two
//! directions never share a channel. Single-process mode runs over tokio
//! channels; the `Publisher`/`Subscriber`/`Requester` traits allow plugging in
//! remote transports without touching the coordination core, which treats all
//! wire payloads as opaque byte sequences.

pub mod adapters;
pub mod error;
pub mod transport;
pub mod wire;

// Re-export commonly used types
pub use adapters::sim::{SimDataFeed, SimExecutionClient, SimVenueStreams};
pub use error::{GatewayError, TransportError};
pub use transport::{
    Publisher, Requester, Subscriber,
    channel::{ChannelPublisher, ChannelRequester, ChannelResponder, ChannelSubscriber},
};
pub use wire::{Compressor, NoopCompressor, WireCodec, WireFormat};
