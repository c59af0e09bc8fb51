//! Transport abstraction layer
//!
//! Unified traits for message passing over tokio channels. The trait-based
//! design allows swapping in remote transports (NATS, ZeroMQ, etc.) without
//! changing any caller.

pub mod channel;

use crate::error::TransportError;
use async_trait::async_trait;

/// Publisher - sends messages to a topic/channel
#[async_trait]
pub trait Publisher<M>: Send + Sync
where
    M: Send + Sync,
{
    /// Publish a message
    async fn publish(&self, msg: &M) -> Result<(), TransportError>;
}

/// Subscriber - receives messages from a topic
#[async_trait]
pub trait Subscriber<M>: Send
where
    M: Send,
{
    /// Wait for the next message
    async fn next(&mut self) -> Result<M, TransportError>;

    /// Try to receive without blocking (returns None if no message available)
    fn try_next(&mut self) -> Result<Option<M>, TransportError>;
}

/// Request/Reply pattern for inquiry-style operations
#[async_trait]
pub trait Requester<Req, Res>: Send + Sync
where
    Req: Send + Sync,
    Res: Send,
{
    /// Send a request and wait for a response
    async fn request(&self, req: &Req) -> Result<Res, TransportError>;
}
