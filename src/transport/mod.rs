//! Outbound UI transport for transient progress notices.
//!
//! The dispatcher posts a notice before slow tool calls and retracts it
//! once the answer is ready. Transport calls are advisory: failures are
//! logged by the caller and never change the answer.

mod console;

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

pub use console::ConsoleTransport;

use crate::error::TransportError;

/// Identifies a posted notice so it can be retracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub u64);

/// Allocates increasing handles.
#[derive(Debug, Default)]
pub struct HandleSequence(AtomicU64);

impl HandleSequence {
    /// Returns the next handle.
    pub fn next(&self) -> MessageHandle {
        MessageHandle(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Chat or UI surface that can display and remove transient messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Displays `text` and returns a handle to it.
    async fn send(&self, text: &str) -> Result<MessageHandle, TransportError>;

    /// Removes a previously sent message.
    async fn retract(&self, handle: MessageHandle) -> Result<(), TransportError>;
}

/// Transport that displays nothing.
#[derive(Debug, Default)]
pub struct NullTransport {
    handles: HandleSequence,
}

#[async_trait]
impl Transport for NullTransport {
    async fn send(&self, _text: &str) -> Result<MessageHandle, TransportError> {
        Ok(self.handles.next())
    }

    async fn retract(&self, _handle: MessageHandle) -> Result<(), TransportError> {
        Ok(())
    }
}
