//! # Error Types
//!
//! This module defines the error types used throughout the fleet link,
//! from transport-level failures to wire-format violations.

use crate::transport;

/// The primary error enum for the fleet link.
///
/// It is generic over the transport error type `E`, allowing it to wrap
/// specific errors from the underlying network transport (e.g., TCP, cellular).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError<E> {
    /// The broker refused the session or the network never came up.
    ConnectFailed(E),
    /// An error occurred in the underlying transport layer.
    Transport(E),
    /// The operation needs a live session and there is none.
    NotConnected,
    /// A topic or payload does not fit the compile-time buffers.
    BufferTooSmall,
}

/// Implements the `From` trait to allow for automatic conversion of any
/// transport error into a `LinkError`. This is what allows the `?` operator
/// to work seamlessly on `Result`s from the transport layer.
impl<E: transport::TransportError> From<E> for LinkError<E> {
    fn from(err: E) -> Self {
        LinkError::Transport(err)
    }
}

/// Errors produced while encoding or decoding wire payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProtoError {
    /// The payload is not valid JSON or is missing a required field.
    Malformed,
    /// A well-formed command envelope named a verb we do not know.
    UnknownCommand,
    /// The encoded output exceeds the provided buffer.
    BufferTooSmall,
}

impl core::fmt::Display for ProtoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            ProtoError::Malformed => "malformed payload",
            ProtoError::UnknownCommand => "unknown command",
            ProtoError::BufferTooSmall => "buffer too small",
        };
        f.write_str(text)
    }
}
