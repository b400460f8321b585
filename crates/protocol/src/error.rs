//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding a client packet.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("Empty packet")]
    Empty,

    #[error("Invalid packet opcode: {0:#04x}")]
    InvalidOpcode(u8),

    #[error("Unexpected end of data")]
    UnexpectedEof,

    #[error("Invalid length {len} for opcode {opcode:#04x}")]
    InvalidLength { opcode: u8, len: usize },

    #[error("Non-finite movement delta")]
    NonFiniteDelta,
}
