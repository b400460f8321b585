//! Wire protocol for the bubble arena server.
//!
//! This crate contains:
//! - Checked little-endian reading/writing utilities
//! - Client packet parsing and server packet builders
//! - Shared primitive types

mod binary;
mod error;
pub mod packets;

pub use binary::{BinaryReader, BinaryWriter};
pub use error::ProtocolError;

/// A 2D position in arena space.
pub type Position = glam::Vec2;
