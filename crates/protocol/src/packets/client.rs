//! Client -> Server packet parsing.

use super::ClientOpcode;
use crate::{BinaryReader, BinaryWriter, ProtocolError};
use bytes::Bytes;

/// Parsed client packet.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    /// Join game (0x00) with a display name.
    Join { name: String },
    /// Move by a relative delta (0x10).
    Move { delta_x: f32, delta_y: f32 },
    /// Chat message (0x63); the payload is not interpreted.
    Chat { payload: Bytes },
}

impl ClientPacket {
    /// Parse a client packet from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = BinaryReader::new(Bytes::copy_from_slice(data));
        let opcode = reader.get_u8().map_err(|_| ProtocolError::Empty)?;

        match opcode {
            0x00 => Ok(ClientPacket::Join {
                name: reader.get_string_utf8(),
            }),
            0x10 => {
                if data.len() != 9 {
                    return Err(ProtocolError::InvalidLength {
                        opcode,
                        len: data.len(),
                    });
                }
                let delta_x = reader.get_f32()?;
                let delta_y = reader.get_f32()?;
                if !delta_x.is_finite() || !delta_y.is_finite() {
                    return Err(ProtocolError::NonFiniteDelta);
                }
                Ok(ClientPacket::Move { delta_x, delta_y })
            }
            0x63 => Ok(ClientPacket::Chat {
                payload: reader.get_rest(),
            }),
            _ => Err(ProtocolError::InvalidOpcode(opcode)),
        }
    }

    /// Encode this packet the way a client would send it.
    pub fn encode(&self) -> BinaryWriter {
        let mut w = BinaryWriter::new();
        match self {
            ClientPacket::Join { name } => {
                w.put_u8(ClientOpcode::Join as u8);
                w.put_string_utf8(name);
            }
            ClientPacket::Move { delta_x, delta_y } => {
                w.put_u8(ClientOpcode::Move as u8);
                w.put_f32(*delta_x);
                w.put_f32(*delta_y);
            }
            ClientPacket::Chat { payload } => {
                w.put_u8(ClientOpcode::Chat as u8);
                w.put_slice(payload);
            }
        }
        w
    }
}
