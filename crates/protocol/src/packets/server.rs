//! Server -> Client packet building and decoding.

use super::ServerOpcode;
use crate::{BinaryReader, BinaryWriter, Position, ProtocolError};
use bytes::Bytes;

/// One player as it appears in a roster packet.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub id: u32,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub score: u32,
}

/// Build a Roster packet (0x10).
pub fn build_roster(entries: &[RosterEntry]) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(5 + entries.len() * 24);
    w.put_u8(ServerOpcode::Roster as u8);
    w.put_u32(entries.len() as u32);
    for entry in entries {
        w.put_u32(entry.id);
        w.put_string_utf8(&entry.name);
        w.put_f32(entry.x);
        w.put_f32(entry.y);
        w.put_u32(entry.score);
    }
    w
}

/// Build a FoodUpdate packet (0x11).
pub fn build_food_update(food: Position) -> BinaryWriter {
    let mut w = BinaryWriter::with_capacity(9);
    w.put_u8(ServerOpcode::FoodUpdate as u8);
    w.put_f32(food.x);
    w.put_f32(food.y);
    w
}

/// Build a FoodEaten packet (0x12).
pub fn build_food_eaten(player_id: u32, player_name: &str, new_score: u32, new_food: Position) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(ServerOpcode::FoodEaten as u8);
    w.put_u32(player_id);
    w.put_string_utf8(player_name);
    w.put_u32(new_score);
    w.put_f32(new_food.x);
    w.put_f32(new_food.y);
    w
}

/// Build a PlayerEaten packet (0x13).
pub fn build_player_eaten(
    eater_id: u32,
    eater_name: &str,
    eater_new_score: u32,
    victim_id: u32,
    victim_name: &str,
    victim_old_score: u32,
) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(ServerOpcode::PlayerEaten as u8);
    w.put_u32(eater_id);
    w.put_string_utf8(eater_name);
    w.put_u32(eater_new_score);
    w.put_u32(victim_id);
    w.put_string_utf8(victim_name);
    w.put_u32(victim_old_score);
    w
}

/// Build a JoinRejected packet (0x20).
pub fn build_join_rejected(reason: &str) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(ServerOpcode::JoinRejected as u8);
    w.put_string_utf8(reason);
    w
}

/// Build a ChatLog packet (0x63) carrying every retained entry.
pub fn build_chat_log<'a>(entries: impl ExactSizeIterator<Item = &'a [u8]>) -> BinaryWriter {
    let mut w = BinaryWriter::new();
    w.put_u8(ServerOpcode::ChatLog as u8);
    w.put_u32(entries.len() as u32);
    for entry in entries {
        w.put_blob(entry);
    }
    w
}

/// Decoded server packet, as seen by a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    Roster(Vec<RosterEntry>),
    FoodUpdate(Position),
    FoodEaten {
        player_id: u32,
        player_name: String,
        new_score: u32,
        new_food: Position,
    },
    PlayerEaten {
        eater_id: u32,
        eater_name: String,
        eater_new_score: u32,
        victim_id: u32,
        victim_name: String,
        victim_old_score: u32,
    },
    JoinRejected(String),
    ChatLog(Vec<Bytes>),
}

impl ServerPacket {
    /// Parse a server packet from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        let mut r = BinaryReader::new(Bytes::copy_from_slice(data));
        let opcode = r.get_u8().map_err(|_| ProtocolError::Empty)?;

        let packet = match opcode {
            0x10 => {
                let count = r.get_u32()? as usize;
                // Each entry is at least 17 bytes; don't trust the count for allocation.
                let mut entries = Vec::with_capacity(count.min(r.remaining() / 17));
                for _ in 0..count {
                    entries.push(RosterEntry {
                        id: r.get_u32()?,
                        name: r.get_string_utf8(),
                        x: r.get_f32()?,
                        y: r.get_f32()?,
                        score: r.get_u32()?,
                    });
                }
                ServerPacket::Roster(entries)
            }
            0x11 => {
                let x = r.get_f32()?;
                let y = r.get_f32()?;
                ServerPacket::FoodUpdate(Position::new(x, y))
            }
            0x12 => {
                let player_id = r.get_u32()?;
                let player_name = r.get_string_utf8();
                let new_score = r.get_u32()?;
                let x = r.get_f32()?;
                let y = r.get_f32()?;
                ServerPacket::FoodEaten {
                    player_id,
                    player_name,
                    new_score,
                    new_food: Position::new(x, y),
                }
            }
            0x13 => ServerPacket::PlayerEaten {
                eater_id: r.get_u32()?,
                eater_name: r.get_string_utf8(),
                eater_new_score: r.get_u32()?,
                victim_id: r.get_u32()?,
                victim_name: r.get_string_utf8(),
                victim_old_score: r.get_u32()?,
            },
            0x20 => ServerPacket::JoinRejected(r.get_string_utf8()),
            0x63 => {
                let count = r.get_u32()? as usize;
                let mut entries = Vec::with_capacity(count.min(r.remaining() / 4));
                for _ in 0..count {
                    entries.push(r.get_blob()?);
                }
                ServerPacket::ChatLog(entries)
            }
            _ => return Err(ProtocolError::InvalidOpcode(opcode)),
        };
        Ok(packet)
    }
}
