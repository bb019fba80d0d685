//! Typed chunk decoding for the aseprite binary format
//!
//! Each chunk in a frame's chunk stream is a length-prefixed record with a
//! 2-byte type tag. Only the chunk types the assistant needs are decoded;
//! everything else becomes [`Chunk::Unknown`] and is skipped by consuming
//! its declared length, so new format revisions don't break parsing.

use crate::aseprite::loader::{ByteCursor, ParseError};
use crate::aseprite::tags::{AsepriteTag, TagColor};

pub const LAYER_CHUNK_TYPE: u16 = 0x2004;
pub const CEL_CHUNK_TYPE: u16 = 0x2005;
pub const FRAME_TAGS_CHUNK_TYPE: u16 = 0x2018;

/// Layer type field values from the layer chunk.
pub const NORMAL_LAYER_TYPE: u16 = 0;
pub const GROUP_LAYER_TYPE: u16 = 1;

/// One decoded chunk from a frame's chunk stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Layer(LayerChunk),
    Cel(CelChunk),
    FrameTags(FrameTagsChunk),
    /// A chunk type the assistant doesn't decode; length recorded so the
    /// stream position stays consistent.
    Unknown { chunk_type: u16, len: u32 },
}

/// A layer record (chunk type `0x2004`).
#[derive(Debug, Clone, PartialEq)]
pub struct LayerChunk {
    pub flags: u16,
    pub layer_type: u16,
    pub name: String,
}

impl LayerChunk {
    /// Bit 0 of the flags is the visibility bit.
    pub fn is_visible(&self) -> bool {
        self.flags % 2 == 1
    }

    pub fn is_group(&self) -> bool {
        self.layer_type == GROUP_LAYER_TYPE
    }
}

/// Frame pixel data (chunk type `0x2005`).
///
/// The payload is opaque to the assistant; the raw bytes are kept only so
/// anim freshness hashing can see pixel changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CelChunk {
    pub data: Vec<u8>,
}

/// The ordered tag list (chunk type `0x2018`).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameTagsChunk {
    pub tags: Vec<AsepriteTag>,
}

/// Decode one chunk payload. `payload_len` is the declared chunk length
/// minus the 6-byte chunk header.
pub fn decode_chunk(
    cursor: &mut ByteCursor,
    chunk_type: u16,
    payload_len: u32,
) -> Result<Chunk, ParseError> {
    let end = cursor.position() + payload_len as usize;
    let chunk = match chunk_type {
        LAYER_CHUNK_TYPE => Chunk::Layer(decode_layer(cursor)?),
        CEL_CHUNK_TYPE => Chunk::Cel(CelChunk { data: cursor.read_bytes(payload_len as usize)?.to_vec() }),
        FRAME_TAGS_CHUNK_TYPE => Chunk::FrameTags(decode_frame_tags(cursor)?),
        other => {
            cursor.skip(payload_len as usize)?;
            Chunk::Unknown { chunk_type: other, len: payload_len }
        }
    };

    // A decoder reading past the declared length means the length field and
    // the payload disagree, which is fatal for this file.
    if cursor.position() > end {
        return Err(ParseError::ChunkOverrun { chunk_type, declared: payload_len });
    }
    // Trailing payload bytes (fields newer than this decoder) are skipped.
    cursor.skip(end - cursor.position())?;
    Ok(chunk)
}

fn decode_layer(cursor: &mut ByteCursor) -> Result<LayerChunk, ParseError> {
    let flags = cursor.read_u16()?;
    let layer_type = cursor.read_u16()?;
    let _child_level = cursor.read_u16()?;
    let _default_width = cursor.read_u16()?;
    let _default_height = cursor.read_u16()?;
    let _blend_mode = cursor.read_u16()?;
    let _opacity = cursor.read_u8()?;
    cursor.skip(3)?; // reserved
    let name = cursor.read_string()?;
    Ok(LayerChunk { flags, layer_type, name })
}

fn decode_frame_tags(cursor: &mut ByteCursor) -> Result<FrameTagsChunk, ParseError> {
    let count = cursor.read_u16()?;
    cursor.skip(8)?; // reserved
    let mut tags = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let start = cursor.read_u16()?;
        let end = cursor.read_u16()?;
        let _loop_direction = cursor.read_u8()?;
        cursor.skip(8)?; // reserved
        let r = cursor.read_u8()?;
        let g = cursor.read_u8()?;
        let b = cursor.read_u8()?;
        let _extra = cursor.read_u8()?;
        let name = cursor.read_string()?;
        tags.push(AsepriteTag { name, start, end, color: TagColor::from_rgb(r, g, b) });
    }
    Ok(FrameTagsChunk { tags })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer_payload(flags: u16, layer_type: u16, name: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&flags.to_le_bytes());
        buf.extend_from_slice(&layer_type.to_le_bytes());
        buf.extend_from_slice(&[0u8; 8]); // child level, default w/h, blend mode
        buf.push(255); // opacity
        buf.extend_from_slice(&[0u8; 3]); // reserved
        buf.extend_from_slice(&(name.len() as u16).to_le_bytes());
        buf.extend_from_slice(name.as_bytes());
        buf
    }

    #[test]
    fn test_decode_layer_chunk() {
        let payload = layer_payload(3, NORMAL_LAYER_TYPE, "HURTBOX");
        let mut cursor = ByteCursor::new(&payload);
        let chunk = decode_chunk(&mut cursor, LAYER_CHUNK_TYPE, payload.len() as u32).unwrap();
        match chunk {
            Chunk::Layer(layer) => {
                assert_eq!(layer.name, "HURTBOX");
                assert!(layer.is_visible());
                assert!(!layer.is_group());
            }
            other => panic!("expected layer chunk, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_frame_tags_chunk() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u16.to_le_bytes()); // tag count
        payload.extend_from_slice(&[0u8; 8]);
        payload.extend_from_slice(&2u16.to_le_bytes()); // start
        payload.extend_from_slice(&3u16.to_le_bytes()); // end
        payload.push(0); // loop direction
        payload.extend_from_slice(&[0u8; 8]);
        payload.extend_from_slice(&[34, 177, 76, 0]); // green + extra byte
        payload.extend_from_slice(&4u16.to_le_bytes());
        payload.extend_from_slice(b"fair");

        let mut cursor = ByteCursor::new(&payload);
        let chunk =
            decode_chunk(&mut cursor, FRAME_TAGS_CHUNK_TYPE, payload.len() as u32).unwrap();
        match chunk {
            Chunk::FrameTags(tags) => {
                assert_eq!(
                    tags.tags,
                    vec![AsepriteTag {
                        name: "fair".to_string(),
                        start: 2,
                        end: 3,
                        color: TagColor::Green,
                    }]
                );
            }
            other => panic!("expected frame tags chunk, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_chunk_is_skipped() {
        let payload = vec![0xAB; 10];
        let mut cursor = ByteCursor::new(&payload);
        let chunk = decode_chunk(&mut cursor, 0x2007, 10).unwrap();
        assert_eq!(chunk, Chunk::Unknown { chunk_type: 0x2007, len: 10 });
        assert_eq!(cursor.position(), 10);
    }

    #[test]
    fn test_chunk_longer_than_buffer_is_fatal() {
        let payload = vec![0u8; 4];
        let mut cursor = ByteCursor::new(&payload);
        let result = decode_chunk(&mut cursor, 0x2007, 10);
        assert!(result.is_err());
    }

    #[test]
    fn test_trailing_payload_bytes_are_consumed() {
        // A layer chunk with 5 extra bytes after the name, as a newer format
        // revision might add.
        let mut payload = layer_payload(1, NORMAL_LAYER_TYPE, "body");
        payload.extend_from_slice(&[9u8; 5]);
        let mut cursor = ByteCursor::new(&payload);
        decode_chunk(&mut cursor, LAYER_CHUNK_TYPE, payload.len() as u32).unwrap();
        assert_eq!(cursor.position(), payload.len());
    }
}
