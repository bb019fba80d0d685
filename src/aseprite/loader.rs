//! Single-pass decoder for the `.aseprite` byte layout
//!
//! The file is a 128-byte header followed by one record per frame; each frame
//! declares its byte length and carries a stream of length-prefixed chunks.
//! All multi-byte fields are little-endian.

use thiserror::Error;

use crate::aseprite::chunks::{self, Chunk, FrameTagsChunk, LayerChunk};
use crate::aseprite::tags::AsepriteTag;

const HEADER_MAGIC: u16 = 0xA5E0;
const FRAME_MAGIC: u16 = 0xF1FA;
const HEADER_LEN: usize = 128;
const FRAME_HEADER_LEN: usize = 16;
const CHUNK_HEADER_LEN: usize = 6;

/// Error type for aseprite parse failures.
///
/// Any of these aborts processing of the file that produced it; the caller
/// logs and continues with other files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("truncated file: needed {needed} bytes at offset {offset}, {remaining} remain")]
    Truncated { offset: usize, needed: usize, remaining: usize },
    #[error("bad magic number: expected {expected:#06x}, found {found:#06x}")]
    BadMagic { expected: u16, found: u16 },
    #[error("chunk {chunk_type:#06x} declares {declared} payload bytes but decoder read past them")]
    ChunkOverrun { chunk_type: u16, declared: u32 },
    #[error("chunk header declares {declared} bytes but only {remaining} remain in frame")]
    ChunkTooLong { declared: u32, remaining: usize },
    #[error("string field is not valid UTF-8")]
    BadString,
    #[error("tag '{name}' range {start}..={end} is invalid for {num_frames} frames")]
    BadTagRange { name: String, start: u16, end: u16, num_frames: u16 },
}

/// A forward-only reader over the raw byte buffer.
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ParseError> {
        if self.remaining() < len {
            return Err(ParseError::Truncated {
                offset: self.pos,
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ParseError> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ParseError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a u16-length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, ParseError> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| ParseError::BadString)
    }
}

/// File header fields the assistant uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsepriteHeader {
    pub file_size: u32,
    pub num_frames: u16,
    pub width: u16,
    pub height: u16,
}

/// One frame record: its decoded chunks plus the raw frame bytes, kept for
/// content hashing.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub chunks: Vec<Chunk>,
    pub raw: Vec<u8>,
}

/// A fully parsed aseprite file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAsepriteFile {
    pub header: AsepriteHeader,
    pub frames: Vec<Frame>,
}

impl RawAsepriteFile {
    /// Decode a byte buffer into frames of typed chunks.
    ///
    /// Unknown chunk types are skipped without error; malformed length
    /// fields, bad magic numbers, and out-of-range tags are fatal.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut cursor = ByteCursor::new(data);
        let header = parse_header(&mut cursor)?;

        let mut frames = Vec::with_capacity(header.num_frames as usize);
        for _ in 0..header.num_frames {
            frames.push(parse_frame(&mut cursor)?);
        }

        let file = Self { header, frames };
        file.validate_tags()?;
        Ok(file)
    }

    pub fn num_frames(&self) -> u16 {
        self.header.num_frames
    }

    /// All tags across the file, in chunk order.
    pub fn tags(&self) -> Vec<&AsepriteTag> {
        self.frames
            .iter()
            .flat_map(|frame| &frame.chunks)
            .filter_map(|chunk| match chunk {
                Chunk::FrameTags(FrameTagsChunk { tags }) => Some(tags.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// All layer chunks in file order.
    pub fn layers(&self) -> Vec<&LayerChunk> {
        self.frames
            .iter()
            .flat_map(|frame| &frame.chunks)
            .filter_map(|chunk| match chunk {
                Chunk::Layer(layer) => Some(layer),
                _ => None,
            })
            .collect()
    }

    /// Raw bytes of the inclusive frame range, concatenated.
    ///
    /// This is the input to anim content hashing; anything that changes a
    /// frame's serialized bytes changes the hash.
    pub fn frame_range_bytes(&self, start: u16, end: u16) -> Vec<u8> {
        let start = start as usize;
        let end = (end as usize).min(self.frames.len().saturating_sub(1));
        let mut bytes = Vec::new();
        for frame in self.frames.iter().take(end + 1).skip(start) {
            bytes.extend_from_slice(&frame.raw);
        }
        bytes
    }

    fn validate_tags(&self) -> Result<(), ParseError> {
        for tag in self.tags() {
            if tag.start > tag.end || tag.end >= self.header.num_frames {
                return Err(ParseError::BadTagRange {
                    name: tag.name.clone(),
                    start: tag.start,
                    end: tag.end,
                    num_frames: self.header.num_frames,
                });
            }
        }
        Ok(())
    }
}

fn parse_header(cursor: &mut ByteCursor) -> Result<AsepriteHeader, ParseError> {
    let start = cursor.position();
    let file_size = cursor.read_u32()?;
    let magic = cursor.read_u16()?;
    if magic != HEADER_MAGIC {
        return Err(ParseError::BadMagic { expected: HEADER_MAGIC, found: magic });
    }
    let num_frames = cursor.read_u16()?;
    let width = cursor.read_u16()?;
    let height = cursor.read_u16()?;

    // The header occupies a fixed 128 bytes; the rest holds fields the
    // assistant doesn't need.
    cursor.skip(HEADER_LEN - (cursor.position() - start))?;
    Ok(AsepriteHeader { file_size, num_frames, width, height })
}

fn parse_frame(cursor: &mut ByteCursor) -> Result<Frame, ParseError> {
    let frame_start = cursor.position();
    let frame_bytes = cursor.read_u32()? as usize;
    let magic = cursor.read_u16()?;
    if magic != FRAME_MAGIC {
        return Err(ParseError::BadMagic { expected: FRAME_MAGIC, found: magic });
    }
    let old_chunk_count = cursor.read_u16()?;
    let _duration_ms = cursor.read_u16()?;
    cursor.skip(2)?; // reserved
    let new_chunk_count = cursor.read_u32()?;

    let chunk_count =
        if new_chunk_count == 0 { old_chunk_count as u32 } else { new_chunk_count };

    if frame_bytes < FRAME_HEADER_LEN || frame_bytes > FRAME_HEADER_LEN + cursor.remaining() {
        return Err(ParseError::Truncated {
            offset: frame_start,
            needed: frame_bytes,
            remaining: cursor.remaining() + FRAME_HEADER_LEN,
        });
    }
    let frame_end = frame_start + frame_bytes;

    let mut chunks = Vec::with_capacity(chunk_count as usize);
    for _ in 0..chunk_count {
        let chunk_len = cursor.read_u32()?;
        let chunk_type = cursor.read_u16()?;
        if (chunk_len as usize) < CHUNK_HEADER_LEN
            || cursor.position() + chunk_len as usize - CHUNK_HEADER_LEN > frame_end
        {
            return Err(ParseError::ChunkTooLong {
                declared: chunk_len,
                remaining: frame_end.saturating_sub(cursor.position()),
            });
        }
        let payload_len = chunk_len - CHUNK_HEADER_LEN as u32;
        chunks.push(chunks::decode_chunk(cursor, chunk_type, payload_len)?);
    }

    // Padding after the last chunk still belongs to this frame.
    cursor.skip(frame_end.saturating_sub(cursor.position()))?;

    let raw = cursor.buf[frame_start..frame_end].to_vec();
    Ok(Frame { chunks, raw })
}
