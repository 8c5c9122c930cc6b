use std::collections::HashMap;

use crate::ChunkError;
use crate::chunk::types::{
    ByteRange, CHUNK_FORMAT_VERSION, CHUNK_HEADER_SIZE, CHUNK_MAGIC, ChunkHeader, IMAGE_HEADER_SIZE, ImageHeader,
    RECORD_HEADER_SIZE, RawImageHeader, RecordHeader, ResourceType, VERTEX_STREAM_HEADER_SIZE, VertexSemantic,
    VertexStreamHeader,
};
use crate::common::reader::parse_prefix;

/// The result of walking a chunk's record stream once: where every payload lives, nothing copied.
#[derive(Debug, Default)]
pub(crate) struct ChunkIndex {
    pub generic: HashMap<u32, ByteRange>,
    pub vertex_streams: HashMap<VertexSemantic, ByteRange>,
    pub images: Vec<(ImageHeader, ByteRange)>,
}

pub struct ChunkReader {}

impl ChunkReader {
    pub fn parse_header(data: &[u8]) -> Result<ChunkHeader, ChunkError> {
        if data.len() < CHUNK_HEADER_SIZE {
            return Err(ChunkError::FormatError {
                reason: "File is smaller than the chunk header",
            });
        }

        let header: ChunkHeader = parse_prefix(data, "File is smaller than the chunk header")?;
        if header.magic != CHUNK_MAGIC {
            return Err(ChunkError::InvalidMagicValue { magic: header.magic });
        }

        if header.version != CHUNK_FORMAT_VERSION {
            return Err(ChunkError::UnsupportedVersion {
                version: header.version,
                supported: CHUNK_FORMAT_VERSION,
            });
        }

        Ok(header)
    }

    pub(crate) fn index(data: &[u8]) -> Result<ChunkIndex, ChunkError> {
        let header = Self::parse_header(data)?;

        let mut index = ChunkIndex::default();
        let mut cursor = CHUNK_HEADER_SIZE;

        for _ in 0..header.resource_count {
            let record: RecordHeader = parse_prefix(&data[cursor..], "Truncated record header")?;
            cursor += RECORD_HEADER_SIZE;

            let resource_type = ResourceType::try_from(record.resource_type).map_err(|_| {
                ChunkError::UnknownResourceType {
                    tag: record.resource_type,
                }
            })?;

            match resource_type {
                ResourceType::Generic => {
                    let range = Self::payload_range(data, cursor, record.size)?;
                    index.generic.insert(record.identifier, range);
                    cursor = range.end();
                }
                ResourceType::VertexStream => {
                    let sub_header: VertexStreamHeader =
                        parse_prefix(&data[cursor..], "Truncated vertex stream header")?;
                    cursor += VERTEX_STREAM_HEADER_SIZE;

                    let semantic = VertexSemantic::try_from(sub_header.semantic).map_err(|_| {
                        ChunkError::UnknownVertexSemantic {
                            semantic: sub_header.semantic,
                        }
                    })?;

                    let range = Self::payload_range(data, cursor, record.size)?;
                    index.vertex_streams.insert(semantic, range);
                    cursor = range.end();
                }
                ResourceType::Image => {
                    let raw: RawImageHeader = parse_prefix(&data[cursor..], "Truncated image header")?;
                    cursor += IMAGE_HEADER_SIZE;

                    let image_header = ImageHeader::try_from(raw)?;
                    let range = Self::payload_range(data, cursor, record.size)?;
                    index.images.push((image_header, range));
                    cursor = range.end();
                }
            }
        }

        if cursor != data.len() {
            return Err(ChunkError::FormatError {
                reason: "Trailing bytes after the last record",
            });
        }

        Ok(index)
    }

    fn payload_range(data: &[u8], offset: usize, size: u64) -> Result<ByteRange, ChunkError> {
        let out_of_bounds = ChunkError::RecordOutOfBounds {
            offset: offset as u64,
            size,
            len: data.len() as u64,
        };

        let len = usize::try_from(size).map_err(|_| ChunkError::RecordOutOfBounds {
            offset: offset as u64,
            size,
            len: data.len() as u64,
        })?;

        match offset.checked_add(len) {
            Some(end) if end <= data.len() => Ok(ByteRange { offset, len }),
            _ => Err(out_of_bounds),
        }
    }
}
