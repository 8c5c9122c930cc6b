use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::ChunkError;

pub(crate) trait Parseable<T> {
    fn parse<R: Read>(rdr: &mut R) -> Result<T, ChunkError>;
}

impl Parseable<u32> for u32 {
    fn parse<R: Read>(rdr: &mut R) -> Result<u32, ChunkError> {
        Ok(rdr.read_u32::<LittleEndian>()?)
    }
}

impl Parseable<u64> for u64 {
    fn parse<R: Read>(rdr: &mut R) -> Result<u64, ChunkError> {
        Ok(rdr.read_u64::<LittleEndian>()?)
    }
}

/// Reads a fixed-layout value from the front of `bytes`, failing with `reason` instead of an EOF when the slice is
/// too short.
pub(crate) fn parse_prefix<T: Parseable<T>>(bytes: &[u8], reason: &'static str) -> Result<T, ChunkError> {
    let mut rdr = bytes;
    match T::parse(&mut rdr) {
        Err(ChunkError::IOError(internal)) if internal.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ChunkError::FormatError { reason })
        }
        res => res,
    }
}
