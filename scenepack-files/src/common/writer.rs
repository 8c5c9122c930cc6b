use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::ChunkError;

/// The counterpart to [`crate::common::reader::Parseable`]: everything that can be parsed from a chunk can be
/// written back in the very same layout.
pub(crate) trait Writable {
    fn write<W: Write>(&self, wtr: &mut W) -> Result<(), ChunkError>;
}

impl Writable for u32 {
    fn write<W: Write>(&self, wtr: &mut W) -> Result<(), ChunkError> {
        Ok(wtr.write_u32::<LittleEndian>(*self)?)
    }
}

impl Writable for u64 {
    fn write<W: Write>(&self, wtr: &mut W) -> Result<(), ChunkError> {
        Ok(wtr.write_u64::<LittleEndian>(*self)?)
    }
}
