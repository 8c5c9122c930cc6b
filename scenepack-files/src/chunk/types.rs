use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use scenepack_files_derive_parseable::{Parse, Write};

/// `0x3285130105`, written little endian as the first eight bytes of every chunk file.
pub const CHUNK_MAGIC: u64 = 0x0032_8513_0105;
pub const CHUNK_FORMAT_VERSION: u32 = 1;

/// magic (8) + version (4) + resource count (4)
pub const CHUNK_HEADER_SIZE: usize = 16;
/// resource type (4) + identifier (4) + payload size (8)
pub const RECORD_HEADER_SIZE: usize = 16;
/// semantic (4)
pub const VERTEX_STREAM_HEADER_SIZE: usize = 4;
/// width (4) + height (4) + flags (4) + mip count (4) + format (4)
pub const IMAGE_HEADER_SIZE: usize = 20;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Parse, Write)]
pub struct ChunkHeader {
    pub magic: u64,
    pub version: u32,
    pub resource_count: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum ResourceType {
    Generic = 0,
    VertexStream = 1,
    Image = 2,
}

/// Precedes every payload. `resource_type` selects which (if any) sub header follows before the payload bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Parse, Write)]
pub struct RecordHeader {
    pub resource_type: u32,
    pub identifier: u32,
    pub size: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum VertexSemantic {
    Positions = 0,
    TexCoords = 1,
    Normals = 2,
    Tangents = 3,
    Bitangents = 4,
}

impl VertexSemantic {
    pub const ALL: [VertexSemantic; 5] = [
        VertexSemantic::Positions,
        VertexSemantic::TexCoords,
        VertexSemantic::Normals,
        VertexSemantic::Tangents,
        VertexSemantic::Bitangents,
    ];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Parse, Write)]
pub(crate) struct VertexStreamHeader {
    pub semantic: u32,
}

/// The pixel layout of every mip level of an image payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
pub enum ImageFormat {
    R8 = 0,
    Rg8 = 1,
    Rgba8 = 2,
    Bc1 = 3,
    Bc3 = 4,
    Bc4 = 5,
    Bc5 = 6,
}

impl ImageFormat {
    pub fn is_block_compressed(self) -> bool {
        matches!(
            self,
            ImageFormat::Bc1 | ImageFormat::Bc3 | ImageFormat::Bc4 | ImageFormat::Bc5
        )
    }

    /// Size in bytes of one mip level with the given dimensions, `None` if it does not fit into memory.
    pub fn level_size(self, width: u32, height: u32) -> Option<usize> {
        let (width, height) = (width.max(1) as usize, height.max(1) as usize);
        let blocks = width.div_ceil(4).checked_mul(height.div_ceil(4))?;
        match self {
            ImageFormat::R8 => width.checked_mul(height),
            ImageFormat::Rg8 => width.checked_mul(height)?.checked_mul(2),
            ImageFormat::Rgba8 => width.checked_mul(height)?.checked_mul(4),
            ImageFormat::Bc1 | ImageFormat::Bc4 => blocks.checked_mul(8),
            ImageFormat::Bc3 | ImageFormat::Bc5 => blocks.checked_mul(16),
        }
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ImageFlags: u32 {
        /// Colour data that has to be sampled with an sRGB view.
        const SRGB = 1 << 0;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub flags: ImageFlags,
    pub mip_count: u32,
    pub format: ImageFormat,
}

impl ImageHeader {
    pub fn is_srgb(&self) -> bool {
        self.flags.contains(ImageFlags::SRGB)
    }

    /// The length of the full mip chain: down to 1x1, one level per halving of the larger side.
    pub fn max_mip_count(&self) -> u32 {
        u32::BITS - self.width.max(self.height).leading_zeros()
    }

    /// The payload size a well-formed image with this header has. `None` for headers no image can have.
    pub fn expected_payload_size(&self) -> Option<usize> {
        if self.width == 0 || self.height == 0 || self.mip_count == 0 || self.mip_count > self.max_mip_count() {
            return None;
        }

        (0..self.mip_count).try_fold(0usize, |size, mip| {
            let level = self
                .format
                .level_size(self.width.checked_shr(mip)?, self.height.checked_shr(mip)?)?;
            size.checked_add(level)
        })
    }
}

/// On-disk representation of [`ImageHeader`], enums and flags still in their raw form.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Parse, Write)]
pub(crate) struct RawImageHeader {
    pub width: u32,
    pub height: u32,
    pub flags: u32,
    pub mip_count: u32,
    pub format: u32,
}

impl From<&ImageHeader> for RawImageHeader {
    fn from(value: &ImageHeader) -> Self {
        RawImageHeader {
            width: value.width,
            height: value.height,
            flags: value.flags.bits(),
            mip_count: value.mip_count,
            format: value.format.into(),
        }
    }
}

impl TryFrom<RawImageHeader> for ImageHeader {
    type Error = crate::ChunkError;

    fn try_from(value: RawImageHeader) -> Result<Self, Self::Error> {
        let format = ImageFormat::try_from(value.format)
            .map_err(|_| crate::ChunkError::UnknownImageFormat { format: value.format })?;

        let header = ImageHeader {
            width: value.width,
            height: value.height,
            flags: ImageFlags::from_bits_retain(value.flags),
            mip_count: value.mip_count,
            format,
        };

        if header.expected_payload_size().is_none() {
            return Err(crate::ChunkError::FormatError {
                reason: "Image dimensions or mip count out of range",
            });
        }

        Ok(header)
    }
}

/// A view into the backing buffer of a chunk: never owns the bytes, only points at them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: usize,
    pub len: usize,
}

impl ByteRange {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}
