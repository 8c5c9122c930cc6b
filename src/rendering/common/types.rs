use std::fmt::{Debug, Formatter};

use glam::{Vec2, Vec3, Vec4};
use scenepack_files::chunk::types::VertexSemantic;

/// One attribute stream of a vertex array. All streams of an array have the same element count.
#[derive(Clone, PartialEq)]
pub enum VertexStream {
    Positions(Vec<Vec3>),
    TexCoords(Vec<Vec2>),
    Normals(Vec<Vec3>),
    Tangents(Vec<Vec4>),
    Bitangents(Vec<Vec3>),
}

impl VertexStream {
    pub fn semantic(&self) -> VertexSemantic {
        match self {
            VertexStream::Positions(_) => VertexSemantic::Positions,
            VertexStream::TexCoords(_) => VertexSemantic::TexCoords,
            VertexStream::Normals(_) => VertexSemantic::Normals,
            VertexStream::Tangents(_) => VertexSemantic::Tangents,
            VertexStream::Bitangents(_) => VertexSemantic::Bitangents,
        }
    }

    /// Size in bytes of a single element of a stream with the given semantic.
    pub fn element_size(semantic: VertexSemantic) -> usize {
        match semantic {
            VertexSemantic::Positions | VertexSemantic::Normals | VertexSemantic::Bitangents => size_of::<Vec3>(),
            VertexSemantic::TexCoords => size_of::<Vec2>(),
            VertexSemantic::Tangents => size_of::<Vec4>(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            VertexStream::Positions(v) | VertexStream::Normals(v) | VertexStream::Bitangents(v) => v.len(),
            VertexStream::TexCoords(v) => v.len(),
            VertexStream::Tangents(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tightly packed, little endian representation that is both uploaded and cached.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            VertexStream::Positions(v) | VertexStream::Normals(v) | VertexStream::Bitangents(v) => {
                bytemuck::cast_slice(v)
            }
            VertexStream::TexCoords(v) => bytemuck::cast_slice(v),
            VertexStream::Tangents(v) => bytemuck::cast_slice(v),
        }
    }

    /// Reorders the elements so that `new[i] = old[order[i]]`. `order` has to be a permutation.
    pub fn remap(&mut self, order: &[u32]) {
        fn apply<T: Copy>(data: &mut Vec<T>, order: &[u32]) {
            *data = order.iter().map(|&old| data[old as usize]).collect();
        }

        match self {
            VertexStream::Positions(v) | VertexStream::Normals(v) | VertexStream::Bitangents(v) => apply(v, order),
            VertexStream::TexCoords(v) => apply(v, order),
            VertexStream::Tangents(v) => apply(v, order),
        }
    }
}

impl Debug for VertexStream {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}[{}]", self.semantic(), self.len())
    }
}

/// A set of vertex streams, sorted by semantic, at most one per semantic.
#[derive(Clone, Default, PartialEq)]
pub struct VertexBuffers {
    pub streams: Vec<VertexStream>,
}

impl VertexBuffers {
    pub fn vertex_count(&self) -> usize {
        self.streams.first().map(VertexStream::len).unwrap_or(0)
    }

    pub fn stream(&self, semantic: VertexSemantic) -> Option<&VertexStream> {
        self.streams.iter().find(|stream| stream.semantic() == semantic)
    }

    pub fn semantics(&self) -> impl Iterator<Item = VertexSemantic> + '_ {
        self.streams.iter().map(VertexStream::semantic)
    }

    pub fn positions(&self) -> Option<&[Vec3]> {
        match self.stream(VertexSemantic::Positions) {
            Some(VertexStream::Positions(positions)) => Some(positions),
            _ => None,
        }
    }

    pub fn byte_size(&self) -> usize {
        self.streams.iter().map(|stream| stream.as_bytes().len()).sum()
    }
}

impl Debug for VertexBuffers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ vertex_count: {}, streams: {:?} }}", self.vertex_count(), self.streams)
    }
}

#[derive(Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertex_buffers: VertexBuffers,
    pub index_buffer: Vec<u32>,
}

impl Debug for Mesh {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{ vertex_buffers: {:?}, ", self.vertex_buffers)?;
        write!(f, "index_buffer: [{}] }}", self.index_buffer.len())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ImageUsage {
    Diffuse,
    Normal,
    MetallicRoughness,
}

/// A decoded source image: always tightly packed RGBA8, row major, top row first.
#[derive(Clone, PartialEq)]
pub struct SourceImage {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub srgb: bool,
    pub usage: ImageUsage,
    pub pixels: Vec<u8>,
}

impl SourceImage {
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("<unnamed image>")
    }
}

impl Debug for SourceImage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ label: {:?}, {}x{}, srgb: {}, usage: {:?}, pixels: [{}] }}",
            self.label,
            self.width,
            self.height,
            self.srgb,
            self.usage,
            self.pixels.len()
        )
    }
}
