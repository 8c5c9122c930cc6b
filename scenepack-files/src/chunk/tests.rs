use byteorder::{LittleEndian, WriteBytesExt};

use crate::ChunkError;
use crate::chunk::ResourceChunk;
use crate::chunk::types::{CHUNK_MAGIC, IMAGE_HEADER_SIZE, ImageFlags, ImageFormat, ImageHeader, VertexSemantic};

fn generic_payload() -> Vec<u8> {
    (0u8..16).collect()
}

fn positions_payload() -> Vec<u8> {
    // three vec3 positions
    [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        .iter()
        .flat_map(|f| f.to_le_bytes())
        .collect()
}

fn image_payload() -> Vec<u8> {
    vec![255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255, 255, 255, 255]
}

/// Builds the three record example by hand, independently of the writer.
fn three_record_file(version: u32) -> Result<Vec<u8>, anyhow::Error> {
    let mut buf = Vec::new();
    buf.write_u64::<LittleEndian>(CHUNK_MAGIC)?;
    buf.write_u32::<LittleEndian>(version)?;
    buf.write_u32::<LittleEndian>(3)?;

    let generic = generic_payload();
    buf.write_u32::<LittleEndian>(0)?;
    buf.write_u32::<LittleEndian>(7)?;
    buf.write_u64::<LittleEndian>(generic.len() as u64)?;
    buf.extend_from_slice(&generic);

    let positions = positions_payload();
    buf.write_u32::<LittleEndian>(1)?;
    buf.write_u32::<LittleEndian>(0)?;
    buf.write_u64::<LittleEndian>(positions.len() as u64)?;
    buf.write_u32::<LittleEndian>(0)?; // Positions
    buf.extend_from_slice(&positions);

    let image = image_payload();
    buf.write_u32::<LittleEndian>(2)?;
    buf.write_u32::<LittleEndian>(0)?;
    buf.write_u64::<LittleEndian>(image.len() as u64)?;
    buf.write_u32::<LittleEndian>(2)?; // width
    buf.write_u32::<LittleEndian>(2)?; // height
    buf.write_u32::<LittleEndian>(1)?; // srgb
    buf.write_u32::<LittleEndian>(1)?; // mip count
    buf.write_u32::<LittleEndian>(2)?; // Rgba8
    buf.extend_from_slice(&image);

    Ok(buf)
}

fn srgb_header() -> ImageHeader {
    ImageHeader {
        width: 2,
        height: 2,
        flags: ImageFlags::SRGB,
        mip_count: 1,
        format: ImageFormat::Rgba8,
    }
}

#[test]
fn parse_three_records() -> Result<(), anyhow::Error> {
    let mut chunk = ResourceChunk::new();
    chunk.parse_bytes(three_record_file(1)?)?;

    assert!(chunk.loaded_from_disk());
    assert_eq!(chunk.resource_count(), 3);
    assert_eq!(chunk.get_generic(7), Some(generic_payload().as_slice()));
    assert_eq!(chunk.get_generic(8), None);
    assert_eq!(
        chunk.get_vertex_data(VertexSemantic::Positions),
        Some(positions_payload().as_slice())
    );
    assert_eq!(chunk.get_vertex_data(VertexSemantic::Normals), None);

    let (header, bytes) = chunk.get_image_data(0).expect("image record");
    assert_eq!(*header, srgb_header());
    assert!(header.is_srgb());
    assert_eq!(bytes, image_payload().as_slice());
    assert_eq!(header.expected_payload_size(), Some(bytes.len()));
    assert!(chunk.get_image_data(1).is_none());
    Ok(())
}

#[test]
fn reject_newer_version() -> Result<(), anyhow::Error> {
    let mut chunk = ResourceChunk::new();
    let result = chunk.parse_bytes(three_record_file(2)?);

    assert!(matches!(
        result,
        Err(ChunkError::UnsupportedVersion {
            version: 2,
            supported: 1
        })
    ));
    assert!(!chunk.loaded_from_disk());
    assert!(chunk.is_empty());
    Ok(())
}

#[test]
fn reject_older_version() -> Result<(), anyhow::Error> {
    let result = ResourceChunk::new().parse_bytes(three_record_file(0)?);
    assert!(matches!(result, Err(ChunkError::UnsupportedVersion { version: 0, .. })));
    Ok(())
}

#[test]
fn reject_short_buffer() {
    let mut chunk = ResourceChunk::new();
    let result = chunk.parse_bytes(CHUNK_MAGIC.to_le_bytes().to_vec());

    assert!(matches!(result, Err(ChunkError::FormatError { .. })));
    assert!(!chunk.loaded_from_disk());
}

#[test]
fn reject_corrupted_magic() -> Result<(), anyhow::Error> {
    let mut data = three_record_file(1)?;
    data[0] ^= 0xFF;

    let mut chunk = ResourceChunk::new();
    let result = chunk.parse_bytes(data);

    assert!(matches!(result, Err(ChunkError::InvalidMagicValue { .. })));
    assert!(!chunk.loaded_from_disk());
    Ok(())
}

#[test]
fn reject_unknown_resource_type() -> Result<(), anyhow::Error> {
    let mut data = three_record_file(1)?;
    // resource type tag of the first record
    data[16..20].copy_from_slice(&9u32.to_le_bytes());

    let result = ResourceChunk::new().parse_bytes(data);
    assert!(matches!(result, Err(ChunkError::UnknownResourceType { tag: 9 })));
    Ok(())
}

#[test]
fn reject_payload_out_of_bounds() -> Result<(), anyhow::Error> {
    let mut data = three_record_file(1)?;
    // size of the first record
    data[24..32].copy_from_slice(&u64::MAX.to_le_bytes());

    let result = ResourceChunk::new().parse_bytes(data);
    assert!(matches!(result, Err(ChunkError::RecordOutOfBounds { .. })));
    Ok(())
}

#[test]
fn reject_inconsistent_image_header() -> Result<(), anyhow::Error> {
    let file = three_record_file(1)?;
    let image_header = file.len() - image_payload().len() - IMAGE_HEADER_SIZE;

    // (field offset, value): the payload size stays untouched, only the header lies about it
    for (field, value) in [(12, 40u32), (12, 0), (12, 3), (0, 0), (4, 0)] {
        let mut data = file.clone();
        let offset = image_header + field;
        data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());

        let mut chunk = ResourceChunk::new();
        let result = chunk.parse_bytes(data);
        assert!(
            matches!(result, Err(ChunkError::FormatError { .. })),
            "field {} = {} was accepted",
            field,
            value
        );
        assert!(!chunk.loaded_from_disk());
    }
    Ok(())
}

#[test]
fn payload_size_of_full_mip_chains() {
    let header = ImageHeader {
        width: 8,
        height: 2,
        flags: ImageFlags::empty(),
        mip_count: 4,
        format: ImageFormat::Rgba8,
    };
    assert_eq!(header.max_mip_count(), 4);
    assert_eq!(header.expected_payload_size(), Some((16 + 4 + 2 + 1) * 4));
    assert_eq!(ImageHeader { mip_count: 5, ..header }.expected_payload_size(), None);
    // too large to ever be held in memory
    assert_eq!(
        ImageHeader {
            width: u32::MAX,
            height: u32::MAX,
            mip_count: 32,
            ..header
        }
        .expected_payload_size(),
        None
    );
}

#[test]
fn reject_truncated_record_stream() -> Result<(), anyhow::Error> {
    let mut data = three_record_file(1)?;
    data.truncate(data.len() - 4);

    let result = ResourceChunk::new().parse_bytes(data);
    assert!(result.is_err());
    Ok(())
}

#[test]
fn writer_matches_hand_built_layout() -> Result<(), anyhow::Error> {
    let mut chunk = ResourceChunk::new();
    // insertion order differs from the stable write order on purpose
    chunk.add_image_data(srgb_header(), &image_payload());
    chunk.set_vertex_data(VertexSemantic::Positions, &positions_payload());
    chunk.set_generic(7, &generic_payload());

    assert!(!chunk.loaded_from_disk());
    assert_eq!(chunk.to_bytes()?, three_record_file(1)?);
    Ok(())
}

#[test]
fn refuse_to_write_empty_chunk() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("empty.chunk");

    let result = ResourceChunk::new().write_to_file(&path);
    assert!(matches!(result, Err(ChunkError::EmptyChunk)));
    assert!(!path.exists());
    Ok(())
}

#[test]
fn last_write_wins() -> Result<(), anyhow::Error> {
    let mut chunk = ResourceChunk::new();
    chunk.set_generic(1, &[1, 2, 3, 4]);
    chunk.set_generic(1, &[5, 6]);
    chunk.set_vertex_data(VertexSemantic::Normals, &[0; 12]);
    chunk.set_vertex_data(VertexSemantic::Normals, &[1; 24]);

    assert_eq!(chunk.get_generic(1), Some([5u8, 6].as_slice()));
    assert_eq!(chunk.get_vertex_data(VertexSemantic::Normals), Some([1u8; 24].as_slice()));
    assert_eq!(chunk.resource_count(), 2);
    // superseded bytes stay in the arena
    assert_eq!(chunk.backing_size(), 4 + 2 + 12 + 24);

    // ...but never reach the serialized form
    let mut reparsed = ResourceChunk::new();
    reparsed.parse_bytes(chunk.to_bytes()?)?;
    assert_eq!(reparsed.resource_count(), 2);
    assert_eq!(reparsed.get_generic(1), Some([5u8, 6].as_slice()));
    assert_eq!(reparsed.backing_size(), 16 + (16 + 2) + (16 + 4 + 24));
    Ok(())
}

#[test]
fn file_round_trip() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("scene.gltf.chunk");

    let mut chunk = ResourceChunk::new();
    chunk.set_generic(1, &[9; 33]);
    chunk.set_generic(4, &[]);
    chunk.set_vertex_data(VertexSemantic::TexCoords, &[3; 16]);
    chunk.set_vertex_data(VertexSemantic::Positions, &positions_payload());
    chunk.add_image_data(srgb_header(), &image_payload());
    chunk.add_image_data(
        ImageHeader {
            width: 4,
            height: 4,
            flags: ImageFlags::empty(),
            mip_count: 3,
            format: ImageFormat::R8,
        },
        &[7; 16 + 4 + 1],
    );
    chunk.write_to_file(&path)?;

    let loaded = ResourceChunk::from_file(&path)?;
    assert!(loaded.loaded_from_disk());
    assert_eq!(loaded.generic_identifiers(), vec![1, 4]);
    assert_eq!(loaded.get_generic(1), chunk.get_generic(1));
    assert_eq!(loaded.get_generic(4), Some([0u8; 0].as_slice()));
    assert_eq!(
        loaded.vertex_semantics(),
        vec![VertexSemantic::Positions, VertexSemantic::TexCoords]
    );
    assert_eq!(
        loaded.get_vertex_data(VertexSemantic::Positions),
        chunk.get_vertex_data(VertexSemantic::Positions)
    );
    assert_eq!(loaded.image_count(), 2);
    for index in 0..2 {
        assert_eq!(loaded.get_image_data(index), chunk.get_image_data(index));
    }
    Ok(())
}

#[test]
fn missing_file_is_io_error() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let result = ResourceChunk::from_file(dir.path().join("absent.chunk"));
    assert!(matches!(result, Err(ChunkError::IOError(_))));
    Ok(())
}
