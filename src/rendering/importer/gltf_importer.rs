use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail, ensure};
use glam::{Mat4, Vec2, Vec3, Vec4};
use gltf::image::Format;
use log::{debug, info, trace, warn};

use crate::loading::AsyncOperation;
use crate::rendering::batch::{MeshDescriptor, MeshSink};
use crate::rendering::common::coordinate_systems::{flips_handedness, gltf_to_blender_rot};
use crate::rendering::common::types::{ImageUsage, SourceImage, VertexStream};
use crate::rendering::importer::SceneParser;
use crate::settings::ImportSettings;

/// Imports the default scene (or the first one) of a glTF file, one mesh per triangle primitive.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfImporter {
    settings: ImportSettings,
}

struct ImportContext<'a> {
    buffers: Vec<gltf::buffer::Data>,
    images: Vec<gltf::image::Data>,
    image_cache: HashMap<(usize, ImageUsage), Arc<SourceImage>>,
    sink: &'a mut dyn MeshSink,
    op: &'a AsyncOperation,
    created: usize,
    skipped: usize,
}

impl GltfImporter {
    pub fn new(settings: ImportSettings) -> Self {
        Self { settings }
    }

    fn visit_node(&self, node: gltf::Node, parent: Mat4, ctx: &mut ImportContext) -> anyhow::Result<()> {
        if ctx.op.is_cancelled() {
            return Ok(());
        }

        let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                self.import_primitive(&mesh, &primitive, transform, ctx)?;
            }
        }

        for child in node.children() {
            self.visit_node(child, transform, ctx)?;
        }

        Ok(())
    }

    fn import_primitive(
        &self,
        mesh: &gltf::Mesh,
        primitive: &gltf::Primitive,
        transform: Mat4,
        ctx: &mut ImportContext,
    ) -> anyhow::Result<()> {
        let name = format!("{}/{}", mesh.name().unwrap_or("unnamed"), primitive.index());

        if primitive.mode() != gltf::mesh::Mode::Triangles {
            warn!("Skipping {}: {:?} primitives are not supported", name, primitive.mode());
            ctx.skipped += 1;
            return Ok(());
        }

        let buffers = &ctx.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

        let Some(positions) = reader.read_positions() else {
            warn!("Skipping {}: it has no positions", name);
            ctx.skipped += 1;
            return Ok(());
        };
        let positions = positions.map(Vec3::from).collect::<Vec<_>>();

        let normals = reader.read_normals().map(|normals| normals.map(Vec3::from).collect::<Vec<_>>());
        let tangents = reader.read_tangents().map(|tangents| tangents.map(Vec4::from).collect::<Vec<_>>());

        let mut streams = vec![];
        if let (Some(normals), Some(tangents)) = (&normals, &tangents) {
            // the handedness is in w
            let bitangents = normals
                .iter()
                .zip(tangents)
                .map(|(normal, tangent)| normal.cross(tangent.truncate()) * tangent.w)
                .collect();
            streams.push(VertexStream::Bitangents(bitangents));
        }
        if let Some(normals) = normals {
            streams.push(VertexStream::Normals(normals));
        }
        if let Some(tangents) = tangents {
            streams.push(VertexStream::Tangents(tangents));
        }
        if let Some(tex_coords) = reader.read_tex_coords(0) {
            streams.push(VertexStream::TexCoords(tex_coords.into_f32().map(Vec2::from).collect()));
        }

        let indices = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        streams.push(VertexStream::Positions(positions));

        let material = primitive.material();
        let pbr = material.pbr_metallic_roughness();

        let mut descriptor = MeshDescriptor::new(streams, indices)
            .with_transform(transform)
            .with_base_colour(Vec4::from(pbr.base_color_factor()))
            .mirrored(flips_handedness(&transform) != self.settings.mirror_winding);

        if let Some(info) = pbr.base_color_texture() {
            descriptor = descriptor.with_diffuse(Self::image(&info.texture(), ImageUsage::Diffuse, ctx)?);
        }
        if let Some(normal) = material.normal_texture() {
            descriptor = descriptor.with_normal(Self::image(&normal.texture(), ImageUsage::Normal, ctx)?);
        }
        if let Some(info) = pbr.metallic_roughness_texture() {
            descriptor = descriptor.with_metallic_roughness(Self::image(
                &info.texture(),
                ImageUsage::MetallicRoughness,
                ctx,
            )?);
        }

        match ctx.sink.create_mesh(descriptor) {
            Ok(id) => {
                trace!("Imported {} as {:?}", name, id);
                ctx.created += 1;
            }
            Err(err) => {
                warn!("Skipping {}: {}", name, err);
                ctx.skipped += 1;
            }
        }

        Ok(())
    }

    /// Every image is decoded once per usage, as the usage decides about the colour space.
    fn image(texture: &gltf::Texture, usage: ImageUsage, ctx: &mut ImportContext) -> anyhow::Result<Arc<SourceImage>> {
        let source = texture.source();
        let index = source.index();

        if let Some(image) = ctx.image_cache.get(&(index, usage)) {
            return Ok(image.clone());
        }

        let data = ctx
            .images
            .get(index)
            .with_context(|| format!("Image {} has not been loaded", index))?;
        let pixels = to_rgba8(data).with_context(|| format!("Failed to convert image {}", index))?;

        let image = Arc::new(SourceImage {
            label: source.name().map(str::to_string),
            width: data.width,
            height: data.height,
            srgb: usage == ImageUsage::Diffuse,
            usage,
            pixels,
        });
        ctx.image_cache.insert((index, usage), image.clone());
        Ok(image)
    }
}

/// glTF images come in whatever layout they have been encoded with.
fn to_rgba8(data: &gltf::image::Data) -> anyhow::Result<Vec<u8>> {
    let (channels, channel_size) = match data.format {
        Format::R8 => (1, 1),
        Format::R8G8 => (2, 1),
        Format::R8G8B8 => (3, 1),
        Format::R8G8B8A8 => (4, 1),
        Format::R16 => (1, 2),
        Format::R16G16 => (2, 2),
        Format::R16G16B16 => (3, 2),
        Format::R16G16B16A16 => (4, 2),
        other => bail!("Unsupported pixel format {:?}", other),
    };

    let pixel_size = channels * channel_size;
    let expected = data.width as usize * data.height as usize * pixel_size;
    ensure!(
        data.pixels.len() == expected,
        "{} bytes of pixel data, {}x{} needs {}",
        data.pixels.len(),
        data.width,
        data.height,
        expected
    );

    // 16 bit channels are little endian, keep the high byte
    let channel = |pixel: &[u8], c: usize| pixel[c * channel_size + channel_size - 1];

    Ok(data
        .pixels
        .chunks_exact(pixel_size)
        .flat_map(|pixel| match channels {
            1 => {
                let value = channel(pixel, 0);
                [value, value, value, u8::MAX]
            }
            2 => [channel(pixel, 0), channel(pixel, 1), 0, u8::MAX],
            3 => [channel(pixel, 0), channel(pixel, 1), channel(pixel, 2), u8::MAX],
            _ => [
                channel(pixel, 0),
                channel(pixel, 1),
                channel(pixel, 2),
                channel(pixel, 3),
            ],
        })
        .collect())
}

impl SceneParser for GltfImporter {
    fn parse(&self, path: &Path, sink: &mut dyn MeshSink, op: &AsyncOperation) -> anyhow::Result<()> {
        profiling::scope!("GltfImporter::parse");
        let start = Instant::now();

        let (document, buffers, images) =
            gltf::import(path).with_context(|| format!("Failed to import {}", path.display()))?;
        debug!(
            "Read {} ({} buffers, {} images) in {:?}",
            path.display(),
            buffers.len(),
            images.len(),
            start.elapsed()
        );

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .with_context(|| format!("{} does not contain a scene", path.display()))?;

        let root = if self.settings.z_up {
            gltf_to_blender_rot()
        } else {
            Mat4::IDENTITY
        };

        let mut ctx = ImportContext {
            buffers,
            images,
            image_cache: HashMap::new(),
            sink,
            op,
            created: 0,
            skipped: 0,
        };

        for node in scene.nodes() {
            self.visit_node(node, root, &mut ctx)?;
        }

        info!(
            "Imported {} meshes from {} in {:?} ({} skipped)",
            ctx.created,
            path.display(),
            start.elapsed(),
            ctx.skipped
        );
        Ok(())
    }
}
