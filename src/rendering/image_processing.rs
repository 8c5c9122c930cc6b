use image::RgbaImage;
use image::imageops::{self, FilterType};
use scenepack_files::chunk::types::{ImageFlags, ImageFormat, ImageHeader};

use crate::rendering::batch::BuildError;
use crate::rendering::common::types::{ImageUsage, SourceImage};
use crate::settings::BuildSettings;

/// An image in its final, uploadable form: every mip level, largest first, tightly packed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedImage {
    pub header: ImageHeader,
    pub data: Vec<u8>,
}

/// Turns uncompressed mip chains into block compressed ones. The codec itself lives outside of this crate.
pub trait BlockCompressor: Send + Sync {
    /// Returns `None` to keep the image uncompressed, e.g. for formats the codec does not handle.
    fn compress(&self, image: &ProcessedImage) -> anyhow::Result<Option<ProcessedImage>>;
}

pub struct ImageProcessor<'a> {
    settings: BuildSettings,
    compressor: Option<&'a dyn BlockCompressor>,
}

impl<'a> ImageProcessor<'a> {
    pub fn new(settings: BuildSettings, compressor: Option<&'a dyn BlockCompressor>) -> Self {
        Self { settings, compressor }
    }

    /// R8 for greyscale, RG8 for opaque normal maps, RGBA8 for everything else.
    pub fn select_format(image: &SourceImage) -> ImageFormat {
        let mut greyscale = true;
        let mut opaque = true;
        for pixel in image.pixels.chunks_exact(4) {
            greyscale &= pixel[0] == pixel[1] && pixel[1] == pixel[2];
            opaque &= pixel[3] == u8::MAX;
            if !greyscale && !opaque {
                break;
            }
        }

        match (image.usage, greyscale && opaque, opaque) {
            (ImageUsage::Normal, _, true) => ImageFormat::Rg8,
            (_, true, _) => ImageFormat::R8,
            _ => ImageFormat::Rgba8,
        }
    }

    pub fn mip_count(width: u32, height: u32) -> u32 {
        32 - width.max(height).max(1).leading_zeros()
    }

    pub fn process(&self, image: &SourceImage) -> Result<ProcessedImage, BuildError> {
        profiling::scope!("ImageProcessor::process");

        let error = |reason: String| BuildError::ImageProcessing {
            label: image.label().to_string(),
            reason,
        };

        let format = Self::select_format(image);
        let mip_count = if self.settings.generate_mips {
            Self::mip_count(image.width, image.height)
        } else {
            1
        };

        let base = RgbaImage::from_raw(image.width, image.height, image.pixels.clone())
            .ok_or_else(|| error("The pixel data does not match the dimensions".to_string()))?;

        let header = ImageHeader {
            width: image.width,
            height: image.height,
            flags: if image.srgb {
                ImageFlags::SRGB
            } else {
                ImageFlags::empty()
            },
            mip_count,
            format,
        };

        let mut data = Vec::with_capacity(header.expected_payload_size().unwrap_or_default());
        pack_level(&base, format, &mut data);
        for mip in 1..mip_count {
            let level = imageops::resize(
                &base,
                (image.width >> mip).max(1),
                (image.height >> mip).max(1),
                FilterType::Triangle,
            );
            pack_level(&level, format, &mut data);
        }

        let processed = ProcessedImage { header, data };

        match self.compressor.filter(|_| self.settings.block_compression) {
            Some(compressor) => match compressor.compress(&processed).map_err(|e| error(format!("{:#}", e)))? {
                Some(compressed) => {
                    validate_compressed(&processed.header, &compressed).map_err(error)?;
                    Ok(compressed)
                }
                None => Ok(processed),
            },
            None => Ok(processed),
        }
    }
}

fn pack_level(level: &RgbaImage, format: ImageFormat, out: &mut Vec<u8>) {
    let pixels = level.as_raw().chunks_exact(4);
    match format {
        ImageFormat::R8 => out.extend(pixels.map(|p| p[0])),
        ImageFormat::Rg8 => pixels.for_each(|p| out.extend_from_slice(&p[..2])),
        _ => out.extend_from_slice(level.as_raw()),
    }
}

fn validate_compressed(source: &ImageHeader, compressed: &ProcessedImage) -> Result<(), String> {
    let header = &compressed.header;
    if !header.format.is_block_compressed() {
        return Err(format!("The compressor returned the uncompressed format {:?}", header.format));
    }

    if (header.width, header.height, header.mip_count) != (source.width, source.height, source.mip_count) {
        return Err("The compressor changed the image dimensions".to_string());
    }

    let Some(expected) = header.expected_payload_size() else {
        return Err("The compressor returned an invalid image header".to_string());
    };
    if compressed.data.len() != expected {
        return Err(format!(
            "The compressor returned {} bytes, {:?} needs {}",
            compressed.data.len(),
            header.format,
            expected
        ));
    }

    Ok(())
}
