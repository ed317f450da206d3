// src/services/image_processor.rs
use crate::errors::SkinError;
use image::{DynamicImage, GenericImageView, ImageFormat as ImgFormat, Rgba, RgbaImage};

/// Square canvas expected by the image-edit endpoint.
pub const EDIT_CANVAS_SIZE: u32 = 1024;

const LETTERBOX_BACKGROUND: Rgba<u8> = Rgba([236, 241, 245, 255]);
const MAX_SOURCE_DIMENSION: u32 = 8192;

pub struct ImageProcessor;

impl ImageProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_image(&self, data: &[u8]) -> Result<DynamicImage, SkinError> {
        let img = image::load_from_memory(data)
            .map_err(|e| SkinError::InvalidImage(format!("Invalid image format: {}", e)))?;

        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(SkinError::InvalidImage("Image has no pixels".to_string()));
        }
        if width > MAX_SOURCE_DIMENSION || height > MAX_SOURCE_DIMENSION {
            return Err(SkinError::InvalidImage(format!(
                "Image dimensions exceed {0}x{0}",
                MAX_SOURCE_DIMENSION
            )));
        }

        Ok(img)
    }

    /// Fits the photo inside a `size`x`size` canvas without cropping, centers
    /// it on a light background and returns it as RGBA PNG.
    pub fn prepare_for_edit(&self, data: &[u8], size: u32) -> Result<Vec<u8>, SkinError> {
        let img = self.validate_image(data)?;

        let fitted = img
            .resize(size, size, image::imageops::FilterType::Lanczos3)
            .to_rgba8();
        let (width, height) = fitted.dimensions();

        let mut canvas = RgbaImage::from_pixel(size, size, LETTERBOX_BACKGROUND);
        let x = (size - width.min(size)) / 2;
        let y = (size - height.min(size)) / 2;
        image::imageops::overlay(&mut canvas, &fitted, x as i64, y as i64);

        encode_png(canvas)
    }
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

pub fn encode_png(image: RgbaImage) -> Result<Vec<u8>, SkinError> {
    let mut output = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut std::io::Cursor::new(&mut output), ImgFormat::Png)
        .map_err(|e| SkinError::ImageProcessing(format!("Failed to encode PNG: {}", e)))?;
    Ok(output)
}
