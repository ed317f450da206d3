// src/services/mask_builder.rs
//! Edit masks for the image-edit endpoint.
//!
//! The endpoint only repaints transparent pixels, so each template cuts
//! elliptical holes for the facial regions a focus area may touch out of an
//! opaque white canvas.

use crate::errors::SkinError;
use crate::models::FocusArea;
use crate::services::image_processor::encode_png;
use image::{Rgba, RgbaImage};

const OPAQUE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const EDITABLE: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// (center x, center y, radius x, radius y) as fractions of the canvas side.
type Proportions = (f64, f64, f64, f64);

const DARK_CIRCLE_REGIONS: &[Proportions] = &[
    (0.36, 0.46, 0.12, 0.07),
    (0.64, 0.46, 0.12, 0.07),
];

// Forehead, both cheeks, chin.
const ACNE_REGIONS: &[Proportions] = &[
    (0.50, 0.25, 0.28, 0.16),
    (0.34, 0.58, 0.18, 0.16),
    (0.66, 0.58, 0.18, 0.16),
    (0.50, 0.78, 0.17, 0.12),
];

const FULL_FACE_REGIONS: &[Proportions] = &[(0.50, 0.50, 0.34, 0.42)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ellipse {
    pub cx: u32,
    pub cy: u32,
    pub rx: u32,
    pub ry: u32,
}

impl Ellipse {
    fn scaled((cx, cy, rx, ry): Proportions, size: u32) -> Self {
        let px = |fraction: f64| (size as f64 * fraction).round() as u32;
        Self {
            cx: px(cx),
            cy: px(cy),
            rx: px(rx),
            ry: px(ry),
        }
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        if self.rx == 0 || self.ry == 0 {
            return false;
        }
        let dx = (x - self.cx as f64) / self.rx as f64;
        let dy = (y - self.cy as f64) / self.ry as f64;
        dx * dx + dy * dy <= 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMask {
    size: u32,
    regions: Vec<Ellipse>,
}

impl RegionMask {
    pub fn for_focus(area: FocusArea, size: u32) -> Self {
        let template = match area {
            FocusArea::DarkCircle => DARK_CIRCLE_REGIONS,
            FocusArea::Acne => ACNE_REGIONS,
            FocusArea::Texture => FULL_FACE_REGIONS,
        };
        Self {
            size,
            regions: template.iter().map(|p| Ellipse::scaled(*p, size)).collect(),
        }
    }

    pub fn regions(&self) -> &[Ellipse] {
        &self.regions
    }

    pub fn rasterize(&self) -> RgbaImage {
        let mut mask = RgbaImage::from_pixel(self.size, self.size, OPAQUE);
        for region in &self.regions {
            let x_range = region.cx.saturating_sub(region.rx)
                ..(region.cx + region.rx + 1).min(self.size);
            let y_range = region.cy.saturating_sub(region.ry)
                ..(region.cy + region.ry + 1).min(self.size);
            for y in y_range {
                for x in x_range.clone() {
                    if region.contains(x as f64 + 0.5, y as f64 + 0.5) {
                        mask.put_pixel(x, y, EDITABLE);
                    }
                }
            }
        }
        mask
    }

    pub fn to_png(&self) -> Result<Vec<u8>, SkinError> {
        encode_png(self.rasterize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dark_circle_template_sits_under_each_eye() {
        let mask = RegionMask::for_focus(FocusArea::DarkCircle, 1024);
        assert_eq!(
            mask.regions(),
            &[
                Ellipse { cx: 369, cy: 471, rx: 123, ry: 72 },
                Ellipse { cx: 655, cy: 471, rx: 123, ry: 72 },
            ]
        );
    }

    #[test]
    fn acne_template_has_four_regions_and_texture_one() {
        assert_eq!(RegionMask::for_focus(FocusArea::Acne, 1024).regions().len(), 4);
        let face = RegionMask::for_focus(FocusArea::Texture, 1000);
        assert_eq!(face.regions(), &[Ellipse { cx: 500, cy: 500, rx: 340, ry: 420 }]);
    }

    #[test]
    fn regions_are_transparent_and_background_is_opaque() {
        let image = RegionMask::for_focus(FocusArea::DarkCircle, 200).rasterize();
        assert_eq!(image.dimensions(), (200, 200));
        // Under-eye centers at (72, 92) and (128, 92).
        assert_eq!(*image.get_pixel(72, 92), EDITABLE);
        assert_eq!(*image.get_pixel(128, 92), EDITABLE);
        assert_eq!(*image.get_pixel(100, 20), OPAQUE);
        assert_eq!(*image.get_pixel(0, 0), OPAQUE);
        assert_eq!(*image.get_pixel(100, 180), OPAQUE);
    }

    #[test]
    fn same_input_gives_identical_png_bytes() {
        for area in FocusArea::ALL {
            let first = RegionMask::for_focus(area, 256).to_png().unwrap();
            let second = RegionMask::for_focus(area, 256).to_png().unwrap();
            assert_eq!(first, second, "{:?}", area);
        }
    }

    #[test]
    fn tiny_canvas_does_not_panic() {
        for area in FocusArea::ALL {
            let image = RegionMask::for_focus(area, 1).rasterize();
            assert_eq!(image.dimensions(), (1, 1));
        }
    }
}
