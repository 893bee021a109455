//! PNG overlays of analysis slices
//!
//! Overlays are a side channel for visual QA. Callers log rendering
//! failures and never let them affect the metrics.

use crate::error::Result;
use crate::volume::geometry::{bounding_box, rot90};
use image::{Rgb, RgbImage};
use log::debug;
use ndarray::{Array2, ArrayView2};
use std::path::{Path, PathBuf};

/// Display window in HU
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub min: f32,
    pub max: f32,
}

impl Window {
    /// Abdominal soft tissue, used for the L3 muscle overlay
    pub const SOFT_TISSUE: Window = Window {
        min: -150.0,
        max: 250.0,
    };

    /// Brain window (WL 40, WW 80)
    pub const BRAIN: Window = Window { min: 0.0, max: 80.0 };

    /// Bone window for the L1 overlay
    pub const BONE: Window = Window {
        min: -250.0,
        max: 1250.0,
    };

    /// Maps an intensity to an 8-bit gray level
    pub fn gray(&self, value: f32) -> u8 {
        let t = ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0);
        (t * 255.0).round() as u8
    }
}

const MUSCLE_COLOR: [u8; 3] = [255, 255, 0];
const BLEED_COLOR: [u8; 3] = [103, 0, 13];

/// Trabecular ROI coloring range in HU
const ROI_RANGE: (f32, f32) = (0.0, 300.0);

fn blend(base: u8, color: [u8; 3], alpha: f32) -> Rgb<u8> {
    let mix = |c: u8| ((1.0 - alpha) * f32::from(base) + alpha * f32::from(c)).round() as u8;
    Rgb([mix(color[0]), mix(color[1]), mix(color[2])])
}

/// Cyan-to-magenta ramp
fn cool(t: f32) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    [(t * 255.0).round() as u8, ((1.0 - t) * 255.0).round() as u8, 255]
}

/// Renders a windowed slice with a solid-color mask blended on top
fn render_masked(
    intensity: &ArrayView2<f32>,
    mask: &ArrayView2<bool>,
    window: Window,
    color: [u8; 3],
    alpha: f32,
) -> RgbImage {
    let (rows, cols) = intensity.dim();
    RgbImage::from_fn(cols as u32, rows as u32, |x, y| {
        let idx = [y as usize, x as usize];
        let g = window.gray(intensity[idx]);
        if mask[idx] {
            blend(g, color, alpha)
        } else {
            Rgb([g, g, g])
        }
    })
}

/// Writes overlay images into a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayWriter {
    dir: PathBuf,
}

impl OverlayWriter {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn save(&self, image: &RgbImage, file_name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        image.save(&path)?;
        debug!("Wrote overlay {}", path.display());
        Ok(path)
    }

    /// L3 slice in soft-tissue window with muscle (or vertebra) highlighted
    pub fn l3(&self, intensity: &ArrayView2<f32>, highlight: &ArrayView2<bool>) -> Result<PathBuf> {
        let image = render_masked(
            &rot90(intensity).view(),
            &rot90(highlight).view(),
            Window::SOFT_TISSUE,
            MUSCLE_COLOR,
            0.5,
        );
        self.save(&image, "L3_overlay.png")
    }

    /// Hemorrhage slice in brain window with the bleed in red
    pub fn hemorrhage(
        &self,
        label: &str,
        intensity: &ArrayView2<f32>,
        bleed: &ArrayView2<bool>,
    ) -> Result<PathBuf> {
        let image = render_masked(
            &rot90(intensity).view(),
            &rot90(bleed).view(),
            Window::BRAIN,
            BLEED_COLOR,
            0.7,
        );
        self.save(&image, &format!("bleed_overlay_{}.png", label))
    }

    /// L1 trabecular ROI, cropped around the vertebra
    ///
    /// The crop is padded by 0.8x the larger side of the vertebra bounding
    /// box; ROI voxels are colored by their own HU.
    pub fn bone_density(
        &self,
        intensity: &ArrayView2<f32>,
        roi: &ArrayView2<bool>,
        vertebra: &ArrayView2<bool>,
    ) -> Result<Option<PathBuf>> {
        let intensity = rot90(intensity);
        let roi = rot90(roi);
        let vertebra = rot90(vertebra);

        let Some(bbox) = bounding_box(&vertebra.view()) else {
            return Ok(None);
        };
        let (rows, cols) = intensity.dim();
        let h = bbox.row_max - bbox.row_min;
        let w = bbox.col_max - bbox.col_min;
        let pad = (h.max(w) as f64 * 0.8) as usize;

        let r0 = bbox.row_min.saturating_sub(pad);
        let r1 = (bbox.row_max + pad).min(rows);
        let c0 = bbox.col_min.saturating_sub(pad);
        let c1 = (bbox.col_max + pad).min(cols);
        if r1 <= r0 || c1 <= c0 {
            return Ok(None);
        }

        let crop: Array2<(f32, bool)> =
            Array2::from_shape_fn((r1 - r0, c1 - c0), |(r, c)| {
                (intensity[[r0 + r, c0 + c]], roi[[r0 + r, c0 + c]])
            });
        let (crop_rows, crop_cols) = crop.dim();
        let image = RgbImage::from_fn(crop_cols as u32, crop_rows as u32, |x, y| {
            let (hu, in_roi) = crop[[y as usize, x as usize]];
            let g = Window::BONE.gray(hu);
            if in_roi {
                let t = (hu - ROI_RANGE.0) / (ROI_RANGE.1 - ROI_RANGE.0);
                blend(g, cool(t), 0.8)
            } else {
                Rgb([g, g, g])
            }
        });
        self.save(&image, "L1_BMD_overlay.png").map(Some)
    }
}
