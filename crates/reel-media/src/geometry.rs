//! Orientation detection and centered aspect-normalizing crops.

use reel_models::{CropRect, Orientation};
use serde::{Deserialize, Serialize};

/// Aspect ratios within this distance of the target are left uncropped.
pub const ASPECT_TOLERANCE: f64 = 0.01;

/// Crop plan for one source frame size.
///
/// Recompute with [`FrameGeometry::derive`] whenever the source dimensions
/// change; values are never adjusted in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub source_width: u32,
    pub source_height: u32,
    pub orientation: Orientation,
    pub target_aspect: f64,
    pub crop: CropRect,
}

impl FrameGeometry {
    /// Derive the geometry, picking orientation from the dimensions.
    pub fn derive(width: u32, height: u32) -> Self {
        Self::derive_for(width, height, Orientation::from_dimensions(width, height))
    }

    /// Derive the geometry for an explicit orientation.
    pub fn derive_for(width: u32, height: u32, orientation: Orientation) -> Self {
        let target_aspect = orientation.target_aspect();
        let crop = centered_crop(width, height, target_aspect);
        Self {
            source_width: width,
            source_height: height,
            orientation,
            target_aspect,
            crop,
        }
    }

    /// Whether the crop removes any pixels.
    pub fn needs_crop(&self) -> bool {
        !self.crop.is_full_frame(self.source_width, self.source_height)
    }

    /// Encoder canvas: crop size rounded down to even numbers (4:2:0 output).
    pub fn canvas(&self) -> (u32, u32) {
        (even_floor(self.crop.width), even_floor(self.crop.height))
    }
}

fn even_floor(value: u32) -> u32 {
    (value & !1).max(2)
}

/// Largest centered rectangle of `target_aspect` inside a `width`×`height` frame.
pub fn centered_crop(width: u32, height: u32, target_aspect: f64) -> CropRect {
    if width == 0 || height == 0 {
        return CropRect::full(width, height);
    }

    let aspect = width as f64 / height as f64;
    if (aspect - target_aspect).abs() <= ASPECT_TOLERANCE {
        return CropRect::full(width, height);
    }

    if aspect > target_aspect {
        // Too wide: trim left and right
        let new_width = ((height as f64 * target_aspect).round() as u32).clamp(1, width);
        CropRect::new((width - new_width) / 2, 0, new_width, height)
    } else {
        // Too tall: trim top and bottom
        let new_height = ((width as f64 / target_aspect).round() as u32).clamp(1, height);
        CropRect::new(0, (height - new_height) / 2, width, new_height)
    }
}
