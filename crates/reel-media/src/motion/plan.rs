//! Frame-indexed interpolation for zoom and pan effects.

use image::{imageops, RgbImage};
use rand::seq::IndexedRandom;
use rand::Rng;
use reel_models::{CropRect, Effect, EffectSelection};

use crate::error::{MediaError, MediaResult};
use crate::geometry::FrameGeometry;
use crate::motion::resample::zoom_about_center;

/// Zoom factor at the unzoomed end of a sweep.
pub const ZOOM_MIN: f64 = 1.0;
/// Zoom factor at the zoomed end of a sweep.
pub const ZOOM_MAX: f64 = 1.1;

/// Per-frame motion parameters, linear in the frame index.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPlan {
    pub effect: Effect,
    /// Total output frames (at least 2)
    pub frame_count: u64,
    /// Zoom factor or horizontal window origin at frame 0
    pub start: f64,
    /// Zoom factor or horizontal window origin at the last frame
    pub end: f64,
    /// Pan window (full frame for zooms)
    pub window: CropRect,
}

impl MotionPlan {
    /// Build the plan for `effect` over `frame_count` frames of the given geometry.
    pub fn new(effect: Effect, frame_count: u64, geometry: &FrameGeometry) -> MediaResult<Self> {
        if frame_count < 2 {
            return Err(MediaError::invalid_input(format!(
                "motion needs at least 2 frames, got {frame_count}"
            )));
        }

        let (start, end, window) = match effect {
            Effect::ZoomIn => (
                ZOOM_MIN,
                ZOOM_MAX,
                CropRect::full(geometry.source_width, geometry.source_height),
            ),
            Effect::ZoomOut => (
                ZOOM_MAX,
                ZOOM_MIN,
                CropRect::full(geometry.source_width, geometry.source_height),
            ),
            Effect::PanLeft => {
                let crop = geometry.crop;
                let far = geometry.source_width.saturating_sub(crop.width);
                (far as f64, crop.x as f64, crop)
            }
            Effect::PanRight => {
                let crop = geometry.crop;
                (0.0, crop.x as f64, crop)
            }
        };

        Ok(Self {
            effect,
            frame_count,
            start,
            end,
            window,
        })
    }

    /// Interpolation position of frame `index` in [0, 1].
    pub fn alpha(&self, index: u64) -> f64 {
        let last = self.frame_count - 1;
        index.min(last) as f64 / last as f64
    }

    /// Interpolated zoom factor or window origin at `index`.
    pub fn value_at(&self, index: u64) -> f64 {
        self.start + self.alpha(index) * (self.end - self.start)
    }

    /// Pan window origin at `index`, rounded to whole pixels.
    pub fn pan_origin(&self, index: u64) -> u32 {
        self.value_at(index).round().max(0.0) as u32
    }

    /// Output frame size for a source of `width`×`height`.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        if self.effect.is_zoom() {
            (width, height)
        } else {
            (self.window.width, self.window.height)
        }
    }

    /// Transform one source frame.
    pub fn apply(&self, frame: &RgbImage, index: u64) -> RgbImage {
        if self.effect.is_zoom() {
            zoom_about_center(frame, self.value_at(index))
        } else {
            self.pan(frame, index)
        }
    }

    fn pan(&self, frame: &RgbImage, index: u64) -> RgbImage {
        let (frame_w, frame_h) = frame.dimensions();
        let width = self.window.width.min(frame_w);
        let height = self.window.height.min(frame_h);
        let x = self.pan_origin(index).min(frame_w - width);
        let y = self.window.y.min(frame_h - height);

        let cropped = imageops::crop_imm(frame, x, y, width, height).to_image();
        if cropped.dimensions() == (self.window.width, self.window.height) {
            cropped
        } else {
            imageops::resize(
                &cropped,
                self.window.width,
                self.window.height,
                imageops::FilterType::Lanczos3,
            )
        }
    }
}

/// Pick one effect from a selection; `None` when the selection is empty.
pub fn choose_effect<R: Rng + ?Sized>(selection: &EffectSelection, rng: &mut R) -> Option<Effect> {
    selection.candidates().choose(rng).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, _| Rgb([(x % 256) as u8, 0, 0]))
    }

    #[test]
    fn test_zoom_in_endpoints_and_monotonic() {
        let geometry = FrameGeometry::derive(1920, 1080);
        let plan = MotionPlan::new(Effect::ZoomIn, 300, &geometry).unwrap();
        assert!((plan.value_at(0) - 1.0).abs() < 1e-12);
        assert!((plan.value_at(299) - 1.1).abs() < 1e-12);
        for i in 1..300 {
            assert!(plan.value_at(i) >= plan.value_at(i - 1));
        }
    }

    #[test]
    fn test_zoom_out_endpoints() {
        let geometry = FrameGeometry::derive(1920, 1080);
        let plan = MotionPlan::new(Effect::ZoomOut, 10, &geometry).unwrap();
        assert!((plan.value_at(0) - 1.1).abs() < 1e-12);
        assert!((plan.value_at(9) - 1.0).abs() < 1e-12);
        for i in 1..10 {
            assert!(plan.value_at(i) <= plan.value_at(i - 1));
        }
    }

    #[test]
    fn test_single_frame_rejected() {
        let geometry = FrameGeometry::derive(640, 360);
        assert!(MotionPlan::new(Effect::ZoomIn, 1, &geometry).is_err());
    }

    #[test]
    fn test_pan_left_starts_flush_right_ends_centered() {
        let geometry = FrameGeometry::derive(2560, 1080);
        let plan = MotionPlan::new(Effect::PanLeft, 50, &geometry).unwrap();
        assert_eq!(plan.pan_origin(0), 2560 - 1920);
        assert_eq!(plan.pan_origin(49), geometry.crop.x);
        assert_eq!(plan.output_size(2560, 1080), (1920, 1080));
    }

    #[test]
    fn test_pan_right_starts_flush_left() {
        let geometry = FrameGeometry::derive(2560, 1080);
        let plan = MotionPlan::new(Effect::PanRight, 50, &geometry).unwrap();
        assert_eq!(plan.pan_origin(0), 0);
        assert_eq!(plan.pan_origin(49), 320);
    }

    #[test]
    fn test_pan_frame_content_follows_window() {
        let geometry = FrameGeometry::derive(400, 100);
        let plan = MotionPlan::new(Effect::PanLeft, 2, &geometry).unwrap();
        let frame = gradient(400, 100);

        let first = plan.apply(&frame, 0);
        assert_eq!(first.dimensions(), (plan.window.width, plan.window.height));
        // Right edge flush: last column of the window is the last source column
        assert_eq!(first.get_pixel(first.width() - 1, 0)[0], (399 % 256) as u8);

        let last = plan.apply(&frame, 1);
        assert_eq!(last.get_pixel(0, 0)[0], geometry.crop.x as u8);
    }

    #[test]
    fn test_alpha_clamps_past_the_end() {
        let geometry = FrameGeometry::derive(640, 360);
        let plan = MotionPlan::new(Effect::ZoomIn, 4, &geometry).unwrap();
        assert!((plan.alpha(10) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_choose_effect() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(choose_effect(&EffectSelection::none(), &mut rng).is_none());
        assert_eq!(
            choose_effect(&EffectSelection::single(Effect::PanRight), &mut rng),
            Some(Effect::PanRight)
        );
        for _ in 0..20 {
            let picked = choose_effect(&EffectSelection::zooms(), &mut rng).unwrap();
            assert!(picked.is_zoom());
        }
        assert!(choose_effect(&EffectSelection::Random, &mut rng).is_some());
    }
}
