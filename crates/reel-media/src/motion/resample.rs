//! Separable Lanczos resampling at fractional source positions.
//!
//! `image::imageops::resize` snaps the sampling grid to whole output pixels,
//! so a slow zoom sweep visibly jitters. Here each output pixel maps to an
//! exact fractional source coordinate and the kernel is evaluated there.

use image::RgbImage;
use std::f64::consts::PI;

/// Lanczos lobes.
const LANCZOS_A: f64 = 3.0;

fn lanczos(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    if x.abs() >= LANCZOS_A {
        return 0.0;
    }
    let px = PI * x;
    LANCZOS_A * px.sin() * (px / LANCZOS_A).sin() / (px * px)
}

/// Contributing source indices and normalized weights for one output sample.
#[derive(Debug, Clone)]
struct Taps {
    indices: Vec<usize>,
    weights: Vec<f32>,
}

/// Taps for `out_len` samples at `origin + i * step` over a source of `src_len`.
fn compute_taps(src_len: usize, out_len: usize, origin: f64, step: f64) -> Vec<Taps> {
    // Widen the kernel when minifying to avoid aliasing
    let filter_scale = step.max(1.0);
    let support = LANCZOS_A * filter_scale;
    let last = src_len.saturating_sub(1) as f64;

    (0..out_len)
        .map(|i| {
            let center = origin + i as f64 * step;
            let lo = (center - support).floor() as i64 + 1;
            let hi = (center + support).floor() as i64;

            let mut indices = Vec::with_capacity((hi - lo + 1).max(1) as usize);
            let mut weights = Vec::with_capacity(indices.capacity());
            let mut total = 0.0;
            for j in lo..=hi {
                let w = lanczos((center - j as f64) / filter_scale);
                if w == 0.0 {
                    continue;
                }
                // Replicate border pixels
                indices.push((j as f64).clamp(0.0, last) as usize);
                weights.push(w);
                total += w;
            }

            if total.abs() < f64::EPSILON {
                let nearest = center.round().clamp(0.0, last) as usize;
                return Taps {
                    indices: vec![nearest],
                    weights: vec![1.0],
                };
            }

            Taps {
                indices,
                weights: weights.into_iter().map(|w| (w / total) as f32).collect(),
            }
        })
        .collect()
}

/// Scale `frame` by `zoom` about its center, keeping the original size.
///
/// Output pixel `d` samples source position `(d - c) / zoom + c` where `c`
/// is the pixel-center midpoint of the axis.
pub fn zoom_about_center(frame: &RgbImage, zoom: f64) -> RgbImage {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 || (zoom - 1.0).abs() < 1e-9 || zoom <= 0.0 {
        return frame.clone();
    }

    let step = 1.0 / zoom;
    let cx = (width as f64 - 1.0) / 2.0;
    let cy = (height as f64 - 1.0) / 2.0;
    let x_taps = compute_taps(width as usize, width as usize, cx * (1.0 - step), step);
    let y_taps = compute_taps(height as usize, height as usize, cy * (1.0 - step), step);

    resample(frame, &x_taps, &y_taps)
}

fn resample(frame: &RgbImage, x_taps: &[Taps], y_taps: &[Taps]) -> RgbImage {
    let (src_w, src_h) = frame.dimensions();
    let src = frame.as_raw();
    let out_w = x_taps.len();
    let out_h = y_taps.len();

    // Horizontal pass: src_h rows of out_w pixels
    let mut horizontal = vec![0f32; src_h as usize * out_w * 3];
    for y in 0..src_h as usize {
        let row = &src[y * src_w as usize * 3..(y + 1) * src_w as usize * 3];
        let out_row = &mut horizontal[y * out_w * 3..(y + 1) * out_w * 3];
        for (x, taps) in x_taps.iter().enumerate() {
            let mut acc = [0f32; 3];
            for (&i, &w) in taps.indices.iter().zip(&taps.weights) {
                acc[0] += row[i * 3] as f32 * w;
                acc[1] += row[i * 3 + 1] as f32 * w;
                acc[2] += row[i * 3 + 2] as f32 * w;
            }
            out_row[x * 3..x * 3 + 3].copy_from_slice(&acc);
        }
    }

    // Vertical pass
    let mut out = vec![0u8; out_w * out_h * 3];
    for (y, taps) in y_taps.iter().enumerate() {
        let out_row = &mut out[y * out_w * 3..(y + 1) * out_w * 3];
        for x in 0..out_w * 3 {
            let mut acc = 0f32;
            for (&i, &w) in taps.indices.iter().zip(&taps.weights) {
                acc += horizontal[i * out_w * 3 + x] * w;
            }
            out_row[x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    // Buffer length matches the dimensions by construction
    RgbImage::from_raw(out_w as u32, out_h as u32, out).unwrap_or_else(|| frame.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_kernel_shape() {
        assert_eq!(lanczos(0.0), 1.0);
        assert!(lanczos(1.0).abs() < 1e-12);
        assert!(lanczos(2.0).abs() < 1e-12);
        assert_eq!(lanczos(3.5), 0.0);
        assert!(lanczos(0.5) > 0.0);
    }

    #[test]
    fn test_weights_are_normalized() {
        for taps in compute_taps(100, 100, 4.5, 1.0 / 1.1) {
            let sum: f32 = taps.weights.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_unit_zoom_is_identity() {
        let frame = RgbImage::from_fn(16, 9, |x, y| Rgb([x as u8 * 10, y as u8 * 20, 7]));
        assert_eq!(zoom_about_center(&frame, 1.0), frame);
    }

    #[test]
    fn test_flat_frame_stays_flat() {
        let frame = RgbImage::from_pixel(64, 36, Rgb([120, 60, 30]));
        let zoomed = zoom_about_center(&frame, 1.07);
        assert_eq!(zoomed.dimensions(), (64, 36));
        for p in zoomed.pixels() {
            assert_eq!(*p, Rgb([120, 60, 30]));
        }
    }

    #[test]
    fn test_zoom_magnifies_about_center() {
        // Vertical bar in the middle widens under zoom
        let frame = RgbImage::from_fn(101, 11, |x, _| {
            if (45..=55).contains(&x) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let zoomed = zoom_about_center(&frame, 1.1);
        let bright = |img: &RgbImage| (0..101).filter(|&x| img.get_pixel(x, 5)[0] > 128).count();
        assert!(bright(&zoomed) > bright(&frame));
        // Center pixel unchanged in position
        assert!(zoomed.get_pixel(50, 5)[0] > 200);
    }
}
