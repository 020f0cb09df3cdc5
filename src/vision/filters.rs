//! Image preprocessing filters for OCR
//!
//! Stateless transforms over an RGBA [`Raster`]. After [`greyscale`] every filter
//! assumes R == G == B and reads the red channel as luminance. Alpha is only consumed by [`pad`], which
//! flattens the raster onto white.

use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::distance_transform::Norm;
use imageproc::integral_image::integral_image;
use imageproc::morphology::open;
use tracing::debug;

use crate::capture::Raster;
use crate::vision::SegmentationMode;

/// Smallest adaptive-threshold window half-size
const MIN_WINDOW_HALF_SIZE: u32 = 10;

/// Luminance value written to white pixels
pub const WHITE: u8 = 255;
/// Luminance value written to black pixels
pub const BLACK: u8 = 0;

/// Convert RGBA to greyscale in place (keeping RGBA format)
pub fn greyscale(raster: &mut Raster) {
    for chunk in raster.data.chunks_exact_mut(4) {
        let lum = (0.299 * chunk[0] as f64 + 0.587 * chunk[1] as f64 + 0.114 * chunk[2] as f64).round() as u8;
        chunk[0] = lum;
        chunk[1] = lum;
        chunk[2] = lum;
    }
}

/// Stretch contrast so the darkest pixel maps to 0 and the brightest to 255.
///
/// A flat image (min == max) is left as is.
pub fn normalize_contrast(raster: &mut Raster) {
    let (min, max) = raster
        .data
        .chunks_exact(4)
        .fold((u8::MAX, u8::MIN), |(lo, hi), px| (lo.min(px[0]), hi.max(px[0])));

    if min >= max {
        return;
    }

    let range = (max - min) as f64;
    for chunk in raster.data.chunks_exact_mut(4) {
        let v = (((chunk[0] - min) as f64 / range) * 255.0).round() as u8;
        chunk[0] = v;
        chunk[1] = v;
        chunk[2] = v;
    }
}

/// Sharpen with a 3x3 Laplacian kernel: 5 * center - N - S - E - W.
///
/// Neighbours are read from a snapshot, so the result does not depend on scan order.
/// The outermost rows and columns are left unmodified.
pub fn sharpen(raster: &mut Raster) {
    let (w, h) = raster.dimensions();
    if w < 3 || h < 3 {
        return;
    }

    let snapshot = raster.clone();
    for y in 1..(h - 1) {
        for x in 1..(w - 1) {
            let center = snapshot.luma(x, y) as i32;
            let top = snapshot.luma(x, y - 1) as i32;
            let bottom = snapshot.luma(x, y + 1) as i32;
            let left = snapshot.luma(x - 1, y) as i32;
            let right = snapshot.luma(x + 1, y) as i32;

            let sharpened = 5 * center - top - bottom - left - right;
            raster.set_luma(x, y, sharpened.clamp(0, 255) as u8);
        }
    }
}

/// Local-mean window half-size for a raster of the given size
pub fn window_half_size(width: u32, height: u32, divisor: u32) -> u32 {
    let short = width.min(height) as f64;
    let scaled = (short / divisor.max(1) as f64).round() as u32;
    scaled.max(MIN_WINDOW_HALF_SIZE)
}

/// Binarize against the local mean.
///
/// A pixel becomes black when `lum * count < sum * (1 - sensitivity)` over the
/// (2s+1)x(2s+1) window around it (clipped to the raster). `invert` swaps black
/// and white in the output, for light text on a dark background.
pub fn adaptive_threshold(raster: &mut Raster, divisor: u32, sensitivity: f64, invert: bool) {
    let (w, h) = raster.dimensions();
    if w == 0 || h == 0 {
        return;
    }

    let s = window_half_size(w, h, divisor);
    debug!("Adaptive threshold: window half-size {}, sensitivity {}", s, sensitivity);

    let gray = GrayImage::from_fn(w, h, |x, y| Luma([raster.luma(x, y)]));
    // (w + 1) x (h + 1); entry (x, y) holds the sum of all pixels left of x and above y
    let integral: Image<Luma<u64>> = integral_image::<_, u64>(&gray);
    let at = |x: u32, y: u32| integral.get_pixel(x, y).0[0];

    let keep = 1.0 - sensitivity;
    for y in 0..h {
        let y1 = y.saturating_sub(s);
        let y2 = (y + s).min(h - 1);
        for x in 0..w {
            let x1 = x.saturating_sub(s);
            let x2 = (x + s).min(w - 1);

            let count = ((x2 - x1 + 1) as u64) * ((y2 - y1 + 1) as u64);
            let sum = at(x2 + 1, y2 + 1) + at(x1, y1) - at(x1, y2 + 1) - at(x2 + 1, y1);

            let lum = gray.get_pixel(x, y).0[0] as u64;
            let dark = ((lum * count) as f64) < (sum as f64) * keep;
            let value = match (dark, invert) {
                (true, false) | (false, true) => BLACK,
                _ => WHITE,
            };
            raster.set_luma(x, y, value);
        }
    }
}

/// Adaptive threshold with the parameters of a segmentation mode
pub fn adaptive_threshold_for(raster: &mut Raster, mode: SegmentationMode, invert: bool) {
    adaptive_threshold(raster, mode.threshold_divisor(), mode.threshold_sensitivity(), invert);
}

/// Binary morphological closing (dilate, then erode) with a square structuring element.
///
/// Black (0) is foreground, so this is an opening of the white background. Only
/// in-bounds neighbours are considered in both passes.
pub fn morphological_close(raster: &mut Raster, radius: u32) {
    let (w, h) = raster.dimensions();
    if w == 0 || h == 0 || radius == 0 {
        return;
    }

    let background = GrayImage::from_fn(w, h, |x, y| {
        Luma([if raster.luma(x, y) == BLACK { BLACK } else { WHITE }])
    });
    let k = radius.min(u8::MAX as u32) as u8;
    let opened = open(&background, Norm::LInf, k);

    for (x, y, px) in opened.enumerate_pixels() {
        raster.set_luma(x, y, px.0[0]);
    }
}

/// Draw the raster over a white canvas with a uniform border of `pad` pixels.
///
/// Pixels are composited over white, so the result is fully opaque.
pub fn pad(raster: &Raster, pad: u32) -> Raster {
    let (w, h) = raster.dimensions();
    let mut out = Raster::filled(w + 2 * pad, h + 2 * pad, [WHITE, WHITE, WHITE, 255]);

    let row_bytes = w as usize * 4;
    for y in 0..h {
        let src = raster.index(0, y);
        let dst = out.index(pad, y + pad);
        let rows = out.data[dst..dst + row_bytes]
            .chunks_exact_mut(4)
            .zip(raster.data[src..src + row_bytes].chunks_exact(4));
        for (to, from) in rows {
            let alpha = from[3] as u32;
            for c in 0..3 {
                to[c] = ((from[c] as u32 * alpha + WHITE as u32 * (255 - alpha) + 127) / 255) as u8;
            }
            to[3] = 255;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a greyscale raster from rows of luminance values
    fn gray_raster(rows: &[&[u8]]) -> Raster {
        let h = rows.len() as u32;
        let w = rows[0].len() as u32;
        let mut data = Vec::new();
        for row in rows {
            for &v in row.iter() {
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        Raster::new(data, w, h)
    }

    fn lumas(raster: &Raster) -> Vec<u8> {
        raster.data.chunks_exact(4).map(|px| px[0]).collect()
    }

    #[test]
    fn test_greyscale() {
        let mut raster = Raster::new(vec![255, 0, 0, 200], 1, 1); // Red pixel
        greyscale(&mut raster);
        // 0.299 * 255 = 76.245 -> 76
        assert_eq!(raster.data, vec![76, 76, 76, 200]);
    }

    #[test]
    fn test_greyscale_weights() {
        // 0.299*10 + 0.587*20 + 0.114*30 = 18.15 -> 18
        let mut raster = Raster::new(vec![10, 20, 30, 255], 1, 1);
        greyscale(&mut raster);
        assert_eq!(raster.data[0], 18);
    }

    #[test]
    fn test_contrast_uniform_is_noop() {
        let mut raster = Raster::filled(5, 4, [90, 90, 90, 255]);
        let before = raster.data.clone();
        normalize_contrast(&mut raster);
        assert_eq!(raster.data, before);
    }

    #[test]
    fn test_contrast_stretch() {
        let mut raster = gray_raster(&[&[50, 100, 150]]);
        normalize_contrast(&mut raster);
        // 100 -> (50 / 100) * 255 = 127.5 -> 128
        assert_eq!(lumas(&raster), vec![0, 128, 255]);
    }

    #[test]
    fn test_sharpen_center_and_borders() {
        let mut raster = gray_raster(&[&[50, 50, 50], &[50, 60, 50], &[50, 50, 50]]);
        sharpen(&mut raster);
        // 5 * 60 - 4 * 50 = 100
        assert_eq!(lumas(&raster), vec![50, 50, 50, 50, 100, 50, 50, 50, 50]);
    }

    #[test]
    fn test_sharpen_clamps() {
        let mut raster = gray_raster(&[&[0, 0, 0], &[0, 200, 0], &[0, 0, 0]]);
        sharpen(&mut raster);
        assert_eq!(raster.luma(1, 1), 255);

        let mut raster = gray_raster(&[&[255, 255, 255], &[255, 10, 255], &[255, 255, 255]]);
        sharpen(&mut raster);
        assert_eq!(raster.luma(1, 1), 0);
    }

    #[test]
    fn test_sharpen_reads_snapshot() {
        // Both interior pixels must see the original 100, not the sharpened neighbour
        let mut raster = gray_raster(&[
            &[100, 100, 100, 100],
            &[100, 100, 100, 100],
            &[100, 100, 100, 100],
        ]);
        sharpen(&mut raster);
        assert_eq!(raster.luma(1, 1), 100);
        assert_eq!(raster.luma(2, 1), 100);
    }

    #[test]
    fn test_window_half_size() {
        assert_eq!(window_half_size(40, 40, 12), 10);
        assert_eq!(window_half_size(1200, 2000, 12), 100);
        assert_eq!(window_half_size(300, 600, 16), 19); // 18.75 -> 19
    }

    #[test]
    fn test_threshold_is_binary() {
        let rows: Vec<Vec<u8>> = (0..30u32)
            .map(|y| (0..30u32).map(|x| ((x * 7 + y * 13) % 256) as u8).collect())
            .collect();
        let refs: Vec<&[u8]> = rows.iter().map(|r| r.as_slice()).collect();
        let mut raster = gray_raster(&refs);

        adaptive_threshold_for(&mut raster, SegmentationMode::Paragraph, false);
        for px in raster.data.chunks_exact(4) {
            assert!(px[0] == BLACK || px[0] == WHITE);
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn test_threshold_dark_text_on_light() {
        let mut raster = Raster::filled(40, 40, [230, 230, 230, 255]);
        for y in 18..22 {
            for x in 10..30 {
                raster.set_luma(x, y, 20);
            }
        }

        let mut plain = raster.clone();
        adaptive_threshold_for(&mut plain, SegmentationMode::Line, false);
        assert_eq!(plain.luma(20, 20), BLACK);
        assert_eq!(plain.luma(2, 2), WHITE);

        adaptive_threshold_for(&mut raster, SegmentationMode::Line, true);
        assert_eq!(raster.luma(20, 20), WHITE);
        assert_eq!(raster.luma(2, 2), BLACK);
    }

    #[test]
    fn test_closing_fills_gap() {
        let mut raster = gray_raster(&[
            &[255, 255, 255, 255, 255, 255, 255],
            &[255, 0, 0, 255, 0, 0, 255],
            &[255, 0, 0, 255, 0, 0, 255],
            &[255, 255, 255, 255, 255, 255, 255],
        ]);
        morphological_close(&mut raster, 1);
        assert_eq!(raster.luma(3, 1), BLACK);
        assert_eq!(raster.luma(3, 2), BLACK);
    }

    #[test]
    fn test_closing_idempotent() {
        let rows: Vec<Vec<u8>> = (0..16u32)
            .map(|y| {
                (0..16u32)
                    .map(|x| if (x * 3 + y * 5) % 7 < 3 { BLACK } else { WHITE })
                    .collect()
            })
            .collect();
        let refs: Vec<&[u8]> = rows.iter().map(|r| r.as_slice()).collect();
        let mut raster = gray_raster(&refs);

        morphological_close(&mut raster, 1);
        let once = raster.data.clone();
        morphological_close(&mut raster, 1);
        assert_eq!(raster.data, once);
    }

    #[test]
    fn test_pad_dimensions_and_border() {
        let raster = Raster::filled(3, 2, [0, 0, 0, 255]);
        let padded = pad(&raster, 5);
        assert_eq!(padded.dimensions(), (13, 12));
        assert_eq!(padded.luma(0, 0), WHITE);
        assert_eq!(padded.luma(4, 4), WHITE);
        assert_eq!(padded.luma(5, 5), BLACK);
        assert_eq!(padded.luma(7, 6), BLACK);
        assert_eq!(padded.luma(8, 6), WHITE);
    }

    #[test]
    fn test_pad_composites_over_white() {
        let raster = Raster::new(
            vec![
                0, 0, 0, 0, // transparent black
                0, 0, 0, 128, // half-covered black
                0, 0, 0, 255, // opaque black
            ],
            3,
            1,
        );
        let padded = pad(&raster, 2);
        assert!(padded.data.chunks_exact(4).all(|px| px[3] == 255));
        assert_eq!(padded.luma(2, 2), WHITE);
        assert_eq!(padded.luma(3, 2), 127);
        assert_eq!(padded.luma(4, 2), BLACK);
    }

    #[test]
    fn test_closing_keeps_isolated_light_pixels_dark() {
        // A single light pixel inside a dark block is closed over
        let mut raster = gray_raster(&[
            &[0, 0, 0],
            &[0, 255, 0],
            &[0, 0, 0],
        ]);
        morphological_close(&mut raster, 1);
        assert!(lumas(&raster).iter().all(|&v| v == BLACK));
    }
}
