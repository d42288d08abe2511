//! Zone enhancement before OCR or icon matching.
//!
//! Each zone gets its own fixed chain of transforms. The chains and their
//! magnitudes are tuned against real card scans; changing a constant here
//! changes what Tesseract reads.

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma, Rgba, RgbaImage};
use imageproc::filter::median_filter;

use crate::region::Zone;

/// Side length of the square the attribute icon and templates are resized to.
pub const ATTRIBUTE_MATCH_SIZE: u32 = 256;

/// A single grayscale transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// Histogram stretch, ignoring `cutoff` percent at each end
    AutoContrast { cutoff: u8 },
    /// Lanczos upscale by an integer factor
    Upscale(u32),
    /// Lanczos resize to fixed dimensions
    Resize { width: u32, height: u32 },
    /// 3x3 median denoise
    Median,
    /// Gaussian unsharp mask
    Unsharp {
        radius: f32,
        percent: u32,
        threshold: u8,
    },
    /// Contrast around the mean grey level
    Contrast(f32),
    /// Multiply every pixel
    Brightness(f32),
    /// Strong 3x3 edge enhancement
    EdgeEnhanceMore,
}

const NAME_CHAIN: &[Step] = &[
    Step::AutoContrast { cutoff: 0 },
    Step::Median,
    Step::Unsharp {
        radius: 1.0,
        percent: 150,
        threshold: 3,
    },
    Step::Upscale(3),
];

const TYPE_CHAIN: &[Step] = &[
    Step::AutoContrast { cutoff: 0 },
    Step::Upscale(6),
    Step::Median,
    Step::Unsharp {
        radius: 1.0,
        percent: 250,
        threshold: 3,
    },
    Step::Contrast(1.5),
];

const DESCRIPTION_CHAIN: &[Step] = &[Step::Upscale(2), Step::Median];

const ATKDEF_CHAIN: &[Step] = &[
    Step::AutoContrast { cutoff: 0 },
    Step::Upscale(3),
    Step::Unsharp {
        radius: 1.0,
        percent: 150,
        threshold: 3,
    },
];

/// Applied to the attribute zone and to every reference template alike.
const ATTRIBUTE_MATCH_CHAIN: &[Step] = &[
    Step::Resize {
        width: ATTRIBUTE_MATCH_SIZE,
        height: ATTRIBUTE_MATCH_SIZE,
    },
    Step::Median,
    Step::Contrast(1.4),
    Step::Brightness(0.9),
    Step::EdgeEnhanceMore,
    Step::AutoContrast { cutoff: 0 },
];

/// Returns the grayscale chain used for an OCR zone.
///
/// The attribute zone is not read with OCR; its chain is the matching
/// chain applied after `enhance_attribute_zone`.
pub fn chain_for(zone: Zone) -> &'static [Step] {
    match zone {
        Zone::Name => NAME_CHAIN,
        Zone::Type => TYPE_CHAIN,
        Zone::Description => DESCRIPTION_CHAIN,
        Zone::AtkDef => ATKDEF_CHAIN,
        Zone::Attribute => ATTRIBUTE_MATCH_CHAIN,
    }
}

/// Converts to grayscale and runs the zone's chain.
pub fn enhance_text_zone(zone: Zone, img: &RgbaImage) -> GrayImage {
    apply_chain(to_luma(img), chain_for(zone))
}

/// First pass on the attribute crop, keeping colour: 2x upscale, median,
/// then a per-channel stretch that clips 4% at each end.
pub fn enhance_attribute_zone(img: &RgbaImage) -> RgbaImage {
    let (w, h) = img.dimensions();
    let upscaled = imageops::resize(img, w * 2, h * 2, FilterType::Lanczos3);
    let denoised = median_filter(&upscaled, 1, 1);
    autocontrast_rgb(&denoised, 4)
}

/// Grayscale normalisation shared by the attribute crop and the templates.
/// Output is always `ATTRIBUTE_MATCH_SIZE` square.
pub fn prepare_for_match(img: &RgbaImage) -> GrayImage {
    apply_chain(to_luma(img), ATTRIBUTE_MATCH_CHAIN)
}

pub fn apply_chain(mut img: GrayImage, chain: &[Step]) -> GrayImage {
    for step in chain {
        img = apply_step(&img, *step);
    }
    img
}

fn apply_step(img: &GrayImage, step: Step) -> GrayImage {
    match step {
        Step::AutoContrast { cutoff } => autocontrast(img, cutoff),
        Step::Upscale(factor) => {
            let (w, h) = img.dimensions();
            imageops::resize(img, w * factor, h * factor, FilterType::Lanczos3)
        }
        Step::Resize { width, height } => imageops::resize(img, width, height, FilterType::Lanczos3),
        Step::Median => median_filter(img, 1, 1),
        Step::Unsharp {
            radius,
            percent,
            threshold,
        } => unsharp_mask(img, radius, percent, threshold),
        Step::Contrast(factor) => adjust_contrast(img, factor),
        Step::Brightness(factor) => adjust_brightness(img, factor),
        Step::EdgeEnhanceMore => edge_enhance_more(img),
    }
}

/// Converts to grayscale using the ITU-R BT.601 luma weights.
pub fn to_luma(img: &RgbaImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut output = ImageBuffer::new(w, h);
    for (x, y, pixel) in img.enumerate_pixels() {
        let r = pixel[0] as u32;
        let g = pixel[1] as u32;
        let b = pixel[2] as u32;
        let luma = (r * 299 + g * 587 + b * 114 + 500) / 1000;
        output.put_pixel(x, y, Luma([luma as u8]));
    }
    output
}

/// Builds the stretch lookup table for one channel histogram.
fn autocontrast_lut(histogram: &[u32; 256], cutoff: u8) -> [u8; 256] {
    let mut h = *histogram;

    if cutoff > 0 {
        let total: u64 = h.iter().map(|&c| c as u64).sum();
        let cut = (total * cutoff as u64 / 100) as u32;
        trim_histogram(h.iter_mut(), cut);
        trim_histogram(h.iter_mut().rev(), cut);
    }

    let lo = h.iter().position(|&c| c > 0);
    let hi = h.iter().rposition(|&c| c > 0);

    let mut lut = [0u8; 256];
    match (lo, hi) {
        (Some(lo), Some(hi)) if hi > lo => {
            let scale = 255.0 / (hi - lo) as f64;
            let offset = -(lo as f64) * scale;
            for (ix, v) in lut.iter_mut().enumerate() {
                *v = (ix as f64 * scale + offset).clamp(0.0, 255.0) as u8;
            }
        }
        _ => {
            for (ix, v) in lut.iter_mut().enumerate() {
                *v = ix as u8;
            }
        }
    }
    lut
}

fn trim_histogram<'a>(bins: impl Iterator<Item = &'a mut u32>, mut cut: u32) {
    for bin in bins {
        if cut > *bin {
            cut -= *bin;
            *bin = 0;
        } else {
            *bin -= cut;
            break;
        }
    }
}

/// Stretches the grey levels so the darkest kept level maps to 0 and the
/// brightest to 255. A flat image is returned unchanged.
pub fn autocontrast(img: &GrayImage, cutoff: u8) -> GrayImage {
    let mut histogram = [0u32; 256];
    for p in img.pixels() {
        histogram[p[0] as usize] += 1;
    }
    let lut = autocontrast_lut(&histogram, cutoff);
    let mut output = img.clone();
    for p in output.pixels_mut() {
        p[0] = lut[p[0] as usize];
    }
    output
}

/// `autocontrast` applied independently to the R, G and B channels.
/// Alpha is left alone.
pub fn autocontrast_rgb(img: &RgbaImage, cutoff: u8) -> RgbaImage {
    let mut histograms = [[0u32; 256]; 3];
    for p in img.pixels() {
        for (c, histogram) in histograms.iter_mut().enumerate() {
            histogram[p[c] as usize] += 1;
        }
    }
    let luts: Vec<[u8; 256]> = histograms
        .iter()
        .map(|h| autocontrast_lut(h, cutoff))
        .collect();

    let mut output = img.clone();
    for p in output.pixels_mut() {
        let Rgba([r, g, b, a]) = *p;
        *p = Rgba([luts[0][r as usize], luts[1][g as usize], luts[2][b as usize], a]);
    }
    output
}

/// Sharpens by adding back `percent` of the difference to a Gaussian blur.
/// Pixels whose difference is below `threshold` are left untouched.
pub fn unsharp_mask(img: &GrayImage, radius: f32, percent: u32, threshold: u8) -> GrayImage {
    let blurred = imageops::blur(img, radius);
    let mut output = img.clone();
    for (out, blur) in output.pixels_mut().zip(blurred.pixels()) {
        let orig = out[0] as i32;
        let diff = orig - blur[0] as i32;
        if diff.abs() >= threshold as i32 {
            let value = orig + diff * percent as i32 / 100;
            out[0] = value.clamp(0, 255) as u8;
        }
    }
    output
}

/// Scales each pixel's distance from the rounded mean grey level.
/// Results are truncated to whole grey levels.
pub fn adjust_contrast(img: &GrayImage, factor: f32) -> GrayImage {
    let count = img.width() as u64 * img.height() as u64;
    if count == 0 {
        return img.clone();
    }
    let sum: u64 = img.pixels().map(|p| p[0] as u64).sum();
    let mean = (sum as f64 / count as f64 + 0.5).floor() as f32;

    let mut output = img.clone();
    for p in output.pixels_mut() {
        let value = mean + factor * (p[0] as f32 - mean);
        p[0] = value.clamp(0.0, 255.0) as u8;
    }
    output
}

/// Multiplies every pixel by `factor`, truncating the result.
pub fn adjust_brightness(img: &GrayImage, factor: f32) -> GrayImage {
    let mut output = img.clone();
    for p in output.pixels_mut() {
        p[0] = (p[0] as f32 * factor).clamp(0.0, 255.0) as u8;
    }
    output
}

/// 3x3 kernel with centre weight 9 and -1 around it. Border pixels are
/// copied from the source.
pub fn edge_enhance_more(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut output = img.clone();
    if w < 3 || h < 3 {
        return output;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = 0i32;
            for dy in 0..3 {
                for dx in 0..3 {
                    acc -= img.get_pixel(x + dx - 1, y + dy - 1)[0] as i32;
                }
            }
            // centre counted once as -1 above, so add 10 to reach +9
            acc += 10 * img.get_pixel(x, y)[0] as i32;
            output.put_pixel(x, y, Luma([acc.clamp(0, 255) as u8]));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32, lo: u8, hi: u8) -> GrayImage {
        ImageBuffer::from_fn(w, h, |x, _| {
            let span = (hi - lo) as u32;
            Luma([lo + (x * span / (w - 1).max(1)) as u8])
        })
    }

    #[test]
    fn test_to_luma_bt601() {
        let mut img: RgbaImage = ImageBuffer::new(3, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
        img.put_pixel(2, 0, Rgba([255, 255, 255, 255]));

        let gray = to_luma(&img);
        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);
    }

    #[test]
    fn test_autocontrast_stretches_full_range() {
        let img = gradient(11, 1, 100, 150);
        let out = autocontrast(&img, 0);
        assert_eq!(out.get_pixel(0, 0)[0], 0);
        assert_eq!(out.get_pixel(10, 0)[0], 255);
    }

    #[test]
    fn test_autocontrast_flat_image_unchanged() {
        let img: GrayImage = ImageBuffer::from_pixel(4, 4, Luma([90]));
        assert_eq!(autocontrast(&img, 0), img);
    }

    #[test]
    fn test_autocontrast_cutoff_ignores_outliers() {
        // 98 mid-grey pixels plus one black and one white outlier
        let mut img: GrayImage = ImageBuffer::from_fn(10, 10, |x, _| Luma([100 + x as u8]));
        img.put_pixel(0, 0, Luma([0]));
        img.put_pixel(9, 9, Luma([255]));

        let plain = autocontrast(&img, 0);
        assert_eq!(plain.get_pixel(5, 5)[0], 105);

        let clipped = autocontrast(&img, 4);
        assert_eq!(clipped.get_pixel(0, 0)[0], 0);
        assert_eq!(clipped.get_pixel(9, 9)[0], 255);
        assert!(clipped.get_pixel(5, 5)[0] > 105);
    }

    #[test]
    fn test_adjust_contrast_around_mean() {
        let mut img: GrayImage = ImageBuffer::new(2, 1);
        img.put_pixel(0, 0, Luma([100]));
        img.put_pixel(1, 0, Luma([200]));

        let out = adjust_contrast(&img, 1.5);
        assert_eq!(out.get_pixel(0, 0)[0], 75);
        assert_eq!(out.get_pixel(1, 0)[0], 225);
    }

    #[test]
    fn test_adjust_brightness() {
        let img: GrayImage = ImageBuffer::from_pixel(1, 1, Luma([200]));
        assert_eq!(adjust_brightness(&img, 0.9).get_pixel(0, 0)[0], 180);
    }

    #[test]
    fn test_fractional_levels_are_truncated() {
        // 255 * 0.9 = 229.5
        let white: GrayImage = ImageBuffer::from_pixel(1, 1, Luma([255]));
        assert_eq!(adjust_brightness(&white, 0.9).get_pixel(0, 0)[0], 229);

        // mean 150.5 rounds to 151; 151 + 1.5 * (100 - 151) = 74.5
        let mut img: GrayImage = ImageBuffer::new(2, 1);
        img.put_pixel(0, 0, Luma([100]));
        img.put_pixel(1, 0, Luma([201]));
        let out = adjust_contrast(&img, 1.5);
        assert_eq!(out.get_pixel(0, 0)[0], 74);
        assert_eq!(out.get_pixel(1, 0)[0], 226);
    }

    #[test]
    fn test_edge_enhance_more_flat_is_identity() {
        let img: GrayImage = ImageBuffer::from_pixel(5, 5, Luma([77]));
        assert_eq!(edge_enhance_more(&img), img);
    }

    #[test]
    fn test_edge_enhance_more_spot() {
        let mut img: GrayImage = ImageBuffer::from_pixel(3, 3, Luma([10]));
        img.put_pixel(1, 1, Luma([20]));
        // 9*20 - 8*10 = 100
        assert_eq!(edge_enhance_more(&img).get_pixel(1, 1)[0], 100);
    }

    #[test]
    fn test_unsharp_mask_flat_is_identity() {
        let img: GrayImage = ImageBuffer::from_pixel(8, 8, Luma([128]));
        assert_eq!(unsharp_mask(&img, 1.0, 150, 3), img);
    }

    #[test]
    fn test_zone_chain_output_sizes() {
        let crop: RgbaImage =
            ImageBuffer::from_fn(20, 10, |x, y| Rgba([(x * 10) as u8, (y * 20) as u8, 50, 255]));

        assert_eq!(enhance_text_zone(Zone::Name, &crop).dimensions(), (60, 30));
        assert_eq!(enhance_text_zone(Zone::Type, &crop).dimensions(), (120, 60));
        assert_eq!(enhance_text_zone(Zone::Description, &crop).dimensions(), (40, 20));
        assert_eq!(enhance_text_zone(Zone::AtkDef, &crop).dimensions(), (60, 30));
        assert_eq!(enhance_attribute_zone(&crop).dimensions(), (40, 20));
        assert_eq!(
            prepare_for_match(&crop).dimensions(),
            (ATTRIBUTE_MATCH_SIZE, ATTRIBUTE_MATCH_SIZE)
        );
    }

    #[test]
    fn test_chains_are_deterministic() {
        let crop: RgbaImage =
            ImageBuffer::from_fn(16, 16, |x, y| Rgba([(x * y) as u8, x as u8 * 9, y as u8 * 7, 255]));
        assert_eq!(prepare_for_match(&crop), prepare_for_match(&crop));
        assert_eq!(
            enhance_text_zone(Zone::Type, &crop),
            enhance_text_zone(Zone::Type, &crop)
        );
    }
}
