//! In-memory image pipeline for region bitmaps.
//!
//! Chainable pixel-buffer operations used by the region instance
//! generator. Everything works on plain RGBA buffers; the `image` crate
//! only decodes and encodes at the edges, so the pipeline is testable
//! with synthetic buffers. The order the generator applies these in is
//! load-bearing: colorize must precede autocrop (crop keys off alpha)
//! and run again after blur (blur bleeds edge colors).

use image::{Rgba, RgbaImage};

use crate::color::Color;
use crate::rng::Rng;

/// Per-pixel shade factors for the parchment speckle effect.
const SPECKLE_SHADES: [f64; 7] = [1.0, 1.0, 1.0, 0.95, 0.925, 0.9, 0.85];

/// Transparent margin left around a resized bitmap so the blur pass has
/// room to feather the edges.
const RESIZE_MARGIN: u32 = 5;

pub struct ImageMutator {
    img: RgbaImage,
}

impl ImageMutator {
    pub fn new(img: RgbaImage) -> Self {
        Self { img }
    }

    pub fn into_inner(self) -> RgbaImage {
        self.img
    }

    /// Rotate about the center into an enlarged canvas (double the
    /// rotated bounding box, cropped down later), nearest-neighbor.
    pub fn rotate(self, deg: f64) -> Self {
        let src = &self.img;
        let (w, h) = (src.width() as f64, src.height() as f64);
        let angle = deg.to_radians();
        let (sin_a, cos_a) = (angle.sin(), angle.cos());

        let tw = ((2.0 * (w * cos_a.abs() + h * sin_a.abs())).ceil() as u32).max(1);
        let th = ((2.0 * (w * sin_a.abs() + h * cos_a.abs())).ceil() as u32).max(1);

        let mut target = RgbaImage::new(tw, th);
        let (cx, cy) = (tw as f64 / 2.0, th as f64 / 2.0);
        let (sx0, sy0) = (w / 2.0, h / 2.0);

        for y in 0..th {
            for x in 0..tw {
                let dx = x as f64 + 0.5 - cx;
                let dy = y as f64 + 0.5 - cy;
                let ux = dx * cos_a + dy * sin_a + sx0;
                let uy = -dx * sin_a + dy * cos_a + sy0;
                if ux >= 0.0 && ux < w && uy >= 0.0 && uy < h {
                    target.put_pixel(x, y, *src.get_pixel(ux as u32, uy as u32));
                }
            }
        }

        Self { img: target }
    }

    /// Flat-recolor: every pixel with any alpha becomes the given color
    /// at full opacity.
    pub fn colorize(mut self, color: Color) -> Self {
        for px in self.img.pixels_mut() {
            if px[3] != 0 {
                *px = Rgba([color.r, color.g, color.b, 255]);
            }
        }
        self
    }

    /// Crop to the bounding box of non-transparent pixels. A fully
    /// transparent buffer is left unchanged.
    pub fn autocrop(self) -> Self {
        let src = &self.img;
        let (w, h) = (src.width(), src.height());

        let mut left = w;
        let mut right = 0;
        let mut top = h;
        let mut bottom = 0;
        for (x, y, px) in src.enumerate_pixels() {
            if px[3] != 0 {
                left = left.min(x);
                right = right.max(x + 1);
                top = top.min(y);
                bottom = bottom.max(y + 1);
            }
        }

        if left >= right || top >= bottom {
            return self;
        }

        let mut cropped = RgbaImage::new(right - left, bottom - top);
        for y in top..bottom {
            for x in left..right {
                cropped.put_pixel(x - left, y - top, *src.get_pixel(x, y));
            }
        }

        Self { img: cropped }
    }

    /// Aspect-preserving resize into a `width` x `height` box, drawn
    /// with a transparent margin, nearest-neighbor.
    pub fn resize(self, width: u32, height: u32) -> Self {
        let src = &self.img;
        let (sw, sh) = (src.width(), src.height());
        let aspect = sw as f64 / sh as f64;

        let (mut width, mut height) = (width.max(1), height.max(1));
        if width as f64 / height as f64 > aspect {
            width = ((height as f64 * aspect).ceil() as u32).max(1);
        } else {
            height = ((width as f64 / aspect).ceil() as u32).max(1);
        }

        let inner_w = width.saturating_sub(2 * RESIZE_MARGIN).max(1);
        let inner_h = height.saturating_sub(2 * RESIZE_MARGIN).max(1);

        let mut target = RgbaImage::new(width, height);
        for ty in 0..inner_h {
            for tx in 0..inner_w {
                let sx = (tx as u64 * sw as u64 / inner_w as u64) as u32;
                let sy = (ty as u64 * sh as u64 / inner_h as u64) as u32;
                let out_x = tx + RESIZE_MARGIN;
                let out_y = ty + RESIZE_MARGIN;
                if out_x < width && out_y < height {
                    target.put_pixel(out_x, out_y, *src.get_pixel(sx, sy));
                }
            }
        }

        Self { img: target }
    }

    /// N passes of a 3x3 weighted-average kernel over all four channels,
    /// renormalized at the borders.
    pub fn blur(mut self, iterations: u32) -> Self {
        for _ in 0..iterations {
            self.img = blur_once(&self.img);
        }
        self
    }

    /// Snap alpha to fully opaque or fully transparent, removing the
    /// antialiased fringe the blur pass introduces.
    pub fn clamp_alpha(mut self) -> Self {
        for px in self.img.pixels_mut() {
            px[3] = if px[3] > 0 { 255 } else { 0 };
        }
        self
    }

    /// Multiply each opaque pixel's RGB by a shade drawn from a small
    /// discrete set, faking parchment texture. Seeded, so instances
    /// stay reproducible.
    pub fn speckle(mut self, rng: &mut Rng) -> Self {
        for px in self.img.pixels_mut() {
            if px[3] != 0 {
                let shade = *rng.select(&SPECKLE_SHADES);
                px[0] = (px[0] as f64 * shade).floor() as u8;
                px[1] = (px[1] as f64 * shade).floor() as u8;
                px[2] = (px[2] as f64 * shade).floor() as u8;
            }
        }
        self
    }
}

fn blur_once(src: &RgbaImage) -> RgbaImage {
    const KERNEL: [[u32; 3]; 3] = [[1, 2, 1], [2, 4, 2], [1, 2, 1]];

    let (w, h) = (src.width() as i64, src.height() as i64);
    let mut out = RgbaImage::new(src.width(), src.height());

    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u32; 4];
            let mut weight = 0u32;
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, &k) in row.iter().enumerate() {
                    let sx = x + kx as i64 - 1;
                    let sy = y + ky as i64 - 1;
                    if sx >= 0 && sx < w && sy >= 0 && sy < h {
                        let px = src.get_pixel(sx as u32, sy as u32);
                        for c in 0..4 {
                            acc[c] += px[c] as u32 * k;
                        }
                        weight += k;
                    }
                }
            }
            out.put_pixel(
                x as u32,
                y as u32,
                Rgba([
                    (acc[0] / weight) as u8,
                    (acc[1] / weight) as u8,
                    (acc[2] / weight) as u8,
                    (acc[3] / weight) as u8,
                ]),
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_square(dim: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(dim, dim, Rgba(color))
    }

    #[test]
    fn test_colorize_only_touches_opaque_pixels() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([10, 20, 30, 128]));
        img.put_pixel(1, 0, Rgba([10, 20, 30, 0]));

        let out = ImageMutator::new(img)
            .colorize(Color::new(0xaa, 0xbb, 0xcc))
            .into_inner();
        assert_eq!(out.get_pixel(0, 0).0, [0xaa, 0xbb, 0xcc, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [10, 20, 30, 0]);
    }

    #[test]
    fn test_clamp_alpha_binarizes() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([1, 1, 1, 0]));
        img.put_pixel(1, 0, Rgba([1, 1, 1, 1]));
        img.put_pixel(2, 0, Rgba([1, 1, 1, 254]));

        let out = ImageMutator::new(img).clamp_alpha().into_inner();
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(1, 0)[3], 255);
        assert_eq!(out.get_pixel(2, 0)[3], 255);
    }

    #[test]
    fn test_autocrop_finds_bounding_box() {
        let mut img = RgbaImage::new(10, 10);
        for y in 3..7 {
            for x in 2..8 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let out = ImageMutator::new(img).autocrop().into_inner();
        assert_eq!((out.width(), out.height()), (6, 4));
        assert_eq!(out.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn test_autocrop_transparent_buffer_unchanged() {
        let img = RgbaImage::new(8, 8);
        let out = ImageMutator::new(img).autocrop().into_inner();
        assert_eq!((out.width(), out.height()), (8, 8));
    }

    #[test]
    fn test_rotate_zero_preserves_content() {
        let img = solid_square(16, [50, 60, 70, 255]);
        let out = ImageMutator::new(img).rotate(0.0).autocrop().into_inner();
        assert_eq!((out.width(), out.height()), (16, 16));
        assert_eq!(out.get_pixel(8, 8).0, [50, 60, 70, 255]);
    }

    #[test]
    fn test_rotate_enlarges_canvas() {
        let img = solid_square(10, [1, 2, 3, 255]);
        let out = ImageMutator::new(img).rotate(45.0).into_inner();
        assert!(out.width() > 10);
        assert!(out.height() > 10);
    }

    #[test]
    fn test_resize_preserves_aspect_with_margin() {
        // 2:1 source into a square box stays 2:1.
        let img = RgbaImage::from_pixel(40, 20, Rgba([9, 9, 9, 255]));
        let out = ImageMutator::new(img).resize(30, 30).into_inner();
        assert_eq!((out.width(), out.height()), (30, 15));
        // Margin ring is transparent.
        assert_eq!(out.get_pixel(0, 0)[3], 0);
        assert_eq!(out.get_pixel(RESIZE_MARGIN + 1, RESIZE_MARGIN + 1)[3], 255);
    }

    #[test]
    fn test_blur_spreads_alpha_outward() {
        let mut img = RgbaImage::new(5, 5);
        img.put_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let out = ImageMutator::new(img).blur(1).into_inner();
        assert!(out.get_pixel(1, 2)[3] > 0);
        assert!(out.get_pixel(2, 1)[3] > 0);
        // One pass reaches only the immediate neighborhood.
        assert_eq!(out.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_speckle_is_seeded() {
        let img = solid_square(12, [200, 180, 160, 255]);
        let a = ImageMutator::new(img.clone())
            .speckle(&mut Rng::new(77))
            .into_inner();
        let b = ImageMutator::new(img)
            .speckle(&mut Rng::new(77))
            .into_inner();
        assert_eq!(a.as_raw(), b.as_raw());
        // Some pixel must actually be darkened.
        assert!(a.pixels().any(|px| px[0] < 200));
    }

    #[test]
    fn test_speckle_skips_transparent_pixels() {
        let img = RgbaImage::new(6, 6);
        let out = ImageMutator::new(img.clone())
            .speckle(&mut Rng::new(1))
            .into_inner();
        assert_eq!(out.as_raw(), img.as_raw());
    }
}
