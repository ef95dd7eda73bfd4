//! Source bitmaps for region cards.
//!
//! A card references its template image by path. When the file exists it
//! is decoded with the `image` crate; otherwise an organic silhouette is
//! synthesized deterministically from the card id, so the engine (and
//! its tests) run without any binary assets on disk.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use image::{Rgba, RgbaImage};
use noise::{NoiseFn, OpenSimplex};

use crate::cards::RegionCard;

/// Resolve a card's template bitmap.
pub fn load_card_bitmap(card: &RegionCard) -> Result<RgbaImage, image::ImageError> {
    if !card.image.is_empty() && Path::new(&card.image).exists() {
        return Ok(image::open(&card.image)?.to_rgba8());
    }
    Ok(synthesize_silhouette(&card.id, card.size))
}

/// Render an organic blob silhouette for a card with no bitmap on disk.
///
/// OpenSimplex fBm modulates a radial falloff from the canvas center;
/// cells above the threshold become opaque. Pure function of the card id
/// and nominal size.
pub fn synthesize_silhouette(id: &str, size: u32) -> RgbaImage {
    let dim = size.clamp(16, 512);
    let noise = OpenSimplex::new(derive_seed(id) as u32);

    let mut img = RgbaImage::new(dim, dim);
    let half = dim as f64 / 2.0;

    for y in 0..dim {
        for x in 0..dim {
            let dx = (x as f64 + 0.5 - half) / half;
            let dy = (y as f64 + 0.5 - half) / half;
            let r = (dx * dx + dy * dy).sqrt();

            let n = fbm_noise(&noise, dx * 1.5, dy * 1.5, 4, 0.5, 2.0);
            let v = (1.0 - r) + 0.35 * n;
            if v > 0.3 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
    }

    img
}

/// Derive a noise seed from a card id. Hashing keeps distinct cards on
/// distinct but deterministic silhouettes.
fn derive_seed(id: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    hasher.finish()
}

/// Fractional Brownian Motion noise
fn fbm_noise(
    noise: &impl NoiseFn<f64, 2>,
    x: f64,
    y: f64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += amplitude * noise.get([x * frequency, y * frequency]);
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    total / max_value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silhouette_is_deterministic() {
        let a = synthesize_silhouette("haven", 70);
        let b = synthesize_silhouette("haven", 70);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_different_ids_differ() {
        let a = synthesize_silhouette("haven", 70);
        let b = synthesize_silhouette("redrock", 70);
        assert_ne!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_silhouette_has_body_and_margin() {
        let img = synthesize_silhouette("midland", 100);
        let opaque = img.pixels().filter(|px| px[3] != 0).count();
        let total = (img.width() * img.height()) as usize;
        // A usable blob fills a meaningful fraction of the canvas but
        // never the whole thing.
        assert!(opaque > total / 10, "blob too small: {opaque}/{total}");
        assert!(opaque < total, "blob has no transparent margin");
    }

    #[test]
    fn test_missing_file_falls_back_to_silhouette() {
        let card = RegionCard {
            id: "haven".to_string(),
            image: "assets/does-not-exist.png".to_string(),
            size: 70,
            ..serde_json::from_str(r#"{ "id": "haven" }"#).unwrap()
        };
        let bitmap = load_card_bitmap(&card).unwrap();
        assert_eq!(bitmap.as_raw(), synthesize_silhouette("haven", 70).as_raw());
    }
}
