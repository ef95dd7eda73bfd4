//! Region instance generation.
//!
//! A card is an immutable template; an instance is its seeded
//! realization with a hue-jittered color and a rendered bitmap. For a
//! fixed `(seed, card)` pair the output is byte-identical across runs.

use image::RgbaImage;

use crate::cards::RegionCard;
use crate::color::Color;
use crate::mutator::ImageMutator;
use crate::rng::Rng;

/// A concrete, seeded realization of a region card. Immutable after
/// creation; shared read-only by the journal and the map palette.
#[derive(Clone, Debug)]
pub struct RegionInstance {
    pub id: String,
    pub title: String,
    pub seed: u64,
    pub color: Color,
    pub bitmap: RgbaImage,
}

/// Realize a card into an instance.
///
/// The pipeline order matters: the first colorize gives autocrop a clean
/// alpha mask to key off; blur then desaturates the edges, so colorize
/// runs a second time before the alpha clamp strips the blurred fringe.
pub fn generate_instance(seed: u64, card: &RegionCard, source: RgbaImage) -> RegionInstance {
    let mut rng = Rng::new(seed);

    let color = card.color.with_hue_offset(rng.range(-10.0, 10.0));
    let dim = ((card.size as f64 * rng.range(0.8, 1.2)).round() as u32).max(1);
    let deg = rng.range(-30.0, 30.0);

    let bitmap = ImageMutator::new(source)
        .rotate(deg)
        .colorize(color)
        .autocrop()
        .resize(dim, dim)
        .blur(3)
        .colorize(color)
        .clamp_alpha()
        .speckle(&mut rng)
        .into_inner();

    RegionInstance {
        id: card.id.clone(),
        title: card.title.clone(),
        seed,
        color,
        bitmap,
    }
}
