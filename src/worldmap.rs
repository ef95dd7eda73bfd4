//! Raster world map: a palette-indexed grid onto which region bitmaps
//! are stamped.
//!
//! Each cell holds a small integer index into the palette of placed
//! region instances (0 = empty). Placement searches radially outward
//! from the requested position until the new region's opaque pixels
//! collide with few enough already-filled cells, then absorbs small
//! gaps left between the new region and its neighbors.

use std::collections::VecDeque;
use std::io::Cursor;

use image::{Rgba, RgbaImage};

use crate::generator::RegionInstance;
use crate::rng::Rng;

/// Per-cell shade factors for the rendered minimap.
const MINIMAP_SHADES: [f64; 6] = [1.0, 1.0, 0.98, 0.95, 0.92, 0.9];

/// Background color for empty cells.
const OCEAN: Rgba<u8> = Rgba([0, 64, 128, 255]);

/// Tuning knobs for the placement search and gap absorption. The
/// defaults are empirical; none of them is load-bearing beyond "small,
/// affects visual density".
#[derive(Clone, Copy, Debug)]
pub struct PlacementParams {
    /// Fraction of a bitmap's opaque pixels that may collide with
    /// already-filled cells before an offset is rejected.
    pub collision_threshold: f64,
    /// Radial distance added after each rejected offset.
    pub dist_step: i32,
    /// Attempt budget; exhausting it commits the last offset tried.
    pub max_attempts: u32,
    /// The search starts at `min(bitmap dims) / start_dist_divisor`.
    pub start_dist_divisor: u32,
    /// Upper bound on the empty-run length the scanline pass will close.
    pub max_column_gap: usize,
}

impl Default for PlacementParams {
    fn default() -> Self {
        Self {
            collision_threshold: 0.2,
            dist_step: 3,
            max_attempts: 1000,
            start_dist_divisor: 3,
            max_column_gap: 32,
        }
    }
}

pub struct WorldMap {
    pub width: usize,
    pub height: usize,
    params: PlacementParams,
    map: Vec<u16>,
    palette: Vec<Option<RegionInstance>>,
}

impl WorldMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_params(width, height, PlacementParams::default())
    }

    pub fn with_params(width: usize, height: usize, params: PlacementParams) -> Self {
        Self {
            width,
            height,
            params,
            map: vec![0; width * height],
            // Index 0 is reserved for empty space.
            palette: vec![None],
        }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> u16 {
        self.map[self.index(x, y)]
    }

    pub fn palette(&self) -> &[Option<RegionInstance>] {
        &self.palette
    }

    /// Number of committed placements (palette length minus the empty
    /// sentinel).
    pub fn placements(&self) -> usize {
        self.palette.len() - 1
    }

    /// Look up a placed instance by region id.
    pub fn instance(&self, id: &str) -> Option<&RegionInstance> {
        self.palette
            .iter()
            .flatten()
            .find(|instance| instance.id == id)
    }

    /// All grid cells currently owned by the region with the given id.
    pub fn region_cells(&self, id: &str) -> Vec<(usize, usize)> {
        let indices: Vec<u16> = self
            .palette
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.as_ref().is_some_and(|r| r.id == id))
            .map(|(i, _)| i as u16)
            .collect();
        if indices.is_empty() {
            return Vec::new();
        }

        let mut cells = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if indices.contains(&self.map[self.index(x, y)]) {
                    cells.push((x, y));
                }
            }
        }
        cells
    }

    /// Stamp a region instance near `(x, y)` (world coordinates, origin
    /// at the map center), searching radially along `deg` for an offset
    /// where overlap with existing regions stays under the collision
    /// threshold. Returns the world coordinates actually used; the
    /// search is best-effort and commits the last attempted offset when
    /// the budget runs out.
    pub fn place(&mut self, region: &RegionInstance, x: i32, y: i32, deg: f64) -> (i32, i32) {
        let bitmap = &region.bitmap;
        let (iw, ih) = (bitmap.width() as i32, bitmap.height() as i32);

        let cx = x + self.width as i32 / 2 - iw / 2;
        let cy = y + self.height as i32 / 2 - ih / 2;

        debug_assert!(self.palette.len() < u16::MAX as usize, "palette exhausted");
        let index = self.palette.len() as u16;
        self.palette.push(Some(region.clone()));

        let original = self.map.clone();
        let rad = (-deg).to_radians();
        let mut dist = iw.min(ih) / self.params.start_dist_divisor.max(1) as i32;
        let mut attempts = self.params.max_attempts;

        let (ox, oy) = loop {
            let ox = (dist as f64 * rad.cos()).floor() as i32;
            let oy = (dist as f64 * rad.sin()).floor() as i32;

            let (total, skipped) = self.stamp(bitmap, cx + ox, cy + oy, index);
            attempts = attempts.saturating_sub(1);

            let rejected =
                total > 0 && skipped as f64 > total as f64 * self.params.collision_threshold;
            if rejected && attempts > 0 {
                self.map.copy_from_slice(&original);
                dist += self.params.dist_step;
                continue;
            }
            if rejected {
                log::warn!(
                    "placement search exhausted for `{}`; committing with {}/{} colliding pixels",
                    region.id,
                    skipped,
                    total
                );
            }
            break (ox, oy);
        };

        self.fill_column_gaps(index);
        self.fill_enclosed_gaps(index);

        (x + ox, y + oy)
    }

    /// Write the bitmap's opaque pixels into free cells at the given
    /// top-left grid offset. Returns (opaque pixel count, pixels that
    /// could not claim their cell). Out-of-bounds pixels count as
    /// collisions, pushing placements inward.
    fn stamp(&mut self, bitmap: &RgbaImage, left: i32, top: i32, index: u16) -> (u64, u64) {
        let mut total = 0u64;
        let mut skipped = 0u64;

        for (ix, iy, px) in bitmap.enumerate_pixels() {
            if px[3] == 0 {
                continue;
            }
            total += 1;

            let gx = left + ix as i32;
            let gy = top + iy as i32;
            if gx < 0 || gy < 0 || gx >= self.width as i32 || gy >= self.height as i32 {
                skipped += 1;
                continue;
            }
            let i = self.index(gx as usize, gy as usize);
            if self.map[i] != 0 {
                skipped += 1;
                continue;
            }
            self.map[i] = index;
        }

        (total, skipped)
    }

    /// Scanline gap pass: per column, close empty runs no longer than
    /// `min(run_len / 2, max_column_gap)` that follow a run of the fill
    /// index. Local and greedy; larger gaps are left for the flood pass
    /// or stay open. Walks whole columns, so applying it twice changes
    /// nothing the second time.
    fn fill_column_gaps(&mut self, fill: u16) {
        let h = self.height;
        for x in 0..self.width {
            let mut y = 0;

            // Advance to the first run of the fill index.
            while y < h && self.map[self.index(x, y)] != fill {
                y += 1;
            }

            let mut run = 0usize;
            while y < h {
                let cell = self.map[self.index(x, y)];
                if cell == fill {
                    run += 1;
                    y += 1;
                    continue;
                }
                if cell != 0 {
                    // A different region interrupts the column.
                    while y < h && self.map[self.index(x, y)] != fill {
                        y += 1;
                    }
                    run = 0;
                    continue;
                }

                let gap_start = y;
                let mut gap = 0usize;
                while y < h && self.map[self.index(x, y)] == 0 {
                    gap += 1;
                    y += 1;
                }

                if gap <= (run / 2).min(self.params.max_column_gap) {
                    for yy in gap_start..gap_start + gap {
                        let i = self.index(x, yy);
                        self.map[i] = fill;
                    }
                    run += gap;
                } else {
                    run = 0;
                }
            }
        }
    }

    /// Flood-fill boundary pass: empty cells reachable from the map edge
    /// through 8-connected empty cells are true exterior; every other
    /// empty cell is landlocked and absorbed into the fill index.
    fn fill_enclosed_gaps(&mut self, fill: u16) {
        let (w, h) = (self.width, self.height);
        let mut boundary = vec![false; w * h];
        let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

        let seed = |x: usize, y: usize, boundary: &mut Vec<bool>, queue: &mut VecDeque<(usize, usize)>| {
            let i = y * w + x;
            if self.map[i] == 0 && !boundary[i] {
                boundary[i] = true;
                queue.push_back((x, y));
            }
        };

        for x in 0..w {
            seed(x, 0, &mut boundary, &mut queue);
            seed(x, h - 1, &mut boundary, &mut queue);
        }
        for y in 0..h {
            seed(0, y, &mut boundary, &mut queue);
            seed(w - 1, y, &mut boundary, &mut queue);
        }

        while let Some((x, y)) = queue.pop_front() {
            for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let nx = x as i32 + dx;
                    let ny = y as i32 + dy;
                    if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 {
                        continue;
                    }
                    let j = ny as usize * w + nx as usize;
                    if self.map[j] == 0 && !boundary[j] {
                        boundary[j] = true;
                        queue.push_back((nx as usize, ny as usize));
                    }
                }
            }
        }

        for i in 0..self.map.len() {
            if self.map[i] == 0 && !boundary[i] {
                self.map[i] = fill;
            }
        }
    }

    /// Render the map to an RGBA image: palette color per cell with a
    /// light per-cell shade speckle, ocean blue for empty space.
    pub fn render_minimap(&self, rng: &mut Rng) -> RgbaImage {
        let mut img = RgbaImage::new(self.width as u32, self.height as u32);
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.map[self.index(x, y)];
                let pixel = match &self.palette[cell as usize] {
                    Some(region) => {
                        let s = *rng.select(&MINIMAP_SHADES);
                        Rgba([
                            (region.color.r as f64 * s).floor() as u8,
                            (region.color.g as f64 * s).floor() as u8,
                            (region.color.b as f64 * s).floor() as u8,
                            255,
                        ])
                    }
                    None => OCEAN,
                };
                img.put_pixel(x as u32, y as u32, pixel);
            }
        }
        img
    }

    /// Render and PNG-encode the minimap in one step.
    pub fn minimap_png(&self, rng: &mut Rng) -> Result<Vec<u8>, image::ImageError> {
        encode_png(&self.render_minimap(rng))
    }

    pub fn save_minimap(&self, rng: &mut Rng, path: &str) -> Result<(), image::ImageError> {
        self.render_minimap(rng).save(path)
    }
}

/// PNG-encode an RGBA buffer to an in-memory byte vector.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)?;
    Ok(bytes.into_inner())
}
