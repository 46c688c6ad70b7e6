//! Deterministic height-field terrain.
//!
//! Heights come from layered value noise over a permutation table that is
//! shuffled once when the generator is built. Without a configured seed the
//! table differs between runs but stays fixed for the life of the process, so
//! regenerating a chunk always yields the same voxels.

use bevy::prelude::*;
use crate::config::{GeneratorKind, TerrainSettings};
use crate::voxel::chunk::Chunk;
use crate::voxel::coords::chunk_to_world;
use crate::voxel::types::{BlockId, TerrainPalette};

const TABLE_SIZE: usize = 256;

pub struct TerrainGenerator {
    kind: GeneratorKind,
    settings: TerrainSettings,
    seed: u64,
    perm: [u8; TABLE_SIZE * 2],
}

impl TerrainGenerator {
    /// Uses the configured seed, or draws a fresh one for this process.
    pub fn new(kind: GeneratorKind, settings: TerrainSettings) -> Self {
        let seed = settings.seed.unwrap_or_else(|| fastrand::u64(..));
        Self::with_seed(kind, settings, seed)
    }

    pub fn with_seed(kind: GeneratorKind, settings: TerrainSettings, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut table: Vec<u8> = (0..TABLE_SIZE).map(|i| i as u8).collect();
        rng.shuffle(&mut table);

        let mut perm = [0u8; TABLE_SIZE * 2];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i % TABLE_SIZE];
        }

        log::debug!("terrain permutation table built from seed {seed:#x}");
        Self { kind, settings, seed, perm }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn kind(&self) -> GeneratorKind {
        self.kind
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    fn lattice(&self, xi: i32, zi: i32) -> f32 {
        let a = self.perm[(xi & 255) as usize] as usize;
        self.perm[a + (zi & 255) as usize] as f32 / 255.0
    }

    fn value_noise(&self, x: f32, z: f32) -> f32 {
        let xi = x.floor() as i32;
        let zi = z.floor() as i32;
        let xf = x - x.floor();
        let zf = z - z.floor();

        let v00 = self.lattice(xi, zi);
        let v10 = self.lattice(xi + 1, zi);
        let v01 = self.lattice(xi, zi + 1);
        let v11 = self.lattice(xi + 1, zi + 1);

        let u = smoothstep(xf);
        let v = smoothstep(zf);

        lerp(lerp(v00, v10, u), lerp(v01, v11, u), v)
    }

    /// Normalized fractal sum in `[0, 1]`.
    fn fbm(&self, x: f32, z: f32) -> f32 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_value = 0.0;

        for _ in 0..self.settings.octaves {
            value += amplitude * self.value_noise(x * frequency, z * frequency);
            max_value += amplitude;
            amplitude *= self.settings.persistence;
            frequency *= 2.0;
        }

        value / max_value
    }

    /// Terrain surface elevation of the world column `(x, z)`.
    pub fn height_at(&self, world_x: i32, world_z: i32) -> i32 {
        let s = &self.settings;
        let n = self.fbm(world_x as f32 * s.scale, world_z as f32 * s.scale);
        ((n * s.amplitude).floor() as i32).max(s.min_height)
    }

    /// Fills `chunk` with terrain and trees, then clears its modified flag.
    /// The caller rebuilds the mesh.
    pub fn generate(&self, chunk: &mut Chunk, palette: &TerrainPalette) {
        if self.kind == GeneratorKind::Empty {
            chunk.clear_modified();
            return;
        }

        let edge = chunk.edge() as i32;
        let origin = chunk_to_world(chunk.coord(), edge);

        for lx in 0..edge {
            for lz in 0..edge {
                let world_x = origin.x + lx;
                let world_z = origin.z + lz;
                let height = self.height_at(world_x, world_z);

                fill_column(chunk, origin, lx, lz, height, self.settings.dirt_depth, palette);

                if height > 0 {
                    let mut rng = fastrand::Rng::with_seed(column_seed(self.seed, world_x, world_z));
                    if rng.f32() < self.settings.tree_chance {
                        let base = IVec3::new(world_x, height + 1, world_z);
                        self.place_tree(chunk, origin, base, &mut rng, palette);
                    }
                }
            }
        }

        chunk.clear_modified();
    }

    /// Trunk plus a leaf ball. Cells outside the chunk are dropped.
    fn place_tree(
        &self,
        chunk: &mut Chunk,
        origin: IVec3,
        base: IVec3,
        rng: &mut fastrand::Rng,
        palette: &TerrainPalette,
    ) {
        let s = &self.settings;
        let trunk_height = rng.i32(s.trunk_min..=s.trunk_max);
        for dy in 0..trunk_height {
            place_world(chunk, origin, base + IVec3::new(0, dy, 0), palette.log, true);
        }

        let center = base + IVec3::new(0, trunk_height, 0);
        let r = s.leaf_radius;
        for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    if dx * dx + dy * dy + dz * dz > r * r {
                        continue;
                    }
                    // Always draw so every chunk sees the same sequence for this tree
                    let keep = rng.f32() < s.leaf_density;
                    if keep {
                        place_world(chunk, origin, center + IVec3::new(dx, dy, dz), palette.leaves, false);
                    }
                }
            }
        }
    }
}

/// Column fill for `y = 0..=height`: grass on top, `dirt_depth` layers of
/// dirt, stone below. Only the part inside the chunk is written.
pub(crate) fn fill_column(
    chunk: &mut Chunk,
    origin: IVec3,
    lx: i32,
    lz: i32,
    height: i32,
    dirt_depth: i32,
    palette: &TerrainPalette,
) {
    let edge = chunk.edge() as i32;
    let y_start = origin.y.max(0);
    let y_end = height.min(origin.y + edge - 1);

    for world_y in y_start..=y_end {
        let id = if world_y == height {
            palette.grass
        } else if world_y >= height - dirt_depth {
            palette.dirt
        } else {
            palette.stone
        };
        let local = UVec3::new(lx as u32, (world_y - origin.y) as u32, lz as u32);
        chunk.insert_raw(local, id);
    }
}

fn place_world(chunk: &mut Chunk, origin: IVec3, world: IVec3, id: BlockId, replace: bool) {
    let local = world - origin;
    if local.cmplt(IVec3::ZERO).any() {
        return;
    }
    let local = local.as_uvec3();
    if !chunk.contains_local(local) {
        return;
    }
    if replace || chunk.get(local).is_none() {
        chunk.insert_raw(local, id);
    }
}

fn column_seed(seed: u64, x: i32, z: i32) -> u64 {
    let mut h = seed ^ (x as u32 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h = (h ^ (z as u32 as u64)).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h ^ (h >> 29)
}

fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}
