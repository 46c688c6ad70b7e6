use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a chunk in chunk-space. Registry and persistence key.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug, Serialize, Deserialize)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<IVec3> for ChunkCoord {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<[i32; 3]> for ChunkCoord {
    fn from(a: [i32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Chunk containing the world voxel `pos`.
pub fn world_to_chunk(pos: IVec3, edge: i32) -> ChunkCoord {
    ChunkCoord::new(
        pos.x.div_euclid(edge),
        pos.y.div_euclid(edge),
        pos.z.div_euclid(edge),
    )
}

/// Local key of `pos` inside its chunk, always in `[0, edge)` per axis.
pub fn world_to_local(pos: IVec3, edge: i32) -> UVec3 {
    UVec3::new(
        pos.x.rem_euclid(edge) as u32,
        pos.y.rem_euclid(edge) as u32,
        pos.z.rem_euclid(edge) as u32,
    )
}

/// World position of the chunk's local origin voxel.
pub fn chunk_to_world(coord: ChunkCoord, edge: i32) -> IVec3 {
    coord.as_ivec3() * edge
}

pub fn world_from_local(coord: ChunkCoord, local: UVec3, edge: i32) -> IVec3 {
    chunk_to_world(coord, edge) + local.as_ivec3()
}

/// Voxel whose centered unit cube contains `point`.
/// Voxel `v` spans `[v - 0.5, v + 0.5]` on every axis.
pub fn voxel_at(point: Vec3) -> IVec3 {
    IVec3::new(
        point.x.round() as i32,
        point.y.round() as i32,
        point.z.round() as i32,
    )
}
