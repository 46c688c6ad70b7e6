use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy_mesh::{Indices, PrimitiveTopology};
use std::collections::BTreeMap;
use crate::constants::VOXEL_SIZE;
use crate::voxel::chunk::Chunk;
use crate::voxel::coords::world_from_local;
use crate::voxel::types::{BlockCatalog, BlockId, FaceClass, Material};

/// Fixed description of one cube face: outward normal, corner offsets from the
/// voxel's min corner, per-corner UVs and the class it belongs to.
struct FaceTemplate {
    normal: [f32; 3],
    corners: [[f32; 3]; 4],
    uvs: [[f32; 2]; 4],
    class: FaceClass,
}

const FACES: [FaceTemplate; 6] = [
    // +X
    FaceTemplate {
        normal: [1.0, 0.0, 0.0],
        corners: [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 1.0, 1.0], [1.0, 0.0, 1.0]],
        uvs: [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]],
        class: FaceClass::Side,
    },
    // -X
    FaceTemplate {
        normal: [-1.0, 0.0, 0.0],
        corners: [[0.0, 0.0, 1.0], [0.0, 1.0, 1.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]],
        uvs: [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]],
        class: FaceClass::Side,
    },
    // +Y
    FaceTemplate {
        normal: [0.0, 1.0, 0.0],
        corners: [[0.0, 1.0, 0.0], [0.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, 0.0]],
        uvs: [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]],
        class: FaceClass::Top,
    },
    // -Y
    FaceTemplate {
        normal: [0.0, -1.0, 0.0],
        corners: [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 1.0], [0.0, 0.0, 1.0]],
        uvs: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        class: FaceClass::Bottom,
    },
    // +Z
    FaceTemplate {
        normal: [0.0, 0.0, 1.0],
        corners: [[0.0, 0.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 1.0], [0.0, 1.0, 1.0]],
        uvs: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        class: FaceClass::Side,
    },
    // -Z
    FaceTemplate {
        normal: [0.0, 0.0, -1.0],
        corners: [[1.0, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
        uvs: [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
        class: FaceClass::Side,
    },
];

/// Index range of the mesh drawn with one material.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawGroup {
    pub start: u32,
    pub count: u32,
    pub block: BlockId,
    pub face_class: FaceClass,
    pub material: Material,
}

/// Renderer-facing geometry of one chunk, in world space.
#[derive(Clone, Debug, Default)]
pub struct ChunkMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub groups: Vec<DrawGroup>,
}

impl ChunkMesh {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn group_index_total(&self) -> usize {
        self.groups.iter().map(|g| g.count as usize).sum()
    }

    /// Single bevy mesh holding every group. Read `groups` first; they are not carried over.
    pub fn into_mesh(self) -> Mesh {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions);
        mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, self.normals);
        mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, self.uvs);
        mesh.insert_indices(Indices::U32(self.indices));
        mesh
    }
}

/// Full rebuild, O(voxel count). Every face of every voxel is emitted;
/// hidden faces between neighbours are not culled.
pub fn build_chunk_mesh(chunk: &Chunk, catalog: &BlockCatalog) -> ChunkMesh {
    let mut mesh = ChunkMesh::default();

    let mut buckets: BTreeMap<(BlockId, FaceClass), Vec<UVec3>> = BTreeMap::new();
    for (local, id) in chunk.voxels() {
        for class in catalog.face_classes(id) {
            buckets.entry((id, *class)).or_default().push(local);
        }
    }

    let edge = chunk.edge() as i32;
    for ((id, class), mut voxels) in buckets {
        voxels.sort_unstable_by_key(|v| (v.x, v.y, v.z));
        let start = mesh.indices.len();

        for local in voxels {
            let world = world_from_local(chunk.coord(), local, edge);
            for face in FACES.iter().filter(|f| class.accepts(f.class)) {
                add_face(&mut mesh, world, face);
            }
        }

        let count = mesh.indices.len() - start;
        if count > 0 {
            mesh.groups.push(DrawGroup {
                start: start as u32,
                count: count as u32,
                block: id,
                face_class: class,
                material: catalog.material(id, class),
            });
        }
    }

    mesh
}

fn add_face(mesh: &mut ChunkMesh, world: IVec3, face: &FaceTemplate) {
    let s = VOXEL_SIZE;
    // Voxels are centered on their integer coordinate
    let origin = world.as_vec3() - Vec3::splat(s / 2.0);
    let start_idx = mesh.positions.len() as u32;

    for (corner, uv) in face.corners.iter().zip(face.uvs.iter()) {
        mesh.positions.push([
            origin.x + corner[0] * s,
            origin.y + corner[1] * s,
            origin.z + corner[2] * s,
        ]);
        mesh.normals.push(face.normal);
        mesh.uvs.push(*uv);
    }

    mesh.indices.extend_from_slice(&[
        start_idx, start_idx + 1, start_idx + 2,
        start_idx, start_idx + 2, start_idx + 3,
    ]);
}
