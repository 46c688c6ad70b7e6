use crate::voxel::coords::{ChunkCoord, world_from_local};
use crate::voxel::meshing::{ChunkMesh, build_chunk_mesh};
use crate::voxel::persistence::PersistedChunkRecord;
use crate::voxel::types::{BlockCatalog, BlockId};
use crate::voxel::world::WorldError;
use bevy::prelude::*;
use std::collections::HashMap;

/// Sparse voxel storage for one cubic region plus its derived mesh.
///
/// Absent keys are air. The mesh is regenerated wholesale after every
/// mutation, never patched.
pub struct Chunk {
    coord: ChunkCoord,
    edge: u32,
    voxels: HashMap<UVec3, BlockId>,
    mesh: Option<ChunkMesh>,
    modified: bool,
}

impl Chunk {
    pub fn new(coord: ChunkCoord, edge: u32) -> Self {
        Self {
            coord,
            edge,
            voxels: HashMap::new(),
            mesh: None,
            modified: false,
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn edge(&self) -> u32 {
        self.edge
    }

    pub fn contains_local(&self, local: UVec3) -> bool {
        local.x < self.edge && local.y < self.edge && local.z < self.edge
    }

    pub fn get(&self, local: UVec3) -> Option<BlockId> {
        self.voxels.get(&local).copied()
    }

    /// Stores a voxel, marks the chunk modified and rebuilds the mesh.
    pub fn set(&mut self, local: UVec3, id: BlockId, catalog: &BlockCatalog) -> Result<(), WorldError> {
        self.check_bounds(local)?;
        self.voxels.insert(local, id);
        self.modified = true;
        self.rebuild_mesh(catalog);
        Ok(())
    }

    /// Removes a voxel. Returns the previous block type, if any.
    pub fn remove(&mut self, local: UVec3, catalog: &BlockCatalog) -> Result<Option<BlockId>, WorldError> {
        self.check_bounds(local)?;
        let previous = self.voxels.remove(&local);
        if previous.is_some() {
            self.modified = true;
            self.rebuild_mesh(catalog);
        }
        Ok(previous)
    }

    /// Bulk insert used by generation and loading; the caller rebuilds once afterwards.
    pub(crate) fn insert_raw(&mut self, local: UVec3, id: BlockId) -> bool {
        if !self.contains_local(local) {
            return false;
        }
        self.voxels.insert(local, id);
        true
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn voxels(&self) -> impl Iterator<Item = (UVec3, BlockId)> + '_ {
        self.voxels.iter().map(|(k, v)| (*k, *v))
    }

    /// Voxels in world coordinates.
    pub fn world_voxels(&self) -> impl Iterator<Item = (IVec3, BlockId)> + '_ {
        let edge = self.edge as i32;
        self.voxels
            .iter()
            .map(move |(k, v)| (world_from_local(self.coord, *k, edge), *v))
    }

    pub fn voxel_map(&self) -> &HashMap<UVec3, BlockId> {
        &self.voxels
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// `None` when the chunk holds no voxels.
    pub fn mesh(&self) -> Option<&ChunkMesh> {
        self.mesh.as_ref()
    }

    pub fn rebuild_mesh(&mut self, catalog: &BlockCatalog) {
        // Previous mesh is released before the new one is built
        self.mesh = None;
        if self.voxels.is_empty() {
            return;
        }
        self.mesh = Some(build_chunk_mesh(self, catalog));
    }

    pub fn to_record(&self) -> PersistedChunkRecord {
        let mut voxels: Vec<([u32; 3], BlockId)> = self
            .voxels
            .iter()
            .map(|(k, v)| (k.to_array(), *v))
            .collect();
        voxels.sort_unstable();
        PersistedChunkRecord {
            coord: self.coord.to_array(),
            voxels,
        }
    }

    /// Replaces the voxel set with a persisted record. Entries outside the
    /// chunk or with ids the catalog does not know are dropped.
    pub fn apply_record(&mut self, record: &PersistedChunkRecord, catalog: &BlockCatalog) -> usize {
        self.voxels.clear();
        let mut dropped = 0;
        for &(key, id) in &record.voxels {
            if !catalog.contains(id) || !self.insert_raw(UVec3::from_array(key), id) {
                dropped += 1;
            }
        }
        if dropped > 0 {
            log::warn!("chunk {}: dropped {} invalid persisted voxels", self.coord, dropped);
        }
        self.rebuild_mesh(catalog);
        dropped
    }

    fn check_bounds(&self, local: UVec3) -> Result<(), WorldError> {
        if self.contains_local(local) {
            Ok(())
        } else {
            Err(WorldError::LocalOutOfBounds { local, edge: self.edge })
        }
    }
}
