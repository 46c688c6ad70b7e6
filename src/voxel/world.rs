use bevy::prelude::*;
use std::collections::HashMap;
use thiserror::Error;
use crate::config::{ConfigError, GeneratorKind, StorageKind, TerrainSettings, WorldConfig};
use crate::constants::CHUNK_SIZE_I32;
use crate::voxel::chunk::Chunk;
use crate::voxel::coords::{ChunkCoord, voxel_at, world_to_chunk, world_to_local};
use crate::voxel::meshing::ChunkMesh;
use crate::voxel::persistence::{ChunkStore, FileStore, MemoryStore, PersistenceError};
use crate::voxel::terrain::TerrainGenerator;
use crate::voxel::types::{BlockCatalog, BlockId, TerrainPalette};

#[derive(Error, Debug)]
pub enum WorldError {
    #[error("unknown block type id {0}")]
    UnknownBlockType(BlockId),
    #[error("voxel {0} overlaps the agent")]
    PlacementBlocked(IVec3),
    #[error("local key {local} outside chunk edge {edge}")]
    LocalOutOfBounds { local: UVec3, edge: u32 },
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Registry of resident chunks plus everything needed to create them.
///
/// This is the single context object of the voxel core: the block catalog,
/// the terrain generator (and its noise table) and the chunk store all live
/// here and are handed to chunks as they are loaded or mutated.
#[derive(Resource)]
pub struct VoxelWorld {
    edge: i32,
    catalog: BlockCatalog,
    /// Present whenever the generator places terrain.
    palette: Option<TerrainPalette>,
    generator: TerrainGenerator,
    store: Box<dyn ChunkStore>,
    chunks: HashMap<ChunkCoord, Chunk>,
}

impl VoxelWorld {
    /// Builds a world over `store`. The config is validated first.
    pub fn new(config: &WorldConfig, store: Box<dyn ChunkStore>) -> Result<Self, WorldError> {
        config.validate()?;
        let catalog = config.catalog();
        let palette = match config.generator {
            GeneratorKind::Noise => Some(TerrainPalette::resolve(&catalog)?),
            GeneratorKind::Empty => None,
        };
        let generator = TerrainGenerator::new(config.generator, config.terrain.clone());

        Ok(Self {
            edge: config.chunk_size,
            catalog,
            palette,
            generator,
            store,
            chunks: HashMap::new(),
        })
    }

    /// Validates the config and opens the configured store.
    pub fn from_config(config: &WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let store: Box<dyn ChunkStore> = match config.storage.kind {
            StorageKind::Memory => Box::new(MemoryStore::new()),
            StorageKind::Directory => Box::new(FileStore::open(&config.storage.path)?),
        };
        let world = Self::new(config, store)?;
        log::info!(
            "voxel world ready: chunk edge {}, {} block types, terrain seed {:#x}",
            world.edge,
            world.catalog.len(),
            world.generator.seed()
        );
        Ok(world)
    }

    pub fn in_memory(config: &WorldConfig) -> Result<Self, WorldError> {
        Self::new(config, Box::new(MemoryStore::new()))
    }

    pub fn edge(&self) -> i32 {
        self.edge
    }

    pub fn catalog(&self) -> &BlockCatalog {
        &self.catalog
    }

    pub fn palette(&self) -> Option<&TerrainPalette> {
        self.palette.as_ref()
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    pub fn world_to_chunk(&self, pos: IVec3) -> ChunkCoord {
        world_to_chunk(pos, self.edge)
    }

    pub fn world_to_local(&self, pos: IVec3) -> UVec3 {
        world_to_local(pos, self.edge)
    }

    /// Chunk containing `pos`, loading it from the store or generating it first.
    pub fn get_chunk(&mut self, pos: IVec3) -> &mut Chunk {
        let coord = self.world_to_chunk(pos);
        self.load_chunk(coord)
    }

    pub fn load_chunk(&mut self, coord: ChunkCoord) -> &mut Chunk {
        let Self { edge, catalog, palette, generator, store, chunks } = self;
        let (catalog, palette, generator) = (&*catalog, palette.as_ref(), &*generator);
        let store: &dyn ChunkStore = &**store;
        chunks
            .entry(coord)
            .or_insert_with(|| create_chunk(coord, *edge as u32, store, generator, catalog, palette))
    }

    /// Resident chunk at `coord`; never loads.
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    pub fn is_chunk_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn loaded_chunks(&self) -> impl Iterator<Item = ChunkCoord> + '_ {
        self.chunks.keys().copied()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn voxel_count(&self) -> usize {
        self.chunks.values().map(Chunk::len).sum()
    }

    pub fn meshes(&self) -> impl Iterator<Item = (ChunkCoord, &ChunkMesh)> + '_ {
        self.chunks
            .iter()
            .filter_map(|(coord, chunk)| chunk.mesh().map(|mesh| (*coord, mesh)))
    }

    /// Places a voxel. Ids outside the catalog are rejected.
    pub fn set_voxel(&mut self, pos: IVec3, id: BlockId) -> Result<(), WorldError> {
        if !self.catalog.contains(id) {
            return Err(WorldError::UnknownBlockType(id));
        }
        self.mutate(pos, |chunk, local, catalog| chunk.set(local, id, catalog))
    }

    /// Clears a voxel, returning what was there.
    pub fn remove_voxel(&mut self, pos: IVec3) -> Result<Option<BlockId>, WorldError> {
        self.mutate(pos, |chunk, local, catalog| chunk.remove(local, catalog))
    }

    /// Block at `pos` in a resident chunk. Non-resident chunks read as air.
    pub fn get_voxel(&self, pos: IVec3) -> Option<BlockId> {
        self.chunks
            .get(&self.world_to_chunk(pos))
            .and_then(|chunk| chunk.get(self.world_to_local(pos)))
    }

    pub fn query_occupied(&self, pos: IVec3) -> bool {
        self.get_voxel(pos).is_some()
    }

    /// Loads every chunk within `radius` chunks of `center`. Returns how many were new.
    pub fn load_area(&mut self, center: Vec3, radius: i32) -> usize {
        let middle = self.world_to_chunk(voxel_at(center));
        let mut loaded = 0;
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                for dz in -radius..=radius {
                    let coord = ChunkCoord::new(middle.x + dx, middle.y + dy, middle.z + dz);
                    if !self.is_chunk_loaded(coord) {
                        self.load_chunk(coord);
                        loaded += 1;
                    }
                }
            }
        }
        if loaded > 0 {
            log::debug!("loaded {loaded} chunks around {middle}");
        }
        loaded
    }

    /// Drops a chunk from memory, writing it first if it has unsaved changes.
    /// A chunk whose write fails stays resident so no edit is lost.
    pub fn unload_chunk(&mut self, coord: ChunkCoord) -> bool {
        let Some(chunk) = self.chunks.get_mut(&coord) else {
            return false;
        };
        if chunk.is_modified() && !persist(&mut *self.store, chunk) {
            return false;
        }
        self.chunks.remove(&coord);
        true
    }

    /// Forgets a chunk entirely; the next access regenerates it.
    pub fn reset_chunk(&mut self, coord: ChunkCoord) -> Result<(), WorldError> {
        self.store.delete(coord)?;
        self.chunks.remove(&coord);
        Ok(())
    }

    /// Retries writes for chunks whose last save failed. Returns the number still unsaved.
    pub fn save_modified(&mut self) -> usize {
        let store = &mut *self.store;
        let mut failed = 0;
        for chunk in self.chunks.values_mut().filter(|c| c.is_modified()) {
            if !persist(store, chunk) {
                failed += 1;
            }
        }
        failed
    }

    fn mutate<R>(
        &mut self,
        pos: IVec3,
        f: impl FnOnce(&mut Chunk, UVec3, &BlockCatalog) -> Result<R, WorldError>,
    ) -> Result<R, WorldError> {
        let coord = self.world_to_chunk(pos);
        let local = self.world_to_local(pos);
        let Self { edge, catalog, palette, generator, store, chunks } = self;
        let (catalog, palette, generator) = (&*catalog, palette.as_ref(), &*generator);

        let chunk = chunks
            .entry(coord)
            .or_insert_with(|| create_chunk(coord, *edge as u32, &**store, generator, catalog, palette));
        let result = f(chunk, local, catalog)?;
        if chunk.is_modified() {
            persist(&mut **store, chunk);
        }
        Ok(result)
    }
}

/// Built-in catalog, noise terrain with a fresh seed, in-memory storage.
impl Default for VoxelWorld {
    fn default() -> Self {
        Self {
            edge: CHUNK_SIZE_I32,
            catalog: BlockCatalog::default(),
            palette: Some(TerrainPalette::default()),
            generator: TerrainGenerator::new(GeneratorKind::Noise, TerrainSettings::default()),
            store: Box::new(MemoryStore::new()),
            chunks: HashMap::new(),
        }
    }
}

fn create_chunk(
    coord: ChunkCoord,
    edge: u32,
    store: &dyn ChunkStore,
    generator: &TerrainGenerator,
    catalog: &BlockCatalog,
    palette: Option<&TerrainPalette>,
) -> Chunk {
    let mut chunk = Chunk::new(coord, edge);
    match store.get(coord) {
        Ok(Some(record)) => {
            chunk.apply_record(&record, catalog);
            log::debug!("chunk {coord} loaded from store ({} voxels)", chunk.len());
            return chunk;
        }
        Ok(None) => {}
        Err(e) => log::warn!("chunk {coord} could not be loaded, regenerating: {e}"),
    }

    if let Some(palette) = palette {
        generator.generate(&mut chunk, palette);
        chunk.rebuild_mesh(catalog);
    }
    log::debug!("chunk {coord} generated ({} voxels)", chunk.len());
    chunk
}

/// Writes the chunk; on failure the chunk stays modified and in memory.
fn persist(store: &mut dyn ChunkStore, chunk: &mut Chunk) -> bool {
    match store.put(&chunk.to_record()) {
        Ok(()) => {
            chunk.clear_modified();
            true
        }
        Err(e) => {
            log::warn!("chunk {} not saved, keeping in-memory state: {e}", chunk.coord());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::persistence::PersistedChunkRecord;
    use crate::voxel::types::BlockType;
    use std::sync::{Arc, Mutex};

    /// Store whose operations can be made to fail, sharing its contents with the test.
    #[derive(Clone, Default)]
    struct FlakyStore {
        inner: Arc<Mutex<HashMap<ChunkCoord, PersistedChunkRecord>>>,
        fail: Arc<Mutex<bool>>,
    }

    impl FlakyStore {
        fn set_failing(&self, fail: bool) {
            *self.fail.lock().unwrap() = fail;
        }

        fn error() -> PersistenceError {
            PersistenceError::Io(std::io::Error::other("disk unavailable"))
        }
    }

    impl ChunkStore for FlakyStore {
        fn get(&self, coord: ChunkCoord) -> Result<Option<PersistedChunkRecord>, PersistenceError> {
            if *self.fail.lock().unwrap() {
                return Err(Self::error());
            }
            Ok(self.inner.lock().unwrap().get(&coord).cloned())
        }

        fn put(&mut self, record: &PersistedChunkRecord) -> Result<(), PersistenceError> {
            if *self.fail.lock().unwrap() {
                return Err(Self::error());
            }
            self.inner.lock().unwrap().insert(record.chunk_coord(), record.clone());
            Ok(())
        }

        fn delete(&mut self, coord: ChunkCoord) -> Result<(), PersistenceError> {
            self.inner.lock().unwrap().remove(&coord);
            Ok(())
        }
    }

    fn empty_world() -> VoxelWorld {
        VoxelWorld::in_memory(&WorldConfig::empty()).unwrap()
    }

    fn seeded_config(seed: u64) -> WorldConfig {
        let mut config = WorldConfig::default();
        config.terrain.seed = Some(seed);
        config
    }

    #[test]
    fn test_coordinates_in_same_chunk_share_instance() {
        let mut world = empty_world();
        let a = world.get_chunk(IVec3::new(0, 0, 0)) as *const Chunk;
        let b = world.get_chunk(IVec3::new(15, 15, 15)) as *const Chunk;
        assert_eq!(a, b);
        let c = world.get_chunk(IVec3::new(-1, 0, 0)) as *const Chunk;
        assert_ne!(a, c);
        assert_eq!(world.chunk_count(), 2);
    }

    #[test]
    fn test_set_then_remove_leaves_chunk_empty() {
        let mut world = empty_world();
        world.set_voxel(IVec3::ZERO, 1).unwrap();
        assert!(world.query_occupied(IVec3::ZERO));
        assert_eq!(world.remove_voxel(IVec3::ZERO).unwrap(), Some(1));

        let chunk = world.chunk(ChunkCoord::new(0, 0, 0)).unwrap();
        assert!(chunk.is_empty());
        assert!(chunk.mesh().is_none());
    }

    #[test]
    fn test_unknown_block_type_rejected() {
        let mut world = empty_world();
        let err = world.set_voxel(IVec3::ZERO, 42).unwrap_err();
        assert!(matches!(err, WorldError::UnknownBlockType(42)));
        assert_eq!(world.voxel_count(), 0);
    }

    #[test]
    fn test_negative_coordinates_map_into_chunk() {
        let mut world = empty_world();
        world.set_voxel(IVec3::new(-1, -1, -1), 2).unwrap();
        let chunk = world.chunk(ChunkCoord::new(-1, -1, -1)).unwrap();
        assert_eq!(chunk.get(UVec3::new(15, 15, 15)), Some(2));
        assert_eq!(world.get_voxel(IVec3::new(-1, -1, -1)), Some(2));
    }

    #[test]
    fn test_non_resident_chunk_reads_unoccupied() {
        let world = VoxelWorld::in_memory(&seeded_config(1)).unwrap();
        assert!(!world.query_occupied(IVec3::new(0, 0, 0)));
        assert_eq!(world.chunk_count(), 0);
    }

    #[test]
    fn test_mutation_is_written_through() {
        let store = FlakyStore::default();
        let mut world = VoxelWorld::new(&WorldConfig::empty(), Box::new(store.clone())).unwrap();
        world.set_voxel(IVec3::new(3, 4, 5), 3).unwrap();

        let saved = store.inner.lock().unwrap().get(&ChunkCoord::new(0, 0, 0)).cloned().unwrap();
        assert_eq!(saved.voxels, vec![([3, 4, 5], 3)]);
        assert!(!world.chunk(ChunkCoord::new(0, 0, 0)).unwrap().is_modified());
    }

    #[test]
    fn test_persisted_chunk_wins_over_generation() {
        let store = FlakyStore::default();
        let config = seeded_config(77);
        let mut world = VoxelWorld::new(&config, Box::new(store.clone())).unwrap();

        let top = world.generator().height_at(0, 0);
        world.remove_voxel(IVec3::new(0, top, 0)).unwrap();
        world.set_voxel(IVec3::new(0, 14, 0), 3).unwrap();

        let mut reloaded = VoxelWorld::new(&config, Box::new(store.clone())).unwrap();
        reloaded.get_chunk(IVec3::ZERO);
        assert_eq!(reloaded.get_voxel(IVec3::new(0, top, 0)), None);
        assert_eq!(reloaded.get_voxel(IVec3::new(0, 14, 0)), Some(3));
    }

    #[test]
    fn test_generated_chunk_is_not_persisted_until_mutated() {
        let store = FlakyStore::default();
        let mut world = VoxelWorld::new(&seeded_config(5), Box::new(store.clone())).unwrap();
        let chunk = world.get_chunk(IVec3::ZERO);
        assert!(!chunk.is_empty());
        assert!(!chunk.is_modified());
        assert!(store.inner.lock().unwrap().is_empty());
    }

    #[test]
    fn test_load_failure_falls_back_to_generation() {
        let store = FlakyStore::default();
        store.set_failing(true);
        let mut world = VoxelWorld::new(&seeded_config(9), Box::new(store.clone())).unwrap();
        let chunk = world.get_chunk(IVec3::ZERO);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn test_save_failure_keeps_memory_state_and_retries() {
        let store = FlakyStore::default();
        let mut world = VoxelWorld::new(&WorldConfig::empty(), Box::new(store.clone())).unwrap();
        world.get_chunk(IVec3::ZERO);

        store.set_failing(true);
        world.set_voxel(IVec3::new(1, 1, 1), 2).unwrap();
        assert_eq!(world.get_voxel(IVec3::new(1, 1, 1)), Some(2));
        assert!(world.chunk(ChunkCoord::new(0, 0, 0)).unwrap().is_modified());
        assert_eq!(world.save_modified(), 1);

        store.set_failing(false);
        assert_eq!(world.save_modified(), 0);
        assert!(store.inner.lock().unwrap().contains_key(&ChunkCoord::new(0, 0, 0)));
    }

    #[test]
    fn test_unload_then_reload_restores_edits() {
        let mut world = empty_world();
        world.set_voxel(IVec3::new(20, 1, 0), 4).unwrap();
        assert!(world.unload_chunk(ChunkCoord::new(1, 0, 0)));
        assert!(!world.query_occupied(IVec3::new(20, 1, 0)));

        world.get_chunk(IVec3::new(20, 1, 0));
        assert_eq!(world.get_voxel(IVec3::new(20, 1, 0)), Some(4));
    }

    #[test]
    fn test_unload_keeps_chunk_when_save_fails() {
        let store = FlakyStore::default();
        let mut world = VoxelWorld::new(&WorldConfig::empty(), Box::new(store.clone())).unwrap();
        store.set_failing(true);
        world.set_voxel(IVec3::new(2, 2, 2), 1).unwrap();

        assert!(!world.unload_chunk(ChunkCoord::new(0, 0, 0)));
        assert_eq!(world.get_voxel(IVec3::new(2, 2, 2)), Some(1));
    }

    #[test]
    fn test_reset_chunk_regenerates() {
        let mut world = VoxelWorld::in_memory(&seeded_config(21)).unwrap();
        let before = world.get_chunk(IVec3::ZERO).voxel_map().clone();
        world.remove_voxel(IVec3::new(0, 0, 0)).unwrap();

        world.reset_chunk(ChunkCoord::new(0, 0, 0)).unwrap();
        assert!(!world.is_chunk_loaded(ChunkCoord::new(0, 0, 0)));
        assert_eq!(world.get_chunk(IVec3::ZERO).voxel_map(), &before);
    }

    #[test]
    fn test_load_area_loads_cube_of_chunks() {
        let mut world = empty_world();
        assert_eq!(world.load_area(Vec3::new(8.0, 8.0, 8.0), 1), 27);
        assert_eq!(world.load_area(Vec3::new(8.0, 8.0, 8.0), 1), 0);
        assert_eq!(world.chunk_count(), 27);
    }

    #[test]
    fn test_custom_catalog_terrain_survives_reload() {
        let mut config = seeded_config(7);
        config.blocks = Some(
            ["glass", "stone", "dirt", "grass", "oak_log", "oak_leaves"]
                .iter()
                .map(|name| BlockType::new(name))
                .collect(),
        );
        let store = FlakyStore::default();
        let mut world = VoxelWorld::new(&config, Box::new(store.clone())).unwrap();
        assert_eq!(world.palette().map(|p| p.grass), Some(3));

        let chunk = world.get_chunk(IVec3::ZERO);
        assert!(!chunk.is_empty());
        // Terrain only uses catalog ids, and never glass
        assert!(chunk.voxels().all(|(_, id)| id != 0 && (id as usize) < 6));

        world.set_voxel(IVec3::new(0, 14, 0), 0).unwrap();
        let before = world.chunk(ChunkCoord::new(0, 0, 0)).unwrap().len();

        let mut reloaded = VoxelWorld::new(&config, Box::new(store.clone())).unwrap();
        assert_eq!(reloaded.get_chunk(IVec3::ZERO).len(), before);
        assert_eq!(reloaded.get_voxel(IVec3::new(0, 14, 0)), Some(0));
    }

    #[test]
    fn test_invalid_config_is_rejected_at_construction() {
        let mut config = seeded_config(7);
        config.blocks = Some(vec![BlockType::new("rock"), BlockType::new("glass")]);
        assert!(matches!(VoxelWorld::in_memory(&config), Err(WorldError::Config(_))));

        let config = WorldConfig { chunk_size: 0, ..WorldConfig::empty() };
        assert!(matches!(VoxelWorld::in_memory(&config), Err(WorldError::Config(_))));
    }

    #[test]
    fn test_empty_generator_accepts_catalog_without_terrain_blocks() {
        let mut config = WorldConfig::empty();
        config.blocks = Some(vec![BlockType::new("rock"), BlockType::new("glass")]);
        let mut world = VoxelWorld::in_memory(&config).unwrap();
        assert!(world.palette().is_none());
        assert!(world.get_chunk(IVec3::ZERO).is_empty());
        world.set_voxel(IVec3::new(1, 1, 1), 1).unwrap();
        assert!(matches!(world.set_voxel(IVec3::ZERO, 2), Err(WorldError::UnknownBlockType(2))));
    }

    #[test]
    fn test_default_world_generates_terrain() {
        let mut world = VoxelWorld::default();
        let catalog_len = world.catalog().len();
        let chunk = world.get_chunk(IVec3::ZERO);
        assert!(!chunk.is_empty());
        assert!(chunk.voxels().all(|(_, id)| (id as usize) < catalog_len));
    }
}
