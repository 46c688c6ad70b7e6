pub mod chunk;
pub mod coords;
pub mod meshing;
pub mod persistence;
pub mod plugin;
pub mod terrain;
pub mod types;
pub mod world;

pub use chunk::Chunk;
pub use coords::ChunkCoord;
pub use meshing::{ChunkMesh, DrawGroup};
pub use persistence::{ChunkStore, FileStore, MemoryStore, PersistedChunkRecord, PersistenceError};
pub use terrain::TerrainGenerator;
pub use types::{BlockCatalog, BlockId, BlockType, FaceClass, Material, TerrainPalette};
pub use world::{VoxelWorld, WorldError};
