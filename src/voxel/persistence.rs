use crate::voxel::coords::ChunkCoord;
use crate::voxel::types::BlockId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Serializable contents of one chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedChunkRecord {
    pub coord: [i32; 3],
    pub voxels: Vec<([u32; 3], BlockId)>,
}

impl PersistedChunkRecord {
    pub fn chunk_coord(&self) -> ChunkCoord {
        ChunkCoord::from(self.coord)
    }

    pub fn encode(&self) -> Result<Vec<u8>, PersistenceError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PersistenceError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("record for {found} stored under key {expected}")]
    KeyMismatch { expected: ChunkCoord, found: ChunkCoord },
}

/// Key-value store of chunk records keyed by chunk coordinate.
///
/// A `get` must observe the latest completed `put` for the same key.
pub trait ChunkStore: Send + Sync {
    fn get(&self, coord: ChunkCoord) -> Result<Option<PersistedChunkRecord>, PersistenceError>;
    fn put(&mut self, record: &PersistedChunkRecord) -> Result<(), PersistenceError>;
    fn delete(&mut self, coord: ChunkCoord) -> Result<(), PersistenceError>;
}

fn check_key(expected: ChunkCoord, record: PersistedChunkRecord) -> Result<PersistedChunkRecord, PersistenceError> {
    let found = record.chunk_coord();
    if found != expected {
        return Err(PersistenceError::KeyMismatch { expected, found });
    }
    Ok(record)
}

/// In-process store holding encoded records.
#[derive(Default)]
pub struct MemoryStore {
    records: HashMap<ChunkCoord, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ChunkStore for MemoryStore {
    fn get(&self, coord: ChunkCoord) -> Result<Option<PersistedChunkRecord>, PersistenceError> {
        match self.records.get(&coord) {
            Some(bytes) => Ok(Some(check_key(coord, PersistedChunkRecord::decode(bytes)?)?)),
            None => Ok(None),
        }
    }

    fn put(&mut self, record: &PersistedChunkRecord) -> Result<(), PersistenceError> {
        self.records.insert(record.chunk_coord(), record.encode()?);
        Ok(())
    }

    fn delete(&mut self, coord: ChunkCoord) -> Result<(), PersistenceError> {
        self.records.remove(&coord);
        Ok(())
    }
}

/// One bincode file per chunk inside a save directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, PersistenceError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        log::info!("chunk store opened at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, coord: ChunkCoord) -> PathBuf {
        self.root
            .join(format!("chunk_{}_{}_{}.bin", coord.x, coord.y, coord.z))
    }
}

impl ChunkStore for FileStore {
    fn get(&self, coord: ChunkCoord) -> Result<Option<PersistedChunkRecord>, PersistenceError> {
        let file = match File::open(self.path_for(coord)) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let reader = BufReader::new(file);
        let record: PersistedChunkRecord = bincode::deserialize_from(reader)?;
        Ok(Some(check_key(coord, record)?))
    }

    fn put(&mut self, record: &PersistedChunkRecord) -> Result<(), PersistenceError> {
        let path = self.path_for(record.chunk_coord());
        // Write next to the target and rename so a crash never leaves a torn record
        let tmp = path.with_extension("bin.tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            bincode::serialize_into(&mut writer, record)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&mut self, coord: ChunkCoord) -> Result<(), PersistenceError> {
        match fs::remove_file(self.path_for(coord)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
