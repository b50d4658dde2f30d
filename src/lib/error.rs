use std::io;
use std::path::PathBuf;
use quartz_nbt::io::NbtIoError;
use thiserror::Error;
use crate::nbt;
use crate::status::ChunkStatus;

/// Why a single chunk slot could not be decoded. Always absorbed into a
/// `Corrupted` classification, never returned from a world-level operation.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Chunk offset {offset} is outside the region file ({file_len} bytes)")]
    OutOfBounds { offset: u64, file_len: u64 },
    #[error("Chunk header is inside the region header (sector {0})")]
    InvalidSector(u32),
    #[error("Chunk length {length} does not fit its {sectors} allocated sectors")]
    InvalidLength { length: u32, sectors: u8 },
    #[error("Unknown compression type {0}")]
    UnknownCompression(u8),
    #[error("Chunk has no {0} tag")]
    MissingTag(&'static str),
    #[error(transparent)]
    Nbt(#[from] nbt::Error),
    #[error("Nbt Tree Error {0}")]
    NbtTree(#[from] NbtIoError),
    #[error(transparent)]
    IoError(#[from] io::Error)
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Region file {path} is unreadable: {source}")]
    ContainerUnreadable { path: PathBuf, #[source] source: io::Error },
    #[error("Could not write to region file {path}: {source}")]
    ContainerWrite { path: PathBuf, #[source] source: io::Error },
    #[error("Malformed region file name {0:?}")]
    MalformedRegionName(String),
    #[error("{operation} is not defined for chunks with status \"{status}\"")]
    PolicyViolation { operation: &'static str, status: ChunkStatus },
    #[error("Chunk needs {sectors} sectors, region files allow at most 255")]
    ChunkTooLarge { sectors: usize },
    #[error(transparent)]
    IoError(#[from] io::Error)
}

pub type Result<T> = std::result::Result<T, Error>;
