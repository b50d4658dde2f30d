use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use crate::positions::{ChunkPos, LocalPos, RegionPos};
use crate::report::or_na;
use crate::status::ChunkStatus;

/// Which records `rescan_entities` is allowed to re-classify.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RescanPolicy {
    /// Only records whose status depends on their entity count (`Ok` and
    /// `TooManyEntities` with a known count).
    #[default]
    EntityDriven,
    /// Every record, whatever its status. A missing count counts as zero, so a
    /// corrupted chunk can come out of this as `Ok`.
    Unconditional
}

/// What a scan found in one region file slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub header_coords: LocalPos,
    pub region_coords: RegionPos,
    pub global_coords: Option<ChunkPos>,
    pub data_coords: Option<ChunkPos>,
    pub status: ChunkStatus,
    pub entity_count: Option<u32>,
    pub scanned_at: SystemTime,
    pub region_path: PathBuf,
    /// Decode error for corrupted chunks.
    pub detail: Option<String>
}

impl ChunkRecord {
    pub fn new(region_path: &Path, region_coords: RegionPos, header_coords: LocalPos, status: ChunkStatus) -> ChunkRecord {
        ChunkRecord {
            header_coords,
            region_coords,
            global_coords: None,
            data_coords: None,
            status,
            entity_count: None,
            scanned_at: SystemTime::now(),
            region_path: region_path.to_owned(),
            detail: None
        }
    }

    /// Where this slot says the chunk is, regardless of what the data says.
    pub fn slot_global(&self) -> ChunkPos {
        self.region_coords.chunk_at(self.header_coords)
    }

    /// The record left behind once this chunk has been deleted from disk.
    pub fn removed(&self) -> ChunkRecord {
        ChunkRecord {
            global_coords: self.global_coords,
            ..ChunkRecord::new(&self.region_path, self.region_coords, self.header_coords, ChunkStatus::NotCreated)
        }
    }

    /// Re-classifies this record against a new entity limit using only the
    /// stored entity count.
    pub fn rescan_entities(&self, entity_limit: u32, policy: RescanPolicy) -> ChunkRecord {
        let count = match (policy, self.status, self.entity_count) {
            (RescanPolicy::Unconditional, _, count) => count.unwrap_or(0),
            (RescanPolicy::EntityDriven, ChunkStatus::Ok | ChunkStatus::TooManyEntities, Some(count)) => count,
            (RescanPolicy::EntityDriven, _, _) => return self.clone()
        };
        let status = if count >= entity_limit {
            ChunkStatus::TooManyEntities
        } else {
            ChunkStatus::Ok
        };
        ChunkRecord { status, ..self.clone() }
    }

    fn scanned_at_secs(&self) -> u64 {
        self.scanned_at.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
    }
}

impl Display for ChunkRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Chunk with header coordinates: {}", self.header_coords)?;
        writeln!(f, "\tData coordinates: {}", or_na(self.data_coords))?;
        writeln!(f, "\tGlobal coordinates: {}", or_na(self.global_coords))?;
        writeln!(f, "\tStatus: {}", self.status)?;
        match self.entity_count {
            Some(count) => writeln!(f, "\tNumber of entities: {}", count)?,
            None => writeln!(f, "\tNumber of entities: N/A")?
        }
        writeln!(f, "\tScan time: {}", self.scanned_at_secs())
    }
}
