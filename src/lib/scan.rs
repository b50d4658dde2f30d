use std::path::Path;
use crate::chunk::RawChunk;
use crate::error::Result;
use crate::positions::{parse_region_filename, LocalPos, RegionPos};
use crate::record::{ChunkRecord, RescanPolicy};
use crate::region::RegionFile;
use crate::status::ChunkStatus;

pub const DEFAULT_ENTITY_LIMIT: u32 = 300;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub entity_limit: u32,
    pub rescan_policy: RescanPolicy
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            entity_limit: DEFAULT_ENTITY_LIMIT,
            rescan_policy: RescanPolicy::default()
        }
    }
}

/// Classifies one slot of the region file at `region_path`. Chunk corruption
/// is a classification; only a region file that cannot be opened is an error.
pub fn scan_chunk_slot(region_path: &Path, local: LocalPos, entity_limit: u32) -> Result<ChunkRecord> {
    let region_coords = parse_region_filename(region_path)?;
    let mut region = RegionFile::open(region_path)?;
    Ok(scan_slot(&mut region, region_coords, local, entity_limit).0)
}

/// Classifies one slot and hands back its raw bytes when they decoded.
pub(crate) fn scan_slot(region: &mut RegionFile, region_coords: RegionPos, local: LocalPos, entity_limit: u32) -> (ChunkRecord, Option<RawChunk>) {
    let mut record = ChunkRecord::new(region.path(), region_coords, local, ChunkStatus::NotCreated);

    let raw = match region.read_chunk(local) {
        Ok(Some(raw)) => raw,
        Ok(None) => return (record, None),
        Err(e) => {
            record.status = ChunkStatus::Corrupted;
            record.detail = Some(e.to_string());
            return (record, None);
        }
    };

    let probe = match raw.probe() {
        Ok(probe) => probe,
        Err(e) => {
            record.status = ChunkStatus::Corrupted;
            record.detail = Some(e.to_string());
            return (record, None);
        }
    };

    record.global_coords = Some(probe.pos);
    record.data_coords = Some(probe.pos);
    record.entity_count = Some(probe.entity_count);
    record.status = if probe.pos != record.slot_global() {
        ChunkStatus::WrongLocated
    } else if probe.entity_count >= entity_limit {
        ChunkStatus::TooManyEntities
    } else {
        ChunkStatus::Ok
    };

    (record, Some(raw))
}
