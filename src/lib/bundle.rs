use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use crate::error::Result;
use crate::positions::{parse_region_filename, LocalPos, RegionPos};
use crate::record::{ChunkRecord, RescanPolicy};
use crate::region::RegionFile;
use crate::report;
use crate::scan::{scan_slot, ScanOptions};
use crate::status::ChunkStatus;

#[derive(Debug, Clone, PartialEq)]
pub enum RegionState {
    Unscanned,
    Scanned(SystemTime),
    Unreadable(String)
}

/// Scan results for every chunk of one region file.
#[derive(Debug, Clone)]
pub struct RegionBundle {
    path: PathBuf,
    coords: RegionPos,
    chunks: Vec<Option<ChunkRecord>>,
    state: RegionState
}

impl RegionBundle {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<RegionBundle> {
        let path = path.as_ref();
        Ok(RegionBundle {
            coords: parse_region_filename(path)?,
            path: path.to_owned(),
            chunks: vec![None; LocalPos::SLOTS],
            state: RegionState::Unscanned
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path.file_name().map_or_else(|| self.coords.file_name(), |n| n.to_string_lossy().into_owned())
    }

    pub fn coords(&self) -> RegionPos {
        self.coords
    }

    pub fn state(&self) -> &RegionState {
        &self.state
    }

    pub fn get(&self, local: LocalPos) -> Option<&ChunkRecord> {
        self.chunks[local.index()].as_ref()
    }

    /// Puts `record` in its slot and returns whatever was there before.
    pub fn replace(&mut self, record: ChunkRecord) -> Option<ChunkRecord> {
        self.chunks[record.header_coords.index()].replace(record)
    }

    /// Swaps the record at `local` for its post-deletion `NotCreated` record
    /// and returns the new one. Empty slots stay empty.
    pub fn mark_removed(&mut self, local: LocalPos) -> Option<&ChunkRecord> {
        let removed = self.get(local)?.removed();
        self.replace(removed);
        self.get(local)
    }

    pub fn records(&self) -> impl Iterator<Item=&ChunkRecord> + '_ {
        self.chunks.iter().flatten()
    }

    fn matching(&self, problem: Option<ChunkStatus>) -> impl Iterator<Item=&ChunkRecord> + '_ {
        self.records().filter(move |record| problem.map_or(true, |p| record.status == p))
    }

    pub fn count(&self, problem: Option<ChunkStatus>) -> u32 {
        self.matching(problem).count() as u32
    }

    pub fn list(&self, problem: Option<ChunkStatus>) -> Vec<&ChunkRecord> {
        self.matching(problem).collect()
    }

    pub fn has_problems(&self) -> bool {
        self.records().any(|record| record.status.is_problem())
    }

    pub fn summarize(&self) -> String {
        self.records()
            .filter(|record| record.status.is_problem())
            .map(report::chunk_block)
            .collect()
    }

    /// Classifies every chunk present in the region file. A file that cannot
    /// be opened leaves the bundle empty and marked unreadable.
    pub fn scan(&mut self, options: &ScanOptions) {
        self.chunks.iter_mut().for_each(|slot| *slot = None);

        let mut region = match RegionFile::open(&self.path) {
            Ok(region) => region,
            Err(e) => {
                warn!("Skipping region file: {}", e);
                self.state = RegionState::Unreadable(e.to_string());
                return;
            }
        };

        let slots: Vec<_> = region.present_slots().collect();
        for local in slots {
            let (record, _) = scan_slot(&mut region, self.coords, local, options.entity_limit);
            if record.status != ChunkStatus::Ok {
                debug!("{} chunk {}: {}", self.file_name(), local, record.status);
            }
            self.replace(record);
        }
        self.state = RegionState::Scanned(SystemTime::now());
    }

    pub fn rescan_entities(&mut self, entity_limit: u32, policy: RescanPolicy) {
        for record in self.chunks.iter_mut().flatten() {
            *record = record.rescan_entities(entity_limit, policy);
        }
    }

    /// Deletes every chunk classified as `problem` from the region file.
    pub fn remove(&mut self, problem: ChunkStatus) -> Result<u32> {
        let problem = problem.require_problem("remove")?;
        let doomed: Vec<_> = self.matching(Some(problem)).map(|record| record.header_coords).collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let mut region = RegionFile::open_for_write(&self.path)?;
        let mut counter = 0;
        for local in doomed {
            region.unlink_chunk(local)?;
            self.mark_removed(local);
            counter += 1;
        }
        Ok(counter)
    }

    /// Empties the entity list of every `TooManyEntities` chunk and returns
    /// how many entities were dropped in total.
    pub fn remove_excess_entities(&mut self) -> Result<u32> {
        let crowded: Vec<_> = self.matching(Some(ChunkStatus::TooManyEntities))
            .map(|record| record.header_coords)
            .collect();
        if crowded.is_empty() {
            return Ok(0);
        }

        let mut region = RegionFile::open_for_write(&self.path)?;
        let mut counter = 0;
        for local in crowded {
            let stripped = region.read_chunk(local)
                .map_err(|e| e.to_string())
                .and_then(|raw| raw.ok_or_else(|| "chunk is gone".to_owned()))
                .and_then(|raw| raw.strip_entities().map_err(|e| e.to_string()));
            let (raw, removed) = match stripped {
                Ok(stripped) => stripped,
                Err(e) => {
                    warn!("Could not remove entities from chunk {} in {}: {}", local, self.file_name(), e);
                    continue;
                }
            };

            region.write_chunk(local, &raw)?;
            counter += removed;
            if let Some(record) = self.chunks[local.index()].as_mut() {
                record.entity_count = Some(0);
                record.status = ChunkStatus::Ok;
            }
        }
        Ok(counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bundle: &RegionBundle, x: u8, z: u8, status: ChunkStatus) -> ChunkRecord {
        ChunkRecord::new(bundle.path(), bundle.coords(), LocalPos::new(x, z).unwrap(), status)
    }

    fn bundle_with(statuses: &[ChunkStatus]) -> RegionBundle {
        let mut bundle = RegionBundle::new("world/region/r.1.-1.mca").unwrap();
        for (i, status) in statuses.iter().enumerate() {
            let rec = record(&bundle, i as u8, 0, *status);
            bundle.replace(rec);
        }
        bundle
    }

    #[test]
    fn derives_coords_from_file_name() {
        let bundle = RegionBundle::new("world/region/r.1.-1.mca").unwrap();
        assert_eq!(bundle.coords(), RegionPos::new(1, -1));
        assert_eq!(bundle.file_name(), "r.1.-1.mca");
        assert!(RegionBundle::new("world/region/level.dat").is_err());
    }

    #[test]
    fn counts_partition_by_status() {
        let bundle = bundle_with(&[
            ChunkStatus::Ok, ChunkStatus::Ok, ChunkStatus::Corrupted,
            ChunkStatus::WrongLocated, ChunkStatus::TooManyEntities, ChunkStatus::NotCreated
        ]);
        let total: u32 = ChunkStatus::ALL.iter().map(|s| bundle.count(Some(*s))).sum();
        assert_eq!(bundle.count(None), 6);
        assert_eq!(total, bundle.count(None));
        assert_eq!(bundle.count(Some(ChunkStatus::Ok)), 2);
        assert_eq!(bundle.list(Some(ChunkStatus::Corrupted))[0].header_coords, LocalPos::new(2, 0).unwrap());
    }

    #[test]
    fn list_is_in_slot_order() {
        let mut bundle = RegionBundle::new("r.0.0.mca").unwrap();
        for (x, z) in [(5, 9), (1, 0), (31, 2)] {
            let rec = record(&bundle, x, z, ChunkStatus::Ok);
            bundle.replace(rec);
        }
        let order: Vec<_> = bundle.list(None).iter().map(|r| r.header_coords.index()).collect();
        assert_eq!(order, vec![1, 2 * 32 + 31, 9 * 32 + 5]);
    }

    #[test]
    fn replace_returns_previous_record() {
        let mut bundle = bundle_with(&[ChunkStatus::Corrupted]);
        let fresh = record(&bundle, 0, 0, ChunkStatus::Ok);
        let previous = bundle.replace(fresh).unwrap();
        assert_eq!(previous.status, ChunkStatus::Corrupted);
        assert_eq!(bundle.count(Some(ChunkStatus::Ok)), 1);
    }

    #[test]
    fn mark_removed_returns_the_not_created_record() {
        let mut bundle = bundle_with(&[ChunkStatus::Ok, ChunkStatus::Corrupted]);
        let local = LocalPos::new(1, 0).unwrap();
        let removed = bundle.mark_removed(local).unwrap();
        assert_eq!(removed.status, ChunkStatus::NotCreated);
        assert_eq!(removed.header_coords, local);
        assert_eq!(bundle.count(Some(ChunkStatus::Corrupted)), 0);
        assert_eq!(bundle.count(None), 2);
        assert!(bundle.mark_removed(LocalPos::new(9, 9).unwrap()).is_none());
    }

    #[test]
    fn summary_lists_only_problems() {
        assert_eq!(bundle_with(&[ChunkStatus::Ok, ChunkStatus::NotCreated]).summarize(), "");
        let summary = bundle_with(&[ChunkStatus::Ok, ChunkStatus::WrongLocated]).summarize();
        assert!(summary.contains("Wrong located"));
        assert!(summary.contains("header (1, 0)"));
        assert_eq!(summary.matches("Chunk coords").count(), 1);
    }

    #[test]
    fn removing_a_non_problem_is_a_policy_violation() {
        let mut bundle = bundle_with(&[ChunkStatus::Ok]);
        assert!(bundle.remove(ChunkStatus::Ok).is_err());
        assert!(bundle.remove(ChunkStatus::NotCreated).is_err());
        assert_eq!(bundle.remove(ChunkStatus::Corrupted).unwrap(), 0);
    }

    #[test]
    fn rescan_applies_to_every_record() {
        let mut bundle = RegionBundle::new("r.0.0.mca").unwrap();
        for (x, count) in [(0, 50), (1, 500)] {
            let mut rec = record(&bundle, x, 0, ChunkStatus::Ok);
            rec.entity_count = Some(count);
            bundle.replace(rec);
        }
        bundle.rescan_entities(100, RescanPolicy::EntityDriven);
        assert_eq!(bundle.count(Some(ChunkStatus::TooManyEntities)), 1);
        bundle.rescan_entities(1000, RescanPolicy::EntityDriven);
        assert_eq!(bundle.count(Some(ChunkStatus::Ok)), 2);
    }
}
