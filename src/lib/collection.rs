use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs::read_dir;
use std::path::{Path, PathBuf};
use rayon::prelude::*;
use tracing::{info, warn};
use crate::bundle::{RegionBundle, RegionState};
use crate::error::Result;
use crate::positions::{ChunkPos, LocalPos, RegionPos, REGION_EXTENSION};
use crate::record::{ChunkRecord, RescanPolicy};
use crate::report;
use crate::scan::ScanOptions;
use crate::status::ChunkStatus;

/// A set of region files: one dimension of a world, or any ad hoc selection.
#[derive(Debug, Clone, Default)]
pub struct RegionCollection {
    path: Option<PathBuf>,
    regions: BTreeMap<RegionPos, RegionBundle>
}

impl RegionCollection {
    /// Collects every `r.<x>.<z>.mca` file in `dir`. A missing directory gives
    /// an empty collection; badly named files are skipped with a warning.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> RegionCollection {
        let dir = dir.as_ref();
        let mut collection = RegionCollection { path: Some(dir.to_owned()), regions: BTreeMap::new() };

        let Ok(entries) = read_dir(dir) else {
            return collection;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_region = path.extension().map_or(false, |ext| ext == REGION_EXTENSION)
                && entry.file_name().to_string_lossy().starts_with("r.");
            if !is_region {
                continue;
            }
            collection.insert_path(&path);
        }
        collection
    }

    /// An ad hoc collection of region files from anywhere on disk.
    pub fn from_paths<I, P>(paths: I) -> RegionCollection
    where
        I: IntoIterator<Item=P>,
        P: AsRef<Path>
    {
        let mut collection = RegionCollection::default();
        for path in paths {
            collection.insert_path(path.as_ref());
        }
        collection
    }

    fn insert_path(&mut self, path: &Path) {
        match RegionBundle::new(path) {
            Ok(bundle) => {
                self.regions.insert(bundle.coords(), bundle);
            }
            Err(e) => warn!("Ignoring {}: {}", path.display(), e)
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, pos: RegionPos) -> Option<&RegionBundle> {
        self.regions.get(&pos)
    }

    pub fn bundles(&self) -> impl Iterator<Item=&RegionBundle> + '_ {
        self.regions.values()
    }

    pub fn count(&self, problem: Option<ChunkStatus>) -> u32 {
        self.bundles().map(|bundle| bundle.count(problem)).sum()
    }

    pub fn list(&self, problem: Option<ChunkStatus>) -> Vec<&ChunkRecord> {
        self.bundles().flat_map(|bundle| bundle.list(problem)).collect()
    }

    pub fn summarize(&self) -> String {
        self.bundles()
            .filter(|bundle| bundle.has_problems())
            .map(report::region_block)
            .collect()
    }

    /// Where the chunk at `global` lives (or would live) in this collection.
    /// Ad hoc collections only know the regions they hold.
    pub fn locate(&self, global: ChunkPos) -> Option<(PathBuf, LocalPos)> {
        let region = global.region();
        let path = match (&self.path, self.regions.get(&region)) {
            (_, Some(bundle)) => bundle.path().to_owned(),
            (Some(dir), None) => dir.join(region.file_name()),
            (None, None) => return None
        };
        Some((path, global.local()))
    }

    /// Scans region files in parallel, one file per worker.
    pub fn scan(&mut self, options: &ScanOptions) {
        self.regions.par_iter_mut().for_each(|(_, bundle)| bundle.scan(options));
        let unreadable = self.bundles().filter(|b| matches!(b.state(), RegionState::Unreadable(_))).count();
        if unreadable > 0 {
            warn!("{} region file(s) could not be read", unreadable);
        }
    }

    pub fn rescan_entities(&mut self, entity_limit: u32, policy: RescanPolicy) {
        for bundle in self.regions.values_mut() {
            bundle.rescan_entities(entity_limit, policy);
        }
    }

    pub fn remove(&mut self, problem: ChunkStatus) -> Result<u32> {
        let mut counter = 0;
        for bundle in self.regions.values_mut() {
            counter += bundle.remove(problem)?;
        }
        if let Some(path) = &self.path {
            info!("Removed {} {} chunks in {}", counter, problem, path.display());
        }
        Ok(counter)
    }

    pub fn remove_excess_entities(&mut self) -> Result<u32> {
        let mut counter = 0;
        for bundle in self.regions.values_mut() {
            counter += bundle.remove_excess_entities()?;
        }
        Ok(counter)
    }
}

impl Display for RegionCollection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Region-set information:")?;
        if let Some(path) = &self.path {
            writeln!(f, "   Regionset path: {}", path.display())?;
        }
        writeln!(f, "   Region files: {}", self.len())?;
        let scanned = !self.is_empty() && self.bundles().all(|b| *b.state() != RegionState::Unscanned);
        write!(f, "   Scanned: {}", scanned)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use super::*;

    #[test]
    fn directory_listing_skips_foreign_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["r.0.0.mca", "r.-1.2.mca", "r.x.2.mca", "level.dat", "r.0.0.mcr"] {
            fs::write(dir.path().join(name), []).unwrap();
        }
        let collection = RegionCollection::from_dir(dir.path());
        let coords: Vec<_> = collection.bundles().map(|b| b.coords()).collect();
        assert_eq!(coords, vec![RegionPos::new(-1, 2), RegionPos::new(0, 0)]);
    }

    #[test]
    fn missing_directory_is_empty() {
        let collection = RegionCollection::from_dir("/definitely/not/here/region");
        assert!(collection.is_empty());
    }

    #[test]
    fn locate_resolves_unscanned_regions_in_directories() {
        let collection = RegionCollection::from_dir("/backup/region");
        let (path, local) = collection.locate(ChunkPos::new(-1, 33)).unwrap();
        assert_eq!(path, Path::new("/backup/region").join("r.-1.1.mca"));
        assert_eq!(local, LocalPos::new(31, 1).unwrap());
    }

    #[test]
    fn ad_hoc_collections_only_locate_known_regions() {
        let collection = RegionCollection::from_paths(["/somewhere/r.0.0.mca", "/elsewhere/r.2.0.mca"]);
        assert_eq!(collection.len(), 2);
        let (path, _) = collection.locate(ChunkPos::new(70, 5)).unwrap();
        assert_eq!(path, Path::new("/elsewhere/r.2.0.mca"));
        assert!(collection.locate(ChunkPos::new(-5, 5)).is_none());
    }
}
