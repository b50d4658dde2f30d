use std::fmt::{Display, Formatter};
use std::fs::{read_dir, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use quartz_nbt::io::{read_nbt, Flavor};
use quartz_nbt::NbtCompound;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use crate::chunk::RawChunk;
use crate::collection::RegionCollection;
use crate::error::Result;
use crate::positions::{ChunkPos, Dimension};
use crate::record::{ChunkRecord, RescanPolicy};
use crate::region::RegionFile;
use crate::scan::{scan_slot, ScanOptions};
use crate::status::ChunkStatus;

// https://minecraft.fandom.com/wiki/Java_Edition_level_format

/// What `level.dat` told us about the world.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelData {
    pub path: PathBuf,
    pub name: Option<String>
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerStatus {
    Unscanned,
    Ok,
    Corrupted(String)
}

/// A player data file. Tracked and checked, never repaired.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerFile {
    pub path: PathBuf,
    pub status: PlayerStatus
}

/// What one backup had to offer for a chunk being repaired.
#[derive(Debug)]
pub enum BackupOutcome {
    /// No region file for the chunk in this backup.
    Unavailable,
    /// The region file is there but cannot be opened.
    Unreadable(String),
    /// Fresh classification of the backup's copy, with its bytes if they decoded.
    Scanned(ChunkRecord, Option<RawChunk>)
}

#[derive(Debug, PartialEq)]
pub enum RepairStep {
    Replace(RawChunk),
    TryNext
}

/// Per-backup decision of the repair loop. Only a backup copy that scans `Ok`
/// right now is ever written into the world.
pub fn decide(outcome: BackupOutcome) -> RepairStep {
    match outcome {
        BackupOutcome::Unavailable => RepairStep::TryNext,
        BackupOutcome::Unreadable(_) => RepairStep::TryNext,
        BackupOutcome::Scanned(record, raw) => match (record.status, raw) {
            (ChunkStatus::Ok, Some(raw)) => RepairStep::Replace(raw),
            (ChunkStatus::Ok, None) => RepairStep::TryNext,
            (ChunkStatus::NotCreated, _) => RepairStep::TryNext,
            (ChunkStatus::Corrupted, _) => RepairStep::TryNext,
            (ChunkStatus::WrongLocated, _) => RepairStep::TryNext,
            (ChunkStatus::TooManyEntities, _) => RepairStep::TryNext
        }
    }
}

pub struct World {
    pub world_path: PathBuf,
    overworld_regions: RegionCollection,
    nether_regions: RegionCollection,
    end_regions: RegionCollection,
    level: Option<LevelData>,
    level_problems: Vec<String>,
    players: Vec<PlayerFile>,
    scanned: bool
}

impl World {
    /// Discovers region files, `level.dat` and player files under `world_path`.
    /// Nothing is scanned yet.
    pub fn open<P: AsRef<Path>>(world_path: P) -> World {
        let world_path = world_path.as_ref();
        let collections = Dimension::ALL.map(|dim| {
            RegionCollection::from_dir(world_path.join(Self::get_region_suffix(dim)))
        });

        let mut world = World::from_collections(world_path, collections);
        world.load_level_data();
        world.players = ["players", "playerdata"].iter()
            .flat_map(|dir| dat_files(&world_path.join(dir)))
            .map(|path| PlayerFile { path, status: PlayerStatus::Unscanned })
            .collect();
        world
    }

    /// A world made of already built collections, in `Dimension::ALL` order.
    pub fn from_collections<P: AsRef<Path>>(world_path: P, collections: [RegionCollection; 3]) -> World {
        let [overworld_regions, nether_regions, end_regions] = collections;
        World {
            world_path: world_path.as_ref().to_owned(),
            overworld_regions,
            nether_regions,
            end_regions,
            level: None,
            level_problems: Vec::new(),
            players: Vec::new(),
            scanned: false
        }
    }

    fn load_level_data(&mut self) {
        let path = self.world_path.join("level.dat");
        if !path.exists() {
            return;
        }
        let name = match read_gzip_nbt(&path) {
            Ok(nbt) => nbt.get::<_, &NbtCompound>("Data")
                .and_then(|data| data.get::<_, &str>("LevelName"))
                .map(str::to_owned)
                .ok(),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                self.level_problems.push(e);
                None
            }
        };
        self.level = Some(LevelData { path, name });
    }

    fn get_region_suffix(dim: Dimension) -> PathBuf {
        match dim {
            Dimension::Overworld => Path::new("region").into(),
            Dimension::Nether => Path::new("DIM-1").join("region"),
            Dimension::End => Path::new("DIM1").join("region")
        }
    }

    pub fn collection(&self, dim: Dimension) -> &RegionCollection {
        match dim {
            Dimension::Overworld => &self.overworld_regions,
            Dimension::Nether => &self.nether_regions,
            Dimension::End => &self.end_regions
        }
    }

    pub fn collection_mut(&mut self, dim: Dimension) -> &mut RegionCollection {
        match dim {
            Dimension::Overworld => &mut self.overworld_regions,
            Dimension::Nether => &mut self.nether_regions,
            Dimension::End => &mut self.end_regions
        }
    }

    fn collections(&self) -> impl Iterator<Item=&RegionCollection> + '_ {
        Dimension::ALL.into_iter().map(|dim| self.collection(dim))
    }

    fn collections_mut(&mut self) -> [&mut RegionCollection; 3] {
        [&mut self.overworld_regions, &mut self.nether_regions, &mut self.end_regions]
    }

    pub fn level(&self) -> Option<&LevelData> {
        self.level.as_ref()
    }

    pub fn level_problems(&self) -> &[String] {
        &self.level_problems
    }

    pub fn players(&self) -> &[PlayerFile] {
        &self.players
    }

    pub fn is_scanned(&self) -> bool {
        self.scanned
    }

    /// Whether anything under the path looks like a Minecraft world.
    pub fn is_world(&self) -> bool {
        self.collections().any(|c| !c.is_empty()) || self.level.is_some() || !self.players.is_empty()
    }

    /// The name from `level.dat`, or the folder name.
    pub fn name(&self) -> String {
        self.level.as_ref()
            .and_then(|level| level.name.clone())
            .or_else(|| self.world_path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| self.world_path.display().to_string())
    }

    pub fn region_count(&self) -> usize {
        self.collections().map(RegionCollection::len).sum()
    }

    pub fn scan(&mut self, options: &ScanOptions) {
        for collection in self.collections_mut() {
            collection.scan(options);
        }
        self.players.par_iter_mut().for_each(|player| {
            player.status = match read_gzip_nbt(&player.path) {
                Ok(_) => PlayerStatus::Ok,
                Err(e) => {
                    warn!("Player file {} is corrupted: {}", player.path.display(), e);
                    PlayerStatus::Corrupted(e)
                }
            };
        });
        self.scanned = true;
    }

    /// Scans, then re-applies `recheck_limit` to the fresh records so a later
    /// rescan does not silently fall back to `options.entity_limit`.
    pub fn scan_and_recheck(&mut self, options: &ScanOptions, recheck_limit: Option<u32>) {
        self.scan(options);
        if let Some(limit) = recheck_limit {
            self.rescan_entities(limit, options.rescan_policy);
        }
    }

    pub fn count(&self, problem: Option<ChunkStatus>) -> u32 {
        self.collections().map(|c| c.count(problem)).sum()
    }

    pub fn list(&self, problem: Option<ChunkStatus>) -> Vec<&ChunkRecord> {
        self.collections().flat_map(|c| c.list(problem)).collect()
    }

    pub fn summarize(&self) -> String {
        let mut text = String::new();
        for dim in Dimension::ALL {
            let summary = self.collection(dim).summarize();
            if !summary.is_empty() {
                text.push_str(&format!("{}:\n{}", dim.title(), summary));
            }
        }
        text
    }

    pub fn rescan_entities(&mut self, entity_limit: u32, policy: RescanPolicy) {
        for collection in self.collections_mut() {
            collection.rescan_entities(entity_limit, policy);
        }
    }

    pub fn remove(&mut self, problem: ChunkStatus) -> Result<u32> {
        let mut counter = 0;
        for collection in self.collections_mut() {
            counter += collection.remove(problem)?;
        }
        Ok(counter)
    }

    pub fn remove_excess_entities(&mut self) -> Result<u32> {
        let mut counter = 0;
        for collection in self.collections_mut() {
            counter += collection.remove_excess_entities()?;
        }
        Ok(counter)
    }

    /// Replaces every chunk classified as `problem` with the first backup copy
    /// that currently scans `Ok`, trying `backups` in order. Records are left
    /// as they were; rescan to see the result.
    pub fn repair(&self, backups: &[World], problem: ChunkStatus, options: &ScanOptions) -> Result<u32> {
        let problem = problem.require_problem("repair")?;
        let mut counter = 0;

        for dim in Dimension::ALL {
            let candidates: Vec<_> = self.collection(dim).list(Some(problem)).into_iter()
                .map(|record| (record.region_path.clone(), record.header_coords, record.slot_global()))
                .collect();

            for (target, local, global) in candidates {
                debug!("Looking for a replacement for chunk {} ({})", global, dim.title());
                for backup in backups {
                    match decide(Self::ask_backup(backup, dim, global, options.entity_limit)) {
                        RepairStep::Replace(raw) => {
                            let mut region = RegionFile::open_for_write(&target)?;
                            region.write_chunk(local, &raw)?;
                            counter += 1;
                            info!("Chunk {} replaced using backup {}", global, backup.world_path.display());
                            break;
                        }
                        RepairStep::TryNext => continue
                    }
                }
            }
        }
        Ok(counter)
    }

    fn ask_backup(backup: &World, dim: Dimension, global: ChunkPos, entity_limit: u32) -> BackupOutcome {
        let Some((path, local)) = backup.collection(dim).locate(global) else {
            return BackupOutcome::Unavailable;
        };
        if !path.exists() {
            debug!("No region file {} in backup", path.display());
            return BackupOutcome::Unavailable;
        }
        let outcome = match RegionFile::open(&path) {
            Ok(mut region) => {
                let (record, raw) = scan_slot(&mut region, global.region(), local, entity_limit);
                BackupOutcome::Scanned(record, raw)
            }
            Err(e) => BackupOutcome::Unreadable(e.to_string())
        };
        if let BackupOutcome::Scanned(record, _) = &outcome {
            debug!("Chunk {} is {} in backup {}", global, record.status, backup.world_path.display());
        }
        outcome
    }
}

impl Display for World {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "World information:")?;
        writeln!(f, "   World path: {}", self.world_path.display())?;
        writeln!(f, "   World name: {}", self.name())?;
        writeln!(f, "   Region files: {}", self.region_count())?;
        write!(f, "   Scanned: {}", self.scanned)
    }
}

fn read_gzip_nbt(path: &Path) -> std::result::Result<NbtCompound, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    read_nbt(&mut BufReader::new(file), Flavor::GzCompressed)
        .map(|(nbt, _)| nbt)
        .map_err(|e| e.to_string())
}

fn dat_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<_> = entries.flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "dat"))
        .collect();
    files.sort();
    files
}
