use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use region_fixer::report::count_table;
use region_fixer::world::PlayerStatus;
use region_fixer::{ChunkStatus, RescanPolicy, ScanOptions, World};

/// Scan Minecraft worlds for broken chunks and fix them, using backups of the
/// same world when there are any.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// World folders to scan
    #[arg(required = true)]
    worlds: Vec<PathBuf>,

    /// Backup world folders, tried in the given order when replacing chunks
    #[arg(short, long, value_delimiter = ',')]
    backups: Vec<PathBuf>,

    /// Chunks with at least this many entities are reported as a problem
    #[arg(short, long, default_value_t = region_fixer::scan::DEFAULT_ENTITY_LIMIT)]
    entity_limit: u32,

    /// Number of region files scanned at the same time
    #[arg(short, long)]
    processes: Option<usize>,

    #[arg(long)]
    replace_corrupted: bool,
    #[arg(long)]
    replace_wrong_located: bool,
    #[arg(long)]
    replace_entities: bool,

    #[arg(long)]
    delete_corrupted: bool,
    #[arg(long)]
    delete_wrong_located: bool,
    #[arg(long)]
    delete_too_many_entities: bool,
    /// Empty the entity list of chunks over the entity limit
    #[arg(long)]
    delete_entities: bool,

    /// After scanning, re-apply this entity limit to the results without
    /// reading the chunks again
    #[arg(long)]
    recheck_entity_limit: Option<u32>,

    /// Let --recheck-entity-limit re-classify every chunk, not only the ones
    /// whose status depends on their entity count
    #[arg(long)]
    legacy_rescan: bool,

    /// Print every problematic chunk
    #[arg(short, long)]
    summary: bool
}

impl Args {
    fn replacements(&self) -> Vec<ChunkStatus> {
        [
            (self.replace_corrupted, ChunkStatus::Corrupted),
            (self.replace_wrong_located, ChunkStatus::WrongLocated),
            (self.replace_entities, ChunkStatus::TooManyEntities)
        ].into_iter().filter(|(wanted, _)| *wanted).map(|(_, status)| status).collect()
    }

    fn deletions(&self) -> Vec<ChunkStatus> {
        [
            (self.delete_corrupted, ChunkStatus::Corrupted),
            (self.delete_wrong_located, ChunkStatus::WrongLocated),
            (self.delete_too_many_entities, ChunkStatus::TooManyEntities)
        ].into_iter().filter(|(wanted, _)| *wanted).map(|(_, status)| status).collect()
    }
}

fn fix_world(path: &Path, backups: &[World], args: &Args, options: &ScanOptions) -> Result<()> {
    let mut world = World::open(path);
    if !world.is_world() {
        warn!("{} does not look like a Minecraft world, skipping", path.display());
        return Ok(());
    }

    info!("Scanning world \"{}\"", world.name());
    world.scan_and_recheck(options, args.recheck_entity_limit);
    println!("{}", world);
    print!("{}", count_table(&world));
    for problem in world.level_problems() {
        println!("level.dat: {}", problem);
    }
    for player in world.players() {
        if let PlayerStatus::Corrupted(e) = &player.status {
            println!("Player file {}: {}", player.path.display(), e);
        }
    }
    if args.summary {
        print!("{}", world.summarize());
    }

    let replacements = args.replacements();
    if !replacements.is_empty() {
        if backups.is_empty() {
            bail!("Replacing chunks needs at least one --backups folder");
        }
        for problem in replacements {
            let repaired = world.repair(backups, problem, options)
                .with_context(|| format!("Replacing {} chunks in {}", problem, path.display()))?;
            println!("Replaced {} of {} {} chunks", repaired, world.count(Some(problem)), problem);
        }
        world.scan_and_recheck(options, args.recheck_entity_limit);
    }

    for problem in args.deletions() {
        let removed = world.remove(problem)
            .with_context(|| format!("Deleting {} chunks in {}", problem, path.display()))?;
        println!("Deleted {} {} chunks", removed, problem);
    }
    if args.delete_entities {
        let removed = world.remove_excess_entities()
            .with_context(|| format!("Deleting entities in {}", path.display()))?;
        println!("Deleted {} entities", removed);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Some(processes) = args.processes {
        rayon::ThreadPoolBuilder::new().num_threads(processes).build_global()
            .context("Setting up the scanning thread pool")?;
    }

    let options = ScanOptions {
        entity_limit: args.entity_limit,
        rescan_policy: if args.legacy_rescan { RescanPolicy::Unconditional } else { RescanPolicy::EntityDriven }
    };

    let mut backups = Vec::new();
    for path in &args.backups {
        let backup = World::open(path);
        if !backup.is_world() {
            bail!("Backup folder {} does not look like a Minecraft world", path.display());
        }
        backups.push(backup);
    }

    for path in &args.worlds {
        fix_world(path, &backups, &args, &options)?;
    }
    Ok(())
}
