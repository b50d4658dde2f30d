#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use quartz_nbt::{NbtCompound, NbtList};
use region_fixer::chunk::{CompressionType, RawChunk};
use region_fixer::positions::{ChunkPos, Dimension};
use region_fixer::region::RegionFile;

pub fn region_dir(world: &Path, dim: Dimension) -> PathBuf {
    match dim {
        Dimension::Overworld => world.join("region"),
        Dimension::Nether => world.join("DIM-1").join("region"),
        Dimension::End => world.join("DIM1").join("region")
    }
}

/// Path of the region file holding `pos`, creating an empty one if needed.
pub fn region_for(world: &Path, dim: Dimension, pos: ChunkPos) -> PathBuf {
    let dir = region_dir(world, dim);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(pos.region().file_name());
    if !path.exists() {
        RegionFile::create(&path).unwrap();
    }
    path
}

pub fn chunk_nbt(pos: ChunkPos, entities: usize, marker: i32) -> NbtCompound {
    let mut list = NbtList::new();
    for i in 0..entities {
        let mut entity = NbtCompound::new();
        entity.insert("id", "minecraft:item".to_owned());
        entity.insert("Age", i as i16);
        list.push(entity);
    }
    let mut level = NbtCompound::new();
    level.insert("xPos", pos.x);
    level.insert("zPos", pos.z);
    level.insert("Entities", list);
    level.insert("Marker", marker);
    let mut root = NbtCompound::new();
    root.insert("Level", level);
    root.insert("DataVersion", 1343i32);
    root
}

/// Stores a healthy chunk claiming to be at `data_pos` in the slot of `slot_pos`.
pub fn put_chunk(world: &Path, dim: Dimension, slot_pos: ChunkPos, data_pos: ChunkPos, entities: usize, marker: i32) -> RawChunk {
    let raw = RawChunk::from_nbt(&chunk_nbt(data_pos, entities, marker), CompressionType::Zlib).unwrap();
    let mut region = RegionFile::open_for_write(region_for(world, dim, slot_pos)).unwrap();
    region.write_chunk(slot_pos.local(), &raw).unwrap();
    raw
}

pub fn put_ok(world: &Path, pos: ChunkPos, marker: i32) -> RawChunk {
    put_chunk(world, Dimension::Overworld, pos, pos, 0, marker)
}

pub fn put_corrupted(world: &Path, dim: Dimension, pos: ChunkPos) {
    let raw = RawChunk::new(CompressionType::Zlib, vec![0x78, 0x9c, 0xde, 0xad, 0xbe, 0xef]);
    let mut region = RegionFile::open_for_write(region_for(world, dim, pos)).unwrap();
    region.write_chunk(pos.local(), &raw).unwrap();
}

pub fn read_raw(world: &Path, dim: Dimension, pos: ChunkPos) -> Option<RawChunk> {
    let path = region_dir(world, dim).join(pos.region().file_name());
    RegionFile::open(path).unwrap().read_chunk(pos.local()).unwrap()
}

/// Overwrites the header entry of `pos` with a raw sector offset and count.
pub fn set_location(world: &Path, dim: Dimension, pos: ChunkPos, offset: u32, sectors: u8) {
    use std::io::{Seek, SeekFrom, Write};
    let path = region_dir(world, dim).join(pos.region().file_name());
    let mut file = fs::OpenOptions::new().write(true).open(path).unwrap();
    let [_, a, b, c] = offset.to_be_bytes();
    file.seek(SeekFrom::Start(pos.local().index() as u64 * 4)).unwrap();
    file.write_all(&[a, b, c, sectors]).unwrap();
}

pub fn region_len(world: &Path, dim: Dimension, pos: ChunkPos) -> u64 {
    fs::metadata(region_dir(world, dim).join(pos.region().file_name())).unwrap().len()
}
