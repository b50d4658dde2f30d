use std::fmt::{Display, Formatter};
use std::path::Path;
use crate::error::Error;

/// Extension used for every region file this crate creates or looks up.
pub const REGION_EXTENSION: &str = "mca";

#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone)]
pub enum Dimension {
    Overworld,
    Nether,
    End
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Overworld, Dimension::Nether, Dimension::End];

    pub fn title(&self) -> &'static str {
        match self {
            Dimension::Overworld => "Overworld",
            Dimension::Nether => "Nether",
            Dimension::End => "End"
        }
    }
}

/// Global chunk coordinates: the chunk's true position in the world.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        ChunkPos { x, z }
    }

    pub fn local(&self) -> LocalPos {
        LocalPos { x: (self.x & 31) as u8, z: (self.z & 31) as u8 }
    }

    pub fn region(&self) -> RegionPos {
        (*self).into()
    }
}
impl From<(i32, i32)> for ChunkPos {
    fn from((x, z): (i32, i32)) -> Self {
        ChunkPos {x, z}
    }
}
impl Display for ChunkPos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Identity of a region file, as encoded in its `r.<x>.<z>.mca` name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32
}
impl RegionPos {
    pub fn new(x: i32, z: i32) -> RegionPos {
        RegionPos { x, z }
    }

    pub fn file_name(&self) -> String {
        region_filename(self.x, self.z)
    }

    /// Global position of the chunk stored at `local` in this region.
    pub fn chunk_at(&self, local: LocalPos) -> ChunkPos {
        let (x, z) = local_to_global(self.x, self.z, local.x as i32, local.z as i32);
        ChunkPos { x, z }
    }
}
impl From<(i32, i32)> for RegionPos {
    fn from((x, z): (i32, i32)) -> Self {
        RegionPos {x, z}
    }
}
impl From<ChunkPos> for RegionPos {
    fn from(value: ChunkPos) -> Self {
        RegionPos { x: value.x >> 5, z: value.z >> 5}
    }
}
impl Display for RegionPos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// A slot in a region file's 32x32 grid. Both components are always in `0..32`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct LocalPos {
    x: u8,
    z: u8
}
impl LocalPos {
    pub const SLOTS: usize = 1024;

    pub fn new(x: u8, z: u8) -> Option<LocalPos> {
        if x < 32 && z < 32 {
            Some(LocalPos { x, z })
        } else {
            None
        }
    }

    pub fn from_index(index: usize) -> Option<LocalPos> {
        if index < Self::SLOTS {
            Some(LocalPos { x: (index & 31) as u8, z: (index >> 5) as u8 })
        } else {
            None
        }
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn z(&self) -> u8 {
        self.z
    }

    /// Index into the region header tables.
    pub fn index(&self) -> usize {
        (self.x as usize) + (self.z as usize) * 32
    }

    pub fn all() -> impl Iterator<Item=LocalPos> {
        (0..Self::SLOTS).filter_map(LocalPos::from_index)
    }
}
impl Display for LocalPos {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

pub fn global_to_region(gx: i32, gz: i32) -> (i32, i32) {
    (gx >> 5, gz >> 5)
}

pub fn global_to_local(gx: i32, gz: i32) -> (i32, i32) {
    (gx & 31, gz & 31)
}

pub fn local_to_global(rx: i32, rz: i32, lx: i32, lz: i32) -> (i32, i32) {
    (rx.wrapping_mul(32).wrapping_add(lx), rz.wrapping_mul(32).wrapping_add(lz))
}

pub fn region_filename(rx: i32, rz: i32) -> String {
    format!("r.{}.{}.{}", rx, rz, REGION_EXTENSION)
}

/// Parses `r.<x>.<z>.<ext>`. Accepts a bare file name or a full path.
pub fn parse_region_filename<P: AsRef<Path>>(name: P) -> Result<RegionPos, Error> {
    let name = name.as_ref();
    let malformed = || Error::MalformedRegionName(name.display().to_string());

    let file_name = name.file_name().and_then(|n| n.to_str()).ok_or_else(malformed)?;
    let parts: Vec<_> = file_name.split('.').collect();
    let [prefix, x, z, ext] = parts.as_slice() else {
        return Err(malformed());
    };
    if *prefix != "r" || ext.is_empty() {
        return Err(malformed());
    }
    let x = x.parse::<i32>().map_err(|_| malformed())?;
    let z = z.parse::<i32>().map_err(|_| malformed())?;
    Ok(RegionPos::new(x, z))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(gx: i32, gz: i32) -> (i32, i32) {
        let (rx, rz) = global_to_region(gx, gz);
        let (lx, lz) = global_to_local(gx, gz);
        local_to_global(rx, rz, lx, lz)
    }

    #[test]
    fn round_trip_covers_both_sides_of_origin() {
        for gx in -200..200 {
            for gz in (-200..200).step_by(7) {
                assert_eq!(round_trip(gx, gz), (gx, gz));
            }
        }
        for g in [i32::MIN, i32::MIN + 1, -33, -32, -31, 31, 32, 33, i32::MAX - 1, i32::MAX] {
            assert_eq!(round_trip(g, 0), (g, 0));
            assert_eq!(round_trip(-7, g), (-7, g));
        }
    }

    #[test]
    fn negative_chunks_floor_toward_negative_infinity() {
        assert_eq!(global_to_region(-1, -1), (-1, -1));
        assert_eq!(global_to_local(-1, -1), (31, 31));
        assert_eq!(global_to_region(-32, -33), (-1, -2));
        assert_eq!(global_to_local(-32, -33), (0, 31));
        assert_eq!(ChunkPos::new(-1, 40).local(), LocalPos::new(31, 8).unwrap());
        assert_eq!(ChunkPos::new(-1, 40).region(), RegionPos::new(-1, 1));
    }

    #[test]
    fn local_values_stay_in_range() {
        for g in -100..100 {
            let (lx, lz) = global_to_local(g, g * 3);
            assert!((0..32).contains(&lx));
            assert!((0..32).contains(&lz));
        }
    }

    #[test]
    fn region_chunk_at_matches_free_function() {
        let region = RegionPos::new(-2, 3);
        let local = LocalPos::new(5, 31).unwrap();
        assert_eq!(region.chunk_at(local), ChunkPos::new(-64 + 5, 96 + 31));
        assert_eq!(region.chunk_at(local).local(), local);
        assert_eq!(region.chunk_at(local).region(), region);
    }

    #[test]
    fn local_pos_rejects_out_of_range() {
        assert!(LocalPos::new(32, 0).is_none());
        assert!(LocalPos::new(0, 32).is_none());
        assert!(LocalPos::from_index(1024).is_none());
        assert_eq!(LocalPos::all().count(), 1024);
        for local in LocalPos::all() {
            assert_eq!(LocalPos::from_index(local.index()), Some(local));
        }
    }

    #[test]
    fn parses_region_file_names() {
        assert_eq!(parse_region_filename("r.-2.3.mca").unwrap(), RegionPos::new(-2, 3));
        assert_eq!(parse_region_filename("/world/DIM-1/region/r.0.-7.mcr").unwrap(), RegionPos::new(0, -7));
        assert_eq!(region_filename(-2, 3), "r.-2.3.mca");
        assert_eq!(parse_region_filename(region_filename(41, -9)).unwrap(), RegionPos::new(41, -9));
    }

    #[test]
    fn rejects_malformed_region_file_names() {
        for name in ["bogus.mca", "r.1.mca", "r.a.b.mca", "x.1.2.mca", "r.1.2.", "r.1.2.3.mca"] {
            assert!(
                matches!(parse_region_filename(name), Err(Error::MalformedRegionName(_))),
                "{name} should not parse"
            );
        }
    }
}
