use std::io::Cursor;
use flate2::read::{GzDecoder, ZlibDecoder};
use num_enum::TryFromPrimitive;
use quartz_nbt::io::{read_nbt, write_nbt, Flavor};
use quartz_nbt::{NbtCompound, NbtList};
use crate::error::DecodeError;
use crate::nbt::{LeafTag, NbtPath, NbtVisitor, TagId, visit_nbt};
use crate::positions::ChunkPos;

#[derive(Debug, Copy, Clone, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum CompressionType {
    Gzip = 1,
    Zlib = 2,
    Uncompressed = 3
}

impl CompressionType {
    fn flavor(&self) -> Flavor {
        match self {
            CompressionType::Gzip => Flavor::GzCompressed,
            CompressionType::Zlib => Flavor::ZlibCompressed,
            CompressionType::Uncompressed => Flavor::Uncompressed
        }
    }
}

/// A chunk payload exactly as stored in its region file slot, still compressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub compression: CompressionType,
    pub data: Vec<u8>
}

/// The few facts the scanner needs out of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProbe {
    pub pos: ChunkPos,
    pub entity_count: u32
}

#[derive(Default)]
struct ProbeVisitor {
    level_x: Option<i32>,
    level_z: Option<i32>,
    root_x: Option<i32>,
    root_z: Option<i32>,
    level_entities: Option<usize>,
    root_entities: Option<usize>
}

impl NbtVisitor for ProbeVisitor {
    #[inline]
    fn visit_leaf(&mut self, val: LeafTag, path: &NbtPath) {
        let LeafTag::Int(value) = val else {
            return;
        };
        if path.matches(&["Level", "xPos"]) {
            self.level_x = Some(value);
        } else if path.matches(&["Level", "zPos"]) {
            self.level_z = Some(value);
        } else if path.matches(&["xPos"]) {
            self.root_x = Some(value);
        } else if path.matches(&["zPos"]) {
            self.root_z = Some(value);
        }
    }

    #[inline]
    fn visit_list(&mut self, _element: TagId, len: usize, path: &NbtPath) {
        if path.matches(&["Level", "Entities"]) {
            self.level_entities = Some(len);
        } else if path.matches(&["Entities"]) {
            self.root_entities = Some(len);
        }
    }
}

impl RawChunk {
    pub fn new(compression: CompressionType, data: Vec<u8>) -> RawChunk {
        RawChunk { compression, data }
    }

    pub fn from_nbt(nbt: &NbtCompound, compression: CompressionType) -> Result<RawChunk, DecodeError> {
        Self::from_named_nbt(nbt, "", compression)
    }

    pub fn from_named_nbt(nbt: &NbtCompound, root_name: &str, compression: CompressionType) -> Result<RawChunk, DecodeError> {
        let mut data = Vec::new();
        write_nbt(&mut data, Some(root_name), nbt, compression.flavor())?;
        Ok(RawChunk { compression, data })
    }

    pub fn to_nbt(&self) -> Result<NbtCompound, DecodeError> {
        Ok(self.to_named_nbt()?.0)
    }

    /// The chunk's tag tree along with the name of its root tag.
    pub fn to_named_nbt(&self) -> Result<(NbtCompound, String), DecodeError> {
        Ok(read_nbt(&mut Cursor::new(&self.data), self.compression.flavor())?)
    }

    /// Walks the chunk once without building the tag tree.
    pub fn probe(&self) -> Result<ChunkProbe, DecodeError> {
        let mut visitor = ProbeVisitor::default();
        let data = self.data.as_slice();
        match self.compression {
            CompressionType::Gzip => visit_nbt(&mut GzDecoder::new(data), &mut visitor)?,
            CompressionType::Zlib => visit_nbt(&mut ZlibDecoder::new(data), &mut visitor)?,
            CompressionType::Uncompressed => visit_nbt(&mut Cursor::new(data), &mut visitor)?
        };

        let (x, z) = match (visitor.level_x, visitor.level_z) {
            (Some(x), Some(z)) => (x, z),
            _ => (
                visitor.root_x.ok_or(DecodeError::MissingTag("xPos"))?,
                visitor.root_z.ok_or(DecodeError::MissingTag("zPos"))?
            )
        };
        let entities = visitor.level_entities.or(visitor.root_entities).unwrap_or(0);

        Ok(ChunkProbe {
            pos: ChunkPos::new(x, z),
            entity_count: entities as u32
        })
    }

    /// Returns a copy of this chunk with an empty entity list, and how many
    /// entities were dropped.
    pub fn strip_entities(&self) -> Result<(RawChunk, u32), DecodeError> {
        let (mut nbt, root_name) = self.to_named_nbt()?;
        let holder = if nbt.contains_key("Level") {
            nbt.get_mut::<_, &mut NbtCompound>("Level").map_err(|_| DecodeError::MissingTag("Level"))?
        } else {
            &mut nbt
        };
        let removed = holder.get::<_, &NbtList>("Entities").map(|list| list.len()).unwrap_or(0);
        holder.insert("Entities", NbtList::new());

        Ok((RawChunk::from_named_nbt(&nbt, &root_name, self.compression)?, removed as u32))
    }
}
