use std::fmt::{Display, Formatter};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use crate::chunk::{CompressionType, RawChunk};
use crate::error::{DecodeError, Error, Result};
use crate::positions::LocalPos;

// https://minecraft.fandom.com/wiki/Region_file_format

pub const SECTOR_SIZE: u64 = 4096;
const HEADER_SECTORS: u32 = 2;
const HEADER_SIZE: u64 = SECTOR_SIZE * HEADER_SECTORS as u64;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct RegionLocation([u8; 4]);

impl RegionLocation {
    const EMPTY: RegionLocation = RegionLocation([0; 4]);

    fn new(offset: u32, sector_count: u8) -> RegionLocation {
        let [_, a, b, c] = offset.to_be_bytes();
        RegionLocation([a, b, c, sector_count])
    }

    pub fn offset(&self) -> u32 {
        u32::from_be_bytes([0, self.0[0], self.0[1], self.0[2]])
    }

    pub fn sector_count(&self) -> u8 {
        self.0[3]
    }

    pub fn is_present(&self) -> bool {
        self.0[0] | self.0[1] | self.0[2] | self.0[3] != 0
    }

    fn sectors(&self) -> Range<u32> {
        self.offset()..self.offset() + self.sector_count() as u32
    }
}

impl Display for RegionLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "(Offset: {}, Sectors: {})", self.offset(), self.sector_count())
    }
}

#[derive(Debug, Clone)]
pub struct RegionHeader {
    locations: [RegionLocation; 1024],
    timestamps: [u32; 1024],
}

impl RegionHeader {
    fn empty() -> RegionHeader {
        RegionHeader {
            locations: [RegionLocation::EMPTY; 1024],
            timestamps: [0; 1024]
        }
    }

    pub fn parse<R: Read>(reader: &mut R) -> io::Result<RegionHeader> {
        let mut header = RegionHeader::empty();
        for i in 0..1024 {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf)?;
            header.locations[i] = RegionLocation(buf);
        }
        for i in 0..1024 {
            header.timestamps[i] = reader.read_u32::<BigEndian>()?;
        }
        Ok(header)
    }

    pub fn timestamp(&self, local: LocalPos) -> u32 {
        self.timestamps[local.index()]
    }
}

/// An open region file. Every mutation writes through to disk immediately;
/// dropping the value closes the file.
pub struct RegionFile {
    path: PathBuf,
    file: File,
    header: RegionHeader
}

impl RegionFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<RegionFile> {
        Self::open_with(path.as_ref(), OpenOptions::new().read(true))
    }

    pub fn open_for_write<P: AsRef<Path>>(path: P) -> Result<RegionFile> {
        Self::open_with(path.as_ref(), OpenOptions::new().read(true).write(true))
    }

    /// Creates (or truncates) a region file with no chunks in it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<RegionFile> {
        let path = path.as_ref();
        let write_failed = |source| Error::ContainerWrite { path: path.to_owned(), source };

        let mut file = OpenOptions::new().read(true).write(true).create(true).truncate(true)
            .open(path).map_err(write_failed)?;
        file.write_all(&[0u8; HEADER_SIZE as usize]).map_err(write_failed)?;
        Ok(RegionFile { path: path.to_owned(), file, header: RegionHeader::empty() })
    }

    fn open_with(path: &Path, options: &OpenOptions) -> Result<RegionFile> {
        let unreadable = |source| Error::ContainerUnreadable { path: path.to_owned(), source };

        let mut file = options.open(path).map_err(unreadable)?;
        let length = file.metadata().map_err(unreadable)?.len();
        // Minecraft leaves zero byte region files behind; treat them as empty.
        let header = if length == 0 {
            RegionHeader::empty()
        } else {
            RegionHeader::parse(&mut file).map_err(unreadable)?
        };

        Ok(RegionFile { path: path.to_owned(), file, header })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &RegionHeader {
        &self.header
    }

    pub fn is_present(&self, local: LocalPos) -> bool {
        self.header.locations[local.index()].is_present()
    }

    pub fn present_slots(&self) -> impl Iterator<Item=LocalPos> + '_ {
        LocalPos::all().filter(|local| self.is_present(*local))
    }

    /// `Ok(None)` for an empty slot. Anything wrong with the slot's bytes is a
    /// `DecodeError`, including a location that points outside the file.
    pub fn read_chunk(&mut self, local: LocalPos) -> std::result::Result<Option<RawChunk>, DecodeError> {
        let location = self.header.locations[local.index()];
        if !location.is_present() {
            return Ok(None);
        }
        if location.offset() < HEADER_SECTORS {
            return Err(DecodeError::InvalidSector(location.offset()));
        }

        let offset = location.offset() as u64 * SECTOR_SIZE;
        let file_len = self.file.metadata()?.len();
        if offset + 5 > file_len {
            return Err(DecodeError::OutOfBounds { offset, file_len });
        }
        self.file.seek(SeekFrom::Start(offset))?;

        let length = self.file.read_u32::<BigEndian>()?;
        let allocated = location.sector_count() as u64 * SECTOR_SIZE;
        if length == 0 || length as u64 + 4 > allocated || offset + 4 + length as u64 > file_len {
            return Err(DecodeError::InvalidLength { length, sectors: location.sector_count() });
        }
        let compression_byte = self.file.read_u8()?;
        let compression = CompressionType::try_from(compression_byte)
            .map_err(|_| DecodeError::UnknownCompression(compression_byte))?;

        let mut data = vec![0u8; length as usize - 1];
        self.file.read_exact(&mut data)?;

        Ok(Some(RawChunk::new(compression, data)))
    }

    /// Stores `chunk` at `local`, reusing the slot's sectors when that is safe
    /// and appending to the end of the file otherwise.
    pub fn write_chunk(&mut self, local: LocalPos, chunk: &RawChunk) -> Result<()> {
        let total = chunk.data.len() as u64 + 5;
        let sectors = total.div_ceil(SECTOR_SIZE) as usize;
        if sectors > u8::MAX as usize {
            return Err(Error::ChunkTooLarge { sectors });
        }

        let file_len = self.file.metadata().map_err(|e| self.write_failed(e))?.len();
        let offset = if self.can_reuse(local, sectors as u32, file_len) {
            self.header.locations[local.index()].offset()
        } else {
            (file_len.max(HEADER_SIZE).div_ceil(SECTOR_SIZE)) as u32
        };

        let mut buf = Vec::with_capacity(sectors * SECTOR_SIZE as usize);
        buf.write_u32::<BigEndian>(chunk.data.len() as u32 + 1)?;
        buf.write_u8(chunk.compression as u8)?;
        buf.extend_from_slice(&chunk.data);
        buf.resize(sectors * SECTOR_SIZE as usize, 0);

        self.write_at(offset as u64 * SECTOR_SIZE, &buf)?;
        self.set_entry(local, RegionLocation::new(offset, sectors as u8), now())
    }

    /// Forgets the chunk at `local`. The sectors it occupied are left in place.
    pub fn unlink_chunk(&mut self, local: LocalPos) -> Result<()> {
        self.set_entry(local, RegionLocation::EMPTY, 0)
    }

    /// Header entries of broken slots can point anywhere. Only sectors that lie
    /// inside the file and belong to this slot alone may be overwritten.
    fn can_reuse(&self, local: LocalPos, sectors: u32, file_len: u64) -> bool {
        let current = self.header.locations[local.index()];
        if !current.is_present() || current.offset() < HEADER_SECTORS {
            return false;
        }
        let range = current.sectors();
        if (current.sector_count() as u32) < sectors || range.end as u64 * SECTOR_SIZE > file_len {
            return false;
        }
        self.header.locations.iter().enumerate()
            .filter(|(i, other)| *i != local.index() && other.is_present())
            .all(|(_, other)| {
                let other = other.sectors();
                other.end <= range.start || other.start >= range.end
            })
    }

    fn set_entry(&mut self, local: LocalPos, location: RegionLocation, timestamp: u32) -> Result<()> {
        let index = local.index() as u64;
        self.write_at(index * 4, &location.0)?;
        self.write_at(SECTOR_SIZE + index * 4, &timestamp.to_be_bytes())?;
        self.header.locations[local.index()] = location;
        self.header.timestamps[local.index()] = timestamp;
        Ok(())
    }

    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))
            .and_then(|_| self.file.write_all(bytes))
            .map_err(|e| self.write_failed(e))
    }

    fn write_failed(&self, source: io::Error) -> Error {
        Error::ContainerWrite { path: self.path.clone(), source }
    }
}

fn now() -> u32 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as u32).unwrap_or(0)
}
