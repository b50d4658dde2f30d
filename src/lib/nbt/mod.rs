//! Streaming walker over uncompressed NBT. Leaves and list headers are handed
//! to a visitor together with their path; array payloads are skipped, so a
//! chunk can be inspected without materialising its block data.

mod error;

pub use error::{Error, Result};

use std::io::{self, Read};
use byteorder::{BigEndian, ReadBytesExt};
use java_string::JavaString;
use num_enum::TryFromPrimitive;
use crate::nbt::NbtPathElement::{Element, Index};

/// Real chunks nest a handful of levels deep.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug)]
pub enum LeafTag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(JavaString),
    /// Array tags carry only their element count.
    ByteArray(usize),
    IntArray(usize),
    LongArray(usize),
}

pub trait NbtVisitor {
    fn visit_leaf(&mut self, _val: LeafTag, _path: &NbtPath) {}

    /// Called once per list, before any of its elements.
    fn visit_list(&mut self, _element: TagId, _len: usize, _path: &NbtPath) {}
}

#[derive(Debug)]
pub enum NbtPathElement {
    Element(JavaString),
    Index(usize),
}

impl NbtPathElement {
    pub fn is(&self, name: &str) -> bool {
        matches!(self, Element(element) if *element == JavaString::from(name))
    }
}

#[derive(Debug)]
pub struct NbtPath(Vec<NbtPathElement>);
impl NbtPath {
    fn new() -> Self {
        NbtPath(Vec::new())
    }

    fn push(&mut self, path_element: NbtPathElement) {
        self.0.push(path_element);
    }

    fn pop(&mut self) -> Option<NbtPathElement> {
        self.0.pop()
    }

    pub fn get(&self, index: usize) -> Option<&NbtPathElement> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the path below the root is exactly `names`.
    pub fn matches(&self, names: &[&str]) -> bool {
        self.len() == names.len() + 1
            && names.iter().enumerate().all(|(i, name)| self.0[i + 1].is(name))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum TagId {
    End = 0x0,
    Byte = 0x1,
    Short = 0x2,
    Int = 0x3,
    Long = 0x4,
    Float = 0x5,
    Double = 0x6,
    ByteArray = 0x7,
    String = 0x8,
    List = 0x9,
    Compound = 0xA,
    IntArray = 0xB,
    LongArray = 0xC,
}

pub fn visit_nbt<R: Read, V: NbtVisitor>(reader: &mut R, visitor: &mut V) -> Result<()> {
    let root_id: TagId = reader.read_u8()?.try_into()?;
    if root_id != TagId::Compound {
        return Err(Error::InvalidNbtRoot(root_id));
    }

    let mut curr_path = NbtPath::new();

    let root_name = read_string(reader)?;
    curr_path.push(Element(root_name));

    visit_tag_body(reader, visitor, root_id, &mut curr_path)?;

    Ok(())
}

fn visit_tag_body<R: Read, V: NbtVisitor>(reader: &mut R, visitor: &mut V, tag_id: TagId, curr_path: &mut NbtPath) -> Result<()> {
    if curr_path.len() > MAX_DEPTH {
        return Err(Error::TooDeep(MAX_DEPTH));
    }
    match tag_id {
        TagId::Byte => {
            visitor.visit_leaf(LeafTag::Byte(reader.read_i8()?), curr_path);
        }
        TagId::Short => {
            visitor.visit_leaf(LeafTag::Short(reader.read_i16::<BigEndian>()?), curr_path);
        }
        TagId::Int => {
            visitor.visit_leaf(LeafTag::Int(reader.read_i32::<BigEndian>()?), curr_path);
        }
        TagId::Long => {
            visitor.visit_leaf(LeafTag::Long(reader.read_i64::<BigEndian>()?), curr_path);
        }
        TagId::Float => {
            visitor.visit_leaf(LeafTag::Float(reader.read_f32::<BigEndian>()?), curr_path);
        }
        TagId::Double => {
            visitor.visit_leaf(LeafTag::Double(reader.read_f64::<BigEndian>()?), curr_path);
        }
        TagId::ByteArray => {
            let len = read_length(reader, tag_id)?;
            skip(reader, len as u64)?;
            visitor.visit_leaf(LeafTag::ByteArray(len), curr_path);
        }
        TagId::String => {
            visitor.visit_leaf(LeafTag::String(read_string(reader)?), curr_path);
        }
        TagId::List => {
            let element_id: TagId = reader.read_u8()?.try_into()?;
            let len = read_length(reader, tag_id)?;
            if element_id == TagId::End && len > 0 {
                return Err(Error::InvalidNbtEndTag);
            }
            visitor.visit_list(element_id, len, curr_path);

            for i in 0..len {
                curr_path.push(Index(i));
                visit_tag_body(reader, visitor, element_id, curr_path)?;
                curr_path.pop();
            }
        }
        TagId::Compound => {
            let mut tag_id = reader.read_u8()?.try_into()?;
            while tag_id != TagId::End {
                let name = read_string(reader)?;
                curr_path.push(Element(name));
                visit_tag_body(reader, visitor, tag_id, curr_path)?;
                curr_path.pop();
                tag_id = reader.read_u8()?.try_into()?;
            }
        }
        TagId::IntArray => {
            let len = read_length(reader, tag_id)?;
            skip(reader, len as u64 * 4)?;
            visitor.visit_leaf(LeafTag::IntArray(len), curr_path);
        }
        TagId::LongArray => {
            let len = read_length(reader, tag_id)?;
            skip(reader, len as u64 * 8)?;
            visitor.visit_leaf(LeafTag::LongArray(len), curr_path);
        }
        TagId::End => return Err(Error::InvalidNbtEndTag)
    }

    Ok(())
}

#[inline]
fn read_length<R: Read>(reader: &mut R, tag_id: TagId) -> Result<usize> {
    let len = reader.read_i32::<BigEndian>()?;
    if len < 0 {
        return Err(Error::NegativeLength(tag_id, len));
    }
    Ok(len as usize)
}

#[inline]
fn skip<R: Read>(reader: &mut R, len: u64) -> Result<()> {
    let skipped = io::copy(&mut (&mut *reader).take(len), &mut io::sink())?;
    if skipped != len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(())
}

#[inline]
fn read_string<R: Read>(reader: &mut R) -> Result<JavaString> {
    let len = reader.read_u16::<BigEndian>()? as usize;
    let mut bytes = vec![0; len];
    reader.read_exact(&mut bytes)?;

    Ok(JavaString::from_modified_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use quartz_nbt::io::{write_nbt, Flavor};
    use quartz_nbt::{NbtCompound, NbtList};
    use super::*;

    #[derive(Default)]
    struct Recorder {
        ints: Vec<(String, i32)>,
        lists: Vec<(usize, usize)>,
        arrays: Vec<usize>
    }
    impl NbtVisitor for Recorder {
        fn visit_leaf(&mut self, val: LeafTag, path: &NbtPath) {
            match val {
                LeafTag::Int(v) if path.matches(&["Level", "xPos"]) => self.ints.push(("xPos".into(), v)),
                LeafTag::Int(v) => self.ints.push(("other".into(), v)),
                LeafTag::LongArray(len) => self.arrays.push(len),
                _ => {}
            }
        }

        fn visit_list(&mut self, _element: TagId, len: usize, path: &NbtPath) {
            self.lists.push((path.len(), len));
        }
    }

    fn encode(root: &NbtCompound) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_nbt(&mut bytes, None, root, Flavor::Uncompressed).unwrap();
        bytes
    }

    #[test]
    fn reports_leaves_lists_and_array_lengths() {
        let mut level = NbtCompound::new();
        level.insert("xPos", 12i32);
        level.insert("Heights", vec![1i64, 2, 3]);
        let mut entities = NbtList::new();
        entities.push(NbtCompound::new());
        entities.push(NbtCompound::new());
        level.insert("Entities", entities);
        let mut root = NbtCompound::new();
        root.insert("Level", level);
        root.insert("DataVersion", 1343i32);

        let mut recorder = Recorder::default();
        visit_nbt(&mut Cursor::new(encode(&root)), &mut recorder).unwrap();

        assert!(recorder.ints.contains(&("xPos".into(), 12)));
        assert!(recorder.ints.contains(&("other".into(), 1343)));
        assert_eq!(recorder.lists, vec![(3, 2)]);
        assert_eq!(recorder.arrays, vec![3]);
    }

    #[test]
    fn rejects_non_compound_root() {
        let bytes = [TagId::Int as u8, 0, 0, 0, 0, 0, 1];
        assert!(matches!(
            visit_nbt(&mut Cursor::new(bytes), &mut Recorder::default()),
            Err(Error::InvalidNbtRoot(TagId::Int))
        ));
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut root = NbtCompound::new();
        root.insert("Heights", vec![7i64; 64]);
        let mut bytes = encode(&root);
        bytes.truncate(bytes.len() - 20);
        assert!(visit_nbt(&mut Cursor::new(bytes), &mut Recorder::default()).is_err());
    }

    #[test]
    fn negative_lengths_are_rejected() {
        // Compound root "" holding a byte array "a" with length -1
        let bytes = [0x0A, 0, 0, 0x07, 0, 1, b'a', 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            visit_nbt(&mut Cursor::new(bytes), &mut Recorder::default()),
            Err(Error::NegativeLength(TagId::ByteArray, -1))
        ));
    }
}
