//! Audits Minecraft worlds chunk by chunk and repairs broken chunks from
//! backup copies of the same world.

pub mod positions;
pub mod status;
pub mod error;
pub mod nbt;
pub mod chunk;
pub mod region;
pub mod record;
pub mod scan;
pub mod bundle;
pub mod collection;
pub mod world;
pub mod report;

pub use bundle::RegionBundle;
pub use collection::RegionCollection;
pub use error::{Error, Result};
pub use record::{ChunkRecord, RescanPolicy};
pub use scan::{scan_chunk_slot, ScanOptions};
pub use status::ChunkStatus;
pub use world::World;
