use crate::bundle::RegionBundle;
use crate::positions::{ChunkPos, Dimension};
use crate::record::ChunkRecord;
use crate::status::ChunkStatus;
use crate::world::World;

pub(crate) fn or_na(pos: Option<ChunkPos>) -> String {
    pos.map_or_else(|| "N/A".to_owned(), |pos| pos.to_string())
}

/// Summary lines for one problematic chunk.
pub fn chunk_block(record: &ChunkRecord) -> String {
    let mut text = format!(
        " |-+-Chunk coords: header {}, global {}, data {}.\n",
        record.header_coords,
        or_na(record.global_coords),
        or_na(record.data_coords)
    );
    text.push_str(&format!(" | +-Status: {}\n", record.status));
    text.push_str(" | +-Error:\n");
    text.push_str(&format!(" |   -{}\n", record.detail.as_deref().unwrap_or(record.status.text())));
    text.push_str(" |\n");
    text
}

pub fn region_block(bundle: &RegionBundle) -> String {
    format!("Region file: {}\n{} +\n\n", bundle.file_name(), bundle.summarize())
}

/// One line per dimension with the number of chunks in each problem state.
pub fn count_table(world: &World) -> String {
    let mut text = format!("{:<10}{:>8}", "", "Chunks");
    for problem in ChunkStatus::PROBLEMS {
        text.push_str(&format!("{:>20}", problem.text()));
    }
    text.push('\n');

    for dim in Dimension::ALL {
        let collection = world.collection(dim);
        text.push_str(&format!("{:<10}{:>8}", dim.title(), collection.count(None)));
        for problem in ChunkStatus::PROBLEMS {
            text.push_str(&format!("{:>20}", collection.count(Some(problem))));
        }
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use crate::positions::{LocalPos, RegionPos};
    use super::*;

    #[test]
    fn chunk_block_shows_detail_or_status() {
        let mut record = ChunkRecord::new(Path::new("r.0.0.mca"), RegionPos::new(0, 0), LocalPos::new(2, 3).unwrap(), ChunkStatus::Corrupted);
        assert!(chunk_block(&record).contains(" |   -Corrupted\n"));
        record.detail = Some("Unknown compression type 9".into());
        let block = chunk_block(&record);
        assert!(block.starts_with(" |-+-Chunk coords: header (2, 3), global N/A, data N/A.\n"));
        assert!(block.contains(" |   -Unknown compression type 9\n"));
    }
}
