use std::fmt::{Display, Formatter};
use crate::error::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChunkStatus {
    NotCreated,
    Ok,
    Corrupted,
    WrongLocated,
    TooManyEntities
}

impl ChunkStatus {
    pub const ALL: [ChunkStatus; 5] = [
        ChunkStatus::NotCreated,
        ChunkStatus::Ok,
        ChunkStatus::Corrupted,
        ChunkStatus::WrongLocated,
        ChunkStatus::TooManyEntities
    ];

    pub const PROBLEMS: [ChunkStatus; 3] = [
        ChunkStatus::Corrupted,
        ChunkStatus::WrongLocated,
        ChunkStatus::TooManyEntities
    ];

    pub fn text(&self) -> &'static str {
        match self {
            ChunkStatus::NotCreated => "Not created",
            ChunkStatus::Ok => "OK",
            ChunkStatus::Corrupted => "Corrupted",
            ChunkStatus::WrongLocated => "Wrong located",
            ChunkStatus::TooManyEntities => "Too many entities"
        }
    }

    pub fn is_problem(&self) -> bool {
        Self::PROBLEMS.contains(self)
    }

    /// Destructive operations only make sense for problem statuses.
    pub(crate) fn require_problem(self, operation: &'static str) -> Result<ChunkStatus, Error> {
        if self.is_problem() {
            Ok(self)
        } else {
            Err(Error::PolicyViolation { operation, status: self })
        }
    }
}

impl Display for ChunkStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_defects_are_problems() {
        assert!(!ChunkStatus::Ok.is_problem());
        assert!(!ChunkStatus::NotCreated.is_problem());
        assert!(ChunkStatus::PROBLEMS.iter().all(ChunkStatus::is_problem));
        assert!(matches!(
            ChunkStatus::Ok.require_problem("remove"),
            Err(Error::PolicyViolation { operation: "remove", status: ChunkStatus::Ok })
        ));
        assert_eq!(ChunkStatus::Corrupted.require_problem("remove").unwrap(), ChunkStatus::Corrupted);
    }
}
