use std::io;
use java_string::Utf8Error;
use num_enum::TryFromPrimitiveError;
use thiserror::Error;
use crate::nbt::TagId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid NBT Tag ID {0:}")]
    InvalidTagId(#[from] TryFromPrimitiveError<TagId>),
    #[error("Invalid Nbt Root Tag {0:?}")]
    InvalidNbtRoot(TagId),
    #[error("Unexpected End Tag")]
    InvalidNbtEndTag,
    #[error("Negative {0:?} length {1}")]
    NegativeLength(TagId, i32),
    #[error("Nbt nesting deeper than {0} levels")]
    TooDeep(usize),
    #[error("Invalid Modified Utf8 String")]
    InvalidModifiedUtf8(#[from] Utf8Error),
    #[error(transparent)]
    IoError(#[from] io::Error)
}

pub type Result<T> = std::result::Result<T, Error>;
