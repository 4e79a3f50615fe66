//! NBT (Named Binary Tag): the tag tree, its binary codec and its text form (SNBT).

pub mod binary;
pub mod snbt;
pub mod tag;

use thiserror::Error;

pub use binary::{consume_from_bytes, decode, encode, encode_into};
pub use snbt::{parse, parse_named, to_snbt, ParseError, ParseReason};
pub use tag::{Compound, List, NamedTag, Tag, TagKind};

/// Represents the part of the binary stream an error is about.
#[derive(Eq, PartialEq, Clone, Copy, Debug)]
pub enum DataType {
    /// The type id / name length / name prefix of a tag.
    Header,
    /// The name of a tag.
    Name,
    /// The payload of a tag of the given kind.
    Payload(TagKind),
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Header => write!(f, "tag header"),
            DataType::Name => write!(f, "tag name"),
            DataType::Payload(kind) => write!(f, "{kind} payload"),
        }
    }
}

#[derive(Eq, PartialEq, Clone, Debug)]
pub enum ErrorReason {
    ValueTooLarge,
    UnknownTypeId(u8),
    NegativeLength(i32),
    /// The declared length cannot fit in what is left of the input.
    ImplausibleLength(usize),
    UnexpectedEnd { needed: usize, remaining: usize },
    TooDeep,
    InvalidFormat(String),
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorReason::ValueTooLarge => write!(f, "Value too large"),
            ErrorReason::UnknownTypeId(id) => write!(f, "Unknown type id {id}"),
            ErrorReason::NegativeLength(length) => write!(f, "Negative length {length}"),
            ErrorReason::ImplausibleLength(length) => {
                write!(f, "Declared length {length} exceeds the remaining input")
            }
            ErrorReason::UnexpectedEnd { needed, remaining } => write!(
                f,
                "Unexpected end of data, needed {needed} bytes but {remaining} remain"
            ),
            ErrorReason::TooDeep => write!(f, "Nesting too deep"),
            ErrorReason::InvalidFormat(reason) => write!(f, "Invalid format: {reason}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NbtError {
    #[error("Encoding error for {0}: {1}")]
    Encoding(DataType, ErrorReason),

    #[error("Decoding error for {0}: {1}")]
    Decoding(DataType, ErrorReason),

    #[error("A list of {expected} cannot hold a {found}")]
    ListTypeMismatch { expected: TagKind, found: TagKind },
}
