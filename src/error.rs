use std::{io, str};

/// Crate-specific error enum.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Fewer bytes were available than a fixed-size record requires.
    #[error("truncated input: expected {expected} bytes, only {available} available")]
    TruncatedInput {
        /// The number of bytes the record requires.
        expected: u64,
        /// The number of bytes that were actually available.
        available: u64,
    },

    /// The payload length is not a whole number of fixed-size entries.
    #[error("payload length {len} is not a multiple of the {entry_size}-byte entry size")]
    MisalignedPayload {
        /// The payload length, in bytes.
        len: u64,
        /// The size of one entry, in bytes.
        entry_size: u64,
    },

    /// There is no laszip item table for this point format.
    #[error("unsupported point format: {0}")]
    UnsupportedPointFormat(u8),

    /// The string is too long to fit into its fixed-width field.
    #[error("string is too long for a field of {len} bytes: {string}")]
    StringTooLong {
        /// The string.
        string: String,
        /// The width of the field.
        len: usize,
    },

    /// The payload is too long to be described by a regular (non-extended) header.
    #[error("payload is too long for a regular vlr header: {0} bytes")]
    DataTooLong(u64),

    /// A record whose payload would end past the largest possible stream position.
    #[error("record at {byte_offset} with a {data_length}-byte payload ends past u64::MAX")]
    RecordOutOfRange {
        /// The position of the record's header.
        byte_offset: u64,
        /// The payload length from the header.
        data_length: u64,
    },

    /// An octree child direction outside of `0..8`.
    #[error("child direction must be in 0..8, was {0}")]
    InvalidDirection(i32),

    /// No EPSG code could be found at the end of the WKT.
    #[error("the WKT CRS could not be parsed into EPSG code(s)")]
    UnreadableWktCrs,

    /// [std::io::Error]
    #[error(transparent)]
    Io(#[from] io::Error),

    /// [std::str::Utf8Error]
    #[error(transparent)]
    Utf8(#[from] str::Utf8Error),
}
