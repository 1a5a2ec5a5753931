//! Read and write the variable length records (vlrs) of
//! [ASPRS LAS](https://www.asprs.org/committee-general/laser-las-file-format-exchange-activities.html)
//! and [COPC](https://copc.io/) files.
//!
//! Every record is a fixed-size header followed by a payload of `data_length` bytes. Regular
//! headers are 54 bytes with a 16-bit length, extended headers are 60 bytes with a 64-bit length.
//!
//! # Reading
//!
//! Read a header, then decode its payload with [Record::read_from], or do both at once:
//!
//! ```
//! use las_vlr::{Payload, Record, WktVlr};
//!
//! let wkt = WktVlr::new("GEOGCS[\"WGS 84\"]\0");
//! let mut bytes = wkt.header().unwrap().to_bytes().unwrap();
//! bytes.extend(wkt.to_bytes().unwrap());
//!
//! let (header, record) = Record::read_with_header(bytes.as_slice()).unwrap();
//! assert_eq!("LASF_Projection", header.user_id);
//! if let Record::Wkt(wkt) = record {
//!     assert_eq!("GEOGCS[\"WGS 84\"]", wkt.wkt());
//! }
//! ```
//!
//! Payloads with ids that aren't known to this crate are kept as raw bytes in
//! [Record::Unknown]. Decoders always consume the whole payload, so a bad record doesn't stop the
//! records after it from being read.
//!
//! # Writing
//!
//! Every payload implements [Payload], which knows its ids and size:
//!
//! ```
//! use las_vlr::{LazVlr, Payload};
//!
//! let laz = LazVlr::new(6, 0, las_vlr::laz::DEFAULT_CHUNK_SIZE).unwrap();
//! let header = laz.header().unwrap();
//! assert_eq!("laszip encoded", header.user_id);
//! assert_eq!(22204, header.record_id);
//! assert_eq!(laz.size(), u64::from(header.data_length));
//! ```
//!
//! # Locating records
//!
//! Use [IndexEntry::read_all] to walk the record headers of a file without decoding payloads.

#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

pub mod copc;
pub mod extra_bytes;
pub mod header;
pub mod index;
pub mod laz;
pub mod record;
pub mod utils;
pub mod wkt;

mod error;

pub use copc::CopcInfoVlr;
pub use error::Error;
pub use extra_bytes::ExtraBytesVlr;
pub use header::{ExtendedHeader, Header};
pub use index::IndexEntry;
pub use laz::LazVlr;
pub use record::{Kind, Payload, Record};
pub use wkt::WktVlr;

/// Crate-specific result type.
pub type Result<T> = std::result::Result<T, Error>;
