//! The payload contract shared by all record kinds, and dispatch from record ids to decoders.
//!
//! A reader decodes a header first, then asks [Kind::from_ids] which decoder to use. Records that
//! aren't registered come back as [Record::Unknown] holding their raw bytes.
//!
//! ```
//! use las_vlr::{LazVlr, Payload, Record};
//!
//! let laz = LazVlr::new(3, 0, 50_000).unwrap();
//! let mut bytes = laz.header().unwrap().to_bytes().unwrap();
//! bytes.extend(laz.to_bytes().unwrap());
//!
//! let (header, record) = Record::read_with_header(bytes.as_slice()).unwrap();
//! assert_eq!(50, header.data_length);
//! assert_eq!(Record::Laz(laz), record);
//! ```

use crate::{
    CopcInfoVlr, ExtendedHeader, ExtraBytesVlr, Header, LazVlr, Result, WktVlr, copc::Page, utils,
};
use log::{Level, log};
use std::io::{Read, Write};

/// Behavior shared by every record payload.
pub trait Payload {
    /// The user id of records carrying this payload.
    const USER_ID: &'static str;

    /// The record id of records carrying this payload.
    const RECORD_ID: u16;

    /// The description used in headers made by [Payload::header].
    const DESCRIPTION: &'static str;

    /// Returns the number of bytes [Payload::write_to] writes.
    fn size(&self) -> u64;

    /// Writes the payload, without a header.
    fn write_to<W: Write>(&self, write: W) -> Result<()>;

    /// Returns a regular header describing this payload.
    ///
    /// Fails with [crate::Error::DataTooLong] if the payload doesn't fit into a regular record.
    fn header(&self) -> Result<Header> {
        Header::try_from(self.extended_header())
    }

    /// Returns an extended header describing this payload.
    fn extended_header(&self) -> ExtendedHeader {
        ExtendedHeader {
            reserved: 0,
            user_id: Self::USER_ID.to_string(),
            record_id: Self::RECORD_ID,
            data_length: self.size(),
            description: Self::DESCRIPTION.to_string(),
        }
    }

    /// Encodes the payload into a new buffer.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(usize::try_from(self.size()).unwrap_or_default());
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}

/// The registered record kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// [LazVlr]
    Laz,
    /// [ExtraBytesVlr]
    ExtraBytes,
    /// [WktVlr]
    Wkt,
    /// [CopcInfoVlr]
    CopcInfo,
    /// [Page]
    CopcHierarchy,
}

const KINDS: [Kind; 5] = [
    Kind::Laz,
    Kind::ExtraBytes,
    Kind::Wkt,
    Kind::CopcInfo,
    Kind::CopcHierarchy,
];

impl Kind {
    /// Returns the kind registered for this user id and record id.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::Kind;
    /// assert_eq!(Some(Kind::Laz), Kind::from_ids("laszip encoded", 22204));
    /// assert_eq!(None, Kind::from_ids("LASF_Projection", 34735));
    /// ```
    pub fn from_ids(user_id: &str, record_id: u16) -> Option<Kind> {
        KINDS.into_iter().find(|kind| kind.ids() == (user_id, record_id))
    }

    /// Returns the user id and record id of this kind.
    pub fn ids(self) -> (&'static str, u16) {
        match self {
            Kind::Laz => (LazVlr::USER_ID, LazVlr::RECORD_ID),
            Kind::ExtraBytes => (ExtraBytesVlr::USER_ID, ExtraBytesVlr::RECORD_ID),
            Kind::Wkt => (WktVlr::USER_ID, WktVlr::RECORD_ID),
            Kind::CopcInfo => (CopcInfoVlr::USER_ID, CopcInfoVlr::RECORD_ID),
            Kind::CopcHierarchy => (Page::USER_ID, Page::RECORD_ID),
        }
    }

    /// Decodes a payload of this kind from exactly `data_length` bytes.
    ///
    /// On error the whole payload has still been consumed, so the next record can be read.
    pub fn read_from<R: Read>(self, read: R, data_length: u64) -> Result<Record> {
        let data = utils::read_bytes(read, data_length)?;
        let record = match self {
            Kind::Laz => {
                let laz = LazVlr::from_buffer(&data)?;
                if !laz.valid() {
                    log!(
                        Level::Warn,
                        "laszip vlr has an unknown scheme (compressor {}, coder {})",
                        laz.compressor,
                        laz.coder
                    );
                }
                Record::Laz(laz)
            }
            Kind::ExtraBytes => Record::ExtraBytes(ExtraBytesVlr::from_buffer(&data)?),
            Kind::Wkt => Record::Wkt(WktVlr::from_buffer(&data)?),
            Kind::CopcInfo => {
                if data.len() > CopcInfoVlr::SIZE {
                    log!(
                        Level::Warn,
                        "COPC info vlr has {} bytes, ignoring all past the first {}",
                        data.len(),
                        CopcInfoVlr::SIZE
                    );
                }
                Record::CopcInfo(CopcInfoVlr::from_buffer(&data)?)
            }
            Kind::CopcHierarchy => Record::CopcHierarchy(Page::from_buffer(&data)?),
        };
        Ok(record)
    }
}

/// A decoded record payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    /// [LazVlr]
    Laz(LazVlr),
    /// [ExtraBytesVlr]
    ExtraBytes(ExtraBytesVlr),
    /// [WktVlr]
    Wkt(WktVlr),
    /// [CopcInfoVlr]
    CopcInfo(CopcInfoVlr),
    /// [Page]
    CopcHierarchy(Page),
    /// The raw bytes of a record that isn't registered.
    Unknown(Vec<u8>),
}

impl Record {
    /// Decodes the payload of a record with these ids.
    pub fn read_from<R: Read>(
        read: R,
        user_id: &str,
        record_id: u16,
        data_length: u64,
    ) -> Result<Record> {
        if let Some(kind) = Kind::from_ids(user_id, record_id) {
            kind.read_from(read, data_length)
        } else {
            log!(
                Level::Debug,
                "no decoder for user id '{}' and record id {}, keeping raw bytes",
                user_id,
                record_id
            );
            utils::read_bytes(read, data_length).map(Record::Unknown)
        }
    }

    /// Reads a regular header and the payload that follows it.
    pub fn read_with_header<R: Read>(mut read: R) -> Result<(Header, Record)> {
        let header = Header::read_from(&mut read)?;
        let record = Record::read_from(
            read,
            &header.user_id,
            header.record_id,
            header.data_length.into(),
        )?;
        Ok((header, record))
    }

    /// Reads an extended header and the payload that follows it.
    pub fn read_with_extended_header<R: Read>(mut read: R) -> Result<(ExtendedHeader, Record)> {
        let header = ExtendedHeader::read_from(&mut read)?;
        let record = Record::read_from(read, &header.user_id, header.record_id, header.data_length)?;
        Ok((header, record))
    }

    /// Returns the registered kind, or `None` for unknown records.
    pub fn kind(&self) -> Option<Kind> {
        match self {
            Record::Laz(_) => Some(Kind::Laz),
            Record::ExtraBytes(_) => Some(Kind::ExtraBytes),
            Record::Wkt(_) => Some(Kind::Wkt),
            Record::CopcInfo(_) => Some(Kind::CopcInfo),
            Record::CopcHierarchy(_) => Some(Kind::CopcHierarchy),
            Record::Unknown(_) => None,
        }
    }

    /// Returns the payload size, in bytes.
    pub fn size(&self) -> u64 {
        match self {
            Record::Laz(vlr) => vlr.size(),
            Record::ExtraBytes(vlr) => vlr.size(),
            Record::Wkt(vlr) => vlr.size(),
            Record::CopcInfo(vlr) => vlr.size(),
            Record::CopcHierarchy(page) => page.size(),
            Record::Unknown(data) => data.len() as u64,
        }
    }

    /// Writes the payload, without a header.
    pub fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        match self {
            Record::Laz(vlr) => vlr.write_to(write),
            Record::ExtraBytes(vlr) => vlr.write_to(write),
            Record::Wkt(vlr) => vlr.write_to(write),
            Record::CopcInfo(vlr) => vlr.write_to(write),
            Record::CopcHierarchy(page) => page.write_to(write),
            Record::Unknown(data) => {
                write.write_all(data)?;
                Ok(())
            }
        }
    }
}

impl From<LazVlr> for Record {
    fn from(vlr: LazVlr) -> Record {
        Record::Laz(vlr)
    }
}

impl From<ExtraBytesVlr> for Record {
    fn from(vlr: ExtraBytesVlr) -> Record {
        Record::ExtraBytes(vlr)
    }
}

impl From<WktVlr> for Record {
    fn from(vlr: WktVlr) -> Record {
        Record::Wkt(vlr)
    }
}

impl From<CopcInfoVlr> for Record {
    fn from(vlr: CopcInfoVlr) -> Record {
        Record::CopcInfo(vlr)
    }
}

impl From<Page> for Record {
    fn from(page: Page) -> Record {
        Record::CopcHierarchy(page)
    }
}
