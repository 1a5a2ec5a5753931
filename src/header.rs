//! Record headers, the fixed-size preamble in front of every vlr and evlr payload.
//!
//! A regular [Header] describes at most 65,535 payload bytes. An [ExtendedHeader] has a 64-bit
//! length and is used for the records stored after the point data, e.g. large coordinate system
//! definitions and COPC hierarchy pages.
//!
//! ```
//! use las_vlr::Header;
//!
//! let header = Header {
//!     user_id: "LASF_Projection".to_string(),
//!     record_id: 2112,
//!     data_length: 4,
//!     ..Default::default()
//! };
//! let bytes = header.to_bytes().unwrap();
//! assert_eq!(Header::SIZE, bytes.len());
//! assert_eq!(header, Header::from_bytes(&bytes).unwrap());
//! ```

use crate::{
    Error, Result,
    utils::{self, AsLasStr},
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

const USER_ID_LEN: usize = 16;
const DESCRIPTION_LEN: usize = 32;

/// The header of a regular variable length record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    /// Must be zero according to the las specification, but whatever is read is written back.
    pub reserved: u16,

    /// The user that created this record, at most 16 bytes.
    ///
    /// This value is often an official, "registered" user id, such as "LASF_Spec" or
    /// "LASF_Projection".
    pub user_id: String,

    /// This value specifies the type of record, and depends on the user id.
    pub record_id: u16,

    /// The number of payload bytes following the header.
    pub data_length: u16,

    /// Textual description of the payload, at most 32 bytes.
    pub description: String,
}

/// The header of an extended variable length record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtendedHeader {
    /// Must be zero according to the las specification, but whatever is read is written back.
    pub reserved: u16,

    /// The user that created this record, at most 16 bytes.
    pub user_id: String,

    /// This value specifies the type of record, and depends on the user id.
    pub record_id: u16,

    /// The number of payload bytes following the header.
    pub data_length: u64,

    /// Textual description of the payload, at most 32 bytes.
    pub description: String,
}

impl Header {
    /// The size of an encoded header, in bytes.
    pub const SIZE: usize = 54;

    /// Reads a header from a `Read`.
    ///
    /// Only the header is read, the payload is left in the stream.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::{Error, Header};
    /// assert!(matches!(
    ///     Header::read_from(&[0u8; 12][..]),
    ///     Err(Error::TruncatedInput { expected: 54, available: 12 })
    /// ));
    /// ```
    pub fn read_from<R: Read>(read: R) -> Result<Header> {
        let mut buf = [0; Header::SIZE];
        utils::read_fully(read, &mut buf)?;
        Header::from_bytes(&buf)
    }

    /// Decodes a header from the start of a buffer.
    ///
    /// Bytes past [Header::SIZE] are ignored.
    pub fn from_bytes(buf: &[u8]) -> Result<Header> {
        utils::check_len(buf, Header::SIZE)?;
        let mut src = buf;
        let reserved = src.read_u16::<LittleEndian>()?;
        let user_id = read_las_string(&mut src, USER_ID_LEN)?;
        let record_id = src.read_u16::<LittleEndian>()?;
        let data_length = src.read_u16::<LittleEndian>()?;
        let description = read_las_string(&mut src, DESCRIPTION_LEN)?;
        Ok(Header {
            reserved,
            user_id,
            record_id,
            data_length,
            description,
        })
    }

    /// Writes this header.
    ///
    /// Nothing is written if the user id or the description are too long for their fields.
    pub fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        let bytes = self.to_bytes()?;
        write.write_all(&bytes)?;
        Ok(())
    }

    /// Encodes this header into a new buffer of [Header::SIZE] bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let user_id: [u8; USER_ID_LEN] = utils::las_str_field(&self.user_id)?;
        let description: [u8; DESCRIPTION_LEN] = utils::las_str_field(&self.description)?;
        let mut buf = Vec::with_capacity(Header::SIZE);
        buf.write_u16::<LittleEndian>(self.reserved)?;
        buf.write_all(&user_id)?;
        buf.write_u16::<LittleEndian>(self.record_id)?;
        buf.write_u16::<LittleEndian>(self.data_length)?;
        buf.write_all(&description)?;
        Ok(buf)
    }

    /// Returns the total length of the record, header and payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::Header;
    /// let header = Header { data_length: 1, ..Default::default() };
    /// assert_eq!(55, header.len());
    /// ```
    pub fn len(&self) -> u64 {
        Header::SIZE as u64 + u64::from(self.data_length)
    }

    /// Returns true if the record has no payload.
    pub fn is_empty(&self) -> bool {
        self.data_length == 0
    }
}

impl ExtendedHeader {
    /// The size of an encoded extended header, in bytes.
    pub const SIZE: usize = 60;

    /// Reads an extended header from a `Read`.
    ///
    /// Only the header is read, the payload is left in the stream.
    pub fn read_from<R: Read>(read: R) -> Result<ExtendedHeader> {
        let mut buf = [0; ExtendedHeader::SIZE];
        utils::read_fully(read, &mut buf)?;
        ExtendedHeader::from_bytes(&buf)
    }

    /// Decodes an extended header from the start of a buffer.
    pub fn from_bytes(buf: &[u8]) -> Result<ExtendedHeader> {
        utils::check_len(buf, ExtendedHeader::SIZE)?;
        let mut src = buf;
        let reserved = src.read_u16::<LittleEndian>()?;
        let user_id = read_las_string(&mut src, USER_ID_LEN)?;
        let record_id = src.read_u16::<LittleEndian>()?;
        let data_length = src.read_u64::<LittleEndian>()?;
        let description = read_las_string(&mut src, DESCRIPTION_LEN)?;
        Ok(ExtendedHeader {
            reserved,
            user_id,
            record_id,
            data_length,
            description,
        })
    }

    /// Writes this extended header.
    pub fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        let bytes = self.to_bytes()?;
        write.write_all(&bytes)?;
        Ok(())
    }

    /// Encodes this extended header into a new buffer of [ExtendedHeader::SIZE] bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let user_id: [u8; USER_ID_LEN] = utils::las_str_field(&self.user_id)?;
        let description: [u8; DESCRIPTION_LEN] = utils::las_str_field(&self.description)?;
        let mut buf = Vec::with_capacity(ExtendedHeader::SIZE);
        buf.write_u16::<LittleEndian>(self.reserved)?;
        buf.write_all(&user_id)?;
        buf.write_u16::<LittleEndian>(self.record_id)?;
        buf.write_u64::<LittleEndian>(self.data_length)?;
        buf.write_all(&description)?;
        Ok(buf)
    }

    /// Returns the total length of the record, header and payload.
    pub fn len(&self) -> u64 {
        ExtendedHeader::SIZE as u64 + self.data_length
    }

    /// Returns true if the record has no payload.
    pub fn is_empty(&self) -> bool {
        self.data_length == 0
    }
}

impl From<Header> for ExtendedHeader {
    fn from(header: Header) -> ExtendedHeader {
        ExtendedHeader {
            reserved: header.reserved,
            user_id: header.user_id,
            record_id: header.record_id,
            data_length: header.data_length.into(),
            description: header.description,
        }
    }
}

impl TryFrom<ExtendedHeader> for Header {
    type Error = Error;

    fn try_from(header: ExtendedHeader) -> Result<Header> {
        let data_length =
            u16::try_from(header.data_length).map_err(|_| Error::DataTooLong(header.data_length))?;
        Ok(Header {
            reserved: header.reserved,
            user_id: header.user_id,
            record_id: header.record_id,
            data_length,
            description: header.description,
        })
    }
}

fn read_las_string(src: &mut &[u8], len: usize) -> Result<String> {
    let (field, rest) = src.split_at(len);
    *src = rest;
    Ok(field.as_las_str()?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection() -> Header {
        Header {
            reserved: 0xAABB,
            user_id: "LASF_Projection".to_string(),
            record_id: 2112,
            data_length: 42,
            description: "OGC WKT".to_string(),
        }
    }

    #[test]
    fn layout() {
        let bytes = projection().to_bytes().unwrap();
        assert_eq!(54, bytes.len());
        assert_eq!([0xBBu8, 0xAA], bytes[0..2]);
        assert_eq!(b"LASF_Projection\0", &bytes[2..18]);
        assert_eq!(2112u16.to_le_bytes(), bytes[18..20]);
        assert_eq!(42u16.to_le_bytes(), bytes[20..22]);
        assert_eq!(b"OGC WKT", &bytes[22..29]);
        assert!(bytes[29..54].iter().all(|&b| b == 0));
    }

    #[test]
    fn roundtrip() {
        let header = projection();
        let mut cursor = Vec::new();
        header.write_to(&mut cursor).unwrap();
        assert_eq!(header, Header::read_from(cursor.as_slice()).unwrap());
    }

    #[test]
    fn extended_roundtrip() {
        let header = ExtendedHeader {
            user_id: "copc".to_string(),
            record_id: 1000,
            data_length: u64::from(u32::MAX) + 1,
            ..Default::default()
        };
        let bytes = header.to_bytes().unwrap();
        assert_eq!(60, bytes.len());
        assert_eq!((u64::from(u32::MAX) + 1).to_le_bytes(), bytes[20..28]);
        assert_eq!(header, ExtendedHeader::from_bytes(&bytes).unwrap());
    }

    #[test]
    fn full_width_strings() {
        let header = Header {
            user_id: "0123456789abcdef".to_string(),
            description: "0123456789abcdef0123456789abcdef".to_string(),
            ..Default::default()
        };
        let bytes = header.to_bytes().unwrap();
        assert_eq!(header, Header::from_bytes(&bytes).unwrap());
    }

    #[test]
    fn user_id_too_long() {
        let header = Header {
            user_id: "0123456789abcdefg".to_string(),
            ..Default::default()
        };
        assert!(header.to_bytes().is_err());
        let mut cursor = Vec::new();
        assert!(header.write_to(&mut cursor).is_err());
        assert!(cursor.is_empty());
    }

    #[test]
    fn truncated() {
        let bytes = projection().to_bytes().unwrap();
        assert!(matches!(
            Header::from_bytes(&bytes[..53]),
            Err(Error::TruncatedInput {
                expected: 54,
                available: 53
            })
        ));
        assert!(matches!(
            ExtendedHeader::read_from(bytes.as_slice()),
            Err(Error::TruncatedInput {
                expected: 60,
                available: 54
            })
        ));
    }

    #[test]
    fn narrow_extended() {
        let extended = ExtendedHeader::from(projection());
        assert_eq!(42, extended.data_length);
        assert_eq!(projection(), Header::try_from(extended).unwrap());

        let too_long = ExtendedHeader {
            data_length: u64::from(u16::MAX) + 1,
            ..Default::default()
        };
        assert!(matches!(
            Header::try_from(too_long),
            Err(Error::DataTooLong(65536))
        ));
    }
}
