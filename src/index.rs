//! A catalog of records that doesn't hold their payloads.
//!
//! Large files can carry many megabytes of evlrs. An [IndexEntry] remembers where each record
//! lives so its payload can be read later, and only if needed.

use crate::{Error, ExtendedHeader, Header, Result};
use std::io::{Read, Seek, SeekFrom};

/// The identity and location of one vlr or evlr.
///
/// Entries have the same shape whichever kind of header they were built from. Two entries compare
/// equal only if they also come from the same kind of header, because the header size decides
/// where the payload starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    user_id: String,
    record_id: u16,
    data_length: u64,
    description: String,
    byte_offset: u64,
    extended: bool,
}

impl IndexEntry {
    /// Creates an entry for a regular record that starts at `byte_offset`.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::{Header, IndexEntry};
    /// let header = Header { data_length: 10, ..Default::default() };
    /// let entry = IndexEntry::new(&header, 375);
    /// assert_eq!(375 + 54, entry.payload_offset());
    /// assert_eq!(375 + 54 + 10, entry.end());
    /// ```
    pub fn new(header: &Header, byte_offset: u64) -> IndexEntry {
        IndexEntry {
            user_id: header.user_id.clone(),
            record_id: header.record_id,
            data_length: header.data_length.into(),
            description: header.description.clone(),
            byte_offset,
            extended: false,
        }
    }

    /// Creates an entry for an extended record that starts at `byte_offset`.
    pub fn new_extended(header: &ExtendedHeader, byte_offset: u64) -> IndexEntry {
        IndexEntry {
            user_id: header.user_id.clone(),
            record_id: header.record_id,
            data_length: header.data_length,
            description: header.description.clone(),
            byte_offset,
            extended: true,
        }
    }

    /// Reads `count` consecutive records starting at the current position, skipping payloads.
    ///
    /// The stream is left just past the last payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::io::Cursor;
    /// use las_vlr::{IndexEntry, Payload, WktVlr};
    ///
    /// let wkt = WktVlr::new("GEOGCS[]");
    /// let mut cursor = Cursor::new(Vec::new());
    /// wkt.header().unwrap().write_to(&mut cursor).unwrap();
    /// wkt.write_to(&mut cursor).unwrap();
    ///
    /// cursor.set_position(0);
    /// let entries = IndexEntry::read_all(&mut cursor, 1, false).unwrap();
    /// assert_eq!(2112, entries[0].record_id());
    /// assert_eq!(8, entries[0].data_length());
    /// ```
    pub fn read_all<R: Read + Seek>(
        mut read: R,
        count: usize,
        extended: bool,
    ) -> Result<Vec<IndexEntry>> {
        let mut entries = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let byte_offset = read.stream_position()?;
            let entry = if extended {
                IndexEntry::new_extended(&ExtendedHeader::read_from(&mut read)?, byte_offset)
            } else {
                IndexEntry::new(&Header::read_from(&mut read)?, byte_offset)
            };
            let end = entry.checked_end().ok_or(Error::RecordOutOfRange {
                byte_offset,
                data_length: entry.data_length,
            })?;
            let _ = read.seek(SeekFrom::Start(end))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Returns the user id of the record.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Returns the record id.
    pub fn record_id(&self) -> u16 {
        self.record_id
    }

    /// Returns the payload length, widened to 64 bits for both kinds of record.
    pub fn data_length(&self) -> u64 {
        self.data_length
    }

    /// Returns the description of the record.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the absolute position of the start of the record's header.
    pub fn byte_offset(&self) -> u64 {
        self.byte_offset
    }

    /// Returns true if this entry was built from an extended header.
    pub fn is_extended(&self) -> bool {
        self.extended
    }

    /// Returns the absolute position of the first payload byte.
    ///
    /// Saturates at `u64::MAX`.
    pub fn payload_offset(&self) -> u64 {
        self.byte_offset.saturating_add(self.header_size())
    }

    /// Returns the absolute position just past the payload.
    ///
    /// Saturates at `u64::MAX`, [IndexEntry::read_all] rejects such records.
    pub fn end(&self) -> u64 {
        self.checked_end().unwrap_or(u64::MAX)
    }

    fn checked_end(&self) -> Option<u64> {
        self.byte_offset
            .checked_add(self.header_size())?
            .checked_add(self.data_length)
    }

    fn header_size(&self) -> u64 {
        if self.extended {
            ExtendedHeader::SIZE as u64
        } else {
            Header::SIZE as u64
        }
    }

    /// Returns true if the entry has this user id and record id.
    pub fn matches(&self, user_id: &str, record_id: u16) -> bool {
        self.user_id == user_id && self.record_id == record_id
    }
}

impl From<(&Header, u64)> for IndexEntry {
    fn from((header, byte_offset): (&Header, u64)) -> IndexEntry {
        IndexEntry::new(header, byte_offset)
    }
}

impl From<(&ExtendedHeader, u64)> for IndexEntry {
    fn from((header, byte_offset): (&ExtendedHeader, u64)) -> IndexEntry {
        IndexEntry::new_extended(header, byte_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header() -> Header {
        Header {
            user_id: "LASF_Spec".to_string(),
            record_id: 4,
            data_length: 192,
            description: "extra bytes".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn same_shape_for_both_headers() {
        let regular = IndexEntry::new(&header(), 100);
        let extended = IndexEntry::new_extended(&header().into(), 100);
        assert_eq!(regular.user_id(), extended.user_id());
        assert_eq!(regular.record_id(), extended.record_id());
        assert_eq!(regular.data_length(), extended.data_length());
        assert_eq!(regular.description(), extended.description());
        assert_eq!(regular.byte_offset(), extended.byte_offset());
        assert!(!regular.is_extended());
        assert!(extended.is_extended());
        assert_eq!(154, regular.payload_offset());
        assert_eq!(160, extended.payload_offset());
        assert_ne!(regular, extended);
        assert_eq!(regular, IndexEntry::from((&header(), 100)));
        assert_eq!(extended, IndexEntry::from((&ExtendedHeader::from(header()), 100)));
    }

    #[test]
    fn read_all_skips_payloads() {
        let mut cursor = Cursor::new(vec![0xFFu8; 10]);
        cursor.set_position(10);
        let first = header();
        first.write_to(&mut cursor).unwrap();
        std::io::Write::write_all(&mut cursor, &[0; 192]).unwrap();
        let second = Header {
            record_id: 2112,
            data_length: 3,
            ..Default::default()
        };
        second.write_to(&mut cursor).unwrap();
        std::io::Write::write_all(&mut cursor, b"abc").unwrap();

        cursor.set_position(10);
        let entries = IndexEntry::read_all(&mut cursor, 2, false).unwrap();
        assert_eq!(vec![IndexEntry::new(&first, 10), IndexEntry::new(&second, 256)], entries);
        assert_eq!(cursor.get_ref().len() as u64, cursor.position());
        assert!(entries[0].matches("LASF_Spec", 4));
        assert!(!entries[1].matches("LASF_Spec", 4));
    }

    #[test]
    fn read_all_payload_past_u64_max() {
        let header = ExtendedHeader {
            data_length: u64::MAX,
            ..Default::default()
        };
        let mut cursor = Cursor::new(header.to_bytes().unwrap());
        assert!(matches!(
            IndexEntry::read_all(&mut cursor, 1, true),
            Err(Error::RecordOutOfRange {
                byte_offset: 0,
                data_length: u64::MAX
            })
        ));
        let entry = IndexEntry::new_extended(&header, 10);
        assert_eq!(70, entry.payload_offset());
        assert_eq!(u64::MAX, entry.end());
    }

    #[test]
    fn read_all_truncated_header() {
        let mut cursor = Cursor::new(vec![0u8; 20]);
        assert!(IndexEntry::read_all(&mut cursor, 1, true).is_err());
    }
}
