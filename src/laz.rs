//! The laszip vlr, which describes how the point records of a laz file are compressed.
//!
//! The vlr is a fixed 32-byte prefix followed by one six-byte [LazItem] per compressed field
//! group. The number of items is never stored, it follows from the record's data length.
//!
//! ```
//! use las_vlr::{LazVlr, Payload};
//!
//! let vlr = LazVlr::new(3, 0, las_vlr::laz::DEFAULT_CHUNK_SIZE).unwrap();
//! assert_eq!(3, vlr.items().len());
//! assert_eq!(32 + 3 * 6, vlr.size());
//! assert_eq!(34, vlr.item_record_length());
//! ```

use crate::{Error, Payload, Result, utils};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// The size of the fixed part of the laszip vlr.
pub const PREFIX_SIZE: usize = 32;

/// The size of one item record.
pub const ITEM_SIZE: usize = 6;

/// The number of points per chunk used unless told otherwise.
pub const DEFAULT_CHUNK_SIZE: u32 = 50_000;

/// The chunk size that signals that every chunk has its own point count.
pub const VARIABLE_CHUNK_SIZE: u32 = u32::MAX;

/// The compression schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Compressor {
    /// No compression.
    None = 0,
    /// Points are compressed one at a time.
    PointWise = 1,
    /// Points are compressed one at a time, in independent chunks.
    PointWiseChunked = 2,
    /// Fields are compressed in layers, in independent chunks (point formats 6 and up).
    LayeredChunked = 3,
}

impl Compressor {
    /// Returns the compressor for this code, if it's one we know.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::laz::Compressor;
    /// assert_eq!(Some(Compressor::LayeredChunked), Compressor::from_u16(3));
    /// assert_eq!(None, Compressor::from_u16(4));
    /// ```
    pub fn from_u16(n: u16) -> Option<Compressor> {
        match n {
            0 => Some(Compressor::None),
            1 => Some(Compressor::PointWise),
            2 => Some(Compressor::PointWiseChunked),
            3 => Some(Compressor::LayeredChunked),
            _ => None,
        }
    }
}

/// The entropy coders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Coder {
    /// The arithmetic coder, the only one there is.
    Arithmetic = 0,
}

impl Coder {
    /// Returns the coder for this code, if it's one we know.
    pub fn from_u16(n: u16) -> Option<Coder> {
        match n {
            0 => Some(Coder::Arithmetic),
            _ => None,
        }
    }
}

/// The kinds of field groups that can be compressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[allow(missing_docs)]
pub enum LazItemType {
    Byte = 0,
    Short = 1,
    Int = 2,
    Long = 3,
    Float = 4,
    Double = 5,
    Point10 = 6,
    GpsTime11 = 7,
    Rgb12 = 8,
    Wavepacket13 = 9,
    Point14 = 10,
    Rgb14 = 11,
    RgbNir14 = 12,
    Wavepacket14 = 13,
    Byte14 = 14,
}

impl LazItemType {
    /// Returns the item type for this code, if it's one we know.
    pub fn from_u16(n: u16) -> Option<LazItemType> {
        use LazItemType::*;
        Some(match n {
            0 => Byte,
            1 => Short,
            2 => Int,
            3 => Long,
            4 => Float,
            5 => Double,
            6 => Point10,
            7 => GpsTime11,
            8 => Rgb12,
            9 => Wavepacket13,
            10 => Point14,
            11 => Rgb14,
            12 => RgbNir14,
            13 => Wavepacket14,
            14 => Byte14,
            _ => return None,
        })
    }
}

/// One compressed field group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LazItem {
    /// The item type code, see [LazItemType].
    pub item_type: u16,
    /// The number of uncompressed bytes in one point.
    pub size: u16,
    /// The version of the compressor for this item.
    pub version: u16,
}

impl LazItem {
    const fn new(item_type: LazItemType, size: u16, version: u16) -> LazItem {
        LazItem {
            item_type: item_type as u16,
            size,
            version,
        }
    }

    /// Returns the typed item type, or `None` for an unknown code.
    pub fn kind(&self) -> Option<LazItemType> {
        LazItemType::from_u16(self.item_type)
    }

    fn read_from<R: Read>(read: &mut R) -> Result<LazItem> {
        Ok(LazItem {
            item_type: read.read_u16::<LittleEndian>()?,
            size: read.read_u16::<LittleEndian>()?,
            version: read.read_u16::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        write.write_u16::<LittleEndian>(self.item_type)?;
        write.write_u16::<LittleEndian>(self.size)?;
        write.write_u16::<LittleEndian>(self.version)?;
        Ok(())
    }
}

const POINT10: LazItem = LazItem::new(LazItemType::Point10, 20, 2);
const GPS_TIME11: LazItem = LazItem::new(LazItemType::GpsTime11, 8, 2);
const RGB12: LazItem = LazItem::new(LazItemType::Rgb12, 6, 2);
const WAVEPACKET13: LazItem = LazItem::new(LazItemType::Wavepacket13, 29, 1);
const POINT14: LazItem = LazItem::new(LazItemType::Point14, 30, 3);
const RGB14: LazItem = LazItem::new(LazItemType::Rgb14, 6, 3);
const RGBNIR14: LazItem = LazItem::new(LazItemType::RgbNir14, 8, 3);
const WAVEPACKET14: LazItem = LazItem::new(LazItemType::Wavepacket14, 29, 3);

// Indexed by point format id.
const FORMAT_ITEMS: [&[LazItem]; 11] = [
    &[POINT10],
    &[POINT10, GPS_TIME11],
    &[POINT10, RGB12],
    &[POINT10, GPS_TIME11, RGB12],
    &[POINT10, GPS_TIME11, WAVEPACKET13],
    &[POINT10, GPS_TIME11, RGB12, WAVEPACKET13],
    &[POINT14],
    &[POINT14, RGB14],
    &[POINT14, RGBNIR14],
    &[POINT14, WAVEPACKET14],
    &[POINT14, RGBNIR14, WAVEPACKET14],
];

/// The laszip vlr.
///
/// The two legacy fields are kept as raw bytes. Writers have historically filled them with all
/// sorts of things, so they're carried through untouched and never used for counting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LazVlr {
    /// The compression scheme, see [Compressor].
    pub compressor: u16,
    /// The entropy coder, see [Coder].
    pub coder: u16,
    /// The major version of the compressor.
    pub version_major: u8,
    /// The minor version of the compressor.
    pub version_minor: u8,
    /// The revision of the compressor.
    pub revision: u16,
    /// Option bits, unused by all known compressors.
    pub options: u32,
    /// The number of points in each chunk, or [VARIABLE_CHUNK_SIZE].
    pub chunk_size: u32,
    /// Historically the number of points, but don't believe it.
    pub legacy_num_points: [u8; 8],
    /// Historically the number of compressed bytes, but don't believe it.
    pub legacy_num_bytes: [u8; 8],
    /// The compressed field groups, in the order they appear in a point.
    pub items: Vec<LazItem>,
}

impl LazVlr {
    /// Creates the laszip vlr for a point format.
    ///
    /// Point formats 0 through 5 use the point-wise chunked compressor, formats 6 through 10 use
    /// the layered chunked compressor. A byte item is added when there are extra bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::{LazVlr, laz::LazItemType};
    ///
    /// let vlr = LazVlr::new(7, 4, 50_000).unwrap();
    /// let kinds: Vec<_> = vlr.items().iter().map(|item| item.kind().unwrap()).collect();
    /// assert_eq!(vec![LazItemType::Point14, LazItemType::Rgb14, LazItemType::Byte14], kinds);
    /// assert!(LazVlr::new(11, 0, 50_000).is_err());
    /// ```
    pub fn new(format: u8, extra_bytes: u16, chunk_size: u32) -> Result<LazVlr> {
        let base = FORMAT_ITEMS
            .get(usize::from(format))
            .ok_or(Error::UnsupportedPointFormat(format))?;
        let is_extended = format >= 6;
        let mut items = base.to_vec();
        if extra_bytes > 0 {
            items.push(if is_extended {
                LazItem::new(LazItemType::Byte14, extra_bytes, 3)
            } else {
                LazItem::new(LazItemType::Byte, extra_bytes, 2)
            });
        }
        let compressor = if is_extended {
            Compressor::LayeredChunked
        } else {
            Compressor::PointWiseChunked
        };
        Ok(LazVlr {
            compressor: compressor as u16,
            chunk_size,
            items,
            ..Default::default()
        })
    }

    /// Reads a laszip vlr payload of `data_length` bytes.
    ///
    /// All `data_length` bytes are consumed, even if they turn out to be malformed.
    pub fn read_from<R: Read>(read: R, data_length: u64) -> Result<LazVlr> {
        let data = utils::read_bytes(read, data_length)?;
        LazVlr::from_buffer(&data)
    }

    /// Decodes a laszip vlr from a complete payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::{Error, LazVlr, Payload};
    ///
    /// let bytes = LazVlr::new(0, 0, 50_000).unwrap().to_bytes().unwrap();
    /// assert!(LazVlr::from_buffer(&bytes).is_ok());
    /// assert!(matches!(
    ///     LazVlr::from_buffer(&bytes[..bytes.len() - 1]),
    ///     Err(Error::MisalignedPayload { .. })
    /// ));
    /// ```
    pub fn from_buffer(buf: &[u8]) -> Result<LazVlr> {
        utils::check_len(buf, PREFIX_SIZE)?;
        let item_bytes = (buf.len() - PREFIX_SIZE) as u64;
        if item_bytes % ITEM_SIZE as u64 != 0 {
            return Err(Error::MisalignedPayload {
                len: buf.len() as u64,
                entry_size: ITEM_SIZE as u64,
            });
        }
        let mut src = buf;
        let compressor = src.read_u16::<LittleEndian>()?;
        let coder = src.read_u16::<LittleEndian>()?;
        let version_major = src.read_u8()?;
        let version_minor = src.read_u8()?;
        let revision = src.read_u16::<LittleEndian>()?;
        let options = src.read_u32::<LittleEndian>()?;
        let chunk_size = src.read_u32::<LittleEndian>()?;
        let mut legacy_num_points = [0; 8];
        src.read_exact(&mut legacy_num_points)?;
        let mut legacy_num_bytes = [0; 8];
        src.read_exact(&mut legacy_num_bytes)?;
        let items = (0..item_bytes / ITEM_SIZE as u64)
            .map(|_| LazItem::read_from(&mut src))
            .collect::<Result<Vec<_>>>()?;
        Ok(LazVlr {
            compressor,
            coder,
            version_major,
            version_minor,
            revision,
            options,
            chunk_size,
            legacy_num_points,
            legacy_num_bytes,
            items,
        })
    }

    /// Returns true if the compressor and coder are known and the item table is usable.
    ///
    /// A vlr that isn't valid can still be copied through untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::LazVlr;
    /// let mut vlr = LazVlr::new(1, 0, 50_000).unwrap();
    /// assert!(vlr.valid());
    /// vlr.coder = 1;
    /// assert!(!vlr.valid());
    /// ```
    pub fn valid(&self) -> bool {
        let Some(compressor) = Compressor::from_u16(self.compressor) else {
            return false;
        };
        Coder::from_u16(self.coder).is_some()
            && (compressor == Compressor::None || !self.items.is_empty())
            && self.items.iter().all(|item| item.kind().is_some())
    }

    /// Returns the typed compressor, or `None` for an unknown code.
    pub fn compressor_kind(&self) -> Option<Compressor> {
        Compressor::from_u16(self.compressor)
    }

    /// Returns the compressed field groups.
    pub fn items(&self) -> &[LazItem] {
        &self.items
    }

    /// Returns the number of uncompressed bytes per point described by the items.
    pub fn item_record_length(&self) -> u32 {
        self.items.iter().map(|item| u32::from(item.size)).sum()
    }

    /// Returns true if every chunk carries its own point count.
    pub fn uses_variable_size_chunks(&self) -> bool {
        self.chunk_size == VARIABLE_CHUNK_SIZE
    }
}

impl Default for LazVlr {
    fn default() -> LazVlr {
        LazVlr {
            compressor: Compressor::PointWiseChunked as u16,
            coder: Coder::Arithmetic as u16,
            version_major: 3,
            version_minor: 4,
            revision: 3,
            options: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            legacy_num_points: [0xFF; 8],
            legacy_num_bytes: [0xFF; 8],
            items: Vec::new(),
        }
    }
}

impl Payload for LazVlr {
    const USER_ID: &'static str = "laszip encoded";
    const RECORD_ID: u16 = 22204;
    const DESCRIPTION: &'static str = "http://laszip.org";

    fn size(&self) -> u64 {
        (PREFIX_SIZE + ITEM_SIZE * self.items.len()) as u64
    }

    fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        write.write_u16::<LittleEndian>(self.compressor)?;
        write.write_u16::<LittleEndian>(self.coder)?;
        write.write_u8(self.version_major)?;
        write.write_u8(self.version_minor)?;
        write.write_u16::<LittleEndian>(self.revision)?;
        write.write_u32::<LittleEndian>(self.options)?;
        write.write_u32::<LittleEndian>(self.chunk_size)?;
        write.write_all(&self.legacy_num_points)?;
        write.write_all(&self.legacy_num_bytes)?;
        self.items
            .iter()
            .try_for_each(|item| item.write_to(&mut write))
    }
}
