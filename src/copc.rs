//! [COPC](https://copc.io/) info vlr and hierarchy pages.

use crate::{Error, Payload, Result, utils};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// The user id of the COPC records.
pub const USER_ID: &str = "copc";

/// The COPC info vlr
///
/// The info VLR MUST exist.
/// The info VLR MUST be the first VLR in the file (must begin at offset 375
/// from the beginning of the file).
/// The info VLR is 160 bytes described by the following structure. reserved
/// elements MUST be set to 0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CopcInfoVlr {
    /// Actual (unscaled) X coordinate of center of octree
    pub center_x: f64,
    /// Actual (unscaled) Y coordinate of center of octree
    pub center_y: f64,
    /// Actual (unscaled) Z coordinate of center of octree
    pub center_z: f64,
    /// Perpendicular distance from the center to any side of the root node.
    pub halfsize: f64,
    /// Space between points at the root node.
    /// This value is halved at each octree level
    pub spacing: f64,
    /// File offset to the first hierarchy page
    pub root_hier_offset: u64,
    /// Size of the first hierarchy page in bytes
    pub root_hier_size: u64,
    /// Minimum of GPSTime
    pub gpstime_minimum: f64,
    /// Maximum of GPSTime
    pub gpstime_maximum: f64,
    /// Must be 0, but whatever is read is written back.
    pub reserved: [u64; 11],
}

impl CopcInfoVlr {
    /// The size of the payload.
    pub const SIZE: usize = 160;

    /// Reads the 160-byte payload.
    ///
    /// This **only** reads the *payload data*, the vlr header should already be read.
    pub fn read_from<R: Read>(read: R) -> Result<CopcInfoVlr> {
        let mut buf = [0; CopcInfoVlr::SIZE];
        utils::read_fully(read, &mut buf)?;
        CopcInfoVlr::from_buffer(&buf)
    }

    /// Decodes the payload from the start of a buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::{CopcInfoVlr, Error};
    /// assert!(CopcInfoVlr::from_buffer(&[0; 160]).is_ok());
    /// assert!(matches!(
    ///     CopcInfoVlr::from_buffer(&[0; 159]),
    ///     Err(Error::TruncatedInput { expected: 160, available: 159 })
    /// ));
    /// ```
    pub fn from_buffer(buf: &[u8]) -> Result<CopcInfoVlr> {
        utils::check_len(buf, CopcInfoVlr::SIZE)?;
        let mut src = buf;
        Ok(CopcInfoVlr {
            center_x: src.read_f64::<LittleEndian>()?,
            center_y: src.read_f64::<LittleEndian>()?,
            center_z: src.read_f64::<LittleEndian>()?,
            halfsize: src.read_f64::<LittleEndian>()?,
            spacing: src.read_f64::<LittleEndian>()?,
            root_hier_offset: src.read_u64::<LittleEndian>()?,
            root_hier_size: src.read_u64::<LittleEndian>()?,
            gpstime_minimum: src.read_f64::<LittleEndian>()?,
            gpstime_maximum: src.read_f64::<LittleEndian>()?,
            reserved: {
                let mut reserved = [0; 11];
                for field in reserved.iter_mut() {
                    *field = src.read_u64::<LittleEndian>()?;
                }
                reserved
            },
        })
    }
}

impl Payload for CopcInfoVlr {
    const USER_ID: &'static str = USER_ID;
    const RECORD_ID: u16 = 1;
    const DESCRIPTION: &'static str = "COPC info VLR";

    fn size(&self) -> u64 {
        CopcInfoVlr::SIZE as u64
    }

    fn write_to<W: Write>(&self, mut dst: W) -> Result<()> {
        dst.write_f64::<LittleEndian>(self.center_x)?;
        dst.write_f64::<LittleEndian>(self.center_y)?;
        dst.write_f64::<LittleEndian>(self.center_z)?;
        dst.write_f64::<LittleEndian>(self.halfsize)?;
        dst.write_f64::<LittleEndian>(self.spacing)?;
        dst.write_u64::<LittleEndian>(self.root_hier_offset)?;
        dst.write_u64::<LittleEndian>(self.root_hier_size)?;
        dst.write_f64::<LittleEndian>(self.gpstime_minimum)?;
        dst.write_f64::<LittleEndian>(self.gpstime_maximum)?;
        self.reserved
            .into_iter()
            .try_for_each(|i| dst.write_u64::<LittleEndian>(i))?;
        Ok(())
    }
}

/// VoxelKey corresponds to the naming of EPT data files.
/// <https://entwine.io/en/latest/entwine-point-tile.html#ept-data>
/// The point cloud data itself is arranged in a 3D analogous manner to slippy map tiling schemes.
/// The scheme is Level-X-Y-Z.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone, Copy)]
pub struct VoxelKey {
    /// The octree level, a value < 0 indicates an invalid VoxelKey
    pub level: i32,
    #[allow(missing_docs)]
    pub x: i32,
    #[allow(missing_docs)]
    pub y: i32,
    #[allow(missing_docs)]
    pub z: i32,
}

impl VoxelKey {
    /// The root node of the octree.
    pub const ROOT: VoxelKey = VoxelKey {
        level: 0,
        x: 0,
        y: 0,
        z: 0,
    };

    /// A key that points at nothing.
    pub const INVALID: VoxelKey = VoxelKey {
        level: -1,
        x: -1,
        y: -1,
        z: -1,
    };

    /// Returns true unless the level is negative.
    pub fn is_valid(&self) -> bool {
        self.level >= 0
    }

    /// Computes one of the eight children of this key.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::copc::VoxelKey;
    /// let child = VoxelKey::ROOT.child(5).unwrap();
    /// assert_eq!(VoxelKey { level: 1, x: 1, y: 0, z: 1 }, child);
    /// assert!(VoxelKey::ROOT.child(8).is_err());
    /// ```
    pub fn child(&self, direction: i32) -> Result<VoxelKey> {
        if !(0..8).contains(&direction) {
            return Err(Error::InvalidDirection(direction));
        }
        // bit permutations:
        // 0 -> l+1,2x  ,2y  ,2z
        // 1 -> l+1,2x+1,2y  ,2z
        // 2 -> l+1,2x  ,2y+1,2z
        // 3 -> l+1,2x+1,2y+1,2z
        // ...
        // 7 -> l+1,2x+1,2y+1,2z+1
        Ok(VoxelKey {
            level: self.level.saturating_add(1),
            x: (self.x << 1) | (direction & 0x1),
            y: (self.y << 1) | ((direction >> 1) & 0x1),
            z: (self.z << 1) | ((direction >> 2) & 0x1),
        })
    }

    /// Computes the parent key, the root is its own parent.
    pub fn parent(&self) -> VoxelKey {
        VoxelKey {
            level: self.level.saturating_sub(1).max(0),
            x: self.x >> 1,
            y: self.y >> 1,
            z: self.z >> 1,
        }
    }

    fn read_from<R: Read>(read: &mut R) -> Result<VoxelKey> {
        Ok(VoxelKey {
            level: read.read_i32::<LittleEndian>()?,
            x: read.read_i32::<LittleEndian>()?,
            y: read.read_i32::<LittleEndian>()?,
            z: read.read_i32::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, dst: &mut W) -> Result<()> {
        dst.write_i32::<LittleEndian>(self.level)?;
        dst.write_i32::<LittleEndian>(self.x)?;
        dst.write_i32::<LittleEndian>(self.y)?;
        dst.write_i32::<LittleEndian>(self.z)?;
        Ok(())
    }
}

/// What a hierarchy entry points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A chunk of point data.
    Chunk,
    /// Nothing, but children may exist.
    Empty,
    /// Another hierarchy page.
    Page,
    /// The fields contradict each other.
    Invalid,
}

/// An entry corresponds to a single key/value pair in an EPT hierarchy, but
/// contains additional information to allow direct access and decoding of the
/// corresponding point data.
/// One Entry has 32 bytes
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    /// EPT key of the data to which this entry corresponds
    pub key: VoxelKey,
    /// Absolute offset to the data chunk if the pointCount > 0.
    /// Absolute offset to a child hierarchy page if the pointCount is -1.
    /// 0 if the pointCount is 0.
    pub offset: u64,
    /// Size of the data chunk in bytes (compressed size) if the pointCount > 0.
    /// Size of the hierarchy page if the pointCount is -1.
    /// 0 if the pointCount is 0.
    pub byte_size: i32,
    /// If > 0, represents the number of points in the data chunk.
    /// If -1, indicates the information for this octree node is found in another hierarchy page.
    /// If 0, no point data exists for this key, though may exist for child entries.
    pub point_count: i32,
}

impl Entry {
    /// The size of an entry.
    pub const SIZE: usize = 32;

    /// Creates an entry that locates a chunk of `point_count` points.
    pub fn chunk(key: VoxelKey, offset: u64, byte_size: i32, point_count: i32) -> Entry {
        Entry {
            key,
            offset,
            byte_size,
            point_count,
        }
    }

    /// Creates an entry for a node without points.
    pub fn empty(key: VoxelKey) -> Entry {
        Entry {
            key,
            ..Default::default()
        }
    }

    /// Creates an entry that locates the hierarchy page holding this node's subtree.
    pub fn page(key: VoxelKey, offset: u64, byte_size: i32) -> Entry {
        Entry {
            key,
            offset,
            byte_size,
            point_count: -1,
        }
    }

    /// Classifies this entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::copc::{Entry, EntryKind, VoxelKey};
    ///
    /// assert_eq!(EntryKind::Page, Entry::page(VoxelKey::ROOT, 4336, 32).kind());
    /// assert_eq!(EntryKind::Empty, Entry::empty(VoxelKey::ROOT).kind());
    /// assert_eq!(EntryKind::Invalid, Entry::page(VoxelKey::ROOT, 0, 0).kind());
    /// ```
    pub fn kind(&self) -> EntryKind {
        if !self.key.is_valid() {
            return EntryKind::Invalid;
        }
        match self.point_count {
            n if n > 0 && self.byte_size > 0 => EntryKind::Chunk,
            0 if self.offset == 0 && self.byte_size == 0 => EntryKind::Empty,
            -1 if self.offset != 0 && self.byte_size > 0 => EntryKind::Page,
            _ => EntryKind::Invalid,
        }
    }

    /// Returns true if this entry points at another hierarchy page.
    pub fn is_referencing_page(&self) -> bool {
        self.point_count == -1
    }

    fn read_from<R: Read>(read: &mut R) -> Result<Entry> {
        Ok(Entry {
            key: VoxelKey::read_from(read)?,
            offset: read.read_u64::<LittleEndian>()?,
            byte_size: read.read_i32::<LittleEndian>()?,
            point_count: read.read_i32::<LittleEndian>()?,
        })
    }

    fn write_to<W: Write>(&self, dst: &mut W) -> Result<()> {
        self.key.write_to(dst)?;
        dst.write_u64::<LittleEndian>(self.offset)?;
        dst.write_i32::<LittleEndian>(self.byte_size)?;
        dst.write_i32::<LittleEndian>(self.point_count)?;
        Ok(())
    }
}

/// A hierarchy page, a consecutive run of entries.
///
/// The number of entries in a page can be determined by taking the size of the page (contained in
/// the parent page as [Entry::byte_size] or in the info vlr as [CopcInfoVlr::root_hier_size]) and
/// dividing by the size of an entry (32 bytes).
///
/// The page doesn't interpret its entries, that's left to whatever walks the hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Page {
    entries: Vec<Entry>,
}

impl Page {
    /// Creates a page from its entries.
    pub fn new(entries: Vec<Entry>) -> Page {
        Page { entries }
    }

    /// Reads a page of `byte_size` bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::copc::Page;
    /// let page = Page::read_from(&[0u8; 64][..], 64).unwrap();
    /// assert_eq!(2, page.entries().len());
    /// assert!(Page::read_from(&[0u8; 64][..], 48).is_err());
    /// ```
    pub fn read_from<R: Read>(read: R, byte_size: u64) -> Result<Page> {
        let _ = utils::check_alignment(byte_size, Entry::SIZE as u64)?;
        let data = utils::read_bytes(read, byte_size)?;
        Page::from_buffer(&data)
    }

    /// Decodes a page from a complete payload.
    pub fn from_buffer(buf: &[u8]) -> Result<Page> {
        let count = utils::check_alignment(buf.len() as u64, Entry::SIZE as u64)?;
        let mut src = buf;
        Ok(Page {
            entries: (0..count)
                .map(|_| Entry::read_from(&mut src))
                .collect::<Result<Vec<Entry>>>()?,
        })
    }

    /// Returns the entries.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Consumes the page, returning its entries.
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

impl Payload for Page {
    const USER_ID: &'static str = USER_ID;
    const RECORD_ID: u16 = 1000;
    const DESCRIPTION: &'static str = "EPT hierarchy";

    fn size(&self) -> u64 {
        (self.entries.len() * Entry::SIZE) as u64
    }

    fn write_to<W: Write>(&self, mut dst: W) -> Result<()> {
        self.entries
            .iter()
            .try_for_each(|entry| entry.write_to(&mut dst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> CopcInfoVlr {
        CopcInfoVlr {
            center_x: 637_290.75,
            center_y: 851_209.9,
            center_z: 2_744.97,
            halfsize: 2_000.0,
            spacing: 31.25,
            root_hier_offset: 4336,
            root_hier_size: 32,
            gpstime_minimum: 245_370.41,
            gpstime_maximum: 249_783.70,
            reserved: [0; 11],
        }
    }

    #[test]
    fn test_voxelkey() {
        let vk = VoxelKey::ROOT;
        let childs = (0..8)
            .map(|dir| vk.child(dir))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert!(
            childs
                .iter()
                .map(|v| v.parent())
                .all(|v| v.eq(&VoxelKey::ROOT))
        );
        assert!(
            childs
                .iter()
                .map(|c| (
                    c,
                    (0..8).map(|dir| c.child(dir).unwrap()).collect::<Vec<_>>()
                ))
                .all(|(p, childs)| childs.iter().all(|c| c.parent().eq(p)))
        );
    }

    #[test]
    fn invalid_key() {
        assert!(!VoxelKey::INVALID.is_valid());
        let entry = Entry::chunk(VoxelKey::INVALID, 100, 10, 10);
        assert_eq!(EntryKind::Invalid, entry.kind());
    }

    #[test]
    fn extreme_levels_from_a_page() {
        let mut bytes = Vec::new();
        for level in [i32::MAX, i32::MIN] {
            let entry = Entry {
                key: VoxelKey {
                    level,
                    ..VoxelKey::ROOT
                },
                ..Default::default()
            };
            entry.write_to(&mut bytes).unwrap();
        }
        let page = Page::from_buffer(&bytes).unwrap();
        let deepest = page.entries()[0].key;
        assert_eq!(i32::MAX, deepest.child(0).unwrap().level);
        assert_eq!(i32::MAX - 1, deepest.parent().level);
        let invalid = page.entries()[1].key;
        assert_eq!(0, invalid.parent().level);
        assert_eq!(i32::MIN + 1, invalid.child(0).unwrap().level);
    }

    #[test]
    fn info_roundtrip_is_byte_exact() {
        let mut bytes = info().to_bytes().unwrap();
        assert_eq!(160, bytes.len());
        for (i, byte) in bytes[72..].iter_mut().enumerate() {
            *byte = i as u8;
        }
        let read = CopcInfoVlr::from_buffer(&bytes).unwrap();
        assert_ne!([0u64; 11], read.reserved);
        assert_eq!(bytes, read.to_bytes().unwrap());
    }

    #[test]
    fn info_reserved_defaults_to_zero() {
        assert_eq!([0u64; 11], CopcInfoVlr::default().reserved);
    }

    #[test]
    fn info_layout() {
        let bytes = info().to_bytes().unwrap();
        assert_eq!(4336u64.to_le_bytes(), bytes[40..48]);
        assert_eq!(32u64.to_le_bytes(), bytes[48..56]);
        assert_eq!(249_783.70f64.to_le_bytes(), bytes[64..72]);
    }

    #[test]
    fn info_header() {
        let header = info().header().unwrap();
        assert_eq!("copc", header.user_id);
        assert_eq!(1, header.record_id);
        assert_eq!(160, header.data_length);
    }

    #[test]
    fn tri_state() {
        let key = VoxelKey::ROOT.child(3).unwrap();
        assert_eq!(EntryKind::Chunk, Entry::chunk(key, 1000, 200, 107).kind());
        assert_eq!(EntryKind::Invalid, Entry::chunk(key, 1000, 0, 107).kind());
        assert_eq!(EntryKind::Empty, Entry::empty(key).kind());
        let mut empty = Entry::empty(key);
        empty.offset = 8;
        assert_eq!(EntryKind::Invalid, empty.kind());
        assert_eq!(EntryKind::Page, Entry::page(key, 5000, 64).kind());
        assert_eq!(EntryKind::Invalid, Entry::page(key, 5000, 0).kind());
        assert_eq!(EntryKind::Invalid, Entry::page(key, 0, 64).kind());
        let mut weird = Entry::empty(key);
        weird.point_count = -2;
        assert_eq!(EntryKind::Invalid, weird.kind());
    }

    #[test]
    fn page_roundtrip() {
        let key = VoxelKey::ROOT.child(1).unwrap();
        let page = Page::new(vec![
            Entry::chunk(VoxelKey::ROOT, 1000, 200, 107),
            Entry::page(key, 5000, 64),
            Entry::empty(key.child(7).unwrap()),
        ]);
        let bytes = page.to_bytes().unwrap();
        assert_eq!(96, bytes.len());
        assert_eq!(page.size(), bytes.len() as u64);
        let read = Page::read_from(bytes.as_slice(), 96).unwrap();
        assert_eq!(page, read);
        assert!(read.entries()[1].is_referencing_page());
    }

    #[test]
    fn entry_layout() {
        let page = Page::new(vec![Entry::page(
            VoxelKey {
                level: 1,
                x: 2,
                y: 3,
                z: 4,
            },
            0x0102_0304_0506_0708,
            -5,
        )]);
        let bytes = page.to_bytes().unwrap();
        assert_eq!([1u8, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0], bytes[0..16]);
        assert_eq!(0x0102_0304_0506_0708u64.to_le_bytes(), bytes[16..24]);
        assert_eq!((-5i32).to_le_bytes(), bytes[24..28]);
        assert_eq!((-1i32).to_le_bytes(), bytes[28..32]);
    }

    #[test]
    fn page_is_opaque() {
        let mut page = Page::default();
        page.push(Entry {
            key: VoxelKey::INVALID,
            offset: 12,
            byte_size: -40,
            point_count: -7,
        });
        let bytes = page.to_bytes().unwrap();
        assert_eq!(page, Page::from_buffer(&bytes).unwrap());
    }

    #[test]
    fn page_misaligned() {
        assert!(matches!(
            Page::from_buffer(&[0; 33]),
            Err(Error::MisalignedPayload {
                len: 33,
                entry_size: 32
            })
        ));
    }
}
