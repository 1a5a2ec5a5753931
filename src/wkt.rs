//! The OGC coordinate system WKT vlr.
//!
//! The payload is the WKT text itself, without a length prefix. Many writers add a trailing nul,
//! and some write text that isn't UTF-8. The bytes are kept as they are so that the record is
//! written back exactly as it was read.

use crate::{Error, Payload, Result, utils};
use log::{Level, log};
use std::{
    borrow::Cow,
    io::{Read, Write},
};

const EPSG_RANGE: std::ops::RangeInclusive<u16> = 1024..=(i16::MAX as u16);

/// Horizontal and optional vertical CRS given by EPSG code(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpsgCrs {
    /// EPSG code for the horizontal CRS
    pub horizontal: u16,

    /// Optional EPSG code for the vertical CRS
    pub vertical: Option<u16>,
}

/// The WKT vlr.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WktVlr {
    bytes: Vec<u8>,
}

impl WktVlr {
    /// Creates a vlr holding this text, byte for byte.
    pub fn new(text: impl Into<String>) -> WktVlr {
        WktVlr {
            bytes: text.into().into_bytes(),
        }
    }

    /// Reads exactly `byte_size` bytes of WKT.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::{Payload, WktVlr};
    /// let vlr = WktVlr::read_from(&b"COMPD_CS[]\0"[..], 11).unwrap();
    /// assert_eq!("COMPD_CS[]", vlr.wkt());
    /// assert_eq!(11, vlr.size());
    /// ```
    pub fn read_from<R: Read>(read: R, byte_size: u64) -> Result<WktVlr> {
        let data = utils::read_bytes(read, byte_size)?;
        WktVlr::from_buffer(&data)
    }

    /// Decodes a WKT vlr from a complete payload.
    ///
    /// Never fails, any bytes are accepted.
    pub fn from_buffer(buf: &[u8]) -> Result<WktVlr> {
        if buf.last() == Some(&0) {
            log!(Level::Debug, "WKT vlr is nul terminated");
        }
        if std::str::from_utf8(buf).is_err() {
            log!(Level::Warn, "WKT vlr is not valid UTF-8");
        }
        Ok(WktVlr {
            bytes: buf.to_vec(),
        })
    }

    /// Returns the WKT, without any trailing nuls.
    ///
    /// Bytes that aren't UTF-8 are replaced with U+FFFD.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::WktVlr;
    /// let vlr = WktVlr::from_buffer(b"GEOGCS[\"R\xE9seau\"]\0").unwrap();
    /// assert_eq!("GEOGCS[\"R\u{FFFD}seau\"]", vlr.wkt());
    /// ```
    pub fn wkt(&self) -> Cow<'_, str> {
        let end = self
            .bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        String::from_utf8_lossy(&self.bytes[..end])
    }

    /// Returns the payload exactly as it will be written.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Tries to parse EPSG code(s) from the WKT.
    ///
    /// Looks at the EPSG codes at the end of the horizontal and vertical CRS sub-strings. This is
    /// not a true WKT parser and might provide a bad code if the WKT doesn't look as expected.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::WktVlr;
    /// let vlr = WktVlr::new(r#"PROJCS["NAD83 / UTM zone 15N",AUTHORITY["EPSG","26915"]]"#);
    /// assert_eq!(26915, vlr.epsg().unwrap().horizontal);
    /// ```
    pub fn epsg(&self) -> Result<EpsgCrs> {
        let wkt = self.wkt();

        // VERT_CS for WKT v1 and VERTCRS or VERTICALCRS for v2
        let pieces = ["VERTCRS", "VERTICALCRS", "VERT_CS"]
            .into_iter()
            .find_map(|keyword| wkt.split_once(keyword))
            .map_or_else(
                || vec![&*wkt],
                |(horizontal, vertical)| vec![horizontal, vertical],
            );

        let mut epsg = [None, None];
        for (i, piece) in pieces.into_iter().enumerate() {
            let code = trailing_code(piece.as_bytes());
            if EPSG_RANGE.contains(&code) {
                epsg[i] = Some(code);
            }
        }
        if let Some(horizontal) = epsg[0] {
            Ok(EpsgCrs {
                horizontal,
                vertical: epsg[1],
            })
        } else {
            Err(Error::UnreadableWktCrs)
        }
    }
}

// The code is the last run of digits, within the last few bytes of the piece.
fn trailing_code(piece: &[u8]) -> u16 {
    let mut code: u16 = 0;
    let mut started = false;
    let mut power: u16 = 1;
    for byte in piece.iter().rev().take(10) {
        if byte.is_ascii_digit() {
            started = true;
            code = code.saturating_add(power.saturating_mul(u16::from(byte - b'0')));
            power = power.saturating_mul(10);
        } else if started {
            break;
        }
    }
    code
}

impl Payload for WktVlr {
    const USER_ID: &'static str = "LASF_Projection";
    const RECORD_ID: u16 = 2112;
    const DESCRIPTION: &'static str = "";

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        write.write_all(&self.bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPOUND: &str = r#"COMPD_CS["NAD83(HARN) / Oregon GIC Lambert (ft) + NAVD88 height (ftUS)",PROJCS["NAD83(HARN) / Oregon GIC Lambert (ft)",GEOGCS["NAD83(HARN)",AUTHORITY["EPSG","4152"]],AUTHORITY["EPSG","2994"]],VERT_CS["NAVD88 height (ftUS)",VERT_DATUM["North American Vertical Datum 1988",2005,AUTHORITY["EPSG","5103"]],AUTHORITY["EPSG","6360"]]]"#;

    #[test]
    fn roundtrip_keeps_terminator() {
        let text = format!("{COMPOUND}\0");
        let vlr = WktVlr::read_from(text.as_bytes(), text.len() as u64).unwrap();
        assert_eq!(COMPOUND, vlr.wkt());
        assert_eq!(text.len() as u64, vlr.size());
        assert_eq!(text.as_bytes(), vlr.to_bytes().unwrap().as_slice());
    }

    #[test]
    fn size_is_header_length() {
        let vlr = WktVlr::new(COMPOUND);
        assert_eq!(vlr.size(), u64::from(vlr.header().unwrap().data_length));
        assert_eq!(vlr.size(), vlr.extended_header().data_length);
    }

    #[test]
    fn epsg_compound() {
        let crs = WktVlr::new(COMPOUND).epsg().unwrap();
        assert_eq!(2994, crs.horizontal);
        assert_eq!(Some(6360), crs.vertical);
    }

    #[test]
    fn epsg_unreadable() {
        assert!(matches!(
            WktVlr::new("LOCAL_CS[]").epsg(),
            Err(Error::UnreadableWktCrs)
        ));
    }

    #[test]
    fn latin1_passes_through() {
        let bytes = b"PROJCS[\"RGF93 / Lambert-93\",GEOGCS[\"R\xE9seau\"],AUTHORITY[\"EPSG\",\"2154\"]]\0";
        let vlr = WktVlr::read_from(&bytes[..], bytes.len() as u64).unwrap();
        assert_eq!(bytes.len() as u64, vlr.size());
        assert_eq!(&bytes[..], vlr.as_bytes());
        assert_eq!(bytes.to_vec(), vlr.to_bytes().unwrap());
        assert!(vlr.wkt().contains("R\u{FFFD}seau"));
        assert_eq!(2154, vlr.epsg().unwrap().horizontal);
    }

    #[test]
    fn all_nuls() {
        let vlr = WktVlr::from_buffer(&[0u8; 4]).unwrap();
        assert_eq!("", vlr.wkt());
        assert_eq!(4, vlr.size());
    }

    #[test]
    fn truncated() {
        assert!(matches!(
            WktVlr::read_from(&b"GEOG"[..], 10),
            Err(Error::TruncatedInput {
                expected: 10,
                available: 4
            })
        ));
    }
}
