//! Fixed-width strings and fixed-size reads.

use crate::{Error, Result};
use std::io::{self, Read};

/// Converts a nul-padded byte field into a `&str`.
///
/// The las specification says these fields should be ASCII and nul filled, but not all las data
/// in the wild follows that rule, so everything after the first nul is ignored.
pub trait AsLasStr {
    /// Interprets the bytes as a `&str`, stopping at the first nul.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::utils::AsLasStr;
    /// assert_eq!("LiDAR", [76u8, 105, 68, 65, 82, 0, 33].as_las_str().unwrap());
    /// ```
    fn as_las_str(&self) -> Result<&str>;
}

impl AsLasStr for [u8] {
    fn as_las_str(&self) -> Result<&str> {
        let bytes = if let Some(idx) = self.iter().position(|&n| n == 0) {
            &self[0..idx]
        } else {
            self
        };
        std::str::from_utf8(bytes).map_err(Error::from)
    }
}

/// Writes a string into a fixed-width byte field, filling the remainder with nuls.
pub trait FromLasStr {
    /// Overwrites `self` with the bytes of the string and nul-fills what's left.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::utils::FromLasStr;
    /// let mut bytes = [1u8; 5];
    /// bytes.from_las_str("Beer").unwrap();
    /// assert_eq!([66, 101, 101, 114, 0], bytes);
    /// ```
    fn from_las_str(&mut self, s: &str) -> Result<()>;
}

impl<T: AsMut<[u8]>> FromLasStr for T {
    fn from_las_str(&mut self, s: &str) -> Result<()> {
        let field = self.as_mut();
        if s.len() > field.len() {
            return Err(Error::StringTooLong {
                string: s.to_string(),
                len: field.len(),
            });
        }
        for (a, b) in field
            .iter_mut()
            .zip(s.bytes().chain(std::iter::repeat(0)))
        {
            *a = b;
        }
        Ok(())
    }
}

/// Encodes a string into a new nul-padded field of `N` bytes.
pub(crate) fn las_str_field<const N: usize>(s: &str) -> Result<[u8; N]> {
    let mut field = [0u8; N];
    field.from_las_str(s)?;
    Ok(field)
}

/// Fills `buf` completely, or fails with [Error::TruncatedInput].
pub(crate) fn read_fully<R: Read>(mut read: R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match read.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::TruncatedInput {
                    expected: buf.len() as u64,
                    available: filled as u64,
                });
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Reads exactly `len` bytes into a new vector.
///
/// The vector grows as bytes arrive, so a bogus length can't be used to force a huge allocation.
pub(crate) fn read_bytes<R: Read>(read: R, len: u64) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let _ = read.take(len).read_to_end(&mut data)?;
    if (data.len() as u64) < len {
        Err(Error::TruncatedInput {
            expected: len,
            available: data.len() as u64,
        })
    } else {
        Ok(data)
    }
}

/// Fails with [Error::TruncatedInput] if the buffer is shorter than `expected`.
pub(crate) fn check_len(buf: &[u8], expected: usize) -> Result<()> {
    if buf.len() < expected {
        Err(Error::TruncatedInput {
            expected: expected as u64,
            available: buf.len() as u64,
        })
    } else {
        Ok(())
    }
}

/// Fails with [Error::MisalignedPayload] if `len` isn't a multiple of `entry_size`.
pub(crate) fn check_alignment(len: u64, entry_size: u64) -> Result<u64> {
    if len % entry_size == 0 {
        Ok(len / entry_size)
    } else {
        Err(Error::MisalignedPayload { len, entry_size })
    }
}
