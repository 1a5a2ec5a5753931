//! The extra bytes vlr, which describes fields appended to the end of each point record.
//!
//! "The Extra Bytes VLR provides a mechanism whereby additional information can be added to the
//! end of a standard Point Record". Each field is described by a fixed 192-byte record.
//!
//! ```
//! use las_vlr::{ExtraBytesVlr, Payload, extra_bytes::{DataType, ExtraBytesField}};
//!
//! let mut vlr = ExtraBytesVlr::default();
//! vlr.add_field(ExtraBytesField::new("amplitude", DataType::UnsignedShort));
//! vlr.add_field(ExtraBytesField::new("deviation", DataType::Float));
//! assert_eq!(384, vlr.size());
//! assert_eq!(6, vlr.point_byte_size());
//! ```

use crate::{
    Payload, Result,
    utils::{self, AsLasStr},
};
use byteorder::{ReadBytesExt, WriteBytesExt};
use log::{Level, log};
use std::io::{Read, Write};

/// The size of one field description.
pub const FIELD_SIZE: usize = 192;

const NAME_LEN: usize = 32;
const DESCRIPTION_LEN: usize = 32;

// Table 24 of
// https://www.asprs.org/wp-content/uploads/2010/12/LAS_1_4_r13.pdf
// 0 undocumented extra bytes, the options field holds the byte count
// 1-10 scalars
// 11-30 deprecated two and three component vectors of the scalars
// 31-255 reserved
/// The type of an extra bytes field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum DataType {
    Undocumented,
    UnsignedChar,
    Char,
    UnsignedShort,
    Short,
    UnsignedLong,
    Long,
    UnsignedLongLong,
    LongLong,
    Float,
    Double,
    /// A deprecated vector type, holds the raw code (11 through 30).
    Vector(u8),
    /// A reserved code (31 and up).
    Reserved(u8),
}

impl DataType {
    /// Returns the number of bytes one value of this type takes up in a point.
    ///
    /// Undocumented and reserved types return zero, their size isn't known from the type alone.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::extra_bytes::DataType;
    /// assert_eq!(8, DataType::Double.byte_size());
    /// assert_eq!(12, DataType::from(29).byte_size()); // three floats
    /// ```
    pub fn byte_size(&self) -> u16 {
        match self {
            DataType::Undocumented | DataType::Reserved(_) => 0,
            DataType::UnsignedChar | DataType::Char => 1,
            DataType::UnsignedShort | DataType::Short => 2,
            DataType::UnsignedLong | DataType::Long | DataType::Float => 4,
            DataType::UnsignedLongLong | DataType::LongLong | DataType::Double => 8,
            DataType::Vector(_) => self.scalar().byte_size() * u16::from(self.components()),
        }
    }

    /// Returns the number of components, one for scalars and two or three for vectors.
    pub fn components(&self) -> u8 {
        match self {
            DataType::Vector(code) => 2 + code.saturating_sub(11) / 10,
            _ => 1,
        }
    }

    /// Returns the type of each component.
    pub fn scalar(&self) -> DataType {
        match self {
            DataType::Vector(code) => DataType::from(code.saturating_sub(11) % 10 + 1),
            _ => *self,
        }
    }

    /// Returns true for the floating point types.
    pub fn is_float(&self) -> bool {
        matches!(self.scalar(), DataType::Float | DataType::Double)
    }

    /// Returns true for the signed integer types.
    pub fn is_signed(&self) -> bool {
        matches!(
            self.scalar(),
            DataType::Char | DataType::Short | DataType::Long | DataType::LongLong
        )
    }
}

impl From<u8> for DataType {
    fn from(val: u8) -> DataType {
        match val {
            0 => DataType::Undocumented,
            1 => DataType::UnsignedChar,
            2 => DataType::Char,
            3 => DataType::UnsignedShort,
            4 => DataType::Short,
            5 => DataType::UnsignedLong,
            6 => DataType::Long,
            7 => DataType::UnsignedLongLong,
            8 => DataType::LongLong,
            9 => DataType::Float,
            10 => DataType::Double,
            11..=30 => DataType::Vector(val),
            _ => DataType::Reserved(val),
        }
    }
}

impl From<DataType> for u8 {
    fn from(data_type: DataType) -> u8 {
        match data_type {
            DataType::Undocumented => 0,
            DataType::UnsignedChar => 1,
            DataType::Char => 2,
            DataType::UnsignedShort => 3,
            DataType::Short => 4,
            DataType::UnsignedLong => 5,
            DataType::Long => 6,
            DataType::UnsignedLongLong => 7,
            DataType::LongLong => 8,
            DataType::Float => 9,
            DataType::Double => 10,
            DataType::Vector(code) | DataType::Reserved(code) => code,
        }
    }
}

/// The option bits of an extra bytes field.
///
/// By default all bits are zero, which means the no data, min, max, scale, and offset values are
/// to be disregarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Options(pub u8);

impl Options {
    /// The no data value is relevant.
    pub const NO_DATA: u8 = 1;
    /// The min value is relevant.
    pub const MIN: u8 = 2;
    /// The max value is relevant.
    pub const MAX: u8 = 4;
    /// Values should be multiplied by the scale.
    pub const SCALE: u8 = 8;
    /// Values should be translated by the offset, after scaling.
    pub const OFFSET: u8 = 16;

    /// Returns true if the no data value is relevant.
    pub fn has_no_data(&self) -> bool {
        self.0 & Options::NO_DATA != 0
    }

    /// Returns true if the min value is relevant.
    pub fn has_min(&self) -> bool {
        self.0 & Options::MIN != 0
    }

    /// Returns true if the max value is relevant.
    pub fn has_max(&self) -> bool {
        self.0 & Options::MAX != 0
    }

    /// Returns true if values should be scaled.
    pub fn has_scale(&self) -> bool {
        self.0 & Options::SCALE != 0
    }

    /// Returns true if values should be offset.
    pub fn has_offset(&self) -> bool {
        self.0 & Options::OFFSET != 0
    }
}

/// One eight-byte component of the no data, min, max, scale, or offset arrays.
///
/// No data, min, and max are stored in the field's own type (as a 64-bit unsigned, signed, or
/// floating point value), scale and offset are always doubles. The bytes are kept as-is so that
/// unused components survive a round trip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Value(pub [u8; 8]);

impl Value {
    /// Interprets the value as a double.
    pub fn as_f64(&self) -> f64 {
        f64::from_le_bytes(self.0)
    }

    /// Interprets the value as an unsigned integer.
    pub fn as_u64(&self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    /// Interprets the value as a signed integer.
    pub fn as_i64(&self) -> i64 {
        i64::from_le_bytes(self.0)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value(n.to_le_bytes())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Value {
        Value(n.to_le_bytes())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value(n.to_le_bytes())
    }
}

/// The description of one extra bytes field.
///
/// All five value arrays are always present, regardless of the option bits. Scalar fields only use
/// the first component.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtraBytesField {
    /// Reserved bytes, written back as read.
    pub reserved: [u8; 2],
    /// The data type code, see [DataType].
    pub data_type: u8,
    /// The option bits, see [Options].
    ///
    /// For [DataType::Undocumented] this holds the number of bytes instead.
    pub options: u8,
    /// The name of the field, at most 32 bytes.
    pub name: String,
    /// Unused bytes, written back as read.
    pub unused: [u8; 4],
    #[allow(missing_docs)]
    pub no_data: [Value; 3],
    #[allow(missing_docs)]
    pub min: [Value; 3],
    #[allow(missing_docs)]
    pub max: [Value; 3],
    #[allow(missing_docs)]
    pub scale: [Value; 3],
    #[allow(missing_docs)]
    pub offset: [Value; 3],
    /// A description of the field, at most 32 bytes.
    pub description: String,
}

impl ExtraBytesField {
    /// Creates a new field with no options set.
    pub fn new(name: impl Into<String>, data_type: DataType) -> ExtraBytesField {
        ExtraBytesField {
            data_type: data_type.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Creates an undocumented field of `len` bytes.
    pub fn undocumented(name: impl Into<String>, len: u8) -> ExtraBytesField {
        ExtraBytesField {
            options: len,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Returns the typed data type.
    pub fn data_type(&self) -> DataType {
        self.data_type.into()
    }

    /// Returns the typed option bits.
    pub fn options(&self) -> Options {
        Options(self.options)
    }

    /// Returns the number of bytes this field adds to each point.
    pub fn byte_size(&self) -> u16 {
        match self.data_type() {
            DataType::Undocumented => self.options.into(),
            data_type => data_type.byte_size(),
        }
    }

    /// Returns the scale of each component, or ones if the scale bit isn't set.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::extra_bytes::{DataType, ExtraBytesField, Options};
    ///
    /// let mut field = ExtraBytesField::new("height", DataType::Long);
    /// field.scale[0] = 0.01.into();
    /// assert_eq!([1.0, 1.0, 1.0], field.scales());
    /// field.options |= Options::SCALE;
    /// assert_eq!(0.01, field.scales()[0]);
    /// ```
    pub fn scales(&self) -> [f64; 3] {
        if self.options().has_scale() {
            self.scale.map(|value| value.as_f64())
        } else {
            [1.0; 3]
        }
    }

    /// Returns the offset of each component, or zeros if the offset bit isn't set.
    pub fn offsets(&self) -> [f64; 3] {
        if self.options().has_offset() {
            self.offset.map(|value| value.as_f64())
        } else {
            [0.0; 3]
        }
    }

    /// Returns the no data values, if they're relevant.
    pub fn no_data(&self) -> Option<&[Value]> {
        self.options()
            .has_no_data()
            .then(|| &self.no_data[..self.used_components()])
    }

    /// Returns the min values, if they're relevant.
    pub fn min(&self) -> Option<&[Value]> {
        self.options()
            .has_min()
            .then(|| &self.min[..self.used_components()])
    }

    /// Returns the max values, if they're relevant.
    pub fn max(&self) -> Option<&[Value]> {
        self.options()
            .has_max()
            .then(|| &self.max[..self.used_components()])
    }

    fn used_components(&self) -> usize {
        usize::from(self.data_type().components())
    }

    fn from_bytes(buf: &[u8; FIELD_SIZE]) -> Result<ExtraBytesField> {
        let mut src = &buf[..];
        let mut reserved = [0; 2];
        src.read_exact(&mut reserved)?;
        let data_type = src.read_u8()?;
        let options = src.read_u8()?;
        let name = read_las_string(&mut src, NAME_LEN)?;
        let mut unused = [0; 4];
        src.read_exact(&mut unused)?;
        let no_data = read_values(&mut src)?;
        let min = read_values(&mut src)?;
        let max = read_values(&mut src)?;
        let scale = read_values(&mut src)?;
        let offset = read_values(&mut src)?;
        let description = read_las_string(&mut src, DESCRIPTION_LEN)?;
        Ok(ExtraBytesField {
            reserved,
            data_type,
            options,
            name,
            unused,
            no_data,
            min,
            max,
            scale,
            offset,
            description,
        })
    }

    fn write_to<W: Write>(&self, write: &mut W) -> Result<()> {
        let name: [u8; NAME_LEN] = utils::las_str_field(&self.name)?;
        let description: [u8; DESCRIPTION_LEN] = utils::las_str_field(&self.description)?;
        let mut buf = Vec::with_capacity(FIELD_SIZE);
        buf.write_all(&self.reserved)?;
        buf.write_u8(self.data_type)?;
        buf.write_u8(self.options)?;
        buf.write_all(&name)?;
        buf.write_all(&self.unused)?;
        for values in [
            &self.no_data,
            &self.min,
            &self.max,
            &self.scale,
            &self.offset,
        ] {
            values
                .iter()
                .try_for_each(|value| buf.write_all(&value.0))?;
        }
        buf.write_all(&description)?;
        write.write_all(&buf)?;
        Ok(())
    }
}

/// The extra bytes vlr.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtraBytesVlr {
    /// The fields, in the order their bytes appear in a point.
    pub fields: Vec<ExtraBytesField>,
}

impl ExtraBytesVlr {
    /// Reads an extra bytes payload of `byte_size` bytes.
    ///
    /// Fails with [crate::Error::MisalignedPayload] if `byte_size` isn't a multiple of 192, in
    /// which case nothing is read.
    ///
    /// # Examples
    ///
    /// ```
    /// use las_vlr::{Error, ExtraBytesVlr};
    ///
    /// let vlr = ExtraBytesVlr::read_from(&[0u8; 384][..], 384).unwrap();
    /// assert_eq!(2, vlr.fields.len());
    /// assert!(matches!(
    ///     ExtraBytesVlr::read_from(&[0u8; 385][..], 385),
    ///     Err(Error::MisalignedPayload { len: 385, entry_size: 192 })
    /// ));
    /// ```
    pub fn read_from<R: Read>(mut read: R, byte_size: u64) -> Result<ExtraBytesVlr> {
        let count = utils::check_alignment(byte_size, FIELD_SIZE as u64)?;
        let mut fields = Vec::new();
        let mut buf = [0; FIELD_SIZE];
        for _ in 0..count {
            utils::read_fully(&mut read, &mut buf)?;
            let field = ExtraBytesField::from_bytes(&buf)?;
            if let DataType::Vector(code) = field.data_type() {
                log!(
                    Level::Warn,
                    "extra bytes field '{}' uses deprecated vector data type {}",
                    field.name,
                    code
                );
            }
            fields.push(field);
        }
        Ok(ExtraBytesVlr { fields })
    }

    /// Decodes an extra bytes vlr from a complete payload.
    pub fn from_buffer(buf: &[u8]) -> Result<ExtraBytesVlr> {
        ExtraBytesVlr::read_from(buf, buf.len() as u64)
    }

    /// Appends a field.
    ///
    /// The size grows by 192 bytes, so any header made before this call is stale.
    pub fn add_field(&mut self, field: ExtraBytesField) {
        self.fields.push(field);
    }

    /// Returns the field with this name.
    pub fn field(&self, name: &str) -> Option<&ExtraBytesField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Returns the number of bytes the fields add to each point.
    ///
    /// A regular header can describe more fields than fit in a u16 worth of point bytes, so the
    /// sum is a u32.
    pub fn point_byte_size(&self) -> u32 {
        self.fields
            .iter()
            .map(|field| u32::from(field.byte_size()))
            .sum()
    }
}

impl Payload for ExtraBytesVlr {
    const USER_ID: &'static str = "LASF_Spec";
    const RECORD_ID: u16 = 4;
    const DESCRIPTION: &'static str = "";

    fn size(&self) -> u64 {
        (self.fields.len() * FIELD_SIZE) as u64
    }

    fn write_to<W: Write>(&self, mut write: W) -> Result<()> {
        self.fields
            .iter()
            .try_for_each(|field| field.write_to(&mut write))
    }
}

fn read_las_string(src: &mut &[u8], len: usize) -> Result<String> {
    let (field, rest) = src.split_at(len);
    *src = rest;
    Ok(field.as_las_str()?.to_string())
}

fn read_values(src: &mut &[u8]) -> Result<[Value; 3]> {
    let mut values = [Value::default(); 3];
    for value in values.iter_mut() {
        src.read_exact(&mut value.0)?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn height() -> ExtraBytesField {
        let mut field = ExtraBytesField::new("height above ground", DataType::Long);
        field.options = Options::MIN | Options::MAX | Options::SCALE | Options::OFFSET;
        field.min[0] = Value::from(-100i64);
        field.max[0] = Value::from(5000i64);
        field.scale[0] = Value::from(0.001);
        field.offset[0] = Value::from(10.0);
        field.description = "meters".to_string();
        field
    }

    #[test]
    fn field_layout() {
        let mut field = height();
        field.reserved = [7, 8];
        field.unused = [1, 2, 3, 4];
        let mut bytes = Vec::new();
        field.write_to(&mut bytes).unwrap();
        assert_eq!(192, bytes.len());
        assert_eq!([7u8, 8, 6, 30], bytes[0..4]);
        assert_eq!(b"height above ground", &bytes[4..23]);
        assert!(bytes[23..36].iter().all(|&b| b == 0));
        assert_eq!([1u8, 2, 3, 4], bytes[36..40]);
        assert_eq!((-100i64).to_le_bytes(), bytes[64..72]);
        assert_eq!(5000i64.to_le_bytes(), bytes[88..96]);
        assert_eq!(0.001f64.to_le_bytes(), bytes[112..120]);
        assert_eq!(10.0f64.to_le_bytes(), bytes[136..144]);
        assert_eq!(b"meters", &bytes[160..166]);
    }

    #[test]
    fn roundtrip() {
        let mut vlr = ExtraBytesVlr::default();
        vlr.add_field(height());
        let mut unused_components = ExtraBytesField::new("intensity2", DataType::UnsignedShort);
        unused_components.no_data = [Value([1; 8]), Value([2; 8]), Value([3; 8])];
        vlr.add_field(unused_components);
        let bytes = vlr.to_bytes().unwrap();
        assert_eq!(vlr.size(), bytes.len() as u64);
        assert_eq!(vlr, ExtraBytesVlr::from_buffer(&bytes).unwrap());
    }

    #[test]
    fn add_field_grows_by_192() {
        let mut vlr = ExtraBytesVlr::default();
        assert_eq!(0, vlr.size());
        vlr.add_field(height());
        assert_eq!(192, vlr.size());
        vlr.add_field(height());
        assert_eq!(384, vlr.size());
        assert_eq!(384, vlr.header().unwrap().data_length);
    }

    #[test]
    fn misaligned() {
        for len in [1, 191, 193, 385] {
            let data = vec![0u8; len];
            assert!(matches!(
                ExtraBytesVlr::from_buffer(&data),
                Err(Error::MisalignedPayload { .. })
            ));
        }
    }

    #[test]
    fn truncated() {
        assert!(matches!(
            ExtraBytesVlr::read_from(&[0u8; 200][..], 384),
            Err(Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn options() {
        let field = height();
        assert!(field.no_data().is_none());
        assert_eq!(-100, field.min().unwrap()[0].as_i64());
        assert_eq!(5000, field.max().unwrap()[0].as_i64());
        assert_eq!(1, field.min().unwrap().len());
        assert_eq!(0.001, field.scales()[0]);
        assert_eq!(10.0, field.offsets()[0]);
    }

    #[test]
    fn offset_bit_is_not_scale_bit() {
        let mut field = height();
        field.options = Options::SCALE;
        assert_eq!([0.0; 3], field.offsets());
        field.options = Options::OFFSET;
        assert_eq!([1.0; 3], field.scales());
    }

    #[test]
    fn data_types() {
        for code in 0..=255u8 {
            assert_eq!(code, u8::from(DataType::from(code)));
        }
        assert_eq!(DataType::Short, DataType::from(14).scalar());
        assert_eq!(2, DataType::from(14).components());
        assert_eq!(4, DataType::from(14).byte_size());
        assert_eq!(3, DataType::from(30).components());
        assert_eq!(24, DataType::from(30).byte_size());
        assert!(DataType::from(30).is_float());
        assert!(DataType::from(22).is_signed());
        assert_eq!(0, DataType::from(31).byte_size());
    }

    #[test]
    fn point_byte_size_past_u16() {
        let mut vlr = ExtraBytesVlr::default();
        for i in 0..258 {
            vlr.add_field(ExtraBytesField::undocumented(format!("blob {i}"), 255));
        }
        let header = vlr.header().unwrap();
        assert_eq!(49_536, header.data_length);
        let bytes = vlr.to_bytes().unwrap();
        let read = ExtraBytesVlr::read_from(bytes.as_slice(), header.data_length.into()).unwrap();
        assert_eq!(258 * 255, read.point_byte_size());
    }

    #[test]
    fn point_byte_size() {
        let mut vlr = ExtraBytesVlr::default();
        vlr.add_field(height());
        vlr.add_field(ExtraBytesField::undocumented("blob", 5));
        vlr.add_field(ExtraBytesField::new("normal", DataType::from(30)));
        assert_eq!(4 + 5 + 24, vlr.point_byte_size());
        assert_eq!(Some("blob"), vlr.field("blob").map(|f| f.name.as_str()));
    }

    #[test]
    fn name_too_long() {
        let mut vlr = ExtraBytesVlr::default();
        vlr.add_field(ExtraBytesField::new("x".repeat(33), DataType::Double));
        assert!(vlr.to_bytes().is_err());
    }
}
