//! Fixed-width numeric values stored in header fields.

use crate::{Error, Result};

/// Byte order of an on-disk numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    /// Least significant byte first.
    #[default]
    Little,
    /// Most significant byte first.
    Big,
}

/// Width and signedness of a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericType {
    /// Signed 8-bit.
    I8,
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit.
    I16,
    /// Unsigned 16-bit.
    U16,
    /// Signed 32-bit.
    I32,
    /// Unsigned 32-bit.
    U32,
    /// Signed 64-bit.
    I64,
    /// Unsigned 64-bit.
    U64,
}

impl NumericType {
    /// Resolves a width in bytes and a signedness into a numeric type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedWidth`] for any width other than 1, 2, 4
    /// or 8.
    pub fn from_width(width: usize, signed: bool) -> Result<Self> {
        let ty = match (width, signed) {
            (1, true) => Self::I8,
            (1, false) => Self::U8,
            (2, true) => Self::I16,
            (2, false) => Self::U16,
            (4, true) => Self::I32,
            (4, false) => Self::U32,
            (8, true) => Self::I64,
            (8, false) => Self::U64,
            _ => return Err(Error::UnsupportedWidth { width, signed }),
        };
        Ok(ty)
    }

    /// Returns the width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 => 4,
            Self::I64 | Self::U64 => 8,
        }
    }

    /// Returns `true` for signed types.
    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }
}

/// A header field value with its width and signedness fixed.
///
/// The variant is chosen once, when the header is registered, and every
/// later update keeps it. Arithmetic goes through `i128` so that no
/// intermediate result of any supported width can overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderValue {
    /// Signed 8-bit value.
    I8(i8),
    /// Unsigned 8-bit value.
    U8(u8),
    /// Signed 16-bit value.
    I16(i16),
    /// Unsigned 16-bit value.
    U16(u16),
    /// Signed 32-bit value.
    I32(i32),
    /// Unsigned 32-bit value.
    U32(u32),
    /// Signed 64-bit value.
    I64(i64),
    /// Unsigned 64-bit value.
    U64(u64),
}

impl HeaderValue {
    /// Creates a value of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeaderOverflow`] (with position 0) if `value` does
    /// not fit.
    pub fn new(ty: NumericType, value: i128) -> Result<Self> {
        Self::zero(ty).with_value(value).ok_or(Error::HeaderOverflow {
            position: 0,
            value,
        })
    }

    /// Creates a value from a raw width and signedness.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedWidth`] for widths other than 1, 2, 4, 8
    /// and [`Error::HeaderOverflow`] if `value` does not fit.
    pub fn from_raw(width: usize, signed: bool, value: i128) -> Result<Self> {
        Self::new(NumericType::from_width(width, signed)?, value)
    }

    /// Returns the zero value of a type.
    pub fn zero(ty: NumericType) -> Self {
        match ty {
            NumericType::I8 => Self::I8(0),
            NumericType::U8 => Self::U8(0),
            NumericType::I16 => Self::I16(0),
            NumericType::U16 => Self::U16(0),
            NumericType::I32 => Self::I32(0),
            NumericType::U32 => Self::U32(0),
            NumericType::I64 => Self::I64(0),
            NumericType::U64 => Self::U64(0),
        }
    }

    /// Returns the numeric type of this value.
    pub fn numeric_type(&self) -> NumericType {
        match self {
            Self::I8(_) => NumericType::I8,
            Self::U8(_) => NumericType::U8,
            Self::I16(_) => NumericType::I16,
            Self::U16(_) => NumericType::U16,
            Self::I32(_) => NumericType::I32,
            Self::U32(_) => NumericType::U32,
            Self::I64(_) => NumericType::I64,
            Self::U64(_) => NumericType::U64,
        }
    }

    /// Returns the on-disk width in bytes.
    pub fn width(&self) -> usize {
        self.numeric_type().width()
    }

    /// Returns the value widened to `i128`.
    pub fn get(&self) -> i128 {
        match *self {
            Self::I8(v) => v as i128,
            Self::U8(v) => v as i128,
            Self::I16(v) => v as i128,
            Self::U16(v) => v as i128,
            Self::I32(v) => v as i128,
            Self::U32(v) => v as i128,
            Self::I64(v) => v as i128,
            Self::U64(v) => v as i128,
        }
    }

    /// Returns a value of the same type holding `value`, or `None` if it
    /// does not fit.
    pub fn with_value(&self, value: i128) -> Option<Self> {
        let v = match self {
            Self::I8(_) => Self::I8(i8::try_from(value).ok()?),
            Self::U8(_) => Self::U8(u8::try_from(value).ok()?),
            Self::I16(_) => Self::I16(i16::try_from(value).ok()?),
            Self::U16(_) => Self::U16(u16::try_from(value).ok()?),
            Self::I32(_) => Self::I32(i32::try_from(value).ok()?),
            Self::U32(_) => Self::U32(u32::try_from(value).ok()?),
            Self::I64(_) => Self::I64(i64::try_from(value).ok()?),
            Self::U64(_) => Self::U64(u64::try_from(value).ok()?),
        };
        Some(v)
    }

    /// Encodes the value in the given byte order.
    pub fn encode(&self, endianness: Endianness) -> Vec<u8> {
        macro_rules! bytes {
            ($v:expr) => {
                match endianness {
                    Endianness::Little => $v.to_le_bytes().to_vec(),
                    Endianness::Big => $v.to_be_bytes().to_vec(),
                }
            };
        }
        match *self {
            Self::I8(v) => bytes!(v),
            Self::U8(v) => bytes!(v),
            Self::I16(v) => bytes!(v),
            Self::U16(v) => bytes!(v),
            Self::I32(v) => bytes!(v),
            Self::U32(v) => bytes!(v),
            Self::I64(v) => bytes!(v),
            Self::U64(v) => bytes!(v),
        }
    }

    /// Decodes a value whose width is the length of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedWidth`] if `bytes` is not 1, 2, 4 or 8
    /// bytes long.
    pub fn decode(bytes: &[u8], signed: bool, endianness: Endianness) -> Result<Self> {
        let ty = NumericType::from_width(bytes.len(), signed)?;

        let mut buf = [0u8; 8];
        let width = bytes.len();
        match endianness {
            Endianness::Little => buf[..width].copy_from_slice(bytes),
            Endianness::Big => {
                for (dst, src) in buf[..width].iter_mut().zip(bytes.iter().rev()) {
                    *dst = *src;
                }
            }
        }
        let raw = u64::from_le_bytes(buf);

        let value = match ty {
            NumericType::I8 => Self::I8(raw as u8 as i8),
            NumericType::U8 => Self::U8(raw as u8),
            NumericType::I16 => Self::I16(raw as u16 as i16),
            NumericType::U16 => Self::U16(raw as u16),
            NumericType::I32 => Self::I32(raw as u32 as i32),
            NumericType::U32 => Self::U32(raw as u32),
            NumericType::I64 => Self::I64(raw as i64),
            NumericType::U64 => Self::U64(raw),
        };
        Ok(value)
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.get())
    }
}
