//! Leaf encodings shared by scalar parameters and controller attributes.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::stream::{InputStream, OutputStream};
use crate::{Endian, Error, Result};

// -----------------------------------------------------------------------------
// Value

/// A leaf value: written as bytes in binary modes and as a string in text
/// modes.
///
/// Binary numbers follow the payload [`Endian`]. Strings are written byte by
/// byte and terminated by `0`. An empty text value reads back as the
/// default.
pub trait Value: Sized + Default {
    /// Intrinsic type name, e.g. `"int32"`.
    fn value_type_name() -> &'static str;

    fn write_binary(&self, endian: Endian, output: &mut dyn OutputStream) -> Result<()>;

    fn read_binary(endian: Endian, input: &mut dyn InputStream) -> Result<Self>;

    fn to_text(&self) -> String;

    fn from_text(text: &str) -> Result<Self>;
}

/// A fixed-size number that can be packed into a [`Binary`](crate::Binary)
/// block.
pub trait Plain: Value + Copy + 'static {
    const SIZE: usize;

    fn put(self, endian: Endian, out: &mut Vec<u8>);

    /// Decodes one element; `bytes` is exactly [`SIZE`](Self::SIZE) long.
    fn get(bytes: &[u8], endian: Endian) -> Self;
}

fn parse_error(text: &str, name: &str) -> Error {
    Error::types_not_match(format!("`{text}` is not a valid `{name}` value"))
}

macro_rules! impl_number {
    ($($ty:ty => $name:literal),* $(,)?) => {$(
        impl Value for $ty {
            #[inline]
            fn value_type_name() -> &'static str {
                $name
            }

            fn write_binary(&self, endian: Endian, output: &mut dyn OutputStream) -> Result<()> {
                match endian {
                    Endian::Little => output.write(&self.to_le_bytes()),
                    Endian::Big => output.write(&self.to_be_bytes()),
                }
            }

            fn read_binary(endian: Endian, input: &mut dyn InputStream) -> Result<Self> {
                let mut bytes = [0u8; size_of::<$ty>()];
                input.read(&mut bytes)?;
                Ok(match endian {
                    Endian::Little => <$ty>::from_le_bytes(bytes),
                    Endian::Big => <$ty>::from_be_bytes(bytes),
                })
            }

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn from_text(text: &str) -> Result<Self> {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(Self::default());
                }
                trimmed.parse().map_err(|_| parse_error(text, $name))
            }
        }

        impl Plain for $ty {
            const SIZE: usize = size_of::<$ty>();

            #[inline]
            fn put(self, endian: Endian, out: &mut Vec<u8>) {
                match endian {
                    Endian::Little => out.extend_from_slice(&self.to_le_bytes()),
                    Endian::Big => out.extend_from_slice(&self.to_be_bytes()),
                }
            }

            #[inline]
            fn get(bytes: &[u8], endian: Endian) -> Self {
                let mut raw = [0u8; size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                match endian {
                    Endian::Little => <$ty>::from_le_bytes(raw),
                    Endian::Big => <$ty>::from_be_bytes(raw),
                }
            }
        }
    )*};
}

impl_number! {
    i8 => "int8",
    u8 => "byte",
    i16 => "int16",
    u16 => "uint16",
    i32 => "int32",
    u32 => "uint32",
    i64 => "int64",
    u64 => "uint64",
    f32 => "float",
    f64 => "double",
}

// Pointer-sized integers travel as 64-bit values.
macro_rules! impl_size {
    ($($ty:ty => $wide:ty),* $(,)?) => {$(
        impl Value for $ty {
            #[inline]
            fn value_type_name() -> &'static str {
                <$wide as Value>::value_type_name()
            }

            fn write_binary(&self, endian: Endian, output: &mut dyn OutputStream) -> Result<()> {
                (*self as $wide).write_binary(endian, output)
            }

            fn read_binary(endian: Endian, input: &mut dyn InputStream) -> Result<Self> {
                let wide = <$wide>::read_binary(endian, input)?;
                <$ty>::try_from(wide).map_err(|_| {
                    Error::out_of_bounds(format!("{wide} does not fit in `{}`", stringify!($ty)))
                })
            }

            fn to_text(&self) -> String {
                self.to_string()
            }

            fn from_text(text: &str) -> Result<Self> {
                let wide = <$wide>::from_text(text)?;
                <$ty>::try_from(wide).map_err(|_| parse_error(text, stringify!($ty)))
            }
        }
    )*};
}

impl_size! {
    usize => u64,
    isize => i64,
}

impl Value for bool {
    #[inline]
    fn value_type_name() -> &'static str {
        "bool"
    }

    fn write_binary(&self, _: Endian, output: &mut dyn OutputStream) -> Result<()> {
        output.write(&[*self as u8])
    }

    fn read_binary(_: Endian, input: &mut dyn InputStream) -> Result<Self> {
        let mut byte = [0u8];
        input.read(&mut byte)?;
        Ok(byte[0] != 0)
    }

    fn to_text(&self) -> String {
        self.to_string()
    }

    fn from_text(text: &str) -> Result<Self> {
        match text.trim() {
            "" | "false" | "0" => Ok(false),
            "true" | "1" => Ok(true),
            _ => Err(parse_error(text, "bool")),
        }
    }
}

impl Value for String {
    #[inline]
    fn value_type_name() -> &'static str {
        "string"
    }

    fn write_binary(&self, _: Endian, output: &mut dyn OutputStream) -> Result<()> {
        output.write(self.as_bytes())?;
        output.write(&[0])
    }

    fn read_binary(_: Endian, input: &mut dyn InputStream) -> Result<Self> {
        let mut bytes = Vec::new();
        let mut byte = [0u8];
        loop {
            input.read(&mut byte)?;
            if byte[0] == 0 {
                break;
            }
            bytes.try_reserve(1)?;
            bytes.push(byte[0]);
        }
        String::from_utf8(bytes).map_err(|e| Error::fail(format!("invalid utf-8 string: {e}")))
    }

    fn to_text(&self) -> String {
        self.clone()
    }

    fn from_text(text: &str) -> Result<Self> {
        Ok(text.into())
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec::Vec;

    use super::{Plain, Value};
    use crate::stream::{MemoryReader, MemoryWriter};
    use crate::{Endian, ErrorKind};

    #[test]
    fn endianness_applies_to_numbers() {
        let mut w = MemoryWriter::new();
        0x0102_0304u32.write_binary(Endian::Big, &mut w).unwrap();
        0x0102_0304u32.write_binary(Endian::Little, &mut w).unwrap();
        assert_eq!(w.as_slice(), &[1, 2, 3, 4, 4, 3, 2, 1]);

        let mut r = MemoryReader::new(w.as_slice());
        assert_eq!(u32::read_binary(Endian::Big, &mut r).unwrap(), 0x0102_0304);
        assert_eq!(u32::read_binary(Endian::Little, &mut r).unwrap(), 0x0102_0304);
    }

    #[test]
    fn strings_are_null_terminated() {
        let mut w = MemoryWriter::new();
        String::from("abc").write_binary(Endian::Big, &mut w).unwrap();
        assert_eq!(w.as_slice(), b"abc\0");

        let mut r = MemoryReader::new(b"xy\0z");
        assert_eq!(String::read_binary(Endian::Little, &mut r).unwrap(), "xy");
        assert_eq!(r.remaining(), b"z");

        let mut unterminated = MemoryReader::new(b"no end");
        let error = String::read_binary(Endian::Little, &mut unterminated).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn text_forms() {
        assert_eq!(f32::from_text(&1.5f32.to_text()).unwrap(), 1.5);
        assert_eq!(i16::from_text("").unwrap(), 0);
        assert!(bool::from_text("true").unwrap());
        assert_eq!(
            u8::from_text("300").unwrap_err().kind(),
            ErrorKind::TypesNotMatch
        );
        assert_eq!(usize::value_type_name(), "uint64");
    }

    #[test]
    fn plain_packing() {
        let mut out = Vec::new();
        513u16.put(Endian::Big, &mut out);
        assert_eq!(out, [2, 1]);
        assert_eq!(u16::get(&out, Endian::Big), 513);
        assert_eq!(<f64 as Plain>::SIZE, 8);
    }
}
