use alloc::format;
use alloc::vec::Vec;

use super::{InputStream, OutputStream};
use crate::{Error, Result};

// -----------------------------------------------------------------------------
// MemoryWriter

/// A growable in-memory [`OutputStream`].
///
/// Writing in the middle overwrites existing bytes, writing at the end
/// appends.
///
/// # Examples
///
/// ```
/// use ut_meta::stream::{MemoryWriter, OutputStream};
///
/// let mut w = MemoryWriter::new();
/// w.write(&[0, 0, 3]).unwrap();
/// w.move_cursor(0).unwrap();
/// w.write(&[1]).unwrap();
///
/// assert_eq!(w.as_slice(), &[1, 0, 3]);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryWriter {
    buffer: Vec<u8>,
    position: usize,
}

impl MemoryWriter {
    #[inline]
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            position: 0,
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

impl OutputStream for MemoryWriter {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.position + bytes.len();
        if end > self.buffer.len() {
            self.buffer.try_reserve(end - self.buffer.len())?;
            self.buffer.resize(end, 0);
        }
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    #[inline]
    fn cursor(&mut self) -> Result<u64> {
        Ok(self.position as u64)
    }

    fn move_cursor(&mut self, position: u64) -> Result<()> {
        match usize::try_from(position) {
            Ok(position) if position <= self.buffer.len() => {
                self.position = position;
                Ok(())
            }
            _ => Err(Error::out_of_bounds(format!(
                "cursor {position} is past the end of a {} byte buffer",
                self.buffer.len()
            ))),
        }
    }
}

// -----------------------------------------------------------------------------
// MemoryReader

/// An [`InputStream`] over a byte slice.
///
/// # Examples
///
/// ```
/// use ut_meta::stream::{InputStream, MemoryReader};
///
/// let mut r = MemoryReader::new(&[1, 2, 3]);
/// let mut buf = [0; 2];
/// r.read(&mut buf).unwrap();
/// assert_eq!(buf, [1, 2]);
/// assert!(r.read(&mut buf).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct MemoryReader<'s> {
    data: &'s [u8],
    position: usize,
}

impl<'s> MemoryReader<'s> {
    #[inline]
    pub const fn new(data: &'s [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Bytes not read yet.
    #[inline]
    pub fn remaining(&self) -> &'s [u8] {
        &self.data[self.position..]
    }
}

impl InputStream for MemoryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self.position + buf.len();
        let Some(src) = self.data.get(self.position..end) else {
            return Err(Error::out_of_bounds(format!(
                "cannot read {} bytes at {} from a {} byte buffer",
                buf.len(),
                self.position,
                self.data.len()
            )));
        };
        buf.copy_from_slice(src);
        self.position = end;
        Ok(())
    }

    #[inline]
    fn cursor(&mut self) -> Result<u64> {
        Ok(self.position as u64)
    }

    fn move_cursor(&mut self, position: u64) -> Result<()> {
        match usize::try_from(position) {
            Ok(position) if position <= self.data.len() => {
                self.position = position;
                Ok(())
            }
            _ => Err(Error::out_of_bounds(format!(
                "cursor {position} is past the end of a {} byte buffer",
                self.data.len()
            ))),
        }
    }

    #[inline]
    fn size(&mut self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryReader, MemoryWriter};
    use crate::ErrorKind;
    use crate::stream::{InputStream, OutputStream};

    #[test]
    fn writer_backpatch() {
        let mut w = MemoryWriter::new();
        w.write(&[0; 4]).unwrap();
        w.write(b"abc").unwrap();
        let end = w.cursor().unwrap();

        w.move_cursor(0).unwrap();
        w.write(&7u32.to_le_bytes()).unwrap();
        w.move_cursor(end).unwrap();
        w.write(&[0]).unwrap();

        assert_eq!(w.into_inner(), [7, 0, 0, 0, b'a', b'b', b'c', 0]);
    }

    #[test]
    fn reader_bounds() {
        let mut r = MemoryReader::new(&[1, 2, 3, 4]);
        assert_eq!(r.move_cursor(5).unwrap_err().kind(), ErrorKind::OutOfBounds);
        r.move_cursor(4).unwrap();
        assert!(r.remaining().is_empty());
        assert_eq!(r.size().unwrap(), 4);

        let mut byte = [0];
        assert_eq!(r.read(&mut byte).unwrap_err().kind(), ErrorKind::OutOfBounds);
    }
}
