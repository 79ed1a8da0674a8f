use std::io::{ErrorKind as IoErrorKind, Read, Seek, SeekFrom, Write};

use alloc::format;

use super::{InputStream, OutputStream};
use crate::{Error, Result};

/// Adapts any `std::io` stream into an [`InputStream`] and [`OutputStream`].
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use ut_meta::stream::{IoStream, OutputStream};
///
/// let mut stream = IoStream::new(Cursor::new(Vec::new()));
/// stream.write(b"ut").unwrap();
/// assert_eq!(stream.into_inner().into_inner(), b"ut");
/// ```
#[derive(Debug, Default)]
pub struct IoStream<S>(S);

impl<S> IoStream<S> {
    #[inline]
    pub const fn new(stream: S) -> Self {
        Self(stream)
    }

    #[inline]
    pub fn into_inner(self) -> S {
        self.0
    }
}

fn convert(error: std::io::Error) -> Error {
    match error.kind() {
        IoErrorKind::UnexpectedEof => Error::out_of_bounds(format!("{error}")),
        IoErrorKind::OutOfMemory => Error::out_of_memory(format!("{error}")),
        IoErrorKind::NotFound => Error::not_found(format!("{error}")),
        _ => Error::fail(format!("{error}")),
    }
}

impl<S: Read + Seek> InputStream for IoStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        self.0.read_exact(buf).map_err(convert)
    }

    fn cursor(&mut self) -> Result<u64> {
        self.0.stream_position().map_err(convert)
    }

    fn move_cursor(&mut self, position: u64) -> Result<()> {
        self.0.seek(SeekFrom::Start(position)).map(drop).map_err(convert)
    }

    fn size(&mut self) -> Result<u64> {
        let position = self.0.stream_position().map_err(convert)?;
        let end = self.0.seek(SeekFrom::End(0)).map_err(convert)?;
        self.0.seek(SeekFrom::Start(position)).map_err(convert)?;
        Ok(end)
    }
}

impl<S: Write + Seek> OutputStream for IoStream<S> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.0.write_all(bytes).map_err(convert)
    }

    fn cursor(&mut self) -> Result<u64> {
        self.0.stream_position().map_err(convert)
    }

    fn move_cursor(&mut self, position: u64) -> Result<()> {
        self.0.seek(SeekFrom::Start(position)).map(drop).map_err(convert)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;
    use std::io::Cursor;

    use super::IoStream;
    use crate::stream::{InputStream, OutputStream};
    use crate::{ErrorKind, Info, Snapshot};

    #[test]
    fn cursor_round_trip() {
        let mut values: Vec<u16> = vec![3, 1, 4, 1, 5];
        let mut stream = IoStream::new(Cursor::new(Vec::new()));
        Snapshot::capture_with(&mut values, "values", Info::complete())
            .unwrap()
            .save_binary(&mut stream)
            .unwrap();

        let end = OutputStream::cursor(&mut stream).unwrap();
        InputStream::move_cursor(&mut stream, 0).unwrap();
        assert_eq!(InputStream::size(&mut stream).unwrap(), end);
        assert_eq!(InputStream::cursor(&mut stream).unwrap(), 0);

        let mut loaded: Vec<u16> = Vec::new();
        Snapshot::capture(&mut loaded)
            .unwrap()
            .load_binary(&mut stream)
            .unwrap();
        assert_eq!(loaded, values);
    }

    #[test]
    fn short_read_is_out_of_bounds() {
        let mut stream = IoStream::new(Cursor::new(vec![1u8, 2]));
        let mut buf = [0; 4];
        let error = InputStream::read(&mut stream, &mut buf).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::OutOfBounds);
    }
}
