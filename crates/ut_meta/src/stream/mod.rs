//! Byte streams consumed by the binary controller modes.
//!
//! Output streams must support repositioning: sizes and link ids are
//! reserved first and written once known.

// -----------------------------------------------------------------------------
// Modules

mod memory;

#[cfg(feature = "std")]
mod io;

// -----------------------------------------------------------------------------
// Exports

pub use memory::{MemoryReader, MemoryWriter};

#[cfg(feature = "std")]
pub use io::IoStream;

use crate::Result;

/// A positioned source of bytes.
pub trait InputStream {
    /// Fills `buf` completely or fails with [`OutOfBounds`](crate::ErrorKind::OutOfBounds).
    fn read(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Returns the current position in bytes from the start.
    fn cursor(&mut self) -> Result<u64>;

    /// Moves to an absolute position.
    fn move_cursor(&mut self, position: u64) -> Result<()>;

    /// Total length of the stream in bytes.
    fn size(&mut self) -> Result<u64>;
}

/// A positioned, rewritable sink of bytes.
pub trait OutputStream {
    /// Writes all of `bytes` at the current position.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Returns the current position in bytes from the start.
    fn cursor(&mut self) -> Result<u64>;

    /// Moves to an absolute position.
    fn move_cursor(&mut self, position: u64) -> Result<()>;
}
