//! Transport abstraction
//!
//! The sensor link supplies a byte-oriented read primitive that returns the
//! bytes currently available, or zero on timeout. Framing and
//! synchronization are entirely the frame decoder's responsibility.

use std::io;

use crate::error::VitalsError;

/// Byte source feeding the frame decoder.
pub trait Transport {
    /// Read available bytes into `buf`. Returns the number of bytes read;
    /// zero means a timeout with no data, not end of stream.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, VitalsError>;

    /// True once the source can produce no further data. Live serial
    /// devices never report exhaustion; replayed captures do.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Transport over any [`io::Read`] source: a serial device node opened as a
/// file, a recorded capture, or a test cursor.
pub struct ReaderTransport<R: io::Read> {
    inner: R,
    exhausted: bool,
}

impl<R: io::Read> ReaderTransport<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            exhausted: false,
        }
    }

}

impl<R: io::Read> Transport for ReaderTransport<R> {
    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, VitalsError> {
        match self.inner.read(buf) {
            Ok(0) => {
                self.exhausted = true;
                Ok(0)
            }
            Ok(n) => Ok(n),
            // A read timeout carries no data but is not a failure.
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(VitalsError::Transport(e)),
        }
    }
}
