use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{Frame, FrameHeader, MAX_HEADER_LEN};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Read one `kind:endpointId:lengthHex:` header, a byte at a time.
///
/// Returns `ConnectionClosed` if the stream ends before any header byte and
/// `IncompleteHeader` if it ends part-way through one.
pub fn read_header<R: Read>(reader: &mut R) -> Result<FrameHeader> {
    let mut buf = Vec::with_capacity(16);
    loop {
        if let Some(header) = step_header(reader, &mut buf)? {
            return Ok(header);
        }
    }
}

/// Read exactly `len` bytes, looping over short reads.
///
/// A zero-byte read before `len` bytes arrive is `ConnectionClosed`.
pub fn read_exact<R: Read>(reader: &mut R, len: usize) -> Result<Bytes> {
    let mut buf = BytesMut::zeroed(len);
    let mut filled = 0usize;
    while filled < len {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(buf.freeze())
}

/// Read a header followed by its payload.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Frame> {
    let header = read_header(reader)?;
    let payload = read_exact(reader, header.length as usize)?;
    trace!(
        kind = %header.kind,
        endpoint = %header.endpoint_id,
        len = header.length,
        "frame read"
    );
    Ok(Frame { header, payload })
}

/// Read bytes until `\n` or end of stream, up to `max` bytes.
///
/// The newline and a preceding `\r` are not part of the result. Used for the
/// unframed replies of generic commands. End of stream before the first byte
/// is `ConnectionClosed`.
pub fn read_line<R: Read>(reader: &mut R, max: usize) -> Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    let mut seen_any = false;
    loop {
        match reader.read(&mut byte) {
            Ok(0) if !seen_any => return Err(FrameError::ConnectionClosed),
            Ok(0) => break,
            Ok(_) => {
                seen_any = true;
                if byte[0] == b'\n' {
                    break;
                }
                line.push(byte[0]);
                if line.len() > max {
                    return Err(FrameError::PayloadTooLarge {
                        size: line.len(),
                        max,
                    });
                }
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

/// Read one byte into `buf`; return the header once it is complete.
fn step_header<R: Read>(reader: &mut R, buf: &mut Vec<u8>) -> Result<Option<FrameHeader>> {
    let mut byte = [0u8; 1];
    match reader.read(&mut byte) {
        Ok(0) if buf.is_empty() => Err(FrameError::ConnectionClosed),
        Ok(0) => Err(FrameError::IncompleteHeader(buf.len())),
        Ok(_) => {
            buf.push(byte[0]);
            if FrameHeader::is_complete(buf) {
                return FrameHeader::parse(buf).map(Some);
            }
            if buf.len() >= MAX_HEADER_LEN {
                return Err(FrameError::MalformedHeader(
                    String::from_utf8_lossy(buf).into_owned(),
                ));
            }
            Ok(None)
        }
        Err(err) if err.kind() == ErrorKind::Interrupted => Ok(None),
        Err(err) => Err(FrameError::Io(err)),
    }
}

/// Reads complete frames from any `Read` stream, surviving read timeouts.
///
/// Unlike [`read_frame`], a timeout (`WouldBlock`/`TimedOut`) part-way
/// through a frame does not lose the bytes already consumed: the error is
/// returned and the next call resumes where the previous one stopped. This
/// is what lets the event loop poll a socket with a short read timeout.
pub struct FrameReader<T> {
    inner: T,
    header_buf: Vec<u8>,
    pending: Option<FrameHeader>,
    payload: BytesMut,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            header_buf: Vec::with_capacity(16),
            pending: None,
            payload: BytesMut::new(),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached
    /// between frames.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let header = match self.pending.take() {
            Some(header) => header,
            None => loop {
                if let Some(header) = step_header(&mut self.inner, &mut self.header_buf)? {
                    self.header_buf.clear();
                    break header;
                }
            },
        };

        let len = header.length as usize;
        while self.payload.len() < len {
            let want = (len - self.payload.len()).min(READ_CHUNK_SIZE);
            let mut chunk = [0u8; READ_CHUNK_SIZE];
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => self.payload.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.pending = Some(header);
                    return Err(FrameError::Io(err));
                }
            }
        }

        let payload = self.payload.split_to(len).freeze();
        Ok(Frame { header, payload })
    }

    /// True if a frame has been partially consumed.
    pub fn has_partial(&self) -> bool {
        !self.header_buf.is_empty() || self.pending.is_some()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
