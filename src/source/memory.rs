use crate::capability::{BasicInput, BasicOutput, Close, Positioned, Resizable, Seekable};
use crate::error::{Result, StreamError};
use crate::numeric::{Offset, Position};

/// Growable in-memory random-access stream.
///
/// Generic over the position type so narrow positions (`u8`, `u16`) can be
/// exercised against real data.  The optional knobs model less capable
/// sources: a read-only view, a non-seekable pipe, and a transport that
/// moves at most `n` bytes per call.
#[derive(Debug, Clone)]
pub struct MemoryStream<P: Position = u64> {
    data:         Vec<u8>,
    cursor:       usize,
    position:     P,
    read_only:    bool,
    seekable:     bool,
    max_transfer: Option<usize>,
    closed:       bool,
    close_calls:  usize,
}

impl<P: Position> MemoryStream<P> {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data:         data.into(),
            cursor:       0,
            position:     P::ZERO,
            read_only:    false,
            seekable:     true,
            max_transfer: None,
            closed:       false,
            close_calls:  0,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Reject writes and resizes with [`StreamError::Unsupported`].
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Advertise no random access: `can_seek()` is false and seek/length fail.
    pub fn sequential(mut self) -> Self {
        self.seekable = false;
        self
    }

    /// Cap every read and write call at `n` bytes (at least 1).
    pub fn with_max_transfer(mut self, n: usize) -> Self {
        self.max_transfer = Some(n.max(1));
        self
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of times `close` has been invoked, including repeated calls.
    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed { Err(StreamError::Closed) } else { Ok(()) }
    }

    fn ensure_seekable(&self) -> Result<()> {
        if self.seekable { Ok(()) } else { Err(StreamError::Unsupported("stream is not seekable")) }
    }

    fn transfer_len(&self, requested: usize) -> usize {
        match self.max_transfer {
            Some(cap) => requested.min(cap),
            None      => requested,
        }
    }
}

impl<P: Position> Close for MemoryStream<P> {
    fn close(&mut self) -> Result<()> {
        self.close_calls += 1;
        self.closed = true;
        Ok(())
    }
}

impl<P: Position> BasicInput for MemoryStream<P> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let available = self.data.len().saturating_sub(self.cursor);
        let n = self.transfer_len(buf.len().min(available));
        if n == 0 {
            return Ok(0);
        }
        let next = self.position.advance_by(n)?;
        buf[..n].copy_from_slice(&self.data[self.cursor..self.cursor + n]);
        self.cursor  += n;
        self.position = next;
        Ok(n)
    }
}

impl<P: Position> BasicOutput for MemoryStream<P> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        if self.read_only {
            return Err(StreamError::Unsupported("stream is read-only"));
        }
        let n = self.transfer_len(buf.len());
        if n == 0 {
            return Ok(0);
        }
        let next = self.position.advance_by(n)?;
        let end  = self.cursor + n;
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.cursor..end].copy_from_slice(&buf[..n]);
        self.cursor   = end;
        self.position = next;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()
    }
}

impl<P: Position> Positioned for MemoryStream<P> {
    type Position = P;

    fn position(&self) -> P {
        self.position
    }
}

impl<P: Position> Seekable for MemoryStream<P> {
    fn seek(&mut self, pos: P) -> Result<()> {
        self.ensure_open()?;
        self.ensure_seekable()?;
        let index = pos.checked_distance(P::ZERO)?.try_to_usize()?;
        if index > self.data.len() {
            return Err(StreamError::out_of_range(format!(
                "seek to {pos:?} beyond length {}", self.data.len()
            )));
        }
        self.cursor   = index;
        self.position = pos;
        Ok(())
    }

    fn length(&mut self) -> Result<P> {
        self.ensure_open()?;
        self.ensure_seekable()?;
        P::ZERO.advance_by(self.data.len())
    }

    fn can_seek(&self) -> bool {
        self.seekable
    }
}

impl<P: Position> Resizable for MemoryStream<P> {
    fn set_length(&mut self, len: P) -> Result<()> {
        self.ensure_open()?;
        self.ensure_seekable()?;
        if self.read_only {
            return Err(StreamError::Unsupported("stream is read-only"));
        }
        let len = len.checked_distance(P::ZERO)?.try_to_usize()?;
        self.data.resize(len, 0);
        Ok(())
    }
}
