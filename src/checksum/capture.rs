use log::{debug, trace};

use crate::capability::{
    AsyncBasicInput, AsyncBasicOutput, AsyncClose, BasicInput, BasicOutput, Close, Positioned,
};
use crate::checksum::{Checksum, ChecksumKind, ChecksumSlot, Crc};
use crate::error::{Result, StreamError};
use crate::numeric::Position;

/// Checksums every byte that crosses it, in either direction.
///
/// Only bytes actually transferred are fed to the CRC: a read or write that
/// moves fewer bytes than requested contributes exactly what it moved.  The
/// final `(checksum, length)` goes into the slot on `close`, or on drop if
/// the decorator is torn down without being closed.
pub struct CrcCapture<S, P: Position = u64> {
    inner:      S,
    crc:        Crc,
    position:   P,
    slot:       ChecksumSlot<P>,
    published:  bool,
    leave_open: bool,
    closed:     bool,
}

impl<S, P: Position> CrcCapture<S, P> {
    pub fn new(inner: S, kind: ChecksumKind, slot: ChecksumSlot<P>, leave_open: bool) -> Self {
        Self {
            inner,
            crc: Crc::new(kind),
            position: P::ZERO,
            slot,
            published: false,
            leave_open,
            closed: false,
        }
    }

    /// The result so far, without publishing it.
    pub fn checksum(&self) -> Checksum<P> {
        Checksum {
            kind:   self.crc.kind(),
            value:  self.crc.value(),
            length: self.position,
        }
    }

    pub fn slot(&self) -> &ChecksumSlot<P> {
        &self.slot
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Bytes moved through the inner stream directly are not checksummed.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed { Err(StreamError::Closed) } else { Ok(()) }
    }

    /// Bounds a request so every byte it moves can be counted.
    fn admit(&self, len: usize) -> Result<usize> {
        match self.position.room(len) {
            0 if len > 0 => Err(StreamError::Overflow),
            n => Ok(n),
        }
    }

    fn transferred(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.position = self.position.advance_by(bytes.len())?;
        self.crc.update(bytes);
        trace!("crc capture: {} byte(s), now at {:?}", bytes.len(), self.position);
        Ok(())
    }

    fn publish(&mut self) {
        if self.published {
            return;
        }
        self.published = true;
        let result = self.checksum();
        debug!("crc capture: publishing {result:?}");
        self.slot.publish(result);
    }

    fn begin_close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.publish();
        true
    }
}

impl<S: Close, P: Position> Close for CrcCapture<S, P> {
    fn close(&mut self) -> Result<()> {
        if self.begin_close() && !self.leave_open {
            self.inner.close()?;
        }
        Ok(())
    }
}

impl<S: BasicInput, P: Position> BasicInput for CrcCapture<S, P> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let want = self.admit(buf.len())?;
        let n = self.inner.read(&mut buf[..want])?;
        self.transferred(&buf[..n])?;
        Ok(n)
    }
}

impl<S: BasicOutput, P: Position> BasicOutput for CrcCapture<S, P> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        let want = self.admit(buf.len())?;
        let n = self.inner.write(&buf[..want])?;
        self.transferred(&buf[..n])?;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.inner.flush()
    }
}

impl<S: AsyncClose, P: Position> AsyncClose for CrcCapture<S, P> {
    async fn close(&mut self) -> Result<()> {
        if self.begin_close() && !self.leave_open {
            self.inner.close().await?;
        }
        Ok(())
    }
}

impl<S: AsyncBasicInput, P: Position> AsyncBasicInput for CrcCapture<S, P> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        let want = self.admit(buf.len())?;
        let n = self.inner.read(&mut buf[..want]).await?;
        self.transferred(&buf[..n])?;
        Ok(n)
    }
}

impl<S: AsyncBasicOutput, P: Position> AsyncBasicOutput for CrcCapture<S, P> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        let want = self.admit(buf.len())?;
        let n = self.inner.write(&buf[..want]).await?;
        self.transferred(&buf[..n])?;
        Ok(n)
    }

    async fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.inner.flush().await
    }
}

impl<S, P: Position> Positioned for CrcCapture<S, P> {
    type Position = P;

    fn position(&self) -> P {
        self.position
    }
}

impl<S, P: Position> Drop for CrcCapture<S, P> {
    fn drop(&mut self) {
        self.publish();
    }
}
