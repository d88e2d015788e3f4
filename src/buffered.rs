//! Buffered input and output decorators.
//!
//! # Reader
//! [`BufferedReader`] serves reads from an internal buffer and refills it
//! with exactly one inner read, issued into the whole buffer, once it runs
//! dry.  A refill that returns zero bytes marks the inner stream exhausted;
//! every later read returns `Ok(0)` without touching the inner stream again.
//! An empty destination never triggers a refill.
//!
//! # Writer
//! [`BufferedWriter`] accepts bytes into its buffer and only pushes them to
//! the inner stream when the buffer is full, on `flush`, or on `close`.
//! `close` flushes on a best-effort basis: a failure there is logged and
//! swallowed so that releasing the stream never fails because of it.
//!
//! # Position
//! Both sides count their own logical position, starting at zero and
//! advanced (checked) by every byte that crosses the decorator.  It is
//! unrelated to whatever position the inner stream reports.
//!
//! # Sync and async
//! The buffer bookkeeping lives in private helpers shared by the blocking
//! and suspending trait impls; those impls differ only in how they call the
//! inner stream.

use log::{debug, trace, warn};

use crate::capability::{
    write_zero, AsyncBasicInput, AsyncBasicOutput, AsyncClose, BasicInput, BasicOutput, Close,
    Positioned,
};
use crate::error::{Result, StreamError};
use crate::numeric::Position;

/// Default buffer capacity: 80 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 80 * 1024;
/// Smallest buffer ever allocated, whatever the caller asks for.
pub const MIN_BUFFER_SIZE:     usize = 4 * 1024;
/// Largest buffer ever allocated, whatever the caller asks for.
pub const MAX_BUFFER_SIZE:     usize = 1024 * 1024;

// ── BufferOptions ─────────────────────────────────────────────────────────────

/// Configuration shared by [`BufferedReader`] and [`BufferedWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferOptions {
    /// Requested capacity; clamped to `[MIN_BUFFER_SIZE, MAX_BUFFER_SIZE]`.
    pub capacity:   usize,
    /// When set, closing the decorator leaves the inner stream open.
    pub leave_open: bool,
}

impl Default for BufferOptions {
    fn default() -> Self {
        Self {
            capacity:   DEFAULT_BUFFER_SIZE,
            leave_open: false,
        }
    }
}

impl BufferOptions {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, ..Self::default() }
    }

    pub fn leave_open(mut self, leave_open: bool) -> Self {
        self.leave_open = leave_open;
        self
    }

    pub fn effective_capacity(&self) -> usize {
        self.capacity.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE)
    }
}

// ── Reader ────────────────────────────────────────────────────────────────────

pub struct BufferedReader<S, P: Position = u64> {
    inner:      S,
    buf:        Box<[u8]>,
    pos:        usize,
    filled:     usize,
    position:   P,
    exhausted:  bool,
    leave_open: bool,
    closed:     bool,
}

impl<S, P: Position> BufferedReader<S, P> {
    pub fn new(inner: S) -> Self {
        Self::with_options(inner, BufferOptions::default())
    }

    pub fn with_options(inner: S, opts: BufferOptions) -> Self {
        Self {
            inner,
            buf:        vec![0u8; opts.effective_capacity()].into_boxed_slice(),
            pos:        0,
            filled:     0,
            position:   P::ZERO,
            exhausted:  false,
            leave_open: opts.leave_open,
            closed:     false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes fetched from the inner stream but not yet handed out.
    pub fn buffer(&self) -> &[u8] {
        &self.buf[self.pos..self.filled]
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Reading through the inner stream directly skips any buffered bytes.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed { Err(StreamError::Closed) } else { Ok(()) }
    }

    fn needs_refill(&self) -> bool {
        self.pos >= self.filled && !self.exhausted
    }

    fn refilled(&mut self, n: usize) {
        trace!("buffered reader: refill returned {n} byte(s)");
        self.pos    = 0;
        self.filled = n;
        if n == 0 {
            self.exhausted = true;
        }
    }

    fn drain_into(&mut self, dst: &mut [u8]) -> Result<usize> {
        let n = dst.len().min(self.filled - self.pos);
        if n == 0 {
            return Ok(0);
        }
        let next = self.position.advance_by(n)?;
        dst[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos     += n;
        self.position = next;
        Ok(n)
    }

    /// Marks the decorator closed; returns whether the inner stream must be
    /// closed as well.
    fn begin_close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        debug!("buffered reader closed at {:?} (leave_open={})", self.position, self.leave_open);
        !self.leave_open
    }
}

impl<S: BasicInput, P: Position> BasicInput for BufferedReader<S, P> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if self.needs_refill() {
            let n = self.inner.read(&mut self.buf)?;
            self.refilled(n);
        }
        self.drain_into(buf)
    }
}

impl<S: Close, P: Position> Close for BufferedReader<S, P> {
    fn close(&mut self) -> Result<()> {
        if self.begin_close() {
            self.inner.close()?;
        }
        Ok(())
    }
}

impl<S: AsyncBasicInput, P: Position> AsyncBasicInput for BufferedReader<S, P> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if self.needs_refill() {
            let n = self.inner.read(&mut self.buf).await?;
            self.refilled(n);
        }
        self.drain_into(buf)
    }
}

impl<S: AsyncClose, P: Position> AsyncClose for BufferedReader<S, P> {
    async fn close(&mut self) -> Result<()> {
        if self.begin_close() {
            self.inner.close().await?;
        }
        Ok(())
    }
}

impl<S, P: Position> Positioned for BufferedReader<S, P> {
    type Position = P;

    fn position(&self) -> P {
        self.position
    }
}

// ── Writer ────────────────────────────────────────────────────────────────────

/// Collects small writes and hands them to the inner stream a whole buffer
/// at a time.
///
/// Staged bytes reach the inner stream only on a full buffer, `flush` or
/// `close`.  Dropping the writer without closing it discards whatever is
/// still staged, since a flush may block or fail and `Drop` can report
/// neither.
pub struct BufferedWriter<S, P: Position = u64> {
    inner:      S,
    buf:        Box<[u8]>,
    len:        usize,
    /// Prefix of `buf[..len]` already accepted by the inner stream during an
    /// interrupted flush.
    written:    usize,
    position:   P,
    leave_open: bool,
    closed:     bool,
}

impl<S, P: Position> BufferedWriter<S, P> {
    pub fn new(inner: S) -> Self {
        Self::with_options(inner, BufferOptions::default())
    }

    pub fn with_options(inner: S, opts: BufferOptions) -> Self {
        Self {
            inner,
            buf:        vec![0u8; opts.effective_capacity()].into_boxed_slice(),
            len:        0,
            written:    0,
            position:   P::ZERO,
            leave_open: opts.leave_open,
            closed:     false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Bytes accepted but not yet pushed to the inner stream.
    pub fn buffer(&self) -> &[u8] {
        &self.buf[self.written..self.len]
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unflushed bytes are discarded.
    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed { Err(StreamError::Closed) } else { Ok(()) }
    }

    fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    fn stage(&mut self, src: &[u8]) -> Result<usize> {
        let n = src.len().min(self.buf.len() - self.len);
        let next = self.position.advance_by(n)?;
        self.buf[self.len..self.len + n].copy_from_slice(&src[..n]);
        self.len     += n;
        self.position = next;
        Ok(n)
    }

    fn drained(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(write_zero());
        }
        self.written += n;
        if self.written == self.len {
            trace!("buffered writer: flushed {} byte(s)", self.len);
            self.written = 0;
            self.len     = 0;
        }
        Ok(())
    }

    fn begin_close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        true
    }

    fn finish_close(&mut self, flushed: Result<()>) -> bool {
        if let Err(e) = flushed {
            warn!("buffered writer: flush on close failed, {} byte(s) dropped: {e}", self.len - self.written);
        }
        debug!("buffered writer closed at {:?} (leave_open={})", self.position, self.leave_open);
        !self.leave_open
    }
}

impl<S: BasicOutput, P: Position> BufferedWriter<S, P> {
    fn flush_buffer(&mut self) -> Result<()> {
        while self.written < self.len {
            let n = self.inner.write(&self.buf[self.written..self.len])?;
            self.drained(n)?;
        }
        Ok(())
    }
}

impl<S: AsyncBasicOutput, P: Position> BufferedWriter<S, P> {
    async fn flush_buffer_async(&mut self) -> Result<()> {
        while self.written < self.len {
            let n = self.inner.write(&self.buf[self.written..self.len]).await?;
            self.drained(n)?;
        }
        Ok(())
    }
}

impl<S: BasicOutput, P: Position> BasicOutput for BufferedWriter<S, P> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if self.is_full() {
            self.flush_buffer()?;
        }
        self.stage(buf)
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.flush_buffer()?;
        self.inner.flush()
    }
}

impl<S: BasicOutput, P: Position> Close for BufferedWriter<S, P> {
    fn close(&mut self) -> Result<()> {
        if !self.begin_close() {
            return Ok(());
        }
        let flushed = self.flush_buffer().and_then(|_| self.inner.flush());
        if self.finish_close(flushed) {
            self.inner.close()?;
        }
        Ok(())
    }
}

impl<S: AsyncBasicOutput, P: Position> AsyncBasicOutput for BufferedWriter<S, P> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if self.is_full() {
            self.flush_buffer_async().await?;
        }
        self.stage(buf)
    }

    async fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.flush_buffer_async().await?;
        self.inner.flush().await
    }
}

impl<S: AsyncBasicOutput, P: Position> AsyncClose for BufferedWriter<S, P> {
    async fn close(&mut self) -> Result<()> {
        if !self.begin_close() {
            return Ok(());
        }
        let flushed = match self.flush_buffer_async().await {
            Ok(())  => self.inner.flush().await,
            Err(e)  => Err(e),
        };
        if self.finish_close(flushed) {
            self.inner.close().await?;
        }
        Ok(())
    }
}

impl<S, P: Position> Positioned for BufferedWriter<S, P> {
    type Position = P;

    fn position(&self) -> P {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Seekable;
    use crate::source::MemoryStream;
    use crate::test_helpers::{sample, Probe};

    #[test]
    fn capacity_is_clamped() {
        let r: BufferedReader<_> = BufferedReader::with_options(MemoryStream::<u64>::empty(), BufferOptions::with_capacity(1));
        assert_eq!(r.capacity(), MIN_BUFFER_SIZE);
        let w: BufferedWriter<_> = BufferedWriter::with_options(MemoryStream::<u64>::empty(), BufferOptions::with_capacity(64 << 20));
        assert_eq!(w.capacity(), MAX_BUFFER_SIZE);
        assert_eq!(BufferOptions::default().effective_capacity(), DEFAULT_BUFFER_SIZE);
    }

    #[test]
    fn reader_refills_with_single_whole_buffer_reads() {
        let data = sample(10_000);
        let mut r: BufferedReader<_> = BufferedReader::with_options(Probe::<MemoryStream>::memory(data.clone()), BufferOptions::with_capacity(4096));
        let mut out = vec![0u8; 100];
        let n = r.read(&mut out).unwrap();
        assert_eq!(n, 100);
        assert_eq!(r.get_ref().reads, vec![4096]);
        assert_eq!(r.buffer().len(), 3996);
        assert_eq!(r.position(), 100);

        let mut all = out[..n].to_vec();
        let mut chunk = [0u8; 333];
        loop {
            let n = r.read(&mut chunk).unwrap();
            if n == 0 { break; }
            all.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(all, data);
        assert_eq!(r.position(), 10_000);
        assert!(r.get_ref().reads.iter().all(|&len| len == 4096));
    }

    #[test]
    fn exhaustion_is_remembered() {
        let mut r: BufferedReader<_> = BufferedReader::new(Probe::<MemoryStream>::memory(b"abc".to_vec()));
        let mut buf = [0u8; 8];
        assert_eq!(r.read(&mut buf).unwrap(), 3);
        assert_eq!(r.read(&mut buf).unwrap(), 0);
        let calls = r.get_ref().reads.len();
        assert_eq!(r.read(&mut buf).unwrap(), 0);
        assert_eq!(r.read(&mut buf).unwrap(), 0);
        assert_eq!(r.get_ref().reads.len(), calls);
    }

    #[test]
    fn empty_destination_never_refills() {
        let mut r: BufferedReader<_> = BufferedReader::new(Probe::<MemoryStream>::memory(b"abc".to_vec()));
        assert_eq!(r.read(&mut []).unwrap(), 0);
        assert!(r.get_ref().reads.is_empty());
    }

    #[test]
    fn reader_position_overflow_consumes_nothing() {
        let mut r: BufferedReader<_, u8> = BufferedReader::new(MemoryStream::<u64>::new(sample(400)));
        let mut buf = [0u8; 255];
        r.read_exact(&mut buf).unwrap();
        assert_eq!(r.position(), 255);
        let before = r.buffer().len();
        assert!(matches!(r.read(&mut [0u8; 1]), Err(StreamError::Overflow)));
        assert_eq!(r.buffer().len(), before);
    }

    #[test]
    fn writer_holds_bytes_until_full_or_flushed() {
        let mut w: BufferedWriter<_> = BufferedWriter::with_options(Probe::<MemoryStream>::memory(Vec::new()), BufferOptions::with_capacity(4096));
        w.write_all(&sample(1000)).unwrap();
        assert!(w.get_ref().writes.is_empty());
        assert_eq!(w.position(), 1000);

        w.write_all(&sample(5000)).unwrap();
        assert_eq!(w.get_ref().writes, vec![4096]);

        w.flush().unwrap();
        assert_eq!(w.get_ref().writes, vec![4096, 1904]);
        assert_eq!(w.get_ref().flushes, 1);
    }

    #[test]
    fn writer_write_returns_accepted_count() {
        let mut w: BufferedWriter<_> = BufferedWriter::with_options(MemoryStream::<u64>::empty(), BufferOptions::with_capacity(4096));
        assert_eq!(w.write(&sample(5000)).unwrap(), 4096);
        assert_eq!(w.write(&sample(10)).unwrap(), 10);
    }

    #[test]
    fn writer_resumes_partial_flush_without_duplicates() {
        let inner = Probe::new(MemoryStream::<u64>::empty().with_max_transfer(1000));
        let mut w: BufferedWriter<_> = BufferedWriter::with_options(inner, BufferOptions::with_capacity(4096));
        let data = sample(9000);
        w.write_all(&data).unwrap();
        w.close().unwrap();
        assert_eq!(w.get_ref().inner.contents(), &data[..]);
    }

    #[test]
    fn drop_without_close_discards_staged_bytes() {
        let mut base = MemoryStream::<u64>::empty();
        {
            let mut w: BufferedWriter<_> = BufferedWriter::with_options(&mut base, BufferOptions::with_capacity(4096));
            w.write_all(&sample(5000)).unwrap();
            assert_eq!(w.buffer().len(), 904);
        }
        assert_eq!(base.contents(), &sample(5000)[..4096]);
        assert_eq!(base.close_calls(), 0);
    }

    #[test]
    fn close_swallows_flush_failure_and_releases_inner() {
        let mut inner = Probe::<MemoryStream>::memory(Vec::new());
        inner.fail_writes = true;
        let mut w: BufferedWriter<_> = BufferedWriter::new(inner);
        w.write_all(b"lost").unwrap();
        assert!(w.flush().is_err());
        w.close().unwrap();
        assert_eq!(w.get_ref().closes, 1);
        assert!(matches!(w.write(b"x"), Err(StreamError::Closed)));
    }

    #[test]
    fn close_is_idempotent_and_honours_leave_open() {
        let mut w: BufferedWriter<_> = BufferedWriter::new(Probe::<MemoryStream>::memory(Vec::new()));
        w.write_all(b"data").unwrap();
        w.close().unwrap();
        w.close().unwrap();
        assert_eq!(w.get_ref().closes, 1);
        assert_eq!(w.get_ref().inner.contents(), b"data");

        let mut base = MemoryStream::<u64>::new(b"xyz".to_vec());
        {
            let mut r: BufferedReader<_> = BufferedReader::with_options(&mut base, BufferOptions::default().leave_open(true));
            let mut buf = [0u8; 1];
            r.read_exact(&mut buf).unwrap();
            r.close().unwrap();
            assert!(matches!(r.read(&mut buf), Err(StreamError::Closed)));
        }
        assert!(!base.is_closed());
        base.seek(0).unwrap();
        let mut buf = [0u8; 3];
        base.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"xyz");
    }
}
