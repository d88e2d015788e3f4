//! Backward byte iteration over a random-access input.
//!
//! [`ReverseBytes`] yields the bytes of `[offset, offset + count)` from the
//! last one down to the first, loading the range in fixed-size chunks from
//! its end towards its start.  Nothing beyond one chunk is ever held in
//! memory.
//!
//! The range is validated against the inner stream's length when the
//! iterator is built, so a chunk read that comes back short is reported as
//! [`StreamError::Consistency`] rather than treated as end of stream.
//!
//! # Progress
//! An optional callback receives the cumulative number of bytes *loaded*:
//! once (with zero) before the first byte, then after every chunk load.
//! Loading runs ahead of consumption by up to one chunk.

use std::iter::FusedIterator;

use log::{debug, trace};

use crate::capability::{
    release_inner, release_inner_async, AsyncBasicInput, AsyncClose, AsyncSeekable, BasicInput,
    Close, OffsetOf, Positioned, Seekable,
};
use crate::error::{Result, StreamError};
use crate::numeric::{Offset, Position};
use crate::util::{read_full, read_full_async};

/// Default chunk size: 64 KiB.
pub const REVERSE_CHUNK_SIZE: usize = 64 * 1024;

pub struct ReverseBytes<S: Positioned, F = fn(OffsetOf<S>)> {
    inner:      S,
    offset:     S::Position,
    end:        S::Position,
    /// Start of the chunk currently in `buf`; `end` before the first load.
    chunk_base: S::Position,
    buf:        Box<[u8]>,
    /// Bytes of the loaded chunk not yet yielded; the next byte is `buf[cursor - 1]`.
    cursor:     usize,
    loaded:     OffsetOf<S>,
    started:    bool,
    failed:     bool,
    progress:   Option<F>,
    leave_open: bool,
    closed:     bool,
}

fn validate_range<P: Position>(offset: P, count: P::Offset, length: P) -> Result<P> {
    let end = offset.checked_advance(count)?;
    if end > length {
        return Err(StreamError::out_of_range(format!(
            "range {offset:?}+{count:?} exceeds stream length {length:?}"
        )));
    }
    Ok(end)
}

fn chunk_buffer<O: Offset>(chunk_size: usize, count: O) -> Box<[u8]> {
    vec![0u8; chunk_size.max(1).min(count.to_usize_saturating().max(1))].into_boxed_slice()
}

impl<S: Seekable + Close> ReverseBytes<S> {
    /// Iterate `[offset, offset + count)` of `inner` backwards.
    ///
    /// Fails with `Unsupported` if `inner` cannot seek, `Overflow` if the
    /// range end is not representable and `OutOfRange` if it lies past the
    /// stream's length.  `inner` is closed on failure unless `leave_open`.
    pub fn new(mut inner: S, offset: S::Position, count: OffsetOf<S>, leave_open: bool) -> Result<Self> {
        if !inner.can_seek() {
            let err = StreamError::Unsupported("reverse iteration requires random access");
            return Err(release_inner(inner, leave_open, err));
        }
        let length = match inner.length() {
            Ok(len) => len,
            Err(e)  => return Err(release_inner(inner, leave_open, e)),
        };
        match validate_range(offset, count, length) {
            Ok(end) => Ok(Self::build(inner, offset, end, count, leave_open)),
            Err(e)  => Err(release_inner(inner, leave_open, e)),
        }
    }
}

impl<S: AsyncSeekable + AsyncClose> ReverseBytes<S> {
    pub async fn open(mut inner: S, offset: S::Position, count: OffsetOf<S>, leave_open: bool) -> Result<Self> {
        if !inner.can_seek() {
            let err = StreamError::Unsupported("reverse iteration requires random access");
            return Err(release_inner_async(inner, leave_open, err).await);
        }
        let length = match inner.length().await {
            Ok(len) => len,
            Err(e)  => return Err(release_inner_async(inner, leave_open, e).await),
        };
        match validate_range(offset, count, length) {
            Ok(end) => Ok(Self::build(inner, offset, end, count, leave_open)),
            Err(e)  => Err(release_inner_async(inner, leave_open, e).await),
        }
    }
}

impl<S: Positioned> ReverseBytes<S> {
    fn build(inner: S, offset: S::Position, end: S::Position, count: OffsetOf<S>, leave_open: bool) -> Self {
        debug!("reverse: range {offset:?}..{end:?}");
        Self {
            inner,
            offset,
            end,
            chunk_base: end,
            buf:        chunk_buffer(REVERSE_CHUNK_SIZE, count),
            cursor:     0,
            loaded:     <OffsetOf<S> as Offset>::ZERO,
            started:    false,
            failed:     false,
            progress:   None,
            leave_open,
            closed:     false,
        }
    }

    /// Report loading progress to `report`.
    pub fn with_progress<G: FnMut(OffsetOf<S>)>(self, report: G) -> ReverseBytes<S, G> {
        ReverseBytes {
            inner:      self.inner,
            offset:     self.offset,
            end:        self.end,
            chunk_base: self.chunk_base,
            buf:        self.buf,
            cursor:     self.cursor,
            loaded:     self.loaded,
            started:    self.started,
            failed:     self.failed,
            progress:   Some(report),
            leave_open: self.leave_open,
            closed:     self.closed,
        }
    }
}

impl<S: Positioned, F: FnMut(OffsetOf<S>)> ReverseBytes<S, F> {
    /// Load at most `size` bytes per inner read.  Restarts the iteration.
    pub fn with_chunk_size(mut self, size: usize) -> Result<Self> {
        let count = self.end.checked_distance(self.offset)?;
        self.buf = chunk_buffer(size, count);
        self.reset();
        Ok(self)
    }

    /// Restart from the end of the range.
    pub fn reset(&mut self) {
        self.chunk_base = self.end;
        self.cursor     = 0;
        self.loaded     = <OffsetOf<S> as Offset>::ZERO;
        self.started    = false;
        self.failed     = false;
    }

    pub fn chunk_size(&self) -> usize {
        self.buf.len()
    }

    /// Bytes still to be yielded.
    pub fn remaining(&self) -> Result<OffsetOf<S>> {
        self.chunk_base
            .checked_distance(self.offset)?
            .add_checked(<OffsetOf<S> as Offset>::try_from_usize(self.cursor)?)
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Truncating the inner stream below the range makes the next chunk
    /// load fail with `Consistency`.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn report(&mut self) {
        if let Some(report) = self.progress.as_mut() {
            report(self.loaded);
        }
    }

    /// Emit the initial progress report and decide whether a chunk load is
    /// due.  Returns the next chunk as `(start, len)`, or `None` when the
    /// loaded chunk still has bytes or the range is exhausted.
    fn plan(&mut self) -> Result<Option<(S::Position, usize)>> {
        if self.closed {
            return Err(StreamError::Closed);
        }
        if !self.started {
            self.started = true;
            self.report();
        }
        if self.cursor > 0 {
            return Ok(None);
        }
        let span = self.chunk_base.checked_distance(self.offset)?;
        if span == <OffsetOf<S> as Offset>::ZERO {
            return Ok(None);
        }
        let len   = span.to_usize_saturating().min(self.buf.len());
        let skip  = span.sub_checked(<OffsetOf<S> as Offset>::try_from_usize(len)?)?;
        let start = self.offset.checked_advance(skip)?;
        Ok(Some((start, len)))
    }

    fn chunk_loaded(&mut self, start: S::Position, len: usize, got: usize) -> Result<()> {
        if got < len {
            return Err(StreamError::Consistency(format!(
                "chunk at {start:?} delivered {got} of {len} validated byte(s)"
            )));
        }
        trace!("reverse: loaded {len} byte(s) at {start:?}");
        self.loaded     = self.loaded.add_checked(<OffsetOf<S> as Offset>::try_from_usize(len)?)?;
        self.chunk_base = start;
        self.cursor     = len;
        self.report();
        Ok(())
    }

    fn pop_byte(&mut self) -> Option<u8> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.buf[self.cursor])
    }

    fn begin_close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        true
    }
}

// ── Blocking ──────────────────────────────────────────────────────────────────

impl<S: BasicInput + Seekable, F: FnMut(OffsetOf<S>)> ReverseBytes<S, F> {
    fn step(&mut self) -> Result<Option<u8>> {
        if let Some((start, len)) = self.plan()? {
            self.inner.seek(start)?;
            let got = read_full(&mut self.inner, &mut self.buf[..len])?;
            self.chunk_loaded(start, len, got)?;
        }
        Ok(self.pop_byte())
    }
}

impl<S: BasicInput + Seekable, F: FnMut(OffsetOf<S>)> Iterator for ReverseBytes<S, F> {
    type Item = Result<u8>;

    fn next(&mut self) -> Option<Result<u8>> {
        if self.failed {
            return None;
        }
        match self.step() {
            Ok(byte) => byte.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        match self.remaining() {
            Ok(n) => (0, n.try_to_usize().ok()),
            Err(_) => (0, None),
        }
    }
}

impl<S: BasicInput + Seekable, F: FnMut(OffsetOf<S>)> FusedIterator for ReverseBytes<S, F> {}

impl<S: Close + Positioned, F: FnMut(OffsetOf<S>)> Close for ReverseBytes<S, F> {
    fn close(&mut self) -> Result<()> {
        if self.begin_close() && !self.leave_open {
            self.inner.close()?;
        }
        Ok(())
    }
}

// ── Suspending ────────────────────────────────────────────────────────────────

impl<S: AsyncBasicInput + AsyncSeekable, F: FnMut(OffsetOf<S>)> ReverseBytes<S, F> {
    /// Next byte towards the start of the range, `None` once it is exhausted.
    /// Suspends only while a chunk is being loaded.
    pub async fn next_byte(&mut self) -> Result<Option<u8>> {
        if let Some((start, len)) = self.plan()? {
            self.inner.seek(start).await?;
            let got = read_full_async(&mut self.inner, &mut self.buf[..len]).await?;
            self.chunk_loaded(start, len, got)?;
        }
        Ok(self.pop_byte())
    }
}

impl<S: AsyncClose + Positioned, F: FnMut(OffsetOf<S>)> AsyncClose for ReverseBytes<S, F> {
    async fn close(&mut self) -> Result<()> {
        if self.begin_close() && !self.leave_open {
            self.inner.close().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Resizable;
    use crate::source::MemoryStream;
    use crate::test_helpers::{sample, Probe};

    fn base() -> MemoryStream<u64> {
        MemoryStream::new((0u8..100).collect::<Vec<u8>>())
    }

    #[test]
    fn yields_range_backwards() {
        let rev = ReverseBytes::new(base(), 10, 20, false).unwrap();
        let mut got: Vec<u8> = rev.collect::<Result<_>>().unwrap();
        got.reverse();
        assert_eq!(got, (10u8..30).collect::<Vec<u8>>());
    }

    #[test]
    fn loads_in_chunks_from_the_end() {
        let data = sample(1000);
        let probe = Probe::<MemoryStream>::memory(data.clone());
        let mut rev = ReverseBytes::new(probe, 100, 700, false).unwrap().with_chunk_size(256).unwrap();
        let got: Vec<u8> = rev.by_ref().collect::<Result<_>>().unwrap();
        let expected: Vec<u8> = data[100..800].iter().rev().copied().collect();
        assert_eq!(got, expected);
        assert_eq!(rev.get_ref().reads, vec![256, 256, 188]);
    }

    #[test]
    fn reset_restarts_iteration() {
        let mut rev = ReverseBytes::new(base(), 0, 100, false).unwrap().with_chunk_size(30).unwrap();
        let first: Vec<u8> = rev.by_ref().take(45).collect::<Result<_>>().unwrap();
        assert_eq!(first[0], 99);
        rev.reset();
        let all: Vec<u8> = rev.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(all.len(), 100);
        assert_eq!(&all[..45], &first[..]);
        assert_eq!(rev.remaining().unwrap(), 0);
    }

    #[test]
    fn progress_reports_bytes_loaded() {
        let mut seen = Vec::new();
        {
            let rev = ReverseBytes::new(base(), 0, 100, false)
                .unwrap()
                .with_progress(|n| seen.push(n))
                .with_chunk_size(40)
                .unwrap();
            assert_eq!(rev.filter_map(|b| b.ok()).count(), 100);
        }
        assert_eq!(seen, vec![0, 40, 80, 100]);
    }

    #[test]
    fn empty_range_yields_nothing() {
        let mut seen = Vec::new();
        let mut rev = ReverseBytes::new(base(), 100, 0, false).unwrap().with_progress(|n| seen.push(n));
        assert!(rev.next().is_none());
        drop(rev);
        assert_eq!(seen, vec![0]);
    }

    #[test]
    fn range_past_length_is_rejected() {
        let mut b = base();
        let r = ReverseBytes::new(&mut b, 90, 11, false);
        assert!(matches!(r, Err(StreamError::OutOfRange(_))));
        assert!(b.is_closed());

        let pipe = MemoryStream::<u64>::new(vec![0u8; 4]).sequential();
        assert!(matches!(ReverseBytes::new(pipe, 0, 4, false), Err(StreamError::Unsupported(_))));
    }

    #[test]
    fn short_chunk_is_a_consistency_error() {
        let mut rev = ReverseBytes::new(base(), 0, 50, false).unwrap();
        rev.get_mut().set_length(30).unwrap();
        assert!(matches!(rev.next(), Some(Err(StreamError::Consistency(_)))));
        assert!(rev.next().is_none());
    }

    #[test]
    fn close_honours_leave_open() {
        let mut b = base();
        {
            let mut rev = ReverseBytes::new(&mut b, 0, 10, true).unwrap();
            rev.close().unwrap();
            rev.close().unwrap();
            assert!(matches!(rev.next(), Some(Err(StreamError::Closed))));
        }
        assert!(!b.is_closed());
    }
}
