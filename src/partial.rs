//! Windowed ("partial") streams.
//!
//! A [`PartialReader`] or [`PartialWriter`] exposes the sub-range
//! `[start, start + size)` of an inner stream as a complete stream of its
//! own, starting at logical position zero.  Consumers of the window cannot
//! reach bytes outside it: reads are clipped at the window end, writes that
//! would cross it are rejected whole with [`StreamError::Boundary`].
//!
//! # Sequential and random-access windows
//! `new` opens a window at the inner stream's current position and only
//! needs sequential capability.  `with_start` seeks the inner stream to an
//! explicit start first and requires random access; such a window also
//! supports `seek` / `length` (and `set_length` for writers), translated to
//! absolute inner positions.  Its length is discovered dynamically as
//! `min(inner length, window end) - start`.
//!
//! # Position
//! The window's position is always derived from the inner stream's
//! position.  If something else moves the inner stream below the window
//! start, the next operation fails with [`StreamError::Boundary`] instead of
//! touching bytes outside the window.  Without a size, the window runs to
//! the inner stream's own end.

use log::{debug, warn};

use crate::capability::{
    release_inner, release_inner_async, AsyncBasicInput, AsyncBasicOutput, AsyncClose,
    AsyncResizable, AsyncSeekable, BasicInput, BasicOutput, Close, OffsetOf, Positioned,
    Resizable, Seekable,
};
use crate::error::{Result, StreamError};
use crate::numeric::{Offset, Position};

// ── Window ────────────────────────────────────────────────────────────────────

/// The absolute range a partial stream is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<P: Position> {
    start: P,
    /// Exclusive end; `None` for a window that runs to the inner stream's end.
    limit: Option<P>,
}

impl<P: Position> Window<P> {
    pub fn new(start: P, size: Option<P::Offset>) -> Result<Self> {
        let limit = match size {
            Some(size) => Some(start.checked_advance(size)?),
            None       => None,
        };
        Ok(Self { start, limit })
    }

    pub fn start(&self) -> P {
        self.start
    }

    pub fn limit(&self) -> Option<P> {
        self.limit
    }

    pub fn size(&self) -> Option<P::Offset> {
        self.limit.map(|limit| limit.checked_distance(self.start).unwrap_or(P::Offset::ZERO))
    }

    /// Offset of an absolute inner position from the window start.
    pub fn offset_of(&self, pos: P) -> Result<P::Offset> {
        if pos < self.start {
            return Err(StreamError::boundary(format!(
                "inner position {pos:?} precedes window start {:?}", self.start
            )));
        }
        pos.checked_distance(self.start)
    }

    /// Window-relative position for an absolute inner position.
    fn relative(&self, pos: P) -> Result<P> {
        P::ZERO.checked_advance(self.offset_of(pos)?)
    }

    /// Absolute inner position for a window-relative position.
    pub fn absolute(&self, rel: P) -> Result<P> {
        self.start.checked_advance(rel.checked_distance(P::ZERO)?)
    }

    /// Bytes left before the window end, seen from `pos`.
    fn remaining(&self, pos: P) -> Result<Option<P::Offset>> {
        self.offset_of(pos)?;
        Ok(self.limit.map(|limit| {
            if pos >= limit { P::Offset::ZERO } else { limit.checked_distance(pos).unwrap_or(P::Offset::ZERO) }
        }))
    }

    /// Largest read that stays inside the window.
    fn clip_read(&self, pos: P, want: usize) -> Result<usize> {
        Ok(match self.remaining(pos)? {
            Some(left) => want.min(left.to_usize_saturating()),
            None       => want,
        })
    }

    fn check_write(&self, pos: P, len: usize) -> Result<()> {
        if let Some(left) = self.remaining(pos)? {
            if len > left.to_usize_saturating() {
                return Err(StreamError::boundary(format!(
                    "cannot write any more: {len} byte(s) requested, {left:?} left in window"
                )));
            }
        }
        Ok(())
    }

    /// Logical length given the inner stream's current end.
    fn length(&self, inner_end: P) -> Result<P> {
        let end = match self.limit {
            Some(limit) => inner_end.min(limit),
            None        => inner_end,
        };
        if end <= self.start {
            return Ok(P::ZERO);
        }
        P::ZERO.checked_advance(end.checked_distance(self.start)?)
    }

    fn check_resize(&self, abs_end: P) -> Result<()> {
        match self.limit {
            Some(limit) if abs_end > limit => Err(StreamError::boundary(format!(
                "cannot grow window past {limit:?}"
            ))),
            _ => Ok(()),
        }
    }
}

// Shared constructors and accessors for both directions.
macro_rules! partial_common {
    ($name:ident) => {
        impl<S: Positioned + Close> $name<S> {
            /// Window of `size` bytes (unbounded if `None`) at the inner
            /// stream's current position.
            ///
            /// Fails with `Overflow` if the window end is not representable;
            /// the inner stream is closed first unless `leave_open` is set.
            pub fn new(inner: S, size: Option<OffsetOf<S>>, leave_open: bool) -> Result<Self> {
                match Window::new(inner.position(), size) {
                    Ok(window) => Ok(Self::framed(inner, window, leave_open)),
                    Err(e)     => Err(release_inner(inner, leave_open, e)),
                }
            }
        }

        impl<S: Positioned + AsyncClose> $name<S> {
            pub async fn new_async(inner: S, size: Option<OffsetOf<S>>, leave_open: bool) -> Result<Self> {
                match Window::new(inner.position(), size) {
                    Ok(window) => Ok(Self::framed(inner, window, leave_open)),
                    Err(e)     => Err(release_inner_async(inner, leave_open, e).await),
                }
            }
        }

        impl<S: Positioned> $name<S> {
            fn framed(inner: S, window: Window<S::Position>, leave_open: bool) -> Self {
                debug!("{}: window {:?}", stringify!($name), window);
                Self { inner, window, leave_open, closed: false }
            }

            pub fn window(&self) -> Window<S::Position> {
                self.window
            }

            pub fn get_ref(&self) -> &S {
                &self.inner
            }

            /// Moving the inner stream below the window start makes the
            /// next operation fail.
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

            fn begin_close(&mut self) -> bool {
                if self.closed {
                    return false;
                }
                self.closed = true;
                true
            }
        }

        impl<S: Seekable + Close> $name<S> {
            /// Window of `size` bytes starting at absolute position `start`.
            ///
            /// Fails with `Unsupported` if the inner stream cannot seek and
            /// with `Overflow` if `start + size` is not representable.  The
            /// inner stream is closed on failure unless `leave_open` is set.
            pub fn with_start(
                mut inner:  S,
                start:      S::Position,
                size:       Option<OffsetOf<S>>,
                leave_open: bool,
            ) -> Result<Self> {
                if !inner.can_seek() {
                    let err = StreamError::Unsupported("partial stream with explicit start requires random access");
                    return Err(release_inner(inner, leave_open, err));
                }
                let window = match Window::new(start, size) {
                    Ok(w)  => w,
                    Err(e) => return Err(release_inner(inner, leave_open, e)),
                };
                if let Err(e) = inner.seek(start) {
                    return Err(release_inner(inner, leave_open, e));
                }
                Ok(Self::framed(inner, window, leave_open))
            }
        }

        impl<S: AsyncSeekable + AsyncClose> $name<S> {
            pub async fn with_start_async(
                mut inner:  S,
                start:      S::Position,
                size:       Option<OffsetOf<S>>,
                leave_open: bool,
            ) -> Result<Self> {
                if !inner.can_seek() {
                    let err = StreamError::Unsupported("partial stream with explicit start requires random access");
                    return Err(release_inner_async(inner, leave_open, err).await);
                }
                let window = match Window::new(start, size) {
                    Ok(w)  => w,
                    Err(e) => return Err(release_inner_async(inner, leave_open, e).await),
                };
                if let Err(e) = inner.seek(start).await {
                    return Err(release_inner_async(inner, leave_open, e).await);
                }
                Ok(Self::framed(inner, window, leave_open))
            }
        }

        impl<S: Positioned> Positioned for $name<S> {
            type Position = S::Position;

            /// Reports zero while the inner stream sits below the window.
            fn position(&self) -> S::Position {
                self.window.relative(self.inner.position()).unwrap_or(<S::Position as Position>::ZERO)
            }
        }

        impl<S: Seekable> Seekable for $name<S> {
            fn seek(&mut self, pos: S::Position) -> Result<()> {
                self.ensure_open()?;
                let abs = self.window.absolute(pos)?;
                self.inner.seek(abs)
            }

            fn length(&mut self) -> Result<S::Position> {
                self.ensure_open()?;
                self.window.offset_of(self.inner.position())?;
                let end = self.inner.length()?;
                self.window.length(end)
            }

            fn can_seek(&self) -> bool {
                self.inner.can_seek()
            }
        }

        impl<S: AsyncSeekable> AsyncSeekable for $name<S> {
            async fn seek(&mut self, pos: S::Position) -> Result<()> {
                self.ensure_open()?;
                let abs = self.window.absolute(pos)?;
                self.inner.seek(abs).await
            }

            async fn length(&mut self) -> Result<S::Position> {
                self.ensure_open()?;
                self.window.offset_of(self.inner.position())?;
                let end = self.inner.length().await?;
                self.window.length(end)
            }

            fn can_seek(&self) -> bool {
                self.inner.can_seek()
            }
        }
    };
}

// ── Reader ────────────────────────────────────────────────────────────────────

pub struct PartialReader<S: Positioned> {
    inner:      S,
    window:     Window<S::Position>,
    leave_open: bool,
    closed:     bool,
}

partial_common!(PartialReader);

impl<S: BasicInput + Positioned> BasicInput for PartialReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let want = self.window.clip_read(self.inner.position(), buf.len())?;
        if want == 0 {
            return Ok(0);
        }
        self.inner.read(&mut buf[..want])
    }
}

impl<S: Close + Positioned> Close for PartialReader<S> {
    fn close(&mut self) -> Result<()> {
        if self.begin_close() && !self.leave_open {
            self.inner.close()?;
        }
        Ok(())
    }
}

impl<S: AsyncBasicInput + Positioned> AsyncBasicInput for PartialReader<S> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let want = self.window.clip_read(self.inner.position(), buf.len())?;
        if want == 0 {
            return Ok(0);
        }
        self.inner.read(&mut buf[..want]).await
    }
}

impl<S: AsyncClose + Positioned> AsyncClose for PartialReader<S> {
    async fn close(&mut self) -> Result<()> {
        if self.begin_close() && !self.leave_open {
            self.inner.close().await?;
        }
        Ok(())
    }
}

// ── Writer ────────────────────────────────────────────────────────────────────

pub struct PartialWriter<S: Positioned> {
    inner:      S,
    window:     Window<S::Position>,
    leave_open: bool,
    closed:     bool,
}

partial_common!(PartialWriter);

impl<S: BasicOutput + Positioned> BasicOutput for PartialWriter<S> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        self.window.check_write(self.inner.position(), buf.len())?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.inner.flush()
    }
}

impl<S: BasicOutput + Positioned> Close for PartialWriter<S> {
    fn close(&mut self) -> Result<()> {
        if !self.begin_close() {
            return Ok(());
        }
        if let Err(e) = self.inner.flush() {
            warn!("partial writer: flush on close failed: {e}");
        }
        if !self.leave_open {
            self.inner.close()?;
        }
        Ok(())
    }
}

impl<S: Resizable> Resizable for PartialWriter<S> {
    fn set_length(&mut self, len: S::Position) -> Result<()> {
        self.ensure_open()?;
        self.window.offset_of(self.inner.position())?;
        let abs = self.window.absolute(len)?;
        self.window.check_resize(abs)?;
        self.inner.set_length(abs)
    }
}

impl<S: AsyncBasicOutput + Positioned> AsyncBasicOutput for PartialWriter<S> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        self.window.check_write(self.inner.position(), buf.len())?;
        self.inner.write(buf).await
    }

    async fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.inner.flush().await
    }
}

impl<S: AsyncBasicOutput + Positioned> AsyncClose for PartialWriter<S> {
    async fn close(&mut self) -> Result<()> {
        if !self.begin_close() {
            return Ok(());
        }
        if let Err(e) = self.inner.flush().await {
            warn!("partial writer: flush on close failed: {e}");
        }
        if !self.leave_open {
            self.inner.close().await?;
        }
        Ok(())
    }
}

impl<S: AsyncResizable> AsyncResizable for PartialWriter<S> {
    async fn set_length(&mut self, len: S::Position) -> Result<()> {
        self.ensure_open()?;
        self.window.offset_of(self.inner.position())?;
        let abs = self.window.absolute(len)?;
        self.window.check_resize(abs)?;
        self.inner.set_length(abs).await
    }
}
