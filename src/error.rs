//! Error taxonomy shared by every stream and decorator.
//!
//! End of stream is never an error: a read that returns `Ok(0)` is the only
//! end-of-data signal.  Everything else a caller may want to tell apart
//! ("misuse" vs "out of data" vs "corruption") has its own variant.

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

#[derive(Error, Debug)]
pub enum StreamError {
    /// The stream (or decorator) has already been closed.
    #[error("stream has been closed")]
    Closed,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// The operation needs a capability the stream does not advertise.
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
    /// Checked position/offset arithmetic left the representable range.
    #[error("arithmetic overflow in position/offset calculation")]
    Overflow,
    /// An operation would cross an enforced window boundary.
    #[error("window boundary violated: {0}")]
    Boundary(String),
    /// The inner stream delivered less than a validated range promised.
    #[error("inconsistent stream state: {0}")]
    Consistency(String),
    /// A fixed-width read ran out of bytes.
    #[error("unexpected end of stream")]
    UnexpectedEof,
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StreamError {
    pub(crate) fn boundary(msg: impl Into<String>) -> Self {
        StreamError::Boundary(msg.into())
    }

    pub(crate) fn out_of_range(msg: impl Into<String>) -> Self {
        StreamError::OutOfRange(msg.into())
    }
}

impl From<StreamError> for io::Error {
    fn from(e: StreamError) -> Self {
        let kind = match &e {
            StreamError::Io(inner)          => return io::Error::new(inner.kind(), e),
            StreamError::Closed             => io::ErrorKind::BrokenPipe,
            StreamError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            StreamError::OutOfRange(_)      => io::ErrorKind::InvalidInput,
            StreamError::Unsupported(_)     => io::ErrorKind::Unsupported,
            StreamError::Overflow           => io::ErrorKind::InvalidInput,
            StreamError::Boundary(_)        => io::ErrorKind::PermissionDenied,
            StreamError::Consistency(_)     => io::ErrorKind::InvalidData,
            StreamError::UnexpectedEof      => io::ErrorKind::UnexpectedEof,
            StreamError::InvalidData(_)     => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_kinds_follow_taxonomy() {
        let e: io::Error = StreamError::UnexpectedEof.into();
        assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof);

        let e: io::Error = StreamError::Unsupported("seek").into();
        assert_eq!(e.kind(), io::ErrorKind::Unsupported);

        let e: io::Error = StreamError::Io(io::Error::new(io::ErrorKind::TimedOut, "slow")).into();
        assert_eq!(e.kind(), io::ErrorKind::TimedOut);
    }
}
