//! Positionable byte streams and composable decorators.
//!
//! Every stream implements a small set of orthogonal capability traits
//! ([`capability`]); decorators wrap one inner stream and re-expose the same
//! contract:
//!
//! | Decorator | Adds |
//! |-----------|------|
//! | [`BufferedReader`] / [`BufferedWriter`] | fixed-capacity buffering |
//! | [`PartialReader`] / [`PartialWriter`] | confinement to a window of the inner stream |
//! | [`ReverseBytes`] | backward iteration over a range, chunk by chunk |
//! | [`CrcCapture`] | running CRC-24 / CRC-32 published on close |
//!
//! Positions are generic ([`numeric::Position`]); all position arithmetic is
//! checked.  Every decorator has a blocking and a suspending (`async`)
//! implementation sharing the same bookkeeping.

pub mod buffered;
pub mod capability;
pub mod checksum;
pub mod error;
pub mod ext;
pub mod numeric;
pub mod partial;
pub mod reverse;
pub mod source;
pub mod util;

#[cfg(test)]
mod test_helpers;

pub use buffered::{BufferOptions, BufferedReader, BufferedWriter};
pub use capability::{
    AsyncBasicInput, AsyncBasicOutput, AsyncClose, AsyncRandomInput, AsyncRandomOutput,
    AsyncResizable, AsyncSeekable, AsyncSequentialInput, AsyncSequentialOutput, BasicInput,
    BasicOutput, Close, OffsetOf, Positioned, RandomInput, RandomOutput, Resizable, Seekable,
    SequentialInput, SequentialOutput,
};
pub use checksum::{Checksum, ChecksumKind, ChecksumSlot, Crc, CrcCapture};
pub use error::{Result, StreamError};
pub use ext::{AsyncInputExt, AsyncOutputExt, InputExt, OutputExt};
pub use numeric::{Offset, Position};
pub use partial::{PartialReader, PartialWriter, Window};
pub use reverse::ReverseBytes;
pub use source::{IoAdapter, MemoryStream, StdStream, TokioStream};
