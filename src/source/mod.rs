//! Concrete streams: the innermost layer every decorator chain starts from.

pub mod memory;
pub mod std_io;
pub mod tokio_io;

pub use memory::MemoryStream;
pub use std_io::{IoAdapter, StdStream};
pub use tokio_io::TokioStream;
