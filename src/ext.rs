//! Fixed-width and line-oriented helpers for any basic input or output.
//!
//! Blanket-implemented, so every stream and decorator gets them.  Integer
//! and float widths take their byte order as a `byteorder` type parameter:
//!
//! ```ignore
//! use byteorder::LittleEndian;
//! let magic = input.read_u32::<LittleEndian>()?;
//! output.write_u64::<LittleEndian>(offset)?;
//! ```
//!
//! A fixed-width read that runs out of bytes fails with
//! [`StreamError::UnexpectedEof`].  Lines are UTF-8, terminated by LF with an
//! optional preceding CR; line reads go one byte at a time, so wrap the
//! input in a [`BufferedReader`](crate::buffered::BufferedReader) first.
#![allow(async_fn_in_trait)]

use byteorder::ByteOrder;

use crate::capability::{AsyncBasicInput, AsyncBasicOutput, BasicInput, BasicOutput};
use crate::error::{Result, StreamError};

fn finish_line(bytes: Vec<u8>, line: &mut String) -> Result<()> {
    let mut bytes = bytes;
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    let text = String::from_utf8(bytes)
        .map_err(|e| StreamError::InvalidData(format!("line is not valid UTF-8: {e}")))?;
    line.push_str(&text);
    Ok(())
}

macro_rules! read_fixed {
    ($($name:ident -> $t:ty, $n:literal, $conv:ident;)*) => {$(
        fn $name<B: ByteOrder>(&mut self) -> Result<$t> {
            let mut buf = [0u8; $n];
            self.read_exact(&mut buf)?;
            Ok(B::$conv(&buf))
        }
    )*};
}

macro_rules! write_fixed {
    ($($name:ident($t:ty), $n:literal, $conv:ident;)*) => {$(
        fn $name<B: ByteOrder>(&mut self, value: $t) -> Result<()> {
            let mut buf = [0u8; $n];
            B::$conv(&mut buf, value);
            self.write_all(&buf)
        }
    )*};
}

macro_rules! read_fixed_async {
    ($($name:ident -> $t:ty, $n:literal, $conv:ident;)*) => {$(
        async fn $name<B: ByteOrder>(&mut self) -> Result<$t> {
            let mut buf = [0u8; $n];
            self.read_exact(&mut buf).await?;
            Ok(B::$conv(&buf))
        }
    )*};
}

macro_rules! write_fixed_async {
    ($($name:ident($t:ty), $n:literal, $conv:ident;)*) => {$(
        async fn $name<B: ByteOrder>(&mut self, value: $t) -> Result<()> {
            let mut buf = [0u8; $n];
            B::$conv(&mut buf, value);
            self.write_all(&buf).await
        }
    )*};
}

// ── Blocking ──────────────────────────────────────────────────────────────────

pub trait InputExt: BasicInput {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    read_fixed! {
        read_u16 -> u16, 2, read_u16;
        read_i16 -> i16, 2, read_i16;
        read_u32 -> u32, 4, read_u32;
        read_i32 -> i32, 4, read_i32;
        read_u64 -> u64, 8, read_u64;
        read_i64 -> i64, 8, read_i64;
        read_f32 -> f32, 4, read_f32;
        read_f64 -> f64, 8, read_f64;
    }

    /// Append the next line, without its terminator, to `line`.
    /// Returns `false` if the stream was already at its end.
    fn read_line(&mut self, line: &mut String) -> Result<bool> {
        let mut bytes = Vec::new();
        let mut byte  = [0u8; 1];
        loop {
            if self.read(&mut byte)? == 0 {
                if bytes.is_empty() {
                    return Ok(false);
                }
                break;
            }
            if byte[0] == b'\n' {
                break;
            }
            bytes.push(byte[0]);
        }
        finish_line(bytes, line)?;
        Ok(true)
    }
}

impl<T: BasicInput + ?Sized> InputExt for T {}

pub trait OutputExt: BasicOutput {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_all(&[value])
    }

    fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_all(&[value as u8])
    }

    write_fixed! {
        write_u16(u16), 2, write_u16;
        write_i16(i16), 2, write_i16;
        write_u32(u32), 4, write_u32;
        write_i32(i32), 4, write_i32;
        write_u64(u64), 8, write_u64;
        write_i64(i64), 8, write_i64;
        write_f32(f32), 4, write_f32;
        write_f64(f64), 8, write_f64;
    }

    /// Write `line` followed by LF.
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_all(line.as_bytes())?;
        self.write_all(b"\n")
    }

    fn write_lines<I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            self.write_line(line.as_ref())?;
        }
        Ok(())
    }
}

impl<T: BasicOutput + ?Sized> OutputExt for T {}

// ── Suspending ────────────────────────────────────────────────────────────────

pub trait AsyncInputExt: AsyncBasicInput {
    async fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf).await?;
        Ok(buf[0])
    }

    async fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8().await? as i8)
    }

    read_fixed_async! {
        read_u16 -> u16, 2, read_u16;
        read_i16 -> i16, 2, read_i16;
        read_u32 -> u32, 4, read_u32;
        read_i32 -> i32, 4, read_i32;
        read_u64 -> u64, 8, read_u64;
        read_i64 -> i64, 8, read_i64;
        read_f32 -> f32, 4, read_f32;
        read_f64 -> f64, 8, read_f64;
    }

    async fn read_line(&mut self, line: &mut String) -> Result<bool> {
        let mut bytes = Vec::new();
        let mut byte  = [0u8; 1];
        loop {
            if self.read(&mut byte).await? == 0 {
                if bytes.is_empty() {
                    return Ok(false);
                }
                break;
            }
            if byte[0] == b'\n' {
                break;
            }
            bytes.push(byte[0]);
        }
        finish_line(bytes, line)?;
        Ok(true)
    }
}

impl<T: AsyncBasicInput + ?Sized> AsyncInputExt for T {}

pub trait AsyncOutputExt: AsyncBasicOutput {
    async fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_all(&[value]).await
    }

    async fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_all(&[value as u8]).await
    }

    write_fixed_async! {
        write_u16(u16), 2, write_u16;
        write_i16(i16), 2, write_i16;
        write_u32(u32), 4, write_u32;
        write_i32(i32), 4, write_i32;
        write_u64(u64), 8, write_u64;
        write_i64(i64), 8, write_i64;
        write_f32(f32), 4, write_f32;
        write_f64(f64), 8, write_f64;
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_all(line.as_bytes()).await?;
        self.write_all(b"\n").await
    }

    /// Writes every line the iterator yields, in order.
    async fn write_lines<I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            self.write_line(line.as_ref()).await?;
        }
        Ok(())
    }
}

impl<T: AsyncBasicOutput + ?Sized> AsyncOutputExt for T {}

#[cfg(test)]
mod tests {
    use byteorder::{BigEndian, LittleEndian};

    use super::{InputExt, OutputExt};
    use crate::capability::Seekable;
    use crate::error::StreamError;
    use crate::source::MemoryStream;

    #[test]
    fn fixed_width_values_in_both_orders() {
        let mut s = MemoryStream::<u64>::empty();
        s.write_u16::<BigEndian>(0x0102).unwrap();
        s.write_u32::<LittleEndian>(0x0A0B_0C0D).unwrap();
        s.write_i64::<BigEndian>(-2).unwrap();
        s.write_f64::<LittleEndian>(1.5).unwrap();
        s.write_i8(-1).unwrap();
        assert_eq!(&s.contents()[..6], &[0x01, 0x02, 0x0D, 0x0C, 0x0B, 0x0A]);

        s.seek(0).unwrap();
        assert_eq!(s.read_u16::<BigEndian>().unwrap(), 0x0102);
        assert_eq!(s.read_u32::<LittleEndian>().unwrap(), 0x0A0B_0C0D);
        assert_eq!(s.read_i64::<BigEndian>().unwrap(), -2);
        assert_eq!(s.read_f64::<LittleEndian>().unwrap(), 1.5);
        assert_eq!(s.read_i8().unwrap(), -1);
        assert!(matches!(s.read_u8(), Err(StreamError::UnexpectedEof)));
    }

    #[test]
    fn short_fixed_width_read_is_unexpected_eof() {
        let mut s = MemoryStream::<u64>::new(vec![1u8, 2, 3]);
        assert!(matches!(s.read_u32::<LittleEndian>(), Err(StreamError::UnexpectedEof)));
    }

    #[test]
    fn lines_round_trip_with_crlf() {
        let mut s = MemoryStream::<u64>::new(b"alpha\r\nbeta\n\ngamma".to_vec());
        let mut lines = Vec::new();
        let mut line = String::new();
        while s.read_line(&mut line).unwrap() {
            lines.push(std::mem::take(&mut line));
        }
        assert_eq!(lines, vec!["alpha", "beta", "", "gamma"]);
    }

    #[test]
    fn write_lines_writes_every_line() {
        let mut s = MemoryStream::<u64>::empty();
        s.write_lines(["one", "two", "three"]).unwrap();
        assert_eq!(s.contents(), b"one\ntwo\nthree\n");
    }

    #[test]
    fn invalid_utf8_line_is_invalid_data() {
        let mut s = MemoryStream::<u64>::new(vec![0xFFu8, 0xFE, b'\n']);
        let mut line = String::new();
        assert!(matches!(s.read_line(&mut line), Err(StreamError::InvalidData(_))));
    }
}
