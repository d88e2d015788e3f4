//! Whole-stream conveniences: copy, slurp, compare.
//!
//! Progress callbacks receive the cumulative number of bytes handled: once
//! with zero before the first transfer, then after every chunk.

use log::trace;

use crate::capability::{AsyncBasicInput, AsyncBasicOutput, BasicInput, BasicOutput};
use crate::error::Result;

/// Chunk size used by the copy and compare loops: 80 KiB.
pub const COPY_CHUNK_SIZE: usize = 80 * 1024;

/// Progress callback: cumulative bytes so far.
pub type ProgressFn<'a> = dyn FnMut(u64) + 'a;

fn report(progress: Option<&mut ProgressFn<'_>>, total: u64) {
    if let Some(cb) = progress {
        cb(total);
    }
}

// ── Blocking ──────────────────────────────────────────────────────────────────

/// Read until `buf` is full or the input ends.  Returns the bytes read.
pub fn read_full<I: BasicInput + ?Sized>(input: &mut I, buf: &mut [u8]) -> Result<usize> {
    let mut got = 0usize;
    while got < buf.len() {
        match input.read(&mut buf[got..])? {
            0 => break,
            n => got += n,
        }
    }
    Ok(got)
}

/// Copy everything from `input` to `output`, then flush `output`.
/// Returns the number of bytes copied.
pub fn copy_all<I, O>(input: &mut I, output: &mut O, mut progress: Option<&mut ProgressFn<'_>>) -> Result<u64>
where
    I: BasicInput + ?Sized,
    O: BasicOutput + ?Sized,
{
    let mut buf   = vec![0u8; COPY_CHUNK_SIZE];
    let mut total = 0u64;
    report(progress.as_deref_mut(), total);
    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        output.write_all(&buf[..n])?;
        total += n as u64;
        report(progress.as_deref_mut(), total);
    }
    output.flush()?;
    trace!("copy_all: {total} byte(s)");
    Ok(total)
}

pub fn read_to_end<I: BasicInput + ?Sized>(input: &mut I) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    loop {
        match input.read(&mut buf)? {
            0 => return Ok(out),
            n => out.extend_from_slice(&buf[..n]),
        }
    }
}

/// Byte-for-byte equality of the remaining contents of two inputs.
pub fn content_equals<A, B>(a: &mut A, b: &mut B) -> Result<bool>
where
    A: BasicInput + ?Sized,
    B: BasicInput + ?Sized,
{
    let mut left  = vec![0u8; COPY_CHUNK_SIZE];
    let mut right = vec![0u8; COPY_CHUNK_SIZE];
    loop {
        let n = read_full(a, &mut left)?;
        let m = read_full(b, &mut right)?;
        if n != m || left[..n] != right[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}

// ── Suspending ────────────────────────────────────────────────────────────────

pub async fn read_full_async<I: AsyncBasicInput + ?Sized>(input: &mut I, buf: &mut [u8]) -> Result<usize> {
    let mut got = 0usize;
    while got < buf.len() {
        match input.read(&mut buf[got..]).await? {
            0 => break,
            n => got += n,
        }
    }
    Ok(got)
}

pub async fn copy_all_async<I, O>(
    input:        &mut I,
    output:       &mut O,
    mut progress: Option<&mut ProgressFn<'_>>,
) -> Result<u64>
where
    I: AsyncBasicInput + ?Sized,
    O: AsyncBasicOutput + ?Sized,
{
    let mut buf   = vec![0u8; COPY_CHUNK_SIZE];
    let mut total = 0u64;
    report(progress.as_deref_mut(), total);
    loop {
        let n = input.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        output.write_all(&buf[..n]).await?;
        total += n as u64;
        report(progress.as_deref_mut(), total);
    }
    output.flush().await?;
    trace!("copy_all_async: {total} byte(s)");
    Ok(total)
}

pub async fn read_to_end_async<I: AsyncBasicInput + ?Sized>(input: &mut I) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; COPY_CHUNK_SIZE];
    loop {
        match input.read(&mut buf).await? {
            0 => return Ok(out),
            n => out.extend_from_slice(&buf[..n]),
        }
    }
}

pub async fn content_equals_async<A, B>(a: &mut A, b: &mut B) -> Result<bool>
where
    A: AsyncBasicInput + ?Sized,
    B: AsyncBasicInput + ?Sized,
{
    let mut left  = vec![0u8; COPY_CHUNK_SIZE];
    let mut right = vec![0u8; COPY_CHUNK_SIZE];
    loop {
        let n = read_full_async(a, &mut left).await?;
        let m = read_full_async(b, &mut right).await?;
        if n != m || left[..n] != right[..m] {
            return Ok(false);
        }
        if n == 0 {
            return Ok(true);
        }
    }
}
