//! Running checksums and the single-write result slot.
//!
//! Two algorithms are available:
//!
//! | Kind | Definition |
//! |------|------------|
//! | [`ChecksumKind::Crc32`] | IEEE 802.3 CRC-32 (reflected, poly `0xEDB88320`), via `crc32fast` |
//! | [`ChecksumKind::Crc24`] | OpenPGP CRC-24 (RFC 4880 §6.1): init `0xB704CE`, poly `0x864CFB`, MSB first |
//!
//! [`CrcCapture`] feeds every byte crossing a stream into a [`Crc`] and
//! publishes the final [`Checksum`] into a [`ChecksumSlot`] when it is
//! closed or dropped.

mod capture;

pub use capture::CrcCapture;

use std::fmt;
use std::sync::Arc;

use crc32fast::Hasher;
use log::warn;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::numeric::Position;

pub const CRC24_INIT: u32 = 0x00B7_04CE;
pub const CRC24_POLY: u32 = 0x0186_4CFB;
const CRC24_MASK:     u32 = 0x00FF_FFFF;

static CRC24_TABLE: [u32; 256] = crc24_table();

const fn crc24_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u32) << 16;
        let mut bit = 0;
        while bit < 8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
            bit += 1;
        }
        table[i] = crc & CRC24_MASK;
        i += 1;
    }
    table
}

// ── ChecksumKind ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumKind {
    Crc24,
    Crc32,
}

impl fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumKind::Crc24 => f.write_str("crc24"),
            ChecksumKind::Crc32 => f.write_str("crc32"),
        }
    }
}

// ── Crc ───────────────────────────────────────────────────────────────────────

#[derive(Clone)]
enum State {
    Crc24(u32),
    Crc32(Hasher),
}

/// Running CRC accumulator.
#[derive(Clone)]
pub struct Crc {
    state: State,
}

impl Crc {
    pub fn new(kind: ChecksumKind) -> Self {
        let state = match kind {
            ChecksumKind::Crc24 => State::Crc24(CRC24_INIT),
            ChecksumKind::Crc32 => State::Crc32(Hasher::new()),
        };
        Self { state }
    }

    pub fn kind(&self) -> ChecksumKind {
        match self.state {
            State::Crc24(_) => ChecksumKind::Crc24,
            State::Crc32(_) => ChecksumKind::Crc32,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            State::Crc24(crc) => {
                let mut c = *crc;
                for &b in data {
                    let idx = (((c >> 16) ^ b as u32) & 0xFF) as usize;
                    c = ((c << 8) ^ CRC24_TABLE[idx]) & CRC24_MASK;
                }
                *crc = c;
            }
            State::Crc32(hasher) => hasher.update(data),
        }
    }

    /// Checksum of everything fed so far.  Does not reset the accumulator.
    pub fn value(&self) -> u32 {
        match &self.state {
            State::Crc24(crc)    => *crc,
            State::Crc32(hasher) => hasher.clone().finalize(),
        }
    }

    pub fn reset(&mut self) {
        *self = Crc::new(self.kind());
    }
}

impl fmt::Debug for Crc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crc")
            .field("kind", &self.kind())
            .field("value", &format_args!("{:#08x}", self.value()))
            .finish()
    }
}

/// One-shot checksum of `data`.
pub fn checksum(kind: ChecksumKind, data: &[u8]) -> u32 {
    let mut crc = Crc::new(kind);
    crc.update(data);
    crc.value()
}

// ── Checksum / ChecksumSlot ───────────────────────────────────────────────────

/// Final result of a capture: the checksum and the number of bytes it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum<P = u64> {
    pub kind:   ChecksumKind,
    pub value:  u32,
    pub length: P,
}

impl<P: Serialize> Checksum<P> {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<P: fmt::Display> fmt::Display for Checksum<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ChecksumKind::Crc24 => write!(f, "{} {:06x} {}", self.kind, self.value, self.length),
            ChecksumKind::Crc32 => write!(f, "{} {:08x} {}", self.kind, self.value, self.length),
        }
    }
}

/// Cloneable cell written at most once.  The capturing decorator keeps one
/// handle; the caller keeps another and reads the result after teardown.
#[derive(Debug, Clone)]
pub struct ChecksumSlot<P: Position = u64> {
    cell: Arc<OnceCell<Checksum<P>>>,
}

impl<P: Position> Default for ChecksumSlot<P> {
    fn default() -> Self {
        Self { cell: Arc::new(OnceCell::new()) }
    }
}

impl<P: Position> ChecksumSlot<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Checksum<P>> {
        self.cell.get().copied()
    }

    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    /// First write wins; later writes are ignored.
    pub(crate) fn publish(&self, result: Checksum<P>) {
        if self.cell.set(result).is_err() {
            warn!("checksum slot already holds a result; ignoring {result:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_check_value() {
        assert_eq!(checksum(ChecksumKind::Crc32, b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn crc24_check_value() {
        assert_eq!(checksum(ChecksumKind::Crc24, b"123456789"), 0x0021_CF02);
        assert_eq!(checksum(ChecksumKind::Crc24, b""), CRC24_INIT);
    }

    #[test]
    fn incremental_updates_match_one_shot() {
        let data: Vec<u8> = (0..=255u8).cycle().take(3000).collect();
        for kind in [ChecksumKind::Crc24, ChecksumKind::Crc32] {
            let mut crc = Crc::new(kind);
            for chunk in data.chunks(7) {
                crc.update(chunk);
            }
            assert_eq!(crc.value(), checksum(kind, &data));
            crc.reset();
            assert_eq!(crc.value(), checksum(kind, b""));
        }
    }

    #[test]
    fn slot_keeps_first_result() {
        let slot = ChecksumSlot::<u64>::new();
        let other = slot.clone();
        assert!(slot.get().is_none());
        other.publish(Checksum { kind: ChecksumKind::Crc32, value: 1, length: 10 });
        other.publish(Checksum { kind: ChecksumKind::Crc32, value: 2, length: 20 });
        assert_eq!(slot.get().map(|c| c.value), Some(1));
    }

    #[test]
    fn checksum_serialises_to_json() {
        let c = Checksum { kind: ChecksumKind::Crc24, value: 0x21CF02, length: 9u64 };
        assert_eq!(c.to_json().unwrap(), r#"{"kind":"crc24","value":2215682,"length":9}"#);
        assert_eq!(c.to_string(), "crc24 21cf02 9");
    }
}
