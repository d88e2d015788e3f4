//! Position and offset arithmetic.
//!
//! A stream position is an opaque, totally ordered value.  Random-access
//! decorators only ever combine positions through the two operations
//! below, both of which are checked:
//!
//! ```text
//! Position + Offset   -> Position     (Position::checked_advance)
//! Position - Position -> Offset       (Position::checked_distance)
//! ```
//!
//! Leaving the representable range fails with [`StreamError::Overflow`];
//! nothing ever wraps.  In-memory buffers are indexed by `usize`, so offsets
//! also convert to and from `usize`, again checked.

use std::fmt::Debug;

use crate::error::{Result, StreamError};

/// An unsigned distance between two positions, or a byte count.
pub trait Offset: Copy + Ord + Debug + Send + Sync + 'static {
    const ZERO: Self;

    fn add_checked(self, rhs: Self) -> Result<Self>;
    fn sub_checked(self, rhs: Self) -> Result<Self>;
    fn try_from_usize(n: usize) -> Result<Self>;
    fn try_to_usize(self) -> Result<usize>;

    /// Clamp to `usize::MAX`; used when bounding a request by a buffer length.
    fn to_usize_saturating(self) -> usize {
        self.try_to_usize().unwrap_or(usize::MAX)
    }
}

/// A byte position within a stream.
pub trait Position: Copy + Ord + Debug + Send + Sync + 'static {
    type Offset: Offset;

    const ZERO: Self;
    const MAX: Self;

    fn checked_advance(self, by: Self::Offset) -> Result<Self>;

    /// `self - origin`.  Fails if `origin` lies after `self`.
    fn checked_distance(self, origin: Self) -> Result<Self::Offset>;

    fn advance_by(self, n: usize) -> Result<Self> {
        self.checked_advance(Self::Offset::try_from_usize(n)?)
    }

    /// How many of `want` bytes can still be counted from `self` before the
    /// position type runs out.
    fn room(self, want: usize) -> usize {
        Self::MAX
            .checked_distance(self)
            .map_or(0, |left| left.to_usize_saturating().min(want))
    }
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl Offset for $t {
            const ZERO: Self = 0;

            #[inline]
            fn add_checked(self, rhs: Self) -> Result<Self> {
                self.checked_add(rhs).ok_or(StreamError::Overflow)
            }

            #[inline]
            fn sub_checked(self, rhs: Self) -> Result<Self> {
                self.checked_sub(rhs).ok_or(StreamError::Overflow)
            }

            #[inline]
            fn try_from_usize(n: usize) -> Result<Self> {
                <$t>::try_from(n).map_err(|_| StreamError::Overflow)
            }

            #[inline]
            fn try_to_usize(self) -> Result<usize> {
                usize::try_from(self).map_err(|_| StreamError::Overflow)
            }
        }

        impl Position for $t {
            type Offset = $t;

            const ZERO: Self = 0;
            const MAX: Self = <$t>::MAX;

            #[inline]
            fn checked_advance(self, by: $t) -> Result<Self> {
                self.checked_add(by).ok_or(StreamError::Overflow)
            }

            #[inline]
            fn checked_distance(self, origin: Self) -> Result<$t> {
                self.checked_sub(origin).ok_or(StreamError::Overflow)
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64, u128, usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_position_overflow_is_reported() {
        let p: u8 = u8::MAX;
        assert!(matches!(p.checked_advance(1), Err(StreamError::Overflow)));
        assert!(matches!(200u8.advance_by(56), Err(StreamError::Overflow)));
        assert_eq!(200u8.advance_by(55).unwrap(), 255);
    }

    #[test]
    fn room_is_bounded_by_the_position_type() {
        assert_eq!(200u8.room(100), 55);
        assert_eq!(200u8.room(10), 10);
        assert_eq!(u8::MAX.room(1), 0);
        assert_eq!(0u64.room(usize::MAX), usize::MAX);
    }

    #[test]
    fn distance_requires_ordered_operands() {
        assert_eq!(10u64.checked_distance(4).unwrap(), 6);
        assert!(matches!(4u64.checked_distance(10), Err(StreamError::Overflow)));
    }

    #[test]
    fn usize_bridge_is_checked() {
        assert!(matches!(u16::try_from_usize(70_000), Err(StreamError::Overflow)));
        assert_eq!(u16::try_from_usize(512).unwrap(), 512);
        assert_eq!(u128::MAX.to_usize_saturating(), usize::MAX);
        assert_eq!(7u128.to_usize_saturating(), 7);
    }
}
