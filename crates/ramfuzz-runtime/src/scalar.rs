//! Primitive types the engine can sample, log and request from an oracle.

use std::fmt;

use rand::Rng;

use crate::oracle::Wide;

/// A primitive value with a fixed log encoding.
pub trait Scalar: Copy + PartialOrd + fmt::Debug + 'static {
    /// Type tag written ahead of each logged value.
    const TAG: u8;
    /// Encoded width in bytes.
    const WIDTH: usize;
    const MIN: Self;
    const MAX: Self;
    /// Integral types round constraint bounds inward.
    const INTEGRAL: bool;

    fn write_le(self, out: &mut Vec<u8>);

    /// None unless `bytes` is exactly [`WIDTH`](Scalar::WIDTH) long.
    fn read_le(bytes: &[u8]) -> Option<Self>;

    /// Uniform in `[lo, hi]`. Requires `lo <= hi`.
    fn sample<R: Rng>(lo: Self, hi: Self, rng: &mut R) -> Self;

    /// The oracle's representation.
    fn widen(self) -> Wide;

    /// None if `wide` is of another kind or out of range.
    fn narrow(wide: Wide) -> Option<Self>;

    fn to_f64(self) -> f64;

    /// Saturating.
    fn from_f64(v: f64) -> Self;
}

macro_rules! int_scalar {
    ($t:ty, $tag:expr, $wide:ident, $w:ty) => {
        impl Scalar for $t {
            const TAG: u8 = $tag;
            const WIDTH: usize = std::mem::size_of::<$t>();
            const MIN: Self = <$t>::MIN;
            const MAX: Self = <$t>::MAX;
            const INTEGRAL: bool = true;

            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Option<Self> {
                bytes.try_into().ok().map(<$t>::from_le_bytes)
            }

            fn sample<R: Rng>(lo: Self, hi: Self, rng: &mut R) -> Self {
                rng.gen_range(lo..=hi)
            }

            fn widen(self) -> Wide {
                Wide::$wide(<$w>::from(self))
            }

            fn narrow(wide: Wide) -> Option<Self> {
                match wide {
                    Wide::$wide(v) => <$t>::try_from(v).ok(),
                    _ => None,
                }
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    };
}

int_scalar!(i8, 1, I64, i64);
int_scalar!(u8, 2, U64, u64);
int_scalar!(i16, 3, I64, i64);
int_scalar!(u16, 4, U64, u64);
int_scalar!(i32, 5, I64, i64);
int_scalar!(u32, 6, U64, u64);
int_scalar!(i64, 7, I64, i64);
int_scalar!(u64, 8, U64, u64);

impl Scalar for bool {
    const TAG: u8 = 0;
    const WIDTH: usize = 1;
    const MIN: Self = false;
    const MAX: Self = true;
    const INTEGRAL: bool = true;

    fn write_le(self, out: &mut Vec<u8>) {
        out.push(u8::from(self));
    }

    fn read_le(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [b] => Some(*b != 0),
            _ => None,
        }
    }

    fn sample<R: Rng>(lo: Self, hi: Self, rng: &mut R) -> Self {
        rng.gen_range(u8::from(lo)..=u8::from(hi)) != 0
    }

    fn widen(self) -> Wide {
        Wide::U64(u64::from(self))
    }

    fn narrow(wide: Wide) -> Option<Self> {
        match wide {
            Wide::U64(0) => Some(false),
            Wide::U64(1) => Some(true),
            _ => None,
        }
    }

    fn to_f64(self) -> f64 {
        f64::from(u8::from(self))
    }

    fn from_f64(v: f64) -> Self {
        v != 0.0
    }
}

/// `lo + (hi - lo) * u` without overflowing when the span exceeds the
/// type's range.
fn lerp(lo: f64, hi: f64, u: f64) -> f64 {
    (lo * (1.0 - u) + hi * u).clamp(lo, hi)
}

impl Scalar for f32 {
    const TAG: u8 = 11;
    const WIDTH: usize = 4;
    const MIN: Self = f32::MIN;
    const MAX: Self = f32::MAX;
    const INTEGRAL: bool = false;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(f32::from_le_bytes)
    }

    fn sample<R: Rng>(lo: Self, hi: Self, rng: &mut R) -> Self {
        (lerp(f64::from(lo), f64::from(hi), rng.gen()) as f32).clamp(lo, hi)
    }

    fn widen(self) -> Wide {
        Wide::F64(f64::from(self))
    }

    fn narrow(wide: Wide) -> Option<Self> {
        match wide {
            Wide::F64(v) => Some(v as f32),
            _ => None,
        }
    }

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Scalar for f64 {
    const TAG: u8 = 12;
    const WIDTH: usize = 8;
    const MIN: Self = f64::MIN;
    const MAX: Self = f64::MAX;
    const INTEGRAL: bool = false;

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn read_le(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(f64::from_le_bytes)
    }

    fn sample<R: Rng>(lo: Self, hi: Self, rng: &mut R) -> Self {
        lerp(lo, hi, rng.gen())
    }

    fn widen(self) -> Wide {
        Wide::F64(self)
    }

    fn narrow(wide: Wide) -> Option<Self> {
        match wide {
            Wide::F64(v) => Some(v),
            _ => None,
        }
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(v: f64) -> Self {
        v
    }
}
