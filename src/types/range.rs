// Copyright (c) 2024 Mike Tsao

use core::{fmt, str::FromStr};
use serde::{Deserialize, Serialize};

/// An inclusive span of integers, written `lo>hi` in configuration text. A
/// note range for a keyboard split, for example, is `36>59`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Range {
    /// The low end (inclusive).
    pub lo: i32,
    /// The high end (inclusive).
    pub hi: i32,
}
impl Range {
    /// The character separating the two ends in text.
    pub const SEPARATOR: char = '>';

    #[allow(missing_docs)]
    pub const fn new(lo: i32, hi: i32) -> Self {
        Self { lo, hi }
    }

    /// Whether the value falls within the span, ends included. The ends are
    /// not required to be ordered; `60>40` contains 50 just like `40>60`.
    pub fn contains(&self, value: i64) -> bool {
        let (lo, hi) = if self.lo <= self.hi {
            (self.lo, self.hi)
        } else {
            (self.hi, self.lo)
        };
        (lo as i64..=hi as i64).contains(&value)
    }

    /// Applies the same operation to both ends.
    pub fn map(self, f: impl Fn(i32) -> i32) -> Self {
        Self::new(f(self.lo), f(self.hi))
    }

    /// Packs both ends into one word so that a range fits in a single atomic
    /// cell.
    pub(crate) fn to_bits(self) -> u64 {
        ((self.lo as u32 as u64) << 32) | (self.hi as u32 as u64)
    }

    pub(crate) fn from_bits(bits: u64) -> Self {
        Self::new((bits >> 32) as u32 as i32, bits as u32 as i32)
    }
}
impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.lo, Self::SEPARATOR, self.hi)
    }
}
impl FromStr for Range {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s.split_once(Self::SEPARATOR).unwrap_or((s, s));
        Ok(Self::new(lo.trim().parse()?, hi.trim().parse()?))
    }
}
impl From<(i32, i32)> for Range {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}
