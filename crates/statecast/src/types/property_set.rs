// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-width property bitmask.
//!
//! Bit `i` set means "the property with tag `i` is included". The same type
//! marks validity on a record and selects which properties a partial
//! operation touches.
//!
//! ```text
//! tag:   31 ..  4  3  2  1  0
//! bit:    0 ..  1  0  1  1  x   (bit 0 reserved)
//! ```

use std::fmt;
use std::ops::{Add, BitAnd, BitOr, BitXor, Not, Sub};

/// Set of property tags encoded as a `u32` bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropertySet(u32);

impl PropertySet {
    /// Number of addressable tags (including the reserved tag 0).
    pub const CAPACITY: u32 = 32;

    /// Highest usable tag.
    pub const MAX_TAG: u32 = Self::CAPACITY - 1;

    /// Empty set.
    pub const NONE: Self = Self(0);

    /// Every tag (used as the default mask of partial operations).
    pub const ALL: Self = Self(u32::MAX);

    /// Create from a raw bitmask.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Singleton set for one tag. Tags above [`Self::MAX_TAG`] yield the empty set.
    #[inline]
    pub const fn from_tag(tag: u32) -> Self {
        if tag > Self::MAX_TAG {
            Self::NONE
        } else {
            Self(1 << tag)
        }
    }

    /// Raw bitmask.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of tags in the set.
    #[inline]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub const fn contains(self, tag: u32) -> bool {
        tag <= Self::MAX_TAG && self.0 & (1 << tag) != 0
    }

    /// `self ⊆ other`
    #[inline]
    pub const fn is_subset_of(self, other: Self) -> bool {
        self.0 & other.0 == self.0
    }

    /// `self ⊇ other`
    #[inline]
    pub const fn is_superset_of(self, other: Self) -> bool {
        other.is_subset_of(self)
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Tags in exactly one of the two sets.
    #[inline]
    pub const fn symmetric_difference(self, other: Self) -> Self {
        Self(self.0 ^ other.0)
    }

    #[inline]
    pub const fn complement(self) -> Self {
        Self(!self.0)
    }

    /// Iterate over contained tags in ascending order.
    pub fn tags(self) -> Tags {
        Tags(self.0)
    }
}

impl Add for PropertySet {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOr for PropertySet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitAnd for PropertySet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl Sub for PropertySet {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.difference(rhs)
    }
}

impl BitXor for PropertySet {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self {
        self.symmetric_difference(rhs)
    }
}

impl Not for PropertySet {
    type Output = Self;

    fn not(self) -> Self {
        self.complement()
    }
}

impl FromIterator<u32> for PropertySet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::NONE, |set, tag| set + Self::from_tag(tag))
    }
}

impl fmt::Display for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, tag) in self.tags().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", tag)?;
        }
        write!(f, "}}")
    }
}

/// Ascending iterator over the tags of a [`PropertySet`].
#[derive(Debug, Clone)]
pub struct Tags(u32);

impl Iterator for Tags {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.0 == 0 {
            return None;
        }
        let tag = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(tag)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Tags {}
