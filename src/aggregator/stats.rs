//! Packed count/size accumulator shared by trie values and frozen rows.
//!
//! Count and size live in 32-bit fields. Size is stored in units of
//! [`SIZE_ALIGNMENT`] so the same field reaches further. Every mutation is
//! checked: exceeding a field is a [`AggregationError::CapacityOverflow`],
//! never a wrap.

use crate::utils::config::{MAX_PACKED, SIZE_ALIGNMENT, SIZE_SHIFT};
use crate::utils::error::AggregationError;

/// Capacity and occupancy gathered from array observations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrayUsage {
    /// Sum of array capacities
    pub length: u64,

    /// Sum of occupied slots
    pub used: u64,
}

impl ArrayUsage {
    pub fn new(length: u64, used: u64) -> Self {
        Self { length, used }
    }

    fn checked_add(&self, other: &ArrayUsage) -> Result<ArrayUsage, AggregationError> {
        let length = self.length.checked_add(other.length).ok_or_else(|| {
            AggregationError::overflow(
                "length",
                self.length as u128 + other.length as u128,
                u64::MAX as u128,
            )
        })?;
        let used = self.used.checked_add(other.used).ok_or_else(|| {
            AggregationError::overflow(
                "used",
                self.used as u128 + other.used as u128,
                u64::MAX as u128,
            )
        })?;
        Ok(ArrayUsage { length, used })
    }
}

/// Count, size and optional array usage of a group of instances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsAccumulator {
    count: u32,
    size_units: u32,
    array: Option<ArrayUsage>,
}

impl StatsAccumulator {
    /// Empty accumulator without array info
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty accumulator that carries array info
    pub fn for_array() -> Self {
        Self {
            array: Some(ArrayUsage::default()),
            ..Self::default()
        }
    }

    /// Stats of a single observed instance
    pub fn single(size: u64, array: Option<ArrayUsage>) -> Result<Self, AggregationError> {
        let mut stats = Self {
            array,
            ..Self::default()
        };
        stats.set_count(1)?;
        stats.set_size(size)?;
        Ok(stats)
    }

    /// Largest size a packed size field can represent
    pub const fn max_size() -> u64 {
        MAX_PACKED << SIZE_SHIFT
    }

    pub fn count(&self) -> u64 {
        self.count as u64
    }

    pub fn size(&self) -> u64 {
        (self.size_units as u64) << SIZE_SHIFT
    }

    pub fn length(&self) -> u64 {
        self.array.map_or(0, |a| a.length)
    }

    pub fn used(&self) -> u64 {
        self.array.map_or(0, |a| a.used)
    }

    pub fn array_usage(&self) -> Option<ArrayUsage> {
        self.array
    }

    pub fn is_array_info(&self) -> bool {
        self.array.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn set_count(&mut self, count: u64) -> Result<(), AggregationError> {
        self.count = pack("count", count)?;
        Ok(())
    }

    pub fn set_size(&mut self, size: u64) -> Result<(), AggregationError> {
        self.size_units = pack_size("size", size)?;
        Ok(())
    }

    pub fn set_length(&mut self, length: u64) -> Result<(), AggregationError> {
        match self.array.as_mut() {
            Some(array) => {
                array.length = length;
                Ok(())
            }
            None => Err(AggregationError::invalid(
                "length can only be set on an array accumulator",
            )),
        }
    }

    pub fn set_used(&mut self, used: u64) -> Result<(), AggregationError> {
        match self.array.as_mut() {
            Some(array) => {
                array.used = used;
                Ok(())
            }
            None => Err(AggregationError::invalid(
                "used can only be set on an array accumulator",
            )),
        }
    }

    /// Fold `other` into this accumulator
    ///
    /// Array info is carried over whenever `other` has some. Nothing is
    /// written unless every field fits.
    pub fn add(&mut self, other: &StatsAccumulator) -> Result<(), AggregationError> {
        let count = pack("count", self.count() + other.count())?;
        let size_units = pack(
            "size",
            self.size_units as u64 + other.size_units as u64,
        )
        .map_err(|_| {
            AggregationError::overflow(
                "size",
                (self.size() + other.size()) as u128,
                Self::max_size() as u128,
            )
        })?;
        let array = match (self.array, other.array) {
            (Some(mine), Some(theirs)) => Some(mine.checked_add(&theirs)?),
            (mine, theirs) => mine.or(theirs),
        };

        self.count = count;
        self.size_units = size_units;
        self.array = array;
        Ok(())
    }

    /// Average instance size, 0 for an empty accumulator
    pub fn average(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.size() / self.count()
        }
    }

    /// Percentage of array slots in use
    pub fn use_percentage(&self) -> f64 {
        percent(self.used(), self.length())
    }

    pub fn clear_array_info(&mut self) {
        self.array = None;
    }

    pub fn reset(&mut self) -> &mut Self {
        self.count = 0;
        self.size_units = 0;
        if self.array.is_some() {
            self.array = Some(ArrayUsage::default());
        }
        self
    }
}

/// `part` as a percentage of `whole`
///
/// 0 when `part` is 0, infinite when only `whole` is 0.
pub fn percent(part: u64, whole: u64) -> f64 {
    if part == 0 {
        return 0.0;
    }

    if whole == 0 {
        return f64::INFINITY;
    }

    part as f64 * 100.0 / whole as f64
}

pub(crate) fn pack(field: &'static str, value: u64) -> Result<u32, AggregationError> {
    u32::try_from(value)
        .map_err(|_| AggregationError::overflow(field, value as u128, MAX_PACKED as u128))
}

pub(crate) fn pack_size(field: &'static str, size: u64) -> Result<u32, AggregationError> {
    if size % SIZE_ALIGNMENT != 0 {
        return Err(AggregationError::invalid(format!(
            "{} {} is not a multiple of the {}-byte alignment",
            field, size, SIZE_ALIGNMENT
        )));
    }

    u32::try_from(size >> SIZE_SHIFT).map_err(|_| {
        AggregationError::overflow(
            field,
            size as u128,
            StatsAccumulator::max_size() as u128,
        )
    })
}
