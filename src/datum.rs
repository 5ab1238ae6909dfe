//! Tagged scalar accumulator
//!
//! Every statistic in the tree is either an integer (inode counts, byte
//! totals) or a float (storage-cost estimates in currency units). A node
//! holds millions of these across the whole tree, so the representation is
//! a plain two-variant enum: one discriminant byte plus an eight-byte
//! payload, no boxing, no trait objects.

use serde_json::Value;

/// Floats whose magnitude falls below this are treated as zero.
///
/// Finalization subtracts child aggregates from a parent's clone; cost
/// values that cancel only up to floating-point rounding must still prune
/// to nothing, otherwise every directory grows a near-empty `*.*` child.
pub const FLOAT_ZERO_EPSILON: f64 = 1e-13;

/// A single numeric accumulator, tagged integer or float.
///
/// The tag is fixed at construction. `add`/`sub` are only defined between
/// datums of the same tag; the builder derives every value for a given
/// attribute key with a fixed tag, so mixed-tag arithmetic is a programming
/// bug rather than a data condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Datum {
    /// Unsigned integer payload (counts, sizes in bytes).
    Int(u64),
    /// IEEE double payload (cost estimates).
    Float(f64),
}

impl Datum {
    /// Create an integer datum.
    pub fn int(v: u64) -> Self {
        Datum::Int(v)
    }

    /// Create a float datum.
    pub fn float(v: f64) -> Self {
        Datum::Float(v)
    }

    /// Add `other` into self. Same-tag only.
    pub fn add(&mut self, other: &Datum) {
        match (self, other) {
            (Datum::Int(a), Datum::Int(b)) => *a = a.wrapping_add(*b),
            (Datum::Float(a), Datum::Float(b)) => *a += b,
            _ => debug_assert!(false, "datum tag mismatch in add"),
        }
    }

    /// Subtract `other` from self. Same-tag only.
    pub fn sub(&mut self, other: &Datum) {
        match (self, other) {
            (Datum::Int(a), Datum::Int(b)) => *a = a.wrapping_sub(*b),
            (Datum::Float(a), Datum::Float(b)) => *a -= b,
            _ => debug_assert!(false, "datum tag mismatch in sub"),
        }
    }

    /// Whether this datum counts as zero.
    ///
    /// Integers compare exactly; floats compare against
    /// [`FLOAT_ZERO_EPSILON`] so that values which cancel during
    /// finalization are pruned despite rounding.
    pub fn is_zero(&self) -> bool {
        match self {
            Datum::Int(v) => *v == 0,
            Datum::Float(v) => v.abs() < FLOAT_ZERO_EPSILON,
        }
    }

    /// Project into a JSON number: integers as integers, floats as floats.
    pub fn to_json_value(&self) -> Value {
        match self {
            Datum::Int(v) => Value::from(*v),
            Datum::Float(v) => Value::from(*v),
        }
    }
}
