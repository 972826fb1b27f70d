use num_bigint::BigUint;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Engagement counter (likes, comments, shares, views).
///
/// The backend transmits counters as decimal strings because values can
/// exceed the safe integer range of its own clients, so this wraps a
/// genuine arbitrary-precision integer rather than a machine word.
/// Decrements clamp at zero; a counter is never negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Count(BigUint);

impl Count {
    pub fn new(value: u64) -> Self {
        Count(BigUint::from(value))
    }

    /// Parses a decimal string. Returns `None` for anything that is not
    /// a plain non-negative integer.
    pub fn parse(s: &str) -> Option<Self> {
        s.parse::<BigUint>().ok().map(Count)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == BigUint::from(0u32)
    }

    /// Adds one. The exact inverse of [`Count::saturating_decrement`]
    /// whenever the counter is non-zero beforehand.
    pub fn increment(&mut self) {
        self.0 += 1u32;
    }

    /// Subtracts one, clamping at zero.
    pub fn saturating_decrement(&mut self) {
        if !self.is_zero() {
            self.0 -= 1u32;
        }
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }
}

impl From<u64> for Count {
    fn from(value: u64) -> Self {
        Count::new(value)
    }
}

impl fmt::Display for Count {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Count {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

struct CountVisitor;

impl<'de> Visitor<'de> for CountVisitor {
    type Value = Count;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal string or non-negative integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Count, E> {
        Count::parse(v).ok_or_else(|| E::custom(format!("invalid counter value: {:?}", v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Count, E> {
        Ok(Count::new(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Count, E> {
        if v < 0 {
            return Err(E::custom(format!("negative counter value: {}", v)));
        }
        Ok(Count::new(v as u64))
    }
}

impl<'de> Deserialize<'de> for Count {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Count, D::Error> {
        deserializer.deserialize_any(CountVisitor)
    }
}
