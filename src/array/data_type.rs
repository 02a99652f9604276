//! Data types of uncompressed arrays.
//!
//! Element values are always carried as [`f64`] inside a [`Block`](super::Block).
//! Stores reject 64-bit integers that [`f64`] cannot represent exactly.
//! The [`DataType`] is the logical type reported by an array, and determines the element size used when sizing automatic chunks.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// A data type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// `int8` Integer in `[-2^7, 2^7-1]`.
    #[display("int8")]
    Int8,
    /// `int16` Integer in `[-2^15, 2^15-1]`.
    #[display("int16")]
    Int16,
    /// `int32` Integer in `[-2^31, 2^31-1]`.
    #[display("int32")]
    Int32,
    /// `int64` Integer in `[-2^63, 2^63-1]`.
    #[display("int64")]
    Int64,
    /// `uint8` Integer in `[0, 2^8-1]`.
    #[display("uint8")]
    UInt8,
    /// `uint16` Integer in `[0, 2^16-1]`.
    #[display("uint16")]
    UInt16,
    /// `uint32` Integer in `[0, 2^32-1]`.
    #[display("uint32")]
    UInt32,
    /// `uint64` Integer in `[0, 2^64-1]`.
    #[display("uint64")]
    UInt64,
    /// `float32` IEEE 754 single-precision floating point.
    #[display("float32")]
    Float32,
    /// `float64` IEEE 754 double-precision floating point.
    #[display("float64")]
    Float64,
}

impl DataType {
    /// Returns the size in bytes of an element of this data type.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// Returns true if this is an integer data type.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        !matches!(self, Self::Float32 | Self::Float64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type() {
        assert_eq!(DataType::Int16.size(), 2);
        assert_eq!(DataType::Float64.size(), 8);
        assert!(DataType::UInt32.is_integer());
        assert!(!DataType::Float32.is_integer());
        assert_eq!(DataType::UInt64.to_string(), "uint64");
        assert_eq!(
            serde_json::from_str::<DataType>(r#""float32""#).unwrap(),
            DataType::Float32
        );
        assert_eq!(serde_json::to_string(&DataType::Int8).unwrap(), r#""int8""#);
    }
}
