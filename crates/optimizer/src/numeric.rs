//! Numeric element trait for tensor kernels
//!
//! Every numeric ONNX element type the reference executor computes with implements
//! `Numeric`. Kernels are written once against the trait and instantiated per
//! `TensorData` variant.

use half::{bf16, f16};
use std::fmt::Debug;

/// Trait for numeric types that can be used in ONNX operations
pub trait Numeric: Debug + Copy + Default + PartialOrd + PartialEq + Send + Sync + 'static {
    /// Size of one element in `raw_data`
    const BYTE_WIDTH: usize;

    /// Whether this is a floating point type
    const IS_FLOAT: bool;

    /// Zero value for this type
    fn zero() -> Self;

    /// One value for this type
    fn one() -> Self;

    /// Convert from i64 (wrapping / saturating like an `as` cast)
    fn from_i64(value: i64) -> Self;

    /// Convert to i64
    fn to_i64(self) -> i64;

    /// Convert from f64
    fn from_f64(value: f64) -> Self;

    /// Convert to f64
    fn to_f64(self) -> f64;

    /// Decode one little-endian element
    fn read_le(bytes: &[u8]) -> Self;

    /// Append the little-endian encoding of this element
    fn write_le(self, out: &mut Vec<u8>);

    /// Add two values (wrapping for integers)
    fn add(self, other: Self) -> Self;

    /// Subtract two values (wrapping for integers)
    fn sub(self, other: Self) -> Self;

    /// Multiply two values (wrapping for integers)
    fn mul(self, other: Self) -> Self;

    /// Divide two values, `None` on integer division by zero
    fn checked_div(self, other: Self) -> Option<Self>;

    /// Remainder, `None` on integer division by zero
    fn checked_rem(self, other: Self) -> Option<Self>;
}

macro_rules! impl_numeric_float {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                const BYTE_WIDTH: usize = std::mem::size_of::<$ty>();
                const IS_FLOAT: bool = true;

                #[inline]
                fn zero() -> Self {
                    0.0
                }

                #[inline]
                fn one() -> Self {
                    1.0
                }

                #[inline]
                fn from_i64(value: i64) -> Self {
                    value as $ty
                }

                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn add(self, other: Self) -> Self {
                    self + other
                }

                #[inline]
                fn sub(self, other: Self) -> Self {
                    self - other
                }

                #[inline]
                fn mul(self, other: Self) -> Self {
                    self * other
                }

                #[inline]
                fn checked_div(self, other: Self) -> Option<Self> {
                    Some(self / other)
                }

                #[inline]
                fn checked_rem(self, other: Self) -> Option<Self> {
                    Some(self % other)
                }
            }
        )*
    };
}

macro_rules! impl_numeric_int {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                const BYTE_WIDTH: usize = std::mem::size_of::<$ty>();
                const IS_FLOAT: bool = false;

                #[inline]
                fn zero() -> Self {
                    0
                }

                #[inline]
                fn one() -> Self {
                    1
                }

                #[inline]
                fn from_i64(value: i64) -> Self {
                    value as $ty
                }

                #[inline]
                fn to_i64(self) -> i64 {
                    self as i64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $ty
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_le_bytes(buf)
                }

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn add(self, other: Self) -> Self {
                    self.wrapping_add(other)
                }

                #[inline]
                fn sub(self, other: Self) -> Self {
                    self.wrapping_sub(other)
                }

                #[inline]
                fn mul(self, other: Self) -> Self {
                    self.wrapping_mul(other)
                }

                #[inline]
                fn checked_div(self, other: Self) -> Option<Self> {
                    if other == 0 {
                        None
                    } else {
                        Some(self.wrapping_div(other))
                    }
                }

                #[inline]
                fn checked_rem(self, other: Self) -> Option<Self> {
                    if other == 0 {
                        None
                    } else {
                        Some(self.wrapping_rem(other))
                    }
                }
            }
        )*
    };
}

// Half precision computes in f32 and rounds the result back
macro_rules! impl_numeric_half {
    ($($ty:ty),*) => {
        $(
            impl Numeric for $ty {
                const BYTE_WIDTH: usize = 2;
                const IS_FLOAT: bool = true;

                #[inline]
                fn zero() -> Self {
                    <$ty>::ZERO
                }

                #[inline]
                fn one() -> Self {
                    <$ty>::ONE
                }

                #[inline]
                fn from_i64(value: i64) -> Self {
                    <$ty>::from_f64(value as f64)
                }

                #[inline]
                fn to_i64(self) -> i64 {
                    <$ty>::to_f32(self) as i64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    <$ty>::from_f64(value)
                }

                #[inline]
                fn to_f64(self) -> f64 {
                    <$ty>::to_f64(self)
                }

                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    <$ty>::from_le_bytes([bytes[0], bytes[1]])
                }

                #[inline]
                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn add(self, other: Self) -> Self {
                    <$ty>::from_f32(self.to_f32() + other.to_f32())
                }

                #[inline]
                fn sub(self, other: Self) -> Self {
                    <$ty>::from_f32(self.to_f32() - other.to_f32())
                }

                #[inline]
                fn mul(self, other: Self) -> Self {
                    <$ty>::from_f32(self.to_f32() * other.to_f32())
                }

                #[inline]
                fn checked_div(self, other: Self) -> Option<Self> {
                    Some(<$ty>::from_f32(self.to_f32() / other.to_f32()))
                }

                #[inline]
                fn checked_rem(self, other: Self) -> Option<Self> {
                    Some(<$ty>::from_f32(self.to_f32() % other.to_f32()))
                }
            }
        )*
    };
}

impl_numeric_float!(f32, f64);
impl_numeric_half!(f16, bf16);
impl_numeric_int!(i8, i16, i32, i64, u8, u16, u32, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_roundtrip() {
        let mut bytes = Vec::new();
        (-3i16).write_le(&mut bytes);
        2.5f32.write_le(&mut bytes);

        assert_eq!(bytes.len(), 6);
        assert_eq!(i16::read_le(&bytes[..2]), -3);
        assert_eq!(f32::read_le(&bytes[2..]), 2.5);
    }

    #[test]
    fn test_integer_division_by_zero() {
        assert_eq!(7i32.checked_div(0), None);
        assert_eq!(7i32.checked_div(2), Some(3));
        assert_eq!((-7i64).checked_div(2), Some(-3));
        assert!(1.0f32.checked_div(0.0).unwrap().is_infinite());
    }

    #[test]
    fn test_half_precision_arithmetic() {
        let a = f16::from_f32(1.5);
        let b = f16::from_f32(2.0);
        assert_eq!(a.add(b), f16::from_f32(3.5));
        assert_eq!(Numeric::to_i64(f16::from_f32(-2.75)), -2);

        let mut bytes = Vec::new();
        bf16::from_f32(-1.0).write_le(&mut bytes);
        assert_eq!(bytes, vec![0x80, 0xbf]);
        assert_eq!(bf16::read_le(&bytes), bf16::from_f32(-1.0));
    }

    #[test]
    fn test_integer_arithmetic_wraps() {
        assert_eq!(u8::MAX.add(1), 0);
        assert_eq!(0u8.sub(1), u8::MAX);
    }
}
