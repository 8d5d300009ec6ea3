//! A number that may not be known yet.
//!
//! [`OptionalValue`] lets UI code compute sums and gains over quotes that are
//! still in flight: every arithmetic operation yields an absent result as soon
//! as one operand is absent. Only [`OptionalValue::get`] and
//! [`OptionalValue::try_cmp`] can fail.

use super::errors::AlgebraError;
use std::cmp::Ordering;
use std::fmt::Display;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, Sub, SubAssign};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptionalValue(Option<f64>);

impl OptionalValue {
    pub const ABSENT: OptionalValue = OptionalValue(None);

    pub fn present(value: f64) -> Self {
        Self(Some(value))
    }

    pub fn absent() -> Self {
        Self::ABSENT
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the contained number, failing loudly when it is absent.
    pub fn get(&self) -> Result<f64, AlgebraError> {
        self.0.ok_or(AlgebraError::AbsentValueUnwrap)
    }

    pub fn value(&self) -> Option<f64> {
        self.0
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        Self(self.0.map(f))
    }

    /// Combines two operands with `f`, or yields absent if either is absent.
    pub fn zip_with(self, other: impl Into<OptionalValue>, f: impl FnOnce(f64, f64) -> f64) -> Self {
        match (self.0, other.into().0) {
            (Some(a), Some(b)) => Self(Some(f(a, b))),
            _ => Self::ABSENT,
        }
    }

    /// Orders two present values. Absent operands have no ordering.
    pub fn try_cmp(&self, other: &OptionalValue) -> Result<Ordering, AlgebraError> {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.partial_cmp(&b).ok_or(AlgebraError::UnorderedAbsent),
            _ => Err(AlgebraError::UnorderedAbsent),
        }
    }

    pub fn pow(self, exponent: impl Into<OptionalValue>) -> Self {
        self.zip_with(exponent, f64::powf)
    }

    pub fn powi(self, exponent: i32) -> Self {
        self.map(|v| v.powi(exponent))
    }

    pub fn abs(self) -> Self {
        self.map(f64::abs)
    }

    pub fn round(self) -> Self {
        self.map(f64::round)
    }

    pub fn round_to(self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        self.map(|v| (v * factor).round() / factor)
    }

    pub fn floor_div(self, rhs: impl Into<OptionalValue>) -> Self {
        self.zip_with(rhs, |a, b| (a / b).floor())
    }

    /// Floored quotient and the matching remainder, which takes the sign of
    /// the divisor.
    pub fn div_rem(self, rhs: impl Into<OptionalValue>) -> (Self, Self) {
        let rhs = rhs.into();
        let quotient = self.floor_div(rhs);
        let remainder = self.zip_with(rhs, |a, b| a - b * (a / b).floor());
        (quotient, remainder)
    }

    /// Formats a present value with `fmt`, an absent one as `placeholder`.
    pub fn format_with(&self, fmt: impl Fn(f64) -> String, placeholder: &str) -> String {
        self.0.map_or_else(|| placeholder.to_string(), fmt)
    }
}

impl From<f64> for OptionalValue {
    fn from(value: f64) -> Self {
        Self::present(value)
    }
}

impl From<Option<f64>> for OptionalValue {
    fn from(value: Option<f64>) -> Self {
        Self(value)
    }
}

impl From<OptionalValue> for Option<f64> {
    fn from(value: OptionalValue) -> Self {
        value.0
    }
}

impl Display for OptionalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(v) => {
                let precision = f.precision().unwrap_or(2);
                write!(f, "{v:.precision$}")
            }
            None => write!(f, "?"),
        }
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident) => {
        impl $trait for OptionalValue {
            type Output = OptionalValue;

            fn $method(self, rhs: OptionalValue) -> OptionalValue {
                self.zip_with(rhs, <f64 as $trait>::$method)
            }
        }

        impl $trait<f64> for OptionalValue {
            type Output = OptionalValue;

            fn $method(self, rhs: f64) -> OptionalValue {
                self.zip_with(rhs, <f64 as $trait>::$method)
            }
        }

        impl $trait<OptionalValue> for f64 {
            type Output = OptionalValue;

            fn $method(self, rhs: OptionalValue) -> OptionalValue {
                OptionalValue::present(self).zip_with(rhs, <f64 as $trait>::$method)
            }
        }
    };
}

macro_rules! impl_assign_op {
    ($trait:ident, $method:ident, $op:ident, $op_method:ident) => {
        impl<T: Into<OptionalValue>> $trait<T> for OptionalValue {
            fn $method(&mut self, rhs: T) {
                *self = self.zip_with(rhs, <f64 as $op>::$op_method);
            }
        }
    };
}

impl_binary_op!(Add, add);
impl_binary_op!(Sub, sub);
impl_binary_op!(Mul, mul);
impl_binary_op!(Div, div);
impl_binary_op!(Rem, rem);

impl_assign_op!(AddAssign, add_assign, Add, add);
impl_assign_op!(SubAssign, sub_assign, Sub, sub);
impl_assign_op!(MulAssign, mul_assign, Mul, mul);
impl_assign_op!(DivAssign, div_assign, Div, div);

impl Neg for OptionalValue {
    type Output = OptionalValue;

    fn neg(self) -> OptionalValue {
        self.map(f64::neg)
    }
}

impl Sum for OptionalValue {
    fn sum<I: Iterator<Item = OptionalValue>>(iter: I) -> Self {
        iter.fold(OptionalValue::present(0.0), |total, value| total + value)
    }
}

impl<'a> Sum<&'a OptionalValue> for OptionalValue {
    fn sum<I: Iterator<Item = &'a OptionalValue>>(iter: I) -> Self {
        iter.copied().sum()
    }
}
