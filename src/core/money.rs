//! Currency-tagged optional amounts.

use super::errors::AlgebraError;
use super::optional::OptionalValue;
use std::fmt::Display;
use std::ops::{Add, Div, Mul, Neg, Sub};

const DEFAULT_PLACEHOLDER: &str = "?";

/// Presentation class of an amount, derived only from its sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignStyle {
    Negative,
    NonNegative,
    Absent,
}

/// An [`OptionalValue`] in a specific currency.
///
/// Combining two amounts requires both to carry the same currency; a mismatch
/// is reported as [`AlgebraError::CurrencyMismatch`] rather than an absent
/// result. Scaling by a plain number keeps the amount's currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Money {
    value: OptionalValue,
    currency: String,
    placeholder: String,
}

impl Money {
    pub fn new(value: impl Into<OptionalValue>, currency: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            currency: currency.into(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    pub fn absent(currency: impl Into<String>) -> Self {
        Self::new(OptionalValue::absent(), currency)
    }

    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(0.0, currency)
    }

    /// Replaces the text shown while the amount is unknown.
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn value(&self) -> OptionalValue {
        self.value
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn is_present(&self) -> bool {
        self.value.is_present()
    }

    pub fn get(&self) -> Result<f64, AlgebraError> {
        self.value.get()
    }

    fn with_value(&self, value: OptionalValue) -> Self {
        Self {
            value,
            currency: self.currency.clone(),
            placeholder: self.placeholder.clone(),
        }
    }

    fn check_currency(&self, other: &Money) -> Result<(), AlgebraError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(AlgebraError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            })
        }
    }

    pub fn try_add(&self, other: &Money) -> Result<Money, AlgebraError> {
        self.check_currency(other)?;
        Ok(self.with_value(self.value + other.value))
    }

    pub fn try_sub(&self, other: &Money) -> Result<Money, AlgebraError> {
        self.check_currency(other)?;
        Ok(self.with_value(self.value - other.value))
    }

    /// Ratio of two amounts in the same currency, e.g. a gain relative to cost.
    pub fn try_ratio(&self, other: &Money) -> Result<OptionalValue, AlgebraError> {
        self.check_currency(other)?;
        Ok(self.value / other.value)
    }

    /// Sums amounts that must all be in `currency`. An empty input is zero.
    pub fn try_sum<'a>(
        amounts: impl IntoIterator<Item = &'a Money>,
        currency: &str,
    ) -> Result<Money, AlgebraError> {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |total, amount| total.try_add(amount))
    }

    pub fn sign_style(&self) -> SignStyle {
        match self.value.value() {
            None => SignStyle::Absent,
            Some(v) if v < 0.0 => SignStyle::Negative,
            Some(_) => SignStyle::NonNegative,
        }
    }
}

/// Checks that every operand of an n-ary operation shares one currency.
pub fn ensure_same_currency(amounts: &[&Money]) -> Result<(), AlgebraError> {
    match amounts.split_first() {
        Some((first, rest)) => rest.iter().try_for_each(|m| first.check_currency(m)),
        None => Ok(()),
    }
}

/// Formats `value` with two decimals and `,` thousands separators.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.2}", value.abs());
    let (integer, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value.value() {
            Some(v) => write!(f, "{} {}", self.currency, format_amount(v)),
            None => write!(f, "{}", self.placeholder),
        }
    }
}

macro_rules! impl_scalar_op {
    ($trait:ident, $method:ident) => {
        impl<T: Into<OptionalValue>> $trait<T> for Money {
            type Output = Money;

            fn $method(self, rhs: T) -> Money {
                let rhs: OptionalValue = rhs.into();
                let value = $trait::$method(self.value, rhs);
                self.with_value(value)
            }
        }

        impl<T: Into<OptionalValue>> $trait<T> for &Money {
            type Output = Money;

            fn $method(self, rhs: T) -> Money {
                let rhs: OptionalValue = rhs.into();
                self.with_value($trait::$method(self.value, rhs))
            }
        }
    };
}

impl_scalar_op!(Add, add);
impl_scalar_op!(Sub, sub);
impl_scalar_op!(Mul, mul);
impl_scalar_op!(Div, div);

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        let value = -self.value;
        self.with_value(value)
    }
}
