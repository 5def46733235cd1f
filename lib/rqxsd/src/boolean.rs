use crate::{Decimal, Double, Float, Integer};
use std::fmt;
use std::str::FromStr;

/// [XML Schema `boolean` datatype](https://www.w3.org/TR/xmlschema11-2/#boolean)
///
/// Uses internally a [`bool`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Boolean {
    value: bool,
}

impl Boolean {
    #[inline]
    #[must_use]
    pub fn is_true(self) -> bool {
        self.value
    }
}

impl From<bool> for Boolean {
    #[inline]
    fn from(value: bool) -> Self {
        Self { value }
    }
}

impl From<Integer> for Boolean {
    #[inline]
    fn from(value: Integer) -> Self {
        (value != Integer::from(0)).into()
    }
}

impl From<Decimal> for Boolean {
    #[inline]
    fn from(value: Decimal) -> Self {
        (value != Decimal::from(0)).into()
    }
}

impl From<Float> for Boolean {
    #[inline]
    fn from(value: Float) -> Self {
        (value != Float::from(0.) && !value.is_nan()).into()
    }
}

impl From<Double> for Boolean {
    #[inline]
    fn from(value: Double) -> Self {
        (value != Double::from(0.) && !value.is_nan()).into()
    }
}

impl From<Boolean> for bool {
    #[inline]
    fn from(value: Boolean) -> Self {
        value.value
    }
}

impl FromStr for Boolean {
    type Err = ParseBooleanError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(match input {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => return Err(ParseBooleanError),
        }
        .into())
    }
}

impl fmt::Display for Boolean {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// An error when parsing a [`Boolean`] lexical form.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("the string is not a valid xsd:boolean")]
pub struct ParseBooleanError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str() -> Result<(), ParseBooleanError> {
        assert!(Boolean::from_str("true")?.is_true());
        assert!(Boolean::from_str("1")?.is_true());
        assert!(!Boolean::from_str("false")?.is_true());
        assert!(!Boolean::from_str("0")?.is_true());
        assert!(Boolean::from_str("yes").is_err());
        Ok(())
    }

    #[test]
    fn from_numeric() {
        assert!(Boolean::from(Integer::from(5)).is_true());
        assert!(!Boolean::from(Decimal::from(0)).is_true());
        assert!(!Boolean::from(Double::from(f64::NAN)).is_true());
    }
}
