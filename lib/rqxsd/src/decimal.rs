use crate::{Double, Float, Integer};
use std::fmt;
use std::str::FromStr;

const FRACTION_DIGITS: u32 = 18;
const FRACTION_POW: i128 = 1_000_000_000_000_000_000;

/// [XML Schema `decimal` datatype](https://www.w3.org/TR/xmlschema11-2/#decimal)
///
/// A fixed-point value stored in an [`i128`] scaled by 10¹⁸, giving close to
/// 18 digits on each side of the decimal point.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Decimal {
    value: i128, // value * 10^18
}

impl Decimal {
    pub const MAX: Self = Self { value: i128::MAX };
    pub const MIN: Self = Self { value: i128::MIN };

    /// Builds the decimal `digits / 10^scale`.
    #[inline]
    pub const fn new(digits: i128, scale: u32) -> Result<Self, TooLargeForDecimalError> {
        let Some(shift) = FRACTION_DIGITS.checked_sub(scale) else {
            return Err(TooLargeForDecimalError);
        };
        let Some(value) = digits.checked_mul(10_i128.pow(shift)) else {
            return Err(TooLargeForDecimalError);
        };
        Ok(Self { value })
    }

    /// [op:numeric-add](https://www.w3.org/TR/xpath-functions-31/#func-numeric-add)
    ///
    /// Returns `None` in case of overflow.
    #[inline]
    #[must_use]
    pub fn checked_add(self, rhs: impl Into<Self>) -> Option<Self> {
        Some(Self {
            value: self.value.checked_add(rhs.into().value)?,
        })
    }

    /// [op:numeric-subtract](https://www.w3.org/TR/xpath-functions-31/#func-numeric-subtract)
    ///
    /// Returns `None` in case of overflow.
    #[inline]
    #[must_use]
    pub fn checked_sub(self, rhs: impl Into<Self>) -> Option<Self> {
        Some(Self {
            value: self.value.checked_sub(rhs.into().value)?,
        })
    }

    /// [op:numeric-multiply](https://www.w3.org/TR/xpath-functions-31/#func-numeric-multiply)
    ///
    /// Returns `None` in case of overflow.
    ///
    /// The two operands carry 36 fractional digits between them; the factors
    /// of ten that cannot be cancelled out before the multiplication must
    /// come from trailing zeros of the operands, otherwise the product does
    /// not fit the representation.
    #[must_use]
    pub fn checked_mul(self, rhs: impl Into<Self>) -> Option<Self> {
        let (a, cancelled_a) = cancel_trailing_zeros(self.value);
        let (b, cancelled_b) = cancel_trailing_zeros(rhs.into().value);
        let product = a.checked_mul(b)?;
        let cancelled = cancelled_a + cancelled_b;
        Some(Self {
            value: if cancelled >= FRACTION_DIGITS {
                product.checked_mul(10_i128.checked_pow(cancelled - FRACTION_DIGITS)?)?
            } else {
                // Low-order digits beyond the representable precision are dropped.
                product.checked_div(10_i128.checked_pow(FRACTION_DIGITS - cancelled)?)?
            },
        })
    }

    /// [op:numeric-divide](https://www.w3.org/TR/xpath-functions-31/#func-numeric-divide)
    ///
    /// Returns `None` in case of division by 0 or overflow.
    #[must_use]
    pub fn checked_div(self, rhs: impl Into<Self>) -> Option<Self> {
        let rhs = rhs.into();
        if rhs.value == 0 {
            return None;
        }
        // Shift the dividend up as far as it goes and the divisor down as far
        // as its trailing zeros allow, then settle the remaining scale.
        let mut dividend = self.value;
        let mut up = 0_u32;
        if dividend != 0 {
            while let Some(shifted) = dividend.checked_mul(10) {
                dividend = shifted;
                up += 1;
            }
        }
        let (divisor, down) = cancel_trailing_zeros(rhs.value);
        let quotient = dividend.checked_div(divisor)?;
        let shifted = up + down;
        Some(Self {
            value: if shifted >= FRACTION_DIGITS {
                quotient.checked_div(10_i128.checked_pow(shifted - FRACTION_DIGITS)?)?
            } else {
                quotient.checked_mul(10_i128.checked_pow(FRACTION_DIGITS - shifted)?)?
            },
        })
    }

    /// [op:numeric-mod](https://www.w3.org/TR/xpath-functions-31/#func-numeric-mod)
    ///
    /// Returns `None` in case of division by 0.
    #[inline]
    #[must_use]
    pub fn checked_rem(self, rhs: impl Into<Self>) -> Option<Self> {
        Some(Self {
            value: self.value.checked_rem(rhs.into().value)?,
        })
    }

    /// [op:numeric-unary-minus](https://www.w3.org/TR/xpath-functions-31/#func-numeric-unary-minus)
    ///
    /// Returns `None` in case of overflow.
    #[inline]
    #[must_use]
    pub fn checked_neg(self) -> Option<Self> {
        Some(Self {
            value: self.value.checked_neg()?,
        })
    }

    /// [fn:abs](https://www.w3.org/TR/xpath-functions-31/#func-abs)
    ///
    /// Returns `None` in case of overflow.
    #[inline]
    #[must_use]
    pub fn checked_abs(self) -> Option<Self> {
        Some(Self {
            value: self.value.checked_abs()?,
        })
    }

    /// [fn:floor](https://www.w3.org/TR/xpath-functions-31/#func-floor)
    #[inline]
    #[must_use]
    pub fn checked_floor(self) -> Option<Self> {
        Some(Self {
            value: self.value.checked_sub(self.value.rem_euclid(FRACTION_POW))?,
        })
    }

    /// [fn:ceiling](https://www.w3.org/TR/xpath-functions-31/#func-ceiling)
    #[inline]
    #[must_use]
    pub fn checked_ceil(self) -> Option<Self> {
        let rem = self.value.rem_euclid(FRACTION_POW);
        if rem == 0 {
            return Some(self);
        }
        Some(Self {
            value: self
                .value
                .checked_sub(rem)?
                .checked_add(FRACTION_POW)?,
        })
    }

    /// [fn:round](https://www.w3.org/TR/xpath-functions-31/#func-round)
    ///
    /// Rounds half towards positive infinity.
    #[inline]
    #[must_use]
    pub fn checked_round(self) -> Option<Self> {
        Self {
            value: self.value.checked_add(FRACTION_POW / 2)?,
        }
        .checked_floor()
    }

    #[inline]
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.value < 0
    }

    #[inline]
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.value > 0
    }

    /// Rounds towards zero into an [`Integer`], the XSD cast behaviour.
    #[inline]
    #[must_use]
    pub fn to_integer(self) -> Option<Integer> {
        i64::try_from(self.value / FRACTION_POW).ok().map(Into::into)
    }

    pub(crate) const fn raw_value(self) -> i128 {
        self.value
    }
}

fn cancel_trailing_zeros(mut value: i128) -> (i128, u32) {
    let mut cancelled = 0;
    if value != 0 {
        while value % 10 == 0 && cancelled < FRACTION_DIGITS {
            value /= 10;
            cancelled += 1;
        }
    } else {
        cancelled = FRACTION_DIGITS;
    }
    (value, cancelled)
}

impl From<bool> for Decimal {
    #[inline]
    fn from(value: bool) -> Self {
        i64::from(value).into()
    }
}

impl From<i32> for Decimal {
    #[inline]
    fn from(value: i32) -> Self {
        i64::from(value).into()
    }
}

impl From<i64> for Decimal {
    #[inline]
    fn from(value: i64) -> Self {
        Self {
            value: i128::from(value) * FRACTION_POW,
        }
    }
}

impl From<Integer> for Decimal {
    #[inline]
    fn from(value: Integer) -> Self {
        i64::from(value).into()
    }
}

impl TryFrom<Double> for Decimal {
    type Error = TooLargeForDecimalError;

    fn try_from(value: Double) -> Result<Self, Self::Error> {
        let value = f64::from(value);
        if !value.is_finite() {
            return Err(TooLargeForDecimalError);
        }
        #[allow(clippy::cast_precision_loss)]
        let scaled = value * FRACTION_POW as f64;
        if scaled <= i128::MIN as f64 || scaled >= i128::MAX as f64 {
            return Err(TooLargeForDecimalError);
        }
        Ok(Self {
            #[allow(clippy::cast_possible_truncation)]
            value: scaled.round() as i128,
        })
    }
}

impl TryFrom<Float> for Decimal {
    type Error = TooLargeForDecimalError;

    #[inline]
    fn try_from(value: Float) -> Result<Self, Self::Error> {
        Double::from(value).try_into()
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (negative, unsigned) = match input.as_bytes().first() {
            Some(b'-') => (true, &input[1..]),
            Some(b'+') => (false, &input[1..]),
            Some(_) => (false, input),
            None => return Err(ParseDecimalError::Syntax),
        };
        let (integer_part, fraction_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };
        if integer_part.is_empty() && fraction_part.is_empty() {
            return Err(ParseDecimalError::Syntax);
        }
        if fraction_part.len() > FRACTION_DIGITS as usize {
            return Err(ParseDecimalError::Overflow);
        }
        let mut value = 0_i128;
        for b in integer_part.bytes() {
            if !b.is_ascii_digit() {
                return Err(ParseDecimalError::Syntax);
            }
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add((b - b'0').into()))
                .ok_or(ParseDecimalError::Overflow)?;
        }
        value = value
            .checked_mul(FRACTION_POW)
            .ok_or(ParseDecimalError::Overflow)?;
        let mut fraction_scale = FRACTION_POW;
        for b in fraction_part.bytes() {
            if !b.is_ascii_digit() {
                return Err(ParseDecimalError::Syntax);
            }
            fraction_scale /= 10;
            value = value
                .checked_add(i128::from(b - b'0') * fraction_scale)
                .ok_or(ParseDecimalError::Overflow)?;
        }
        Ok(Self {
            value: if negative {
                value.checked_neg().ok_or(ParseDecimalError::Overflow)?
            } else {
                value
            },
        })
    }
}

impl fmt::Display for Decimal {
    /// Canonical form: no leading zeros, a decimal point with at least one
    /// digit after it, trailing fraction zeros removed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value < 0 {
            f.write_str("-")?;
        }
        let magnitude = self.value.unsigned_abs();
        let integer_part = magnitude / FRACTION_POW.unsigned_abs();
        let mut fraction_part = magnitude % FRACTION_POW.unsigned_abs();
        let mut digits = FRACTION_DIGITS;
        while digits > 1 && fraction_part % 10 == 0 {
            fraction_part /= 10;
            digits -= 1;
        }
        write!(f, "{integer_part}.{fraction_part:0digits$}", digits = digits as usize)
    }
}

/// An error when parsing a [`Decimal`] lexical form.
#[derive(Debug, Clone, Copy, thiserror::Error)]
pub enum ParseDecimalError {
    #[error("the value does not fit the xsd:decimal internal representation")]
    Overflow,
    #[error("the string is not a valid xsd:decimal")]
    Syntax,
}

/// The input is too large to fit into a [`Decimal`].
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("value too large for xsd:decimal internal representation")]
pub struct TooLargeForDecimalError;

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn from_str() {
        assert_eq!(dec("1.5").to_string(), "1.5");
        assert_eq!(dec("-01.50").to_string(), "-1.5");
        assert_eq!(dec("+.5").to_string(), "0.5");
        assert_eq!(dec("5.").to_string(), "5.0");
        assert_eq!(dec("42").to_string(), "42.0");
        assert_eq!(dec("0").to_string(), "0.0");
        assert!(Decimal::from_str(".").is_err());
        assert!(Decimal::from_str("1e3").is_err());
        assert!(Decimal::from_str("--1").is_err());
    }

    #[test]
    fn canonicalises_trailing_zeros() {
        assert_eq!(dec("1.500").to_string(), "1.5");
        assert_eq!(dec("1.000").to_string(), "1.0");
        assert_eq!(dec("0.010").to_string(), "0.01");
    }

    #[test]
    fn arithmetic() {
        assert_eq!(dec("1.5").checked_add(dec("2.5")), Some(dec("4")));
        assert_eq!(dec("1.5").checked_mul(dec("2")), Some(dec("3")));
        assert_eq!(dec("0.5").checked_mul(dec("0.5")), Some(dec("0.25")));
        assert_eq!(dec("1").checked_div(dec("4")), Some(dec("0.25")));
        assert_eq!(dec("1").checked_div(dec("0")), None);
        assert_eq!(
            dec("1").checked_div(dec("3")).unwrap().to_string(),
            "0.333333333333333333"
        );
        assert_eq!(Decimal::MAX.checked_add(Decimal::new(1, 18).unwrap()), None);
    }

    #[test]
    fn rounding() {
        assert_eq!(dec("2.5").checked_round(), Some(dec("3")));
        assert_eq!(dec("-2.5").checked_round(), Some(dec("-2")));
        assert_eq!(dec("2.4").checked_floor(), Some(dec("2")));
        assert_eq!(dec("-2.4").checked_floor(), Some(dec("-3")));
        assert_eq!(dec("2.4").checked_ceil(), Some(dec("3")));
        assert_eq!(dec("-2.4").checked_ceil(), Some(dec("-2")));
    }

    #[test]
    fn to_integer() {
        assert_eq!(dec("42.7").to_integer(), Some(Integer::from(42)));
        assert_eq!(dec("-42.7").to_integer(), Some(Integer::from(-42)));
        assert_eq!(Decimal::MAX.to_integer(), None);
    }
}
