use crate::Decimal;
use std::cmp::Ordering;
use std::fmt;

/// [XML Schema `dayTimeDuration` datatype](https://www.w3.org/TR/xmlschema11-2/#dayTimeDuration)
///
/// Stores the duration as a number of seconds in a [`Decimal`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct DayTimeDuration {
    seconds: Decimal,
}

impl DayTimeDuration {
    #[inline]
    #[must_use]
    pub fn new(seconds: impl Into<Decimal>) -> Self {
        Self {
            seconds: seconds.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn as_seconds(self) -> Decimal {
        self.seconds
    }
}

impl From<Decimal> for DayTimeDuration {
    #[inline]
    fn from(seconds: Decimal) -> Self {
        Self { seconds }
    }
}

impl PartialEq<Decimal> for DayTimeDuration {
    #[inline]
    fn eq(&self, other: &Decimal) -> bool {
        self.seconds == *other
    }
}

impl PartialOrd<Decimal> for DayTimeDuration {
    #[inline]
    fn partial_cmp(&self, other: &Decimal) -> Option<Ordering> {
        self.seconds.partial_cmp(other)
    }
}

impl fmt::Display for DayTimeDuration {
    /// Canonical `PnDTnHnMnS` rendering with zero components omitted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seconds.is_negative() {
            f.write_str("-")?;
        }
        let Some(magnitude) = self.seconds.checked_abs() else {
            return Err(fmt::Error);
        };
        let whole = i64::from(magnitude.to_integer().ok_or(fmt::Error)?);
        let fraction = magnitude
            .checked_sub(Decimal::from(whole))
            .ok_or(fmt::Error)?;
        let days = whole / 86_400;
        let hours = whole % 86_400 / 3_600;
        let minutes = whole % 3_600 / 60;
        let seconds = whole % 60;
        f.write_str("P")?;
        if days != 0 {
            write!(f, "{days}D")?;
        }
        if hours == 0 && minutes == 0 && seconds == 0 && fraction == Decimal::from(0) {
            if days == 0 {
                f.write_str("T0S")?;
            }
            return Ok(());
        }
        f.write_str("T")?;
        if hours != 0 {
            write!(f, "{hours}H")?;
        }
        if minutes != 0 {
            write!(f, "{minutes}M")?;
        }
        if fraction != Decimal::from(0) {
            let seconds = Decimal::from(seconds)
                .checked_add(fraction)
                .ok_or(fmt::Error)?;
            write!(f, "{seconds}S")?;
        } else if seconds != 0 {
            write!(f, "{seconds}S")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(DayTimeDuration::new(0).to_string(), "PT0S");
        assert_eq!(DayTimeDuration::new(19_800).to_string(), "PT5H30M");
        assert_eq!(DayTimeDuration::new(-3_600).to_string(), "-PT1H");
        assert_eq!(DayTimeDuration::new(90_061).to_string(), "P1DT1H1M1S");
        assert_eq!(
            DayTimeDuration::new(Decimal::new(15, 1).unwrap()).to_string(),
            "PT1.5S"
        );
    }
}
