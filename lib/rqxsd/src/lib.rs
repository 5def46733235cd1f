#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]

mod boolean;
mod date_time;
mod decimal;
mod double;
mod duration;
mod float;
mod integer;

pub use crate::boolean::{Boolean, ParseBooleanError};
pub use crate::date_time::{
    Date, DateTime, InvalidTimezoneError, ParseDateTimeError, TimezoneOffset,
};
pub use crate::decimal::{Decimal, ParseDecimalError, TooLargeForDecimalError};
pub use crate::double::Double;
pub use crate::duration::DayTimeDuration;
pub use crate::float::Float;
pub use crate::integer::{Integer, TooLargeForIntegerError};
