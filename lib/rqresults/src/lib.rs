#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]

mod csv;
mod format;
mod json;
mod serializer;
mod solution;
mod xml;

pub use crate::format::QueryResultsFormat;
pub use crate::serializer::{QueryResultsSerializer, SolutionsSerializer};
pub use crate::solution::QuerySolution;
