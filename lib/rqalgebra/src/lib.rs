#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]

pub mod algebra;
mod expression;
mod parser;
pub mod prepare;
mod query;
pub mod term;
pub mod use_map;

pub use crate::algebra::GraphPattern;
pub use crate::expression::{
    AggregateExpression, AggregateFunction, Expression, Function, OrderExpression,
};
pub use crate::parser::SyntaxError;
pub use crate::prepare::{PrepareError, PrepareWarning, PreparedQuery};
pub use crate::query::{Query, QueryDataset};
pub use crate::term::{GroundTerm, NamedNodePattern, TermPattern, TriplePattern};
