#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]

mod blank_node;
pub mod dataset;
mod io;
mod literal;
mod named_node;
mod parser;
mod triple;
mod variable;
pub mod vocab;

pub use crate::blank_node::{BlankNode, BlankNodeIdParseError};
pub use crate::dataset::Dataset;
pub use crate::io::{NQuadsParseError, NQuadsParser, NQuadsWriter};
pub use crate::literal::{Literal, NumericValue};
pub use crate::named_node::{NamedNode, NamedNodeRef};
pub use crate::parser::TermParseError;
pub use crate::triple::{GraphName, NamedOrBlankNode, Quad, Term, Triple, TryFromTermError};
pub use crate::variable::{Variable, VariableNameParseError};
pub use oxilangtag::LanguageTagParseError;
pub use oxiri::IriParseError;
