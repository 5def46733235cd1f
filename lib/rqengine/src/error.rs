use rqalgebra::{PrepareError, SyntaxError};
use std::error::Error;
use std::time::Duration;

/// A SPARQL evaluation error.
///
/// Expression-level type errors are NOT represented here: they stay in-band
/// in the evaluator (an absent value) and never abort the row stream.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum EvaluationError {
    /// Error during `SERVICE` evaluation.
    #[error("{0}")]
    Service(#[source] Box<dyn Error + Send + Sync>),
    /// The `SERVICE` name is a variable or otherwise unbound.
    #[error("the term naming the service endpoint is unbound")]
    UnboundService,
    /// No handler is registered for `SERVICE` evaluation.
    #[error("no SERVICE handler has been registered")]
    UnsupportedService,
    /// The wall-clock budget of the query was exhausted.
    #[error("query execution exceeded the timeout limit of {0:?}")]
    Timeout(Duration),
    /// The query stop flag was raised.
    #[error("the query has been cancelled")]
    Cancelled,
    /// An engine invariant does not hold; the query is aborted.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// An error raised while turning query text into an executable query.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum QueryPrepareError {
    /// The query text does not parse.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    /// The parsed tree violates a preparation rule.
    #[error(transparent)]
    Prepare(#[from] PrepareError),
}
