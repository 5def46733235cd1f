//! The `SERVICE` collaborator contract.
//!
//! The engine does not speak HTTP itself: callers plug in a handler that
//! evaluates a graph pattern against a remote endpoint and hands solutions
//! back. A handler construction failure under `SERVICE SILENT` degrades to
//! an empty rowsource.

use rqalgebra::GraphPattern;
use rqrdf::{NamedNode, Term, Variable};
use std::error::Error;

/// Evaluates the inner pattern of a `SERVICE` clause against a remote
/// endpoint.
pub trait ServiceHandler {
    /// Returns the solution variables and, for each solution, the values in
    /// the same order (`None` for unbound).
    fn handle(
        &self,
        service_name: &NamedNode,
        pattern: &GraphPattern,
    ) -> Result<ServiceSolutions, Box<dyn Error + Send + Sync>>;
}

/// The solution table a [`ServiceHandler`] returns.
pub struct ServiceSolutions {
    pub variables: Vec<Variable>,
    pub solutions: Vec<Vec<Option<Term>>>,
}

impl<F> ServiceHandler for F
where
    F: Fn(&NamedNode, &GraphPattern) -> Result<ServiceSolutions, Box<dyn Error + Send + Sync>>,
{
    fn handle(
        &self,
        service_name: &NamedNode,
        pattern: &GraphPattern,
    ) -> Result<ServiceSolutions, Box<dyn Error + Send + Sync>> {
        self(service_name, pattern)
    }
}
