//! The pull surfaces query execution hands back to callers.

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::rowsource::RowSource;
use rqalgebra::{NamedNodePattern, TermPattern, TriplePattern};
use rqrdf::{BlankNode, NamedNode, NamedOrBlankNode, Term, Triple, Variable};
use rqresults::QuerySolution;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

/// Results of a [SPARQL query](https://www.w3.org/TR/sparql11-query/).
pub enum QueryResults {
    /// Results of a [SELECT](https://www.w3.org/TR/sparql11-query/#select) query.
    Solutions(QuerySolutionIter),
    /// Result of an [ASK](https://www.w3.org/TR/sparql11-query/#ask) query.
    Boolean(bool),
    /// Results of a [CONSTRUCT](https://www.w3.org/TR/sparql11-query/#construct) query.
    Graph(QueryTripleIter),
}

impl From<bool> for QueryResults {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// An iterator over [`QuerySolution`]s.
///
/// The first fatal error ends the stream: it is yielded once and every
/// later call returns `None`.
pub struct QuerySolutionIter {
    variables: Arc<[Variable]>,
    source: Box<dyn RowSource>,
    finished: bool,
}

impl QuerySolutionIter {
    pub(crate) fn new(
        ctx: &Rc<EvalContext>,
        source: Box<dyn RowSource>,
    ) -> Result<Self, EvaluationError> {
        let mut variables = Vec::with_capacity(source.variables().len());
        for &offset in source.variables() {
            variables.push(ctx.table.variable(offset).cloned().ok_or_else(|| {
                EvaluationError::Internal(format!(
                    "projected offset {offset} has no named variable"
                ))
            })?);
        }
        Ok(Self {
            variables: variables.into(),
            source,
            finished: false,
        })
    }

    /// The variables projected by the solutions, in projection order.
    #[inline]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Rewinds the stream to its beginning so it can be read again.
    pub fn rewind(&mut self) -> Result<(), EvaluationError> {
        self.source.reset()?;
        self.finished = false;
        Ok(())
    }
}

impl Iterator for QuerySolutionIter {
    type Item = Result<QuerySolution, EvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.source.read_row() {
            Ok(Some(row)) => Some(Ok((Arc::clone(&self.variables), row.values).into())),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.finished = true;
                Some(Err(error))
            }
        }
    }
}

/// The triple stream of a `CONSTRUCT` query: the template is instantiated
/// once per solution, skipping triples with unbound or ill-placed terms,
/// with template blank nodes renamed per solution.
pub struct QueryTripleIter {
    source: Box<dyn RowSource>,
    template: Vec<TriplePattern>,
    columns: FxHashMap<String, usize>,
    pending: VecDeque<Triple>,
    finished: bool,
}

impl QueryTripleIter {
    pub(crate) fn new(
        ctx: &Rc<EvalContext>,
        source: Box<dyn RowSource>,
        template: Vec<TriplePattern>,
    ) -> Self {
        let mut columns = FxHashMap::default();
        for (column, &offset) in source.variables().iter().enumerate() {
            if let Some(variable) = ctx.table.variable(offset) {
                columns.insert(variable.as_str().to_owned(), column);
            }
        }
        Self {
            source,
            template,
            columns,
            pending: VecDeque::new(),
            finished: false,
        }
    }

    fn instantiate(&mut self, values: &[Option<Term>]) {
        let mut blank_nodes: FxHashMap<String, BlankNode> = FxHashMap::default();
        for pattern in &self.template {
            let subject: Option<NamedOrBlankNode> = match &pattern.subject {
                TermPattern::NamedNode(node) => Some(node.clone().into()),
                TermPattern::BlankNode(node) => {
                    Some(fresh_blank_node(&mut blank_nodes, node).into())
                }
                TermPattern::Literal(_) => None,
                TermPattern::Variable(variable) => {
                    match self.value_of(variable.as_str(), values) {
                        Some(Term::NamedNode(node)) => Some(node.into()),
                        Some(Term::BlankNode(node)) => Some(node.into()),
                        _ => None,
                    }
                }
            };
            let predicate: Option<NamedNode> = match &pattern.predicate {
                NamedNodePattern::NamedNode(node) => Some(node.clone()),
                NamedNodePattern::Variable(variable) => {
                    match self.value_of(variable.as_str(), values) {
                        Some(Term::NamedNode(node)) => Some(node),
                        _ => None,
                    }
                }
            };
            let object: Option<Term> = match &pattern.object {
                TermPattern::NamedNode(node) => Some(node.clone().into()),
                TermPattern::BlankNode(node) => {
                    Some(fresh_blank_node(&mut blank_nodes, node).into())
                }
                TermPattern::Literal(literal) => Some(literal.clone().into()),
                TermPattern::Variable(variable) => self.value_of(variable.as_str(), values),
            };
            if let (Some(subject), Some(predicate), Some(object)) = (subject, predicate, object)
            {
                self.pending.push_back(Triple {
                    subject,
                    predicate,
                    object,
                });
            }
        }
    }

    fn value_of(&self, name: &str, values: &[Option<Term>]) -> Option<Term> {
        values.get(*self.columns.get(name)?)?.clone()
    }
}

fn fresh_blank_node(
    blank_nodes: &mut FxHashMap<String, BlankNode>,
    template_node: &BlankNode,
) -> BlankNode {
    blank_nodes
        .entry(template_node.as_str().to_owned())
        .or_default()
        .clone()
}

impl Iterator for QueryTripleIter {
    type Item = Result<Triple, EvaluationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(triple) = self.pending.pop_front() {
                return Some(Ok(triple));
            }
            if self.finished {
                return None;
            }
            match self.source.read_row() {
                Ok(Some(row)) => self.instantiate(&row.values),
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(error) => {
                    self.finished = true;
                    return Some(Err(error));
                }
            }
        }
    }
}
