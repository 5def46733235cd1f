//! The leaf operator: matching one triple pattern against the dataset.

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::RowSource;
use rqalgebra::{NamedNodePattern, TermPattern, TriplePattern};
use rqrdf::{GraphName, NamedOrBlankNode, Quad, Term};
use std::rc::Rc;

/// One column of the pattern: a ground term, the first occurrence of a
/// variable, or a repeated occurrence that must match the first.
enum Slot {
    Constant(Term),
    Variable { offset: usize, column: usize },
    Repeated { column: usize },
}

/// Emits one row per dataset quad matching the pattern in the current
/// origin graph, binding the pattern variables. Variables already bound in
/// the runtime frame (`EXISTS` pre-binding) act as constants.
pub(crate) struct TriplesMatch {
    ctx: Rc<EvalContext>,
    subject: Slot,
    predicate: Slot,
    object: Slot,
    variables: Vec<usize>,
    cursor: usize,
    emitted: usize,
    origin: Option<NamedOrBlankNode>,
}

impl TriplesMatch {
    pub fn new(pattern: &TriplePattern, ctx: &Rc<EvalContext>) -> Result<Self, EvaluationError> {
        let mut variables = Vec::new();
        let subject = term_slot(&pattern.subject, ctx, &mut variables)?;
        let predicate = match &pattern.predicate {
            NamedNodePattern::NamedNode(node) => Slot::Constant(node.clone().into()),
            NamedNodePattern::Variable(variable) => {
                variable_slot(super::named_offset(ctx, variable)?, &mut variables)
            }
        };
        let object = term_slot(&pattern.object, ctx, &mut variables)?;
        Ok(Self {
            ctx: Rc::clone(ctx),
            subject,
            predicate,
            object,
            variables,
            cursor: 0,
            emitted: 0,
            origin: None,
        })
    }

    fn graph_matches(&self, quad: &Quad) -> bool {
        match (&self.origin, &quad.graph_name) {
            (None, graph_name) => graph_name.is_default_graph(),
            (Some(NamedOrBlankNode::NamedNode(origin)), GraphName::NamedNode(graph_name)) => {
                origin == graph_name
            }
            (Some(NamedOrBlankNode::BlankNode(origin)), GraphName::BlankNode(graph_name)) => {
                origin == graph_name
            }
            _ => false,
        }
    }
}

fn term_slot(
    pattern: &TermPattern,
    ctx: &Rc<EvalContext>,
    variables: &mut Vec<usize>,
) -> Result<Slot, EvaluationError> {
    Ok(match pattern {
        TermPattern::NamedNode(node) => Slot::Constant(node.clone().into()),
        TermPattern::Literal(literal) => Slot::Constant(literal.clone().into()),
        // Blank nodes in patterns behave as anonymous variables.
        TermPattern::BlankNode(node) => {
            let offset = ctx.table.anonymous_offset(node.as_str()).ok_or_else(|| {
                EvaluationError::Internal(format!(
                    "blank node {node} is missing from the table"
                ))
            })?;
            variable_slot(offset, variables)
        }
        TermPattern::Variable(variable) => {
            variable_slot(super::named_offset(ctx, variable)?, variables)
        }
    })
}

fn variable_slot(offset: usize, variables: &mut Vec<usize>) -> Slot {
    if let Some(column) = variables.iter().position(|&o| o == offset) {
        Slot::Repeated { column }
    } else {
        variables.push(offset);
        Slot::Variable {
            offset,
            column: variables.len() - 1,
        }
    }
}

impl RowSource for TriplesMatch {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        self.ctx.limits.check()?;
        let frame = self.ctx.frame.borrow();
        while let Some(quad) = self.ctx.dataset.get(self.cursor) {
            self.cursor += 1;
            if !self.graph_matches(quad) {
                continue;
            }
            let mut values = vec![None; self.variables.len()];
            let subject: Term = quad.subject.clone().into();
            let predicate: Term = quad.predicate.clone().into();
            if match_slot(&self.subject, &subject, &mut values, &frame)
                && match_slot(&self.predicate, &predicate, &mut values, &frame)
                && match_slot(&self.object, &quad.object, &mut values, &frame)
            {
                let offset = self.emitted;
                self.emitted += 1;
                return Ok(Some(Row { values, offset }));
            }
        }
        Ok(None)
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.cursor = 0;
        self.emitted = 0;
        Ok(())
    }

    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        self.origin = origin;
    }
}

fn match_slot(
    slot: &Slot,
    term: &Term,
    values: &mut [Option<Term>],
    frame: &[Option<Term>],
) -> bool {
    match slot {
        Slot::Constant(expected) => expected == term,
        Slot::Variable { offset, column } => {
            if let Some(bound) = frame.get(*offset).and_then(Option::as_ref) {
                if bound != term {
                    return false;
                }
            }
            values[*column] = Some(term.clone());
            true
        }
        Slot::Repeated { column } => values[*column].as_ref() == Some(term),
    }
}
