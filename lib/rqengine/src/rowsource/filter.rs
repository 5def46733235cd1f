//! Row filtering and `BIND`.

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::expression::EvalScope;
use crate::row::Row;
use crate::rowsource::RowSource;
use rqalgebra::Expression;
use rqrdf::NamedOrBlankNode;
use std::rc::Rc;

/// Drops the rows whose filter expression errors or is not effectively
/// true.
pub(crate) struct Filter {
    ctx: Rc<EvalContext>,
    inner: Box<dyn RowSource>,
    expression: Expression,
    variables: Vec<usize>,
    origin: Option<NamedOrBlankNode>,
}

impl Filter {
    pub fn new(
        inner: Box<dyn RowSource>,
        expression: Expression,
        ctx: &Rc<EvalContext>,
    ) -> Self {
        let variables = inner.variables().to_vec();
        Self {
            ctx: Rc::clone(ctx),
            inner,
            expression,
            variables,
            origin: None,
        }
    }
}

impl RowSource for Filter {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        loop {
            self.ctx.limits.check()?;
            let Some(row) = self.inner.read_row()? else {
                return Ok(None);
            };
            let scope = EvalScope {
                ctx: &self.ctx,
                variables: &self.variables,
                origin: self.origin.as_ref(),
            };
            if scope.evaluate_boolean(&self.expression, &row) == Some(true) {
                return Ok(Some(row));
            }
        }
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.inner.reset()
    }

    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        self.origin = origin.clone();
        self.inner.set_origin(origin);
    }

    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        (index == 0).then(|| self.inner.as_ref())
    }
}

/// `BIND`: widens each row by one column holding the expression value, or
/// null when evaluation errors.
pub(crate) struct Extend {
    ctx: Rc<EvalContext>,
    inner: Box<dyn RowSource>,
    expression: Expression,
    inner_width: usize,
    variables: Vec<usize>,
    origin: Option<NamedOrBlankNode>,
}

impl Extend {
    pub fn new(
        inner: Box<dyn RowSource>,
        offset: usize,
        expression: Expression,
        ctx: &Rc<EvalContext>,
    ) -> Self {
        let mut variables = inner.variables().to_vec();
        let inner_width = variables.len();
        variables.push(offset);
        Self {
            ctx: Rc::clone(ctx),
            inner,
            expression,
            inner_width,
            variables,
            origin: None,
        }
    }
}

impl RowSource for Extend {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        self.ctx.limits.check()?;
        let Some(mut row) = self.inner.read_row()? else {
            return Ok(None);
        };
        let scope = EvalScope {
            ctx: &self.ctx,
            variables: &self.variables[..self.inner_width],
            origin: self.origin.as_ref(),
        };
        let value = scope.evaluate(&self.expression, &row);
        row.values.push(value);
        Ok(Some(row))
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.inner.reset()
    }

    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        self.origin = origin.clone();
        self.inner.set_origin(origin);
    }

    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        (index == 0).then(|| self.inner.as_ref())
    }
}
