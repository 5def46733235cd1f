//! Solution-sequence modifiers: projection, distinct, ordering, slicing.

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::expression::EvalScope;
use crate::row::Row;
use crate::rowsource::RowSource;
use crate::sort::{sort_rows, KeyedRow};
use rqalgebra::OrderExpression;
use rqrdf::{NamedOrBlankNode, Term};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::rc::Rc;

/// Narrows and reorders the inner row to the projected variable list.
pub(crate) struct Project {
    inner: Box<dyn RowSource>,
    variables: Vec<usize>,
    columns: Vec<Option<usize>>,
    emitted: usize,
}

impl Project {
    pub fn new(inner: Box<dyn RowSource>, variables: Vec<usize>) -> Self {
        let columns = variables
            .iter()
            .map(|offset| inner.variables().iter().position(|o| o == offset))
            .collect();
        Self {
            inner,
            variables,
            columns,
            emitted: 0,
        }
    }
}

impl RowSource for Project {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        let Some(row) = self.inner.read_row()? else {
            return Ok(None);
        };
        let values = self
            .columns
            .iter()
            .map(|column| column.and_then(|column| row.values[column].clone()))
            .collect();
        let offset = self.emitted;
        self.emitted += 1;
        Ok(Some(Row { values, offset }))
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.emitted = 0;
        self.inner.reset()
    }

    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        self.inner.set_origin(origin);
    }

    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        (index == 0).then(|| self.inner.as_ref())
    }
}

/// Drops rows whose values match an already-emitted row, term for term.
pub(crate) struct Distinct {
    ctx: Rc<EvalContext>,
    inner: Box<dyn RowSource>,
    variables: Vec<usize>,
    seen: FxHashSet<Vec<Option<Term>>>,
    emitted: usize,
}

impl Distinct {
    pub fn new(inner: Box<dyn RowSource>, ctx: &Rc<EvalContext>) -> Self {
        let variables = inner.variables().to_vec();
        Self {
            ctx: Rc::clone(ctx),
            inner,
            variables,
            seen: FxHashSet::default(),
            emitted: 0,
        }
    }
}

impl RowSource for Distinct {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        loop {
            self.ctx.limits.check()?;
            let Some(mut row) = self.inner.read_row()? else {
                return Ok(None);
            };
            if self.seen.insert(row.values.clone()) {
                row.offset = self.emitted;
                self.emitted += 1;
                return Ok(Some(row));
            }
        }
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.seen.clear();
        self.emitted = 0;
        self.inner.reset()
    }

    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        self.inner.set_origin(origin);
    }

    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        (index == 0).then(|| self.inner.as_ref())
    }
}

/// `LIMIT`/`OFFSET` on the inner stream.
pub(crate) struct Slice {
    inner: Box<dyn RowSource>,
    variables: Vec<usize>,
    start: usize,
    length: Option<usize>,
    skipped: usize,
    served: usize,
}

impl Slice {
    pub fn new(inner: Box<dyn RowSource>, start: usize, length: Option<usize>) -> Self {
        let variables = inner.variables().to_vec();
        Self {
            inner,
            variables,
            start,
            length,
            skipped: 0,
            served: 0,
        }
    }
}

impl RowSource for Slice {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        if self.length.is_some_and(|length| self.served >= length) {
            return Ok(None);
        }
        while self.skipped < self.start {
            if self.inner.read_row()?.is_none() {
                return Ok(None);
            }
            self.skipped += 1;
        }
        let Some(mut row) = self.inner.read_row()? else {
            return Ok(None);
        };
        row.offset = self.served;
        self.served += 1;
        Ok(Some(row))
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.skipped = 0;
        self.served = 0;
        self.inner.reset()
    }

    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        self.inner.set_origin(origin);
    }

    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        (index == 0).then(|| self.inner.as_ref())
    }
}

/// Buffers the whole inner stream, computes the order keys of every row
/// (an evaluation error sorts lowest) and serves the rows in stable sorted
/// order.
pub(crate) struct OrderBy {
    ctx: Rc<EvalContext>,
    inner: Box<dyn RowSource>,
    conditions: Vec<OrderExpression>,
    descending: Vec<bool>,
    variables: Vec<usize>,
    buffered: Option<VecDeque<Row>>,
    origin: Option<NamedOrBlankNode>,
}

impl OrderBy {
    pub fn new(
        inner: Box<dyn RowSource>,
        conditions: Vec<OrderExpression>,
        ctx: &Rc<EvalContext>,
    ) -> Self {
        let descending = conditions.iter().map(OrderExpression::is_descending).collect();
        let variables = inner.variables().to_vec();
        Self {
            ctx: Rc::clone(ctx),
            inner,
            conditions,
            descending,
            variables,
            buffered: None,
            origin: None,
        }
    }

    fn fill_buffer(&mut self) -> Result<(), EvaluationError> {
        let mut keyed = Vec::new();
        let scope = EvalScope {
            ctx: &self.ctx,
            variables: &self.variables,
            origin: self.origin.as_ref(),
        };
        while let Some(row) = self.inner.read_row()? {
            self.ctx.limits.check()?;
            let keys = self
                .conditions
                .iter()
                .map(|condition| scope.evaluate(condition.expression(), &row))
                .collect();
            keyed.push(KeyedRow { keys, row });
        }
        sort_rows(&mut keyed, &self.descending);
        self.buffered = Some(keyed.into_iter().map(|keyed| keyed.row).collect());
        Ok(())
    }
}

impl RowSource for OrderBy {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        if self.buffered.is_none() {
            self.fill_buffer()?;
        }
        Ok(self.buffered.as_mut().and_then(VecDeque::pop_front))
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.buffered = None;
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
