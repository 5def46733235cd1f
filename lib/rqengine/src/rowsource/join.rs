//! Nested-loop joins: inner join, left join (`OPTIONAL`) and `MINUS`.

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::expression::EvalScope;
use crate::row::{CompatibilityMap, Row};
use crate::rowsource::RowSource;
use rqalgebra::Expression;
use rqrdf::NamedOrBlankNode;
use std::rc::Rc;

/// Where each right-hand column lands in the merged row.
enum RightColumn {
    /// Shared with the left side at this left column.
    Shared(usize),
    /// Appended after the left columns.
    Appended,
}

struct JoinLayout {
    variables: Vec<usize>,
    map: CompatibilityMap,
    right_columns: Vec<RightColumn>,
}

impl JoinLayout {
    fn new(left: &dyn RowSource, right: &dyn RowSource) -> Self {
        let map = CompatibilityMap::new(left.variables(), right.variables());
        let mut variables = left.variables().to_vec();
        let mut right_columns = Vec::with_capacity(right.variables().len());
        for offset in right.variables() {
            match left.variables().iter().position(|o| o == offset) {
                Some(column) => right_columns.push(RightColumn::Shared(column)),
                None => {
                    variables.push(*offset);
                    right_columns.push(RightColumn::Appended);
                }
            }
        }
        Self {
            variables,
            map,
            right_columns,
        }
    }

    /// Merges a compatible row pair, taking the right value for variables
    /// the left row leaves unbound.
    fn merge(&self, left: &Row, right: &Row, offset: usize) -> Row {
        let mut values = left.values.clone();
        for (column, value) in self.right_columns.iter().zip(&right.values) {
            match column {
                RightColumn::Shared(left_column) => {
                    if values[*left_column].is_none() {
                        values[*left_column] = value.clone();
                    }
                }
                RightColumn::Appended => values.push(value.clone()),
            }
        }
        Row { values, offset }
    }

    /// The left row padded with nulls to the merged width.
    fn unmatched(&self, left: &Row, offset: usize) -> Row {
        let mut values = left.values.clone();
        values.resize(self.variables.len(), None);
        Row { values, offset }
    }
}

/// The inner join: for each left row the right side is reset and scanned,
/// compatible pairs merge.
pub(crate) struct Join {
    ctx: Rc<EvalContext>,
    left: Box<dyn RowSource>,
    right: Box<dyn RowSource>,
    layout: JoinLayout,
    current_left: Option<Row>,
    emitted: usize,
}

impl Join {
    pub fn new(
        left: Box<dyn RowSource>,
        right: Box<dyn RowSource>,
        ctx: &Rc<EvalContext>,
    ) -> Self {
        let layout = JoinLayout::new(left.as_ref(), right.as_ref());
        Self {
            ctx: Rc::clone(ctx),
            left,
            right,
            layout,
            current_left: None,
            emitted: 0,
        }
    }
}

impl RowSource for Join {
    fn variables(&self) -> &[usize] {
        &self.layout.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        loop {
            self.ctx.limits.check()?;
            if self.current_left.is_none() {
                match self.left.read_row()? {
                    Some(row) => {
                        self.current_left = Some(row);
                        self.right.reset()?;
                    }
                    None => return Ok(None),
                }
            }
            let Some(left) = &self.current_left else {
                return Ok(None);
            };
            while let Some(right) = self.right.read_row()? {
                if self.layout.map.compatible(left, &right) {
                    let merged = self.layout.merge(left, &right, self.emitted);
                    self.emitted += 1;
                    return Ok(Some(merged));
                }
            }
            self.current_left = None;
        }
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.left.reset()?;
        self.right.reset()?;
        self.current_left = None;
        self.emitted = 0;
        Ok(())
    }

    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        self.left.set_origin(origin.clone());
        self.right.set_origin(origin);
    }

    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        match index {
            0 => Some(self.left.as_ref()),
            1 => Some(self.right.as_ref()),
            _ => None,
        }
    }
}

/// `OPTIONAL`: like [`Join`], but a left row with no surviving match is
/// emitted padded with nulls. The trailing filter expression is evaluated
/// on the merged row; an error or `false` suppresses that pair and the
/// unmatched fallback applies.
pub(crate) struct LeftJoin {
    ctx: Rc<EvalContext>,
    left: Box<dyn RowSource>,
    right: Box<dyn RowSource>,
    expression: Option<Expression>,
    layout: JoinLayout,
    current_left: Option<Row>,
    matched: bool,
    emitted: usize,
    origin: Option<NamedOrBlankNode>,
}

impl LeftJoin {
    pub fn new(
        left: Box<dyn RowSource>,
        right: Box<dyn RowSource>,
        expression: Option<Expression>,
        ctx: &Rc<EvalContext>,
    ) -> Self {
        let layout = JoinLayout::new(left.as_ref(), right.as_ref());
        Self {
            ctx: Rc::clone(ctx),
            left,
            right,
            expression,
            layout,
            current_left: None,
            matched: false,
            emitted: 0,
            origin: None,
        }
    }
}

impl RowSource for LeftJoin {
    fn variables(&self) -> &[usize] {
        &self.layout.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        loop {
            self.ctx.limits.check()?;
            if self.current_left.is_none() {
                match self.left.read_row()? {
                    Some(row) => {
                        self.current_left = Some(row);
                        self.matched = false;
                        self.right.reset()?;
                    }
                    None => return Ok(None),
                }
            }
            let Some(left) = &self.current_left else {
                return Ok(None);
            };
            while let Some(right) = self.right.read_row()? {
                if !self.layout.map.compatible(left, &right) {
                    continue;
                }
                let merged = self.layout.merge(left, &right, self.emitted);
                if let Some(expression) = &self.expression {
                    let scope = EvalScope {
                        ctx: &self.ctx,
                        variables: &self.layout.variables,
                        origin: self.origin.as_ref(),
                    };
                    if scope.evaluate_boolean(expression, &merged) != Some(true) {
                        continue;
                    }
                }
                self.matched = true;
                self.emitted += 1;
                return Ok(Some(merged));
            }
            let fallback = if self.matched {
                None
            } else {
                let row = self.layout.unmatched(left, self.emitted);
                self.emitted += 1;
                Some(row)
            };
            self.current_left = None;
            if fallback.is_some() {
                return Ok(fallback);
            }
        }
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.left.reset()?;
        self.right.reset()?;
        self.current_left = None;
        self.matched = false;
        self.emitted = 0;
        Ok(())
    }

    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        self.origin = origin.clone();
        self.left.set_origin(origin.clone());
        self.right.set_origin(origin);
    }

    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        match index {
            0 => Some(self.left.as_ref()),
            1 => Some(self.right.as_ref()),
            _ => None,
        }
    }
}

/// `MINUS`: a left row is dropped when some right row is compatible with it
/// and shares at least one binding.
pub(crate) struct Minus {
    ctx: Rc<EvalContext>,
    left: Box<dyn RowSource>,
    right: Box<dyn RowSource>,
    map: CompatibilityMap,
    variables: Vec<usize>,
    emitted: usize,
}

impl Minus {
    pub fn new(
        left: Box<dyn RowSource>,
        right: Box<dyn RowSource>,
        ctx: &Rc<EvalContext>,
    ) -> Self {
        let map = CompatibilityMap::new(left.variables(), right.variables());
        let variables = left.variables().to_vec();
        Self {
            ctx: Rc::clone(ctx),
            left,
            right,
            map,
            variables,
            emitted: 0,
        }
    }
}

impl RowSource for Minus {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        'next_left: while let Some(mut left) = self.left.read_row()? {
            self.ctx.limits.check()?;
            self.right.reset()?;
            while let Some(right) = self.right.read_row()? {
                if self.map.compatible(&left, &right) && self.map.shares_binding(&left, &right)
                {
                    continue 'next_left;
                }
            }
            left.offset = self.emitted;
            self.emitted += 1;
            return Ok(Some(left));
        }
        Ok(None)
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.left.reset()?;
        self.right.reset()?;
        self.emitted = 0;
        Ok(())
    }

    fn set_origin(&mut self, origin: Option<NamedOrBlankNode>) {
        self.left.set_origin(origin.clone());
        self.right.set_origin(origin);
    }

    fn inner(&self, index: usize) -> Option<&dyn RowSource> {
        match index {
            0 => Some(self.left.as_ref()),
            1 => Some(self.right.as_ref()),
            _ => None,
        }
    }
}
