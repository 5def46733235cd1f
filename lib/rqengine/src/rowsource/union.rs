//! `UNION`: all left rows then all right rows, widened to the union of the
//! two variable sets.

use crate::context::EvalContext;
use crate::error::EvaluationError;
use crate::row::Row;
use crate::rowsource::RowSource;
use rqrdf::NamedOrBlankNode;
use std::rc::Rc;

pub(crate) struct Union {
    ctx: Rc<EvalContext>,
    left: Box<dyn RowSource>,
    right: Box<dyn RowSource>,
    variables: Vec<usize>,
    left_map: Vec<usize>,
    right_map: Vec<usize>,
    on_right: bool,
    emitted: usize,
}

impl Union {
    pub fn new(
        left: Box<dyn RowSource>,
        right: Box<dyn RowSource>,
        ctx: &Rc<EvalContext>,
    ) -> Self {
        let mut variables = left.variables().to_vec();
        let left_map = (0..variables.len()).collect();
        let mut right_map = Vec::with_capacity(right.variables().len());
        for offset in right.variables() {
            match variables.iter().position(|o| o == offset) {
                Some(column) => right_map.push(column),
                None => {
                    variables.push(*offset);
                    right_map.push(variables.len() - 1);
                }
            }
        }
        Self {
            ctx: Rc::clone(ctx),
            left,
            right,
            variables,
            left_map,
            right_map,
            on_right: false,
            emitted: 0,
        }
    }

}

fn widen(width: usize, map: &[usize], row: &Row, offset: usize) -> Row {
    let mut values = vec![None; width];
    for (value, &column) in row.values.iter().zip(map) {
        values[column] = value.clone();
    }
    Row { values, offset }
}

impl RowSource for Union {
    fn variables(&self) -> &[usize] {
        &self.variables
    }

    fn read_row(&mut self) -> Result<Option<Row>, EvaluationError> {
        self.ctx.limits.check()?;
        if !self.on_right {
            if let Some(row) = self.left.read_row()? {
                let row = widen(self.variables.len(), &self.left_map, &row, self.emitted);
                self.emitted += 1;
                return Ok(Some(row));
            }
            self.on_right = true;
        }
        if let Some(row) = self.right.read_row()? {
            let row = widen(self.variables.len(), &self.right_map, &row, self.emitted);
            self.emitted += 1;
            return Ok(Some(row));
        }
        Ok(None)
    }

    fn reset(&mut self) -> Result<(), EvaluationError> {
        self.left.reset()?;
        self.right.reset()?;
        self.on_right = false;
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
